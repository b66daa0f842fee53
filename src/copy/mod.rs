//! Size-dependent copy strategies.
//!
//! Small files are copied in one operation into a temp file that is
//! atomically renamed over the target. Large files are streamed in fixed
//! size chunks straight into the target, then get their metadata copied.

mod file;
mod utils;

// Re-export public API
pub use file::{CopyOutcome, CopyStrategy, Transferred, transfer};
