//! Progress reporting support (requires `progress` feature)

use crate::batch::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

/// Create a default progress bar counting transfer jobs
#[must_use]
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} jobs ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// A [`ProgressCallback`] that moves `bar` to the completed count
#[must_use]
pub fn progress_callback(bar: ProgressBar) -> ProgressCallback {
    Box::new(move |completed, total| {
        bar.set_length(total);
        bar.set_position(completed);
    })
}
