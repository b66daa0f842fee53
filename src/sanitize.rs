//! Target filename sanitization.
//!
//! Filenames coming from job lists often contain characters that are not
//! valid on Windows shares, or stacked extensions (`invoice.bak.txt`).
//! [`sanitize`] replaces illegal characters with `_` and records each
//! replaced position in a mask so the report shows exactly what changed.

const REPLACEMENT: char = '_';

/// Returns `true` for characters that are replaced during sanitization:
/// control characters, `< > : " / \ | ? *`, and anything outside ASCII.
#[inline]
pub fn is_illegal(c: char) -> bool {
    c < ' ' || !c.is_ascii() || matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*')
}

/// Outcome of sanitizing one filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// The filename to use
    pub name: String,
    /// Whether `name` differs from the input
    pub was_altered: bool,
    /// One entry per character of the input; `true` where it was replaced
    ///
    /// The mask is aligned with the input, not with `name`: extension
    /// collapse removes characters without shortening the mask.
    pub mask: Vec<bool>,
}

impl Sanitized {
    /// Render the mask as a string of `0` and `1`.
    #[must_use]
    pub fn mask_string(&self) -> String {
        self.mask.iter().map(|&hit| if hit { '1' } else { '0' }).collect()
    }
}

/// Sanitize `filename`.
///
/// With `strip_illegal`, every character matching [`is_illegal`] becomes
/// `_`. With `collapse_extensions`, a name with more than two dot-separated
/// segments keeps only the first and the last one. Collapse runs after
/// character replacement.
///
/// # Example
///
/// ```
/// use bulkxfer::sanitize;
///
/// let result = sanitize("inv<oice>:1.bak.txt", true, true);
/// assert_eq!(result.name, "inv_oice_1.txt");
/// assert_eq!(result.mask_string(), "0001000011000000000");
/// assert!(result.was_altered);
/// ```
pub fn sanitize(filename: &str, strip_illegal: bool, collapse_extensions: bool) -> Sanitized {
    let mut mask = Vec::with_capacity(filename.len());
    let mut name = String::with_capacity(filename.len());

    for c in filename.chars() {
        let replace = strip_illegal && is_illegal(c);
        mask.push(replace);
        name.push(if replace { REPLACEMENT } else { c });
    }

    if collapse_extensions {
        name = collapse(&name);
    }

    Sanitized {
        was_altered: name != filename,
        name,
        mask,
    }
}

fn collapse(name: &str) -> String {
    let mut segments = name.split('.');
    let first = segments.next().unwrap_or_default();
    match segments.clone().count() {
        0 | 1 => name.to_owned(),
        _ => {
            let last = segments.last().unwrap_or_default();
            format!("{first}.{last}")
        }
    }
}
