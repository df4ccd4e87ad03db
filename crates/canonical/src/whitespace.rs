//! Whitespace normalization for raw descriptors.
//!
//! The literal form of a descriptor keeps its case and punctuation (tier 0
//! sends it to backends verbatim), but runs of Unicode whitespace are
//! collapsed so "Potatoes,\n  mashed" and "Potatoes, mashed" are the same
//! literal query.

/// Collapses repeated whitespace and trims both ends.
///
/// ```rust
/// use canonical::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  Potatoes,\t mashed \n"), "Potatoes, mashed");
/// assert_eq!(collapse_whitespace("Chicken\u{00A0}breast"), "Chicken breast");
/// assert_eq!(collapse_whitespace(" \n\t "), "");
/// ```
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(segment);
    }
    normalized
}
