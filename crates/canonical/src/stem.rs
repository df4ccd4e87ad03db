//! Light English plural stemmer.
//!
//! Only plural suffixes are removed; past participles and adjective endings
//! ("roasted", "creamy") are kept intact.

use std::borrow::Cow;

/// Stem a single lowercase word.
pub fn stem_word(word: &str) -> Cow<'_, str> {
    if word.chars().count() <= 3 || !word.ends_with('s') {
        return Cow::Borrowed(word);
    }

    if let Some(base) = word.strip_suffix("ies") {
        if base.chars().count() >= 2 {
            return Cow::Owned(format!("{base}y"));
        }
    }

    for suffix in ["oes", "ches", "shes", "sses", "xes", "zes"] {
        if word.ends_with(suffix) {
            return Cow::Borrowed(&word[..word.len() - 2]);
        }
    }

    for keep in ["ss", "us", "is"] {
        if word.ends_with(keep) {
            return Cow::Borrowed(word);
        }
    }

    Cow::Borrowed(&word[..word.len() - 1])
}

/// Stem every space-separated word of an already normalized string.
pub fn stem_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, word) in text.split(' ').filter(|w| !w.is_empty()).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&stem_word(word));
    }
    out
}
