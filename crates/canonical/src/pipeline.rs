use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::NormalizeConfig;
use crate::error::QueryError;
use crate::query::{Category, Granularity, Query, QueryHints};
use crate::stem::stem_text;
use crate::token::contains_phrase;
use crate::whitespace::collapse_whitespace;

/// Normalize free text into lowercase words separated by single spaces.
///
/// Applies NFKC and lowercasing, then turns every non-alphanumeric character
/// into a word boundary. A dash survives as `-` only when it sits between two
/// alphanumeric characters ("stir-fry" stays one word, "- fried" does not).
/// When `stem` is set, each word goes through the light plural stemmer.
pub fn normalize_text(input: &str, stem: bool) -> String {
    let normalized: String = input.nfkc().collect();

    // Lowercasing can expand a single character into multiple (e.g. İ).
    let mut chars: Vec<char> = Vec::with_capacity(normalized.len());
    for grapheme in normalized.graphemes(true) {
        chars.extend(grapheme.to_lowercase().chars());
    }

    let mut out = String::with_capacity(chars.len());
    let mut pending_space = false;

    for (idx, &ch) in chars.iter().enumerate() {
        let kept = if ch.is_alphanumeric() {
            Some(ch)
        } else if ch.is_punctuation_dash() {
            let prev = idx.checked_sub(1).map(|i| chars[i]);
            let next = chars.get(idx + 1).copied();
            match (prev, next) {
                (Some(p), Some(n)) if p.is_alphanumeric() && n.is_alphanumeric() => Some('-'),
                _ => None,
            }
        } else {
            None
        };

        match kept {
            Some(ch) => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                out.push(ch);
            }
            // Whitespace, punctuation, symbols and control characters all
            // end the current word.
            None if !out.is_empty() => pending_space = true,
            None => {}
        }
    }

    if stem {
        stem_text(&out)
    } else {
        out
    }
}

/// Split normalized text into words.
pub fn words(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|w| !w.is_empty()).collect()
}

/// Turn a raw descriptor into a [`Query`].
///
/// Pure function: the same descriptor, hints and config always produce the
/// same query.
pub fn normalize_query(
    raw: &str,
    hints: &QueryHints,
    cfg: &NormalizeConfig,
) -> Result<Query, QueryError> {
    cfg.validate()?;

    let raw_term = collapse_whitespace(raw);
    if raw_term.is_empty() {
        return Err(QueryError::Empty);
    }

    let plain = normalize_text(&raw_term, false);
    let plain_words = words(&plain);
    if plain_words.is_empty() {
        return Err(QueryError::Empty);
    }

    let (kept_words, mut excluded) = split_negative_cues(&plain_words, cfg);

    for term in &hints.excluded_terms {
        let normalized = normalize_text(term, false);
        if !normalized.is_empty() {
            excluded.push(normalized);
        }
    }
    let excluded_terms = finalize_terms(excluded, cfg.stem);

    let brand_tokens = detect_brand_tokens(&plain_words, cfg);

    let joined = kept_words.join(" ");
    let normalized_term = if cfg.stem { stem_text(&joined) } else { joined };

    let granularity = hints
        .granularity
        .unwrap_or_else(|| infer_granularity(&plain_words, &brand_tokens, cfg));

    let mut preferred_categories: Vec<Category> = Vec::new();
    let source = if hints.preferred_categories.is_empty() {
        granularity.default_categories()
    } else {
        hints.preferred_categories.clone()
    };
    for category in source {
        if !preferred_categories.contains(&category) {
            preferred_categories.push(category);
        }
    }
    if !brand_tokens.is_empty() && !preferred_categories.contains(&Category::BrandedProduct) {
        preferred_categories.push(Category::BrandedProduct);
    }

    Ok(Query {
        raw_term,
        normalized_term,
        granularity,
        preferred_categories,
        excluded_terms,
        brand_tokens,
    })
}

/// Removes `<cue> <word>` pairs and returns the remaining words plus the
/// excluded words. Cues are ignored when removing them would leave nothing.
fn split_negative_cues<'a>(
    plain_words: &[&'a str],
    cfg: &NormalizeConfig,
) -> (Vec<&'a str>, Vec<String>) {
    let cues: Vec<String> = cfg
        .negation_cues
        .iter()
        .map(|c| normalize_text(c, false))
        .collect();

    let mut kept = Vec::with_capacity(plain_words.len());
    let mut excluded = Vec::new();
    let mut idx = 0;
    while idx < plain_words.len() {
        let word = plain_words[idx];
        let is_cue = cues.iter().any(|c| c == word);
        if is_cue && idx + 1 < plain_words.len() {
            excluded.push(plain_words[idx + 1].to_string());
            idx += 2;
            continue;
        }
        kept.push(word);
        idx += 1;
    }

    if kept.is_empty() {
        return (plain_words.to_vec(), Vec::new());
    }
    (kept, excluded)
}

fn finalize_terms(terms: Vec<String>, stem: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let term = if stem { stem_text(&term) } else { term };
        if !term.is_empty() && !out.contains(&term) {
            out.push(term);
        }
    }
    out
}

fn detect_brand_tokens(plain_words: &[&str], cfg: &NormalizeConfig) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for keyword in &cfg.brand_keywords {
        let normalized = normalize_text(keyword, false);
        let needle = words(&normalized);
        if contains_phrase(plain_words, &needle) && !found.contains(&normalized) {
            found.push(normalized);
        }
    }
    found
}

fn infer_granularity(
    plain_words: &[&str],
    brand_tokens: &[String],
    cfg: &NormalizeConfig,
) -> Granularity {
    if !brand_tokens.is_empty() {
        return Granularity::BrandedProduct;
    }
    let is_dish = cfg.dish_cues.iter().any(|cue| {
        let normalized = normalize_text(cue, false);
        contains_phrase(plain_words, &words(&normalized))
    });
    if is_dish {
        Granularity::Dish
    } else {
        Granularity::Ingredient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_keeps_internal_hyphens_only() {
        assert_eq!(normalize_text("Stir-Fry, - beef!", false), "stir-fry beef");
        assert_eq!(normalize_text("-leading and trailing-", false), "leading and trailing");
        assert_eq!(normalize_text("no\u{2013}bake", false), "no-bake");
    }

    #[test]
    fn normalize_text_strips_punctuation_and_collapses() {
        assert_eq!(
            normalize_text("  Potatoes,   mashed (prepared) ", false),
            "potatoes mashed prepared"
        );
    }

    #[test]
    fn normalize_text_stems_when_asked() {
        assert_eq!(normalize_text("Mashed Potatoes", true), "mashed potato");
    }
}
