use crate::selectors::ACTION_SELECTOR;
use crate::tools::clean::fold;
use crate::tools::parse::element_text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

/// Text right after a price candidate that marks it as a rating, review count or distance.
static TRAILING_NON_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:/\s*\d|(?:stars?|reviews?|ratings?|points?|pts|km|kilometers?|miles?|mi|m|min|minutes?)\b|分|点|件|★|☆)",
    )
    .expect("valid trailing regex")
});

/// Text right before a price candidate that marks it as a score.
static LEADING_NON_PRICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:rating|rated|score|reviews?|評価|評分|口コミ)\s*:?\s*$")
        .expect("valid leading regex")
});

const CONTEXT_CHARS: usize = 16;
const LABEL_CHARS: usize = 40;

/// Invalid selectors are skipped with a warning; `Config::validate` reports them up front.
pub(super) fn compile_selectors(raw: &[String]) -> Vec<(String, Selector)> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some((s.clone(), sel)),
            Err(e) => {
                tracing::warn!(selector = %s, error = ?e, "skipping invalid selector");
                None
            }
        })
        .collect()
}

/// Amount next to a currency marker, either side. `None` when there are no markers.
pub(super) fn price_regex(markers: &[String]) -> Option<Regex> {
    let mut folded: Vec<String> = markers
        .iter()
        .map(|m| fold(m))
        .filter(|m| !m.is_empty())
        .collect();
    if folded.is_empty() {
        return None;
    }
    // longest first so `nt$` wins over `$`
    folded.sort_by_key(|m| std::cmp::Reverse(m.chars().count()));
    folded.dedup();
    let alt = folded
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    let amount = r"\d[\d,]*(?:\.\d+)?";
    Regex::new(&format!(
        r"(?:{alt})\s?{amount}|{amount}\s?(?:{alt})"
    ))
    .ok()
}

/// First price-looking token in folded `text` that is not a rating or distance.
pub(super) fn find_price(text: &str, price: Option<&Regex>) -> Option<String> {
    let price = price?;
    price.find_iter(text).find_map(|m| {
        let after: String = text[m.end()..].chars().take(CONTEXT_CHARS).collect();
        if TRAILING_NON_PRICE.is_match(&after) {
            return None;
        }
        let before: String = {
            let mut rev: Vec<char> = text[..m.start()].chars().rev().take(CONTEXT_CHARS).collect();
            rev.reverse();
            rev.into_iter().collect()
        };
        if LEADING_NON_PRICE.is_match(&before) {
            return None;
        }
        Some(m.as_str().trim().to_string())
    })
}

/// Configured booking selector, or a clickable element labelled with a booking word.
pub(super) fn find_booking_anchor(
    doc: &Html,
    selectors: &[(String, Selector)],
    words: &[String],
) -> Option<String> {
    for (raw, sel) in selectors {
        if doc.select(sel).next().is_some() {
            return Some(format!("booking element: {raw}"));
        }
    }
    for el in doc.select(&ACTION_SELECTOR) {
        let mut label = fold(&element_text(el));
        if label.is_empty() {
            label = el
                .value()
                .attr("value")
                .or_else(|| el.value().attr("aria-label"))
                .map(fold)
                .unwrap_or_default();
        }
        if first_word_match(&label, words).is_some() {
            let short: String = label.chars().take(LABEL_CHARS).collect();
            return Some(format!("booking link: \"{short}\""));
        }
    }
    None
}

/// Booking word inside a room or availability table.
pub(super) fn find_availability_table<'a>(
    doc: &Html,
    selectors: &[Selector],
    words: &'a [String],
) -> Option<&'a str> {
    selectors.iter().find_map(|sel| {
        doc.select(sel)
            .find_map(|el| first_word_match(&fold(&element_text(el)), words))
    })
}

pub(super) fn first_word_match<'a>(haystack: &str, words: &'a [String]) -> Option<&'a str> {
    words.iter().find_map(|w| {
        let needle = fold(w);
        (!needle.is_empty() && contains_word(haystack, &needle)).then_some(w.as_str())
    })
}

/// Substring match; latin needles must also start on a word boundary
/// (`book` matches "booking" but not "facebook").
pub(super) fn contains_word(haystack: &str, needle: &str) -> bool {
    let latin = needle.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    haystack.match_indices(needle).any(|(idx, _)| {
        !latin
            || haystack[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric())
    })
}
