//! Availability classifier.
//!
//! Rules run in a fixed order and the first one that fires decides:
//!
//! 1. content shorter than `min_content_len` → not available ("page load anomaly")
//! 2. negative indicator phrase → not available
//! 3. positive indicator phrase → available
//! 4. booking button/link → available
//! 5. price next to a currency marker (ratings/distances excluded) → available
//! 6. room/availability table mentioning booking → available
//! 7. looks like a real hotel page and is substantial → available (unless
//!    `fallback_positive` is off), otherwise "inconclusive"
//!
//! Rule 7 leans towards false positives on purpose: a user who double-checks a
//! sold-out page loses a minute, a user who misses a free room loses the room.

mod tests;
mod utils;

use utils::*;

use crate::config::ClassifierConfig;
use crate::tools::clean::{fold, matching_phrases, matching_words};
use crate::tools::parse::{page_title, parse_page, visible_text};
use crate::types::{Rule, Verdict};
use regex::Regex;
use scraper::Selector;

pub const PAGE_LOAD_ANOMALY: &str = "page load anomaly";
pub const FALLBACK_POSITIVE: &str =
    "inconclusive, defaulting to positive to avoid missed opportunity";
pub const INCONCLUSIVE: &str = "inconclusive";

/// Compiled classifier. Build once per configuration and reuse.
pub struct Classifier {
    cfg: ClassifierConfig,
    booking_selectors: Vec<(String, Selector)>,
    table_selectors: Vec<Selector>,
    price: Option<Regex>,
}

impl Classifier {
    pub fn new(cfg: ClassifierConfig) -> Self {
        let booking_selectors = compile_selectors(&cfg.booking_selectors);
        let table_selectors = compile_selectors(&cfg.table_selectors)
            .into_iter()
            .map(|(_, sel)| sel)
            .collect();
        let price = price_regex(&cfg.currency_markers);
        Self {
            cfg,
            booking_selectors,
            table_selectors,
            price,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.cfg
    }

    /// Decide whether `content` shows a bookable room. Pure: same content,
    /// same verdict.
    pub fn classify(&self, content: &str) -> Verdict {
        let len = content.chars().count();
        if len < self.cfg.min_content_len {
            return Verdict::unavailable(Rule::PageLoadAnomaly, PAGE_LOAD_ANOMALY);
        }

        let doc = parse_page(content);
        let text = fold(&visible_text(&doc));

        let negatives = matching_words(&text, &self.cfg.negative_indicators);
        if !negatives.is_empty() {
            return Verdict::unavailable(
                Rule::NegativeIndicator,
                format!("negative indicators: {}", negatives.join(", ")),
            );
        }

        let positives = matching_words(&text, &self.cfg.positive_indicators);
        if !positives.is_empty() {
            return Verdict::available(
                Rule::PositiveIndicator,
                format!("positive indicators: {}", positives.join(", ")),
            );
        }

        if let Some(found) =
            find_booking_anchor(&doc, &self.booking_selectors, &self.cfg.booking_words)
        {
            return Verdict::available(Rule::BookingAnchor, found);
        }

        if let Some(price) = find_price(&text, self.price.as_ref()) {
            return Verdict::available(Rule::PricePattern, format!("price pattern: {price}"));
        }

        if let Some(word) =
            find_availability_table(&doc, &self.table_selectors, &self.cfg.booking_words)
        {
            return Verdict::available(
                Rule::AvailabilityTable,
                format!("availability table mentions \"{word}\""),
            );
        }

        if self.cfg.fallback_positive && len >= self.cfg.substantial_content_len {
            let title = page_title(&doc).map(|t| fold(&t)).unwrap_or_default();
            let looks_like_hotel = !matching_phrases(&title, &self.cfg.title_keywords).is_empty();
            let title_has_error = !matching_phrases(&title, &self.cfg.error_keywords).is_empty();
            let challenged =
                !matching_phrases(&content.to_lowercase(), &self.cfg.challenge_markers).is_empty();
            if looks_like_hotel && !title_has_error && !challenged {
                return Verdict::available(Rule::FallbackPositive, FALLBACK_POSITIVE);
            }
        }

        Verdict::unavailable(Rule::Inconclusive, INCONCLUSIVE)
    }
}

/// One-off classification with a borrowed configuration.
///
/// # Examples
/// ```
/// use roomwatch::config::ClassifierConfig;
/// use roomwatch::tools::classify::classify;
///
/// let page = format!("<html><body><p>Sold out. No rooms available.</p>{}</body></html>", " ".repeat(80));
/// let verdict = classify(&page, &ClassifierConfig::default());
/// assert!(!verdict.available);
/// assert!(verdict.reason.contains("sold out"));
/// ```
pub fn classify(content: &str, cfg: &ClassifierConfig) -> Verdict {
    Classifier::new(cfg.clone()).classify(content)
}
