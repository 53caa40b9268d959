//! Shared Selectors

use once_cell::sync::Lazy;
use scraper::Selector;

/// Selector for `<title>` tags.
pub static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));

/// Clickable things that could carry "book"/"reserve" text.
pub static ACTION_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("a, button, input[type='submit'], input[type='button']")
        .expect("valid action selector")
});
