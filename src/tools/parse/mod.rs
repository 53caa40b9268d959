mod utils;

use utils::*;

use crate::selectors::TITLE_SELECTOR;
use crate::tools::clean::clean;
use scraper::{ElementRef, Html};

/// Parse a fetched page (full document or bare text).
pub fn parse_page(content: &str) -> Html {
    Html::parse_document(content)
}

/// Text a visitor would see: scripts, styles and templates skipped.
pub fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    collect_visible_text(doc.root_element(), &mut out);
    clean(&out)
}

/// Visible text of one element.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_visible_text(el, &mut out);
    clean(&out)
}

/// Cleaned `<title>`, if present and non-empty.
pub fn page_title(doc: &Html) -> Option<String> {
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|el| clean(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}
