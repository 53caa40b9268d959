use scraper::{ElementRef, Node};

/// Elements whose text never renders.
const HIDDEN_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "iframe"];

/// Elements that break a line when rendered; a space stands in for the break.
const BLOCK_TAGS: [&str; 24] = [
    "address", "article", "aside", "br", "button", "dd", "div", "dl", "dt", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "li", "p", "section", "td", "th", "title", "tr",
];

/// Depth-first text collection; callers collapse the extra whitespace.
pub(super) fn collect_visible_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) => {
                let name = e.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_visible_text(child_el, out);
                }
                if BLOCK_TAGS.contains(&name) {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
