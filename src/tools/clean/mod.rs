mod utils;

use utils::*;

/// Clean text.
///
/// Performs the following operations in order:
/// 1. Normalize Unicode to NFKC (full-width `ＳＯＬＤ　ＯＵＴ` → `SOLD OUT`)
/// 2. Remove zero-width characters
/// 3. Remove control characters (except newlines/tabs)
/// 4. Normalize whitespace (collapse runs, trim)
///
/// # Examples
/// ```
/// use roomwatch::tools::clean::clean;
///
/// let dirty = "Ｂｏｏｋ\u{200B}  now\n\n";
/// assert_eq!(clean(dirty), "Book now");
/// ```
pub fn clean(text: &str) -> String {
    let mut result = normalize_unicode(text);
    result = remove_zero_width_chars(&result);
    result = remove_control_chars(&result);
    normalize_whitespace(&result)
}

/// Clean and lowercase, for case- and width-insensitive phrase matching.
///
/// # Examples
/// ```
/// use roomwatch::tools::clean::fold;
///
/// assert_eq!(fold("ＳＯＬＤ   Out"), "sold out");
/// ```
pub fn fold(text: &str) -> String {
    clean(text).to_lowercase()
}

/// Which of `phrases` occur in already-folded `haystack`, in list order.
pub fn matching_phrases<'a>(haystack: &str, phrases: &'a [String]) -> Vec<&'a str> {
    collect_matches(phrases, |needle| haystack.contains(needle))
}

/// Like [`matching_phrases`], but latin phrases must stand as whole words,
/// so `available` does not match inside "unavailable".
///
/// # Examples
/// ```
/// use roomwatch::tools::clean::{fold, matching_words};
///
/// let phrases = vec!["available".to_string()];
/// assert!(matching_words(&fold("Unavailable"), &phrases).is_empty());
/// assert_eq!(matching_words(&fold("Available!"), &phrases), vec!["available"]);
/// ```
pub fn matching_words<'a>(haystack: &str, phrases: &'a [String]) -> Vec<&'a str> {
    collect_matches(phrases, |needle| contains_whole(haystack, needle))
}

/// Substring match; a latin needle edge must sit on a word boundary.
pub fn contains_whole(haystack: &str, needle: &str) -> bool {
    let latin_start = needle.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    let latin_end = needle.chars().next_back().is_some_and(|c| c.is_ascii_alphanumeric());
    haystack.match_indices(needle).any(|(idx, _)| {
        let before = haystack[..idx].chars().next_back();
        let after = haystack[idx + needle.len()..].chars().next();
        (!latin_start || before.map_or(true, |c| !c.is_alphanumeric()))
            && (!latin_end || after.map_or(true, |c| !c.is_alphanumeric()))
    })
}

fn collect_matches<'a>(phrases: &'a [String], hit: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let mut found: Vec<&str> = Vec::new();
    for phrase in phrases {
        let needle = fold(phrase);
        if needle.is_empty() || !hit(&needle) {
            continue;
        }
        if !found.contains(&phrase.as_str()) {
            found.push(phrase.as_str());
        }
    }
    found
}
