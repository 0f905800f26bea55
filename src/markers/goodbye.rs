use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::TextMarker;
use crate::markers::span_marker;
use crate::ocr::layout_builder::PageLayout;

/// "Grüße" and its inflections, also spelled "Gruesse"/"Grüsse".
pub(crate) const GRUESSE: &str = r"gr(?:ü|ue)(?:ß|ss)en?";
pub(crate) const GRUSS: &str = r"gru(?:ß|ss)";

/// Closing phrases, most specific first. A phrase must come before any
/// pattern that matches one of its suffixes ("kind regards" before
/// "regards").
static CLOSINGS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let phrases: [(String, &'static str); 16] = [
        (format!(r"mit\s+freundlichen\s+{GRUESSE}"), "mfg"),
        (format!(r"mit\s+freundlichem\s+{GRUSS}"), "mfg"),
        (format!(r"mit\s+(?:besten|herzlichen|lieben|vielen)\s+{GRUESSE}"), "mit_gruessen"),
        (format!(r"freundliche\s+{GRUESSE}"), "freundliche_gruesse"),
        (format!(r"(?:beste|herzliche|viele|liebe)\s+{GRUESSE}"), "gruesse"),
        ("hochachtungsvoll".to_string(), "hochachtungsvoll"),
        (r"yours\s+sincerely".to_string(), "yours_sincerely"),
        (r"yours\s+faithfully".to_string(), "yours_faithfully"),
        (r"yours\s+truly".to_string(), "yours_truly"),
        (r"kind\s+regards".to_string(), "kind_regards"),
        (r"best\s+regards".to_string(), "best_regards"),
        (r"warm\s+regards".to_string(), "warm_regards"),
        (r"best\s+wishes".to_string(), "best_wishes"),
        ("sincerely".to_string(), "sincerely"),
        ("regards".to_string(), "regards"),
        ("cheers".to_string(), "cheers"),
    ];
    phrases
        .into_iter()
        .map(|(phrase, tag)| {
            let pattern = Regex::new(&format!(r"(?i)\b{phrase}\b")).expect("invalid closing regex");
            (pattern, tag)
        })
        .collect()
});

/// Finds the first closing phrase in reading order. `raw` is the matched
/// phrase itself.
pub fn detect_goodbye(layout: &PageLayout) -> TextMarker {
    for group in layout.paragraphs() {
        for (pattern, tag) in CLOSINGS.iter() {
            if let Some(m) = pattern.find(group.text()) {
                log::trace!("closing '{}' matched as {}", m.as_str(), tag);
                return span_marker(layout, group, m);
            }
        }
    }
    TextMarker::not_found()
}
