use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::TextMarker;
use crate::markers::goodbye::{GRUESSE, GRUSS};
use crate::markers::position_at;
use crate::ocr::layout_builder::PageLayout;

/// Formal salutations; these match wherever they appear.
static STRONG_GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:
            sehr\s+geehrte[rs]?
          | guten\s+(?:tag|morgen|abend)
          | dear
          | good\s+(?:morning|afternoon|evening)
          | to\s+whom\s+it\s+may\s+concern
        )\b",
    )
    .expect("invalid strong greeting regex")
});

/// Casual openers. They also show up mid-sentence, so they only count when
/// followed by one to seven words and a comma ("Hallo Frau Müller,").
static WEAK_GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:hallo|hello|hi|hey|moin|servus|liebe[rs]?)\b((?:\s+[^\s,]+){1,7})\s*,")
        .expect("invalid weak greeting regex")
});

/// "Liebe Grüße," closes a letter; it is not an opener.
static CLOSING_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)^(?:{GRUESSE}|{GRUSS})\b")).expect("invalid closing word regex")
});

fn weak_greeting_start(text: &str) -> Option<usize> {
    WEAK_GREETING.captures_iter(text).find_map(|caps| {
        let words = caps.get(1)?.as_str().trim_start();
        if CLOSING_WORD.is_match(words) {
            return None;
        }
        caps.get(0).map(|m| m.start())
    })
}

/// Finds the first salutation in reading order. `raw` holds the whole
/// paragraph; the position is that of the salutation's first word.
pub fn detect_greeting(layout: &PageLayout) -> TextMarker {
    for group in layout.paragraphs() {
        let text = group.text();
        let start = [STRONG_GREETING.find(text).map(|m| m.start()), weak_greeting_start(text)]
            .into_iter()
            .flatten()
            .min();
        if let Some(start) = start {
            return TextMarker::found(text, position_at(layout, group, start));
        }
    }
    TextMarker::not_found()
}
