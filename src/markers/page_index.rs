use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::core::model::LetterPageIndex;
use crate::markers::position_at;
use crate::ocr::layout_builder::PageLayout;

/// "Seite 2 von 3", "Page 2 of 3", "Seite 2/3". OCR often reads the slash
/// as a pipe, a capital I or a lowercase l.
static TOTAL_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:seite|page)\s*(\d{1,3})\s*(?:von|of|/|\||I|l)\s*(\d{1,3})\b")
        .expect("invalid page index regex")
});

/// "Fortsetzung auf Seite 3", "continued on page 3": the current page is
/// the one before the referenced page.
static CONTINUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:fortsetzung\s+(?:auf|siehe)\s+seite|continued\s+on\s+page)\s*(\d{1,3})\b",
    )
    .expect("invalid continuation regex")
});

fn number(caps: &Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx)?.as_str().parse().ok()
}

/// Detects the printed page index. A "page X of Y" anywhere on the page
/// beats continuation evidence; within each kind the first hit in reading
/// order wins.
pub fn detect_letter_page_index(layout: &PageLayout) -> LetterPageIndex {
    for group in layout.paragraphs() {
        for caps in TOTAL_INDEX.captures_iter(group.text()) {
            let (Some(whole), Some(current), Some(total)) =
                (caps.get(0), number(&caps, 1), number(&caps, 2))
            else {
                continue;
            };
            let pos = position_at(layout, group, whole.start());
            return LetterPageIndex {
                found: true,
                current: Some(current),
                total: Some(total),
                raw: Some(whole.as_str().to_string()),
                x_rel: Some(pos.x_rel),
                y_rel: Some(pos.y_rel),
            };
        }
    }

    for group in layout.paragraphs() {
        for caps in CONTINUATION.captures_iter(group.text()) {
            let (Some(whole), Some(next)) = (caps.get(0), number(&caps, 1)) else {
                continue;
            };
            if next < 2 {
                continue;
            }
            let pos = position_at(layout, group, whole.start());
            return LetterPageIndex {
                found: true,
                current: Some(next - 1),
                total: None,
                raw: Some(whole.as_str().to_string()),
                x_rel: Some(pos.x_rel),
                y_rel: Some(pos.y_rel),
            };
        }
    }

    LetterPageIndex::not_found()
}
