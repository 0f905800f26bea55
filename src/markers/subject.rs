use once_cell::sync::Lazy;
use regex::Regex;

use crate::core::model::TextMarker;
use crate::markers::{find_in_paragraphs, position_at, span_marker};
use crate::ocr::layout_builder::PageLayout;

/// An explicit subject label. A bare "Re" only counts with punctuation.
static SUBJECT_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?:^|\s)
        (
            (?:betreff|betrifft|subject|regarding|thema|topic)\b\s*[:.\-]?
          | betr\.\s*:?
          | re\s*:
        )
        (?:\s+|$)",
    )
    .expect("invalid subject label regex")
});

/// Document-type keywords for unlabeled subjects, multi-word terms first.
static SUBJECT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:
            payment\s+reminder | final\s+notice | letzte\s+mahnung
          | zahlungserinnerung | rechnung | mahnung | k(?:ü|ue)ndigung | bescheid
          | mitteilung | angebot | vertrag | best(?:ä|ae)tigung | einladung
          | invoice | reminder | notice | statement | contract | offer
          | confirmation | invitation
        )\b",
    )
    .expect("invalid subject keyword regex")
});

/// Detects the subject line.
///
/// A label ("Betreff:", "Subject:", "Re:") that starts a line wins: the rest
/// of its paragraph is the subject, or the next paragraph when nothing
/// follows the label. A label with no text anywhere yields not-found. Only
/// pages without any label fall back to document-type keywords, reporting
/// just the keyword.
pub fn detect_subject(layout: &PageLayout) -> TextMarker {
    let paragraphs = layout.paragraphs();
    for (idx, group) in paragraphs.iter().enumerate() {
        let text = group.text();
        let rest_start = SUBJECT_LABEL.captures_iter(text).find_map(|caps| {
            let label = caps.get(1)?;
            let whole = caps.get(0)?;
            // Labels only count at the start of a line.
            (group.line_start(label.start()) == label.start()).then_some(whole.end())
        });
        let Some(rest_start) = rest_start else {
            continue;
        };

        let rest = &text[rest_start..];
        let trimmed = rest.trim_start();
        if !trimmed.is_empty() {
            let offset = rest_start + rest.len() - trimmed.len();
            return TextMarker::found(trimmed.trim_end(), position_at(layout, group, offset));
        }
        return match paragraphs.get(idx + 1) {
            Some(next) => TextMarker::found(next.text(), layout.rel_pos(next.first_token())),
            None => TextMarker::not_found(),
        };
    }

    match find_in_paragraphs(layout, &SUBJECT_KEYWORD) {
        Some((group, m)) => span_marker(layout, group, m),
        None => TextMarker::not_found(),
    }
}
