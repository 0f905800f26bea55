use std::cmp::Ordering;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::core::config::DetectorConfig;
use crate::core::geometry::RelPos;
use crate::core::model::{DateIndicator, DateMarker};
use crate::markers::position_at;
use crate::ocr::layout_builder::{PageLayout, TextGroup};

/// Full names come before their abbreviations.
const MONTHS: &str = "januar|jänner|jaenner|january|jan|februar|february|feb|\
                      märz|maerz|march|mär|mrz|mar|april|apr|mai|may|juni|june|jun|\
                      juli|july|jul|august|aug|september|sept|sep|oktober|october|okt|oct|\
                      november|nov|dezember|december|dez|dec";

#[derive(Debug, Clone, Copy)]
enum DateFormat {
    /// 12.05.2023, 12. 05. 2023
    Numeric,
    /// 12. Mai 2023, 3 March 2024
    DayMonthName,
    /// March 3, 2024
    MonthNameDay,
    /// 2023-05-12
    Iso,
}

static DATE_PATTERNS: Lazy<Vec<(Regex, DateFormat)>> = Lazy::new(|| {
    let patterns = [
        (r"\b(\d{1,2})\s*\.\s*(\d{1,2})\s*\.\s*(\d{4})\b".to_string(), DateFormat::Numeric),
        (
            format!(r"\b(\d{{1,2}})(?:\.\s*|\s+)({MONTHS})\.?\s+(\d{{4}})\b"),
            DateFormat::DayMonthName,
        ),
        (
            format!(r"\b({MONTHS})\.?\s+(\d{{1,2}}),?\s+(\d{{4}})\b"),
            DateFormat::MonthNameDay,
        ),
        (r"\b(\d{4})-(\d{2})-(\d{2})\b".to_string(), DateFormat::Iso),
    ];
    patterns
        .into_iter()
        .map(|(pattern, format)| {
            let regex = Regex::new(&format!("(?i){pattern}")).expect("invalid date regex");
            (regex, format)
        })
        .collect()
});

/// Label words directly to the left of a date on its line ("Datum:", "den").
static INLINE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:datum|date|dated|den|vom|stand)\s*:?\s*$")
        .expect("invalid date label regex")
});

static LABEL_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:datum|date|dated|den|vom|stand)\b").expect("invalid date label regex")
});

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "januar" | "jänner" | "jaenner" | "january" | "jan" => 1,
        "februar" | "february" | "feb" => 2,
        "märz" | "maerz" | "march" | "mär" | "mrz" | "mar" => 3,
        "april" | "apr" => 4,
        "mai" | "may" => 5,
        "juni" | "june" | "jun" => 6,
        "juli" | "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sept" | "sep" => 9,
        "oktober" | "october" | "okt" | "oct" => 10,
        "november" | "nov" => 11,
        "dezember" | "december" | "dez" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

/// Builds the calendar date for a match; `None` for impossible dates.
fn parse_date(caps: &Captures<'_>, format: DateFormat) -> Option<NaiveDate> {
    let int = |idx: usize| -> Option<u32> { caps.get(idx)?.as_str().parse().ok() };
    let (year, month, day) = match format {
        DateFormat::Numeric => (int(3)?, int(2)?, int(1)?),
        DateFormat::DayMonthName => (int(3)?, month_number(caps.get(2)?.as_str())?, int(1)?),
        DateFormat::MonthNameDay => (int(3)?, month_number(caps.get(1)?.as_str())?, int(2)?),
        DateFormat::Iso => (int(1)?, int(2)?, int(3)?),
    };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

#[derive(Debug)]
struct Candidate {
    raw: String,
    date: NaiveDate,
    indicator: Option<DateIndicator>,
    pos: RelPos,
    order: usize,
}

impl Candidate {
    /// Labeled dates first, then rightmost, then topmost, then reading order.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .indicator
            .is_some()
            .cmp(&self.indicator.is_some())
            .then(other.pos.x_rel.total_cmp(&self.pos.x_rel))
            .then(self.pos.y_rel.total_cmp(&other.pos.y_rel))
            .then(self.order.cmp(&other.order))
    }
}

fn label_above(
    paragraphs: &[TextGroup],
    idx: usize,
    date_left: f32,
    config: &DetectorConfig,
) -> bool {
    let Some(prev) = idx.checked_sub(1).and_then(|i| paragraphs.get(i)) else {
        return false;
    };
    prev.word_count() <= config.date_label_max_words
        && LABEL_WORD.is_match(prev.text())
        && (prev.left() - date_left).abs() <= config.date_label_alignment_px
}

/// Detects the letter date in the top region of the page.
///
/// Every valid date in the region is a candidate. Candidates vouched for by
/// a label ("Datum:" on the same line, or a short "Datum" paragraph right
/// above) are preferred, then the rightmost, then the topmost.
pub fn detect_date(layout: &PageLayout, config: &DetectorConfig) -> DateMarker {
    let paragraphs = layout.paragraphs();
    let mut candidates = Vec::new();

    for (idx, group) in paragraphs.iter().enumerate() {
        let text = group.text();
        for (pattern, format) in DATE_PATTERNS.iter() {
            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let pos = position_at(layout, group, whole.start());
                if pos.y_rel > config.date_region {
                    continue;
                }
                let Some(date) = parse_date(&caps, *format) else {
                    log::trace!("discarding impossible date '{}'", whole.as_str());
                    continue;
                };

                let before = &text[group.line_start(whole.start())..whole.start()];
                let date_left = group.token_at(whole.start()).left();
                let indicator = if INLINE_LABEL.is_match(before) {
                    Some(DateIndicator::Inline)
                } else if label_above(paragraphs, idx, date_left, config) {
                    Some(DateIndicator::Above)
                } else {
                    None
                };

                candidates.push(Candidate {
                    raw: whole.as_str().to_string(),
                    date,
                    indicator,
                    pos,
                    order: candidates.len(),
                });
            }
        }
    }

    match candidates.into_iter().min_by(Candidate::rank) {
        Some(best) => DateMarker {
            found: true,
            raw: Some(best.raw),
            date_value: Some(best.date),
            indicator: best.indicator,
            x_rel: Some(best.pos.x_rel),
            y_rel: Some(best.pos.y_rel),
        },
        None => DateMarker::not_found(),
    }
}
