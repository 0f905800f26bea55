use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::geometry::RelPos;

/// Common view over every detector result: found or not, and where.
pub trait Marker {
    fn is_found(&self) -> bool;

    /// Position of the evidence; `None` whenever the marker was not found.
    fn position(&self) -> Option<RelPos>;

    fn y_rel(&self) -> Option<f32> {
        self.position().map(|pos| pos.y_rel)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextMarker {
    pub found: bool,
    pub raw: Option<String>,
    pub x_rel: Option<f32>,
    pub y_rel: Option<f32>,
}

impl TextMarker {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(raw: impl Into<String>, pos: RelPos) -> Self {
        Self {
            found: true,
            raw: Some(raw.into()),
            x_rel: Some(pos.x_rel),
            y_rel: Some(pos.y_rel),
        }
    }
}

impl Marker for TextMarker {
    fn is_found(&self) -> bool {
        self.found
    }

    fn position(&self) -> Option<RelPos> {
        position_of(self.found, self.x_rel, self.y_rel)
    }
}

/// Where the date-label keyword that vouches for a date was seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateIndicator {
    Inline,
    Above,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateMarker {
    pub found: bool,
    pub raw: Option<String>,
    pub date_value: Option<NaiveDate>,
    pub indicator: Option<DateIndicator>,
    pub x_rel: Option<f32>,
    pub y_rel: Option<f32>,
}

impl DateMarker {
    pub fn not_found() -> Self {
        Self::default()
    }
}

impl Marker for DateMarker {
    fn is_found(&self) -> bool {
        self.found
    }

    fn position(&self) -> Option<RelPos> {
        position_of(self.found, self.x_rel, self.y_rel)
    }
}

/// Printed "page X of Y" evidence. `total` is `None` for continuation-only evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterPageIndex {
    pub found: bool,
    pub current: Option<u32>,
    pub total: Option<u32>,
    pub raw: Option<String>,
    pub x_rel: Option<f32>,
    pub y_rel: Option<f32>,
}

impl LetterPageIndex {
    pub fn not_found() -> Self {
        Self::default()
    }

    /// True when the printed index says this is the last page of its letter.
    pub fn is_last(&self) -> bool {
        self.found && matches!((self.current, self.total), (Some(c), Some(t)) if c == t)
    }
}

impl Marker for LetterPageIndex {
    fn is_found(&self) -> bool {
        self.found
    }

    fn position(&self) -> Option<RelPos> {
        position_of(self.found, self.x_rel, self.y_rel)
    }
}

/// Recipient address block. When `found`, `street`, `zip`, `city` and
/// `line_count` are always populated; `name` may still be `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressBlock {
    pub found: bool,
    pub raw: Option<String>,
    pub x_rel: Option<f32>,
    pub y_rel: Option<f32>,
    pub name: Option<String>,
    pub street: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub line_count: Option<usize>,
}

impl AddressBlock {
    pub fn not_found() -> Self {
        Self::default()
    }
}

impl Marker for AddressBlock {
    fn is_found(&self) -> bool {
        self.found
    }

    fn position(&self) -> Option<RelPos> {
        position_of(self.found, self.x_rel, self.y_rel)
    }
}

fn position_of(found: bool, x_rel: Option<f32>, y_rel: Option<f32>) -> Option<RelPos> {
    match (found, x_rel, y_rel) {
        (true, Some(x_rel), Some(y_rel)) => Some(RelPos { x_rel, y_rel }),
        _ => None,
    }
}

/// Everything the detectors found on one scanned page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// 1-indexed, global and contiguous over the scanned document.
    pub scan_page_num: usize,
    pub letter_page_index: LetterPageIndex,
    pub greeting: TextMarker,
    pub goodbye: TextMarker,
    pub subject: TextMarker,
    pub address_block: AddressBlock,
    pub date: DateMarker,
}

impl PageAnalysis {
    /// Analysis of a page with no usable OCR evidence.
    pub fn not_found(scan_page_num: usize) -> Self {
        Self {
            scan_page_num,
            letter_page_index: LetterPageIndex::not_found(),
            greeting: TextMarker::not_found(),
            goodbye: TextMarker::not_found(),
            subject: TextMarker::not_found(),
            address_block: AddressBlock::not_found(),
            date: DateMarker::not_found(),
        }
    }
}

/// A run of consecutive scanned pages inferred to be one physical letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Letter {
    pages: Vec<PageAnalysis>,
}

impl Letter {
    pub fn new(first: PageAnalysis) -> Self {
        Self { pages: vec![first] }
    }

    pub(crate) fn push(&mut self, page: PageAnalysis) {
        self.pages.push(page);
    }

    pub fn pages(&self) -> &[PageAnalysis] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageAnalysis> {
        self.pages
    }

    pub fn first_page(&self) -> &PageAnalysis {
        &self.pages[0]
    }

    pub fn last_page(&self) -> &PageAnalysis {
        &self.pages[self.pages.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|page| page.scan_page_num).collect()
    }

    /// Inclusive range of scanned page numbers covered by this letter.
    pub fn page_range(&self) -> (usize, usize) {
        (self.first_page().scan_page_num, self.last_page().scan_page_num)
    }

    pub fn master_date(&self) -> Option<NaiveDate> {
        let date = &self.first_page().date;
        if date.found {
            date.date_value
        } else {
            None
        }
    }

    pub fn master_subject(&self) -> Option<&str> {
        let subject = &self.first_page().subject;
        if subject.found {
            subject.raw.as_deref()
        } else {
            None
        }
    }

    pub fn master_sender(&self) -> Option<&str> {
        let address = &self.first_page().address_block;
        if address.found {
            address.name.as_deref()
        } else {
            None
        }
    }
}
