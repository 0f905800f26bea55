//! Page-local marker detectors.
//!
//! Every detector reads a [`PageLayout`] in reading order and is total: no
//! evidence, unusable geometry or a missing layout all collapse to the
//! marker's `not_found()` value.

pub mod address;
pub mod date;
pub mod goodbye;
pub mod greeting;
pub mod page_index;
pub mod subject;

pub use address::detect_address_block;
pub use date::detect_date;
pub use goodbye::detect_goodbye;
pub use greeting::detect_greeting;
pub use page_index::detect_letter_page_index;
pub use subject::detect_subject;

use regex::Regex;

use crate::core::geometry::RelPos;
use crate::core::model::TextMarker;
use crate::ocr::layout_builder::{PageLayout, TextGroup};

/// First match of `pattern` over the paragraphs, in reading order.
fn find_in_paragraphs<'a>(
    layout: &'a PageLayout,
    pattern: &Regex,
) -> Option<(&'a TextGroup, regex::Match<'a>)> {
    layout
        .paragraphs()
        .iter()
        .find_map(|group| pattern.find(group.text()).map(|m| (group, m)))
}

/// Position of the token under byte `offset` of `group`.
fn position_at(layout: &PageLayout, group: &TextGroup, offset: usize) -> RelPos {
    layout.rel_pos(group.token_at(offset))
}

fn span_marker(layout: &PageLayout, group: &TextGroup, m: regex::Match<'_>) -> TextMarker {
    TextMarker::found(m.as_str(), position_at(layout, group, m.start()))
}
