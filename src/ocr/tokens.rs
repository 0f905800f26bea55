use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::core::geometry::BBox;

/// Tesseract's hierarchy level for single words.
pub const WORD_LEVEL: u32 = 5;
const PAGE_LEVEL: u32 = 1;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("TSV input has no header row")]
    MissingHeader,
    #[error("invalid token JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One untyped row of an OCR token table. Every column may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawToken {
    pub level: Option<u32>,
    pub page_num: Option<u32>,
    pub block_num: Option<u32>,
    pub par_num: Option<u32>,
    pub line_num: Option<u32>,
    pub word_num: Option<u32>,
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub conf: Option<f32>,
    pub text: Option<String>,
    pub page_width: Option<f32>,
    pub page_height: Option<f32>,
}

/// Native OCR position of a word: (page, block, paragraph, line, word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hierarchy {
    pub page: u32,
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub word: u32,
}

impl Hierarchy {
    pub fn paragraph_key(&self) -> (u32, u32, u32) {
        (self.page, self.block, self.paragraph)
    }

    pub fn line_key(&self) -> (u32, u32, u32, u32) {
        (self.page, self.block, self.paragraph, self.line)
    }
}

/// A validated word-level token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub bbox: BBox,
    pub confidence: f32,
    pub hierarchy: Option<Hierarchy>,
}

impl Token {
    pub fn left(&self) -> f32 {
        self.bbox.x0
    }

    pub fn top(&self) -> f32 {
        self.bbox.y0
    }
}

/// Word tokens of one page together with the page's pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTokens {
    pub width: f32,
    pub height: f32,
    pub tokens: Vec<Token>,
}

impl PageTokens {
    pub fn has_hierarchy(&self) -> bool {
        self.tokens.iter().all(|token| token.hierarchy.is_some())
    }
}

/// The OCR token table of a single page, as handed over by the OCR engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenTable {
    pub rows: Vec<RawToken>,
}

impl TokenTable {
    pub fn new(rows: Vec<RawToken>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Types the table into word tokens.
    ///
    /// Returns `None` when the table is empty, a required column is missing,
    /// the page size is missing or not positive, or no word carries text.
    pub fn words(&self) -> Option<PageTokens> {
        if self.rows.is_empty() {
            return None;
        }
        if !self.rows.iter().all(has_required_columns) {
            return None;
        }

        let first = &self.rows[0];
        let width = first.page_width?;
        let height = first.page_height?;
        if !(width > 0.0 && height > 0.0) {
            return None;
        }

        let tokens: Vec<Token> = self
            .rows
            .iter()
            .filter(|row| row.level == Some(WORD_LEVEL))
            .filter_map(type_row)
            .collect();

        if tokens.is_empty() {
            return None;
        }

        Some(PageTokens {
            width,
            height,
            tokens,
        })
    }

    /// Reads a Tesseract-style TSV export. A multi-page export is split into
    /// one table per `page_num`, in ascending page order.
    pub fn from_tsv(input: &str) -> Result<Vec<TokenTable>, TableError> {
        let mut lines = input.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or(TableError::MissingHeader)?;
        let columns: HashMap<&str, usize> = header
            .split('\t')
            .enumerate()
            .map(|(idx, name)| (name.trim(), idx))
            .collect();
        if !columns.contains_key("text") && !columns.contains_key("level") {
            return Err(TableError::MissingHeader);
        }

        let mut pages: BTreeMap<u32, Vec<RawToken>> = BTreeMap::new();
        for line in lines {
            let cells: Vec<&str> = line.split('\t').collect();
            let cell = |name: &str| columns.get(name).and_then(|&idx| cells.get(idx)).copied();
            let row = RawToken {
                level: cell("level").and_then(parse_u32),
                page_num: cell("page_num").and_then(parse_u32),
                block_num: cell("block_num").and_then(parse_u32),
                par_num: cell("par_num").and_then(parse_u32),
                line_num: cell("line_num").and_then(parse_u32),
                word_num: cell("word_num").and_then(parse_u32),
                left: cell("left").and_then(parse_f32),
                top: cell("top").and_then(parse_f32),
                width: cell("width").and_then(parse_f32),
                height: cell("height").and_then(parse_f32),
                conf: cell("conf").and_then(parse_f32),
                // Tesseract drops the trailing tab when the text cell is empty.
                text: columns
                    .contains_key("text")
                    .then(|| cell("text").unwrap_or_default().to_string()),
                page_width: cell("page_width").and_then(parse_f32),
                page_height: cell("page_height").and_then(parse_f32),
            };
            pages.entry(row.page_num.unwrap_or(1)).or_default().push(row);
        }

        let has_page_size =
            columns.contains_key("page_width") && columns.contains_key("page_height");
        Ok(pages
            .into_values()
            .map(|mut rows| {
                if !has_page_size {
                    fill_page_size(&mut rows);
                }
                TokenTable::new(rows)
            })
            .collect())
    }

    /// Reads a JSON array of pages, each an array of token rows.
    pub fn from_json(input: &str) -> Result<Vec<TokenTable>, TableError> {
        Ok(serde_json::from_str(input)?)
    }
}

fn has_required_columns(row: &RawToken) -> bool {
    row.level.is_some()
        && row.left.is_some()
        && row.top.is_some()
        && row.width.is_some()
        && row.height.is_some()
        && row.text.is_some()
        && row.page_width.is_some()
        && row.page_height.is_some()
}

fn type_row(row: &RawToken) -> Option<Token> {
    let text: String = row.text.as_deref()?.trim().nfc().collect();
    if text.is_empty() {
        return None;
    }
    let hierarchy = match (row.block_num, row.par_num, row.line_num) {
        (Some(block), Some(paragraph), Some(line)) => Some(Hierarchy {
            page: row.page_num.unwrap_or(1),
            block,
            paragraph,
            line,
            word: row.word_num.unwrap_or(0),
        }),
        _ => None,
    };
    Some(Token {
        text,
        bbox: BBox::from_ltwh(row.left?, row.top?, row.width?, row.height?),
        confidence: row.conf.unwrap_or(-1.0),
        hierarchy,
    })
}

/// Tesseract reports the page size on the page-level row only.
fn fill_page_size(rows: &mut [RawToken]) {
    let size = rows
        .iter()
        .find(|row| row.level == Some(PAGE_LEVEL))
        .and_then(|row| Some((row.width?, row.height?)));
    if let Some((width, height)) = size {
        for row in rows.iter_mut() {
            row.page_width = Some(width);
            row.page_height = Some(height);
        }
    }
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse().ok()
}

fn parse_f32(value: &str) -> Option<f32> {
    value.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}
