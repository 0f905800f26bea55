use std::collections::BTreeMap;
use std::ops::Range;

use crate::core::geometry::{BBox, RelPos};
use crate::ocr::tokens::{PageTokens, Token, TokenTable};

/// An ordered run of tokens (a paragraph or a line) with its reconstructed
/// text. Tokens are joined by single spaces, so every character offset of
/// `text` maps back to exactly one source token or separator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGroup {
    tokens: Vec<Token>,
    spans: Vec<Range<usize>>,
    line_ids: Vec<usize>,
    text: String,
    bbox: BBox,
}

impl TextGroup {
    /// `tokens` must be non-empty and already in reading order.
    fn new(tokens: Vec<Token>, line_ids: Vec<usize>) -> Self {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(tokens.len());
        for token in &tokens {
            if !text.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(&token.text);
            spans.push(start..text.len());
        }
        let bbox = tokens
            .iter()
            .skip(1)
            .fold(tokens[0].bbox, |acc, token| acc.union(&token.bbox));
        Self {
            tokens,
            spans,
            line_ids,
            text,
            bbox,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> BBox {
        self.bbox
    }

    pub fn left(&self) -> f32 {
        self.bbox.x0
    }

    pub fn top(&self) -> f32 {
        self.bbox.y0
    }

    pub fn word_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn first_token(&self) -> &Token {
        &self.tokens[0]
    }

    /// Index of the token covering byte `offset` of [`Self::text`]. An offset
    /// on a separator resolves to the following token; anything past the end
    /// falls back to the first token.
    pub fn token_index_at(&self, offset: usize) -> usize {
        self.spans
            .iter()
            .position(|span| offset < span.end)
            .unwrap_or(0)
    }

    pub fn token_at(&self, offset: usize) -> &Token {
        &self.tokens[self.token_index_at(offset)]
    }

    /// Byte offset where the line holding `offset` starts.
    pub fn line_start(&self, offset: usize) -> usize {
        let line = self.line_ids[self.token_index_at(offset)];
        self.line_ids
            .iter()
            .position(|&id| id == line)
            .map(|idx| self.spans[idx].start)
            .unwrap_or(0)
    }
}

/// Reading-order reconstruction of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    width: f32,
    height: f32,
    line_tolerance: f32,
    hierarchical: bool,
    tokens: Vec<Token>,
    paragraphs: Vec<TextGroup>,
}

impl PageLayout {
    /// Returns `None` when the table cannot be typed (see [`TokenTable::words`]).
    pub fn build(table: &TokenTable, line_tolerance: f32) -> Option<Self> {
        table
            .words()
            .map(|page| Self::from_tokens(page, line_tolerance))
    }

    pub fn from_tokens(page: PageTokens, line_tolerance: f32) -> Self {
        let hierarchical = page.has_hierarchy();
        let paragraphs = if hierarchical {
            paragraphs_from_hierarchy(&page.tokens)
        } else {
            cluster_rows(&page.tokens, line_tolerance)
                .into_iter()
                .map(|row| {
                    let ids = vec![0; row.len()];
                    TextGroup::new(row, ids)
                })
                .collect()
        };
        Self {
            width: page.width,
            height: page.height,
            line_tolerance,
            hierarchical,
            tokens: page.tokens,
            paragraphs: sort_reading_order(paragraphs),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn paragraphs(&self) -> &[TextGroup] {
        &self.paragraphs
    }

    /// Paragraph texts in reading order, one per line.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn rel_pos(&self, token: &Token) -> RelPos {
        RelPos::of(&token.bbox, self.width, self.height)
    }

    /// Rebuilds text lines from the tokens accepted by `keep`, top to bottom.
    pub fn lines_where(&self, keep: impl Fn(&Token) -> bool) -> Vec<TextGroup> {
        let kept: Vec<Token> = self.tokens.iter().filter(|t| keep(t)).cloned().collect();
        let rows = if self.hierarchical {
            group_by_key(&kept, |token| token.hierarchy.map(|h| h.line_key()))
        } else {
            cluster_rows(&kept, self.line_tolerance)
        };
        let lines = rows
            .into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.left().total_cmp(&b.left()));
                let ids = vec![0; row.len()];
                TextGroup::new(row, ids)
            })
            .collect();
        sort_reading_order(lines)
    }
}

fn paragraphs_from_hierarchy(tokens: &[Token]) -> Vec<TextGroup> {
    group_by_key(tokens, |token| token.hierarchy.map(|h| h.paragraph_key()))
        .into_iter()
        .map(|mut group| {
            group.sort_by(|a, b| {
                line_of(a)
                    .cmp(&line_of(b))
                    .then(a.left().total_cmp(&b.left()))
            });
            let ids = group.iter().map(|token| line_of(token) as usize).collect();
            TextGroup::new(group, ids)
        })
        .collect()
}

fn line_of(token: &Token) -> u32 {
    token.hierarchy.map(|h| h.line).unwrap_or(0)
}

fn group_by_key<K: Ord>(tokens: &[Token], key: impl Fn(&Token) -> K) -> Vec<Vec<Token>> {
    let mut groups: BTreeMap<K, Vec<Token>> = BTreeMap::new();
    for token in tokens {
        groups.entry(key(token)).or_default().push(token.clone());
    }
    groups.into_values().collect()
}

/// Clusters tokens into rows: a token joins the current row while its top
/// lies within `tolerance` of the row's first token.
fn cluster_rows(tokens: &[Token], tolerance: f32) -> Vec<Vec<Token>> {
    let mut sorted: Vec<Token> = tokens.to_vec();
    sorted.sort_by(|a, b| a.top().total_cmp(&b.top()).then(a.left().total_cmp(&b.left())));

    let mut rows: Vec<Vec<Token>> = Vec::new();
    for token in sorted {
        match rows.last_mut() {
            Some(row) if token.top() - row[0].top() <= tolerance => row.push(token),
            _ => rows.push(vec![token]),
        }
    }
    for row in &mut rows {
        row.sort_by(|a, b| a.left().total_cmp(&b.left()));
    }
    rows
}

fn sort_reading_order(mut groups: Vec<TextGroup>) -> Vec<TextGroup> {
    // Stable sort keeps the hierarchy order for groups on the same spot.
    groups.sort_by(|a, b| a.top().total_cmp(&b.top()).then(a.left().total_cmp(&b.left())));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::tokens::test_support::{line, table, word};
    use crate::ocr::tokens::RawToken;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_by_native_paragraphs_in_reading_order() {
        let mut rows = line("Mit freundlichen Grüßen", 100.0, 900.0, 2, 1);
        rows.extend(line("Sehr geehrte Frau Müller,", 100.0, 200.0, 1, 1));
        rows.extend(line("vielen Dank.", 100.0, 230.0, 1, 2));
        let layout = PageLayout::build(&table(rows), 10.0).expect("valid page");

        let texts: Vec<&str> = layout.paragraphs().iter().map(|p| p.text()).collect();
        assert_eq!(
            texts,
            vec!["Sehr geehrte Frau Müller, vielen Dank.", "Mit freundlichen Grüßen"]
        );
    }

    #[test]
    fn falls_back_to_vertical_clustering_without_hierarchy() {
        let strip = |mut row: RawToken| {
            row.block_num = None;
            row.par_num = None;
            row.line_num = None;
            row
        };
        let rows = vec![
            strip(word("Berlin", 300.0, 105.0, 1, 1)),
            strip(word("12345", 100.0, 100.0, 1, 1)),
            strip(word("Hauptstraße", 100.0, 60.0, 1, 1)),
        ];
        let layout = PageLayout::build(&table(rows), 10.0).expect("valid page");

        let texts: Vec<&str> = layout.paragraphs().iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["Hauptstraße", "12345 Berlin"]);
    }

    #[test]
    fn maps_offsets_back_to_tokens() {
        let layout = PageLayout::build(&table(line("Dear Mr. Smith,", 100.0, 200.0, 1, 1)), 10.0)
            .expect("valid page");
        let group = &layout.paragraphs()[0];

        assert_eq!(group.token_at(0).text, "Dear");
        assert_eq!(group.token_at(5).text, "Mr.");
        // The separator before "Smith," resolves to "Smith,".
        assert_eq!(group.token_at(8).text, "Smith,");
        assert_eq!(group.token_at(500).text, "Dear");
    }

    #[test]
    fn finds_line_start_within_paragraph() {
        let mut rows = line("Musterfirma GmbH", 600.0, 100.0, 1, 1);
        rows.extend(line("Datum: 12.05.2023", 600.0, 130.0, 1, 2));
        let layout = PageLayout::build(&table(rows), 10.0).expect("valid page");
        let group = &layout.paragraphs()[0];

        let offset = group.text().find("12.05").expect("date in text");
        assert_eq!(&group.text()[group.line_start(offset)..offset], "Datum: ");
    }

    #[test]
    fn rebuilds_lines_for_a_zone() {
        let mut rows = line("Max Mustermann", 100.0, 100.0, 1, 1);
        rows.extend(line("Hauptstraße 42", 100.0, 130.0, 1, 2));
        rows.extend(line("Rechnung", 700.0, 130.0, 2, 1));
        let layout = PageLayout::build(&table(rows), 10.0).expect("valid page");

        let left_half = layout.lines_where(|t| t.left() <= 500.0);
        let texts: Vec<&str> = left_half.iter().map(|l| l.text()).collect();
        assert_eq!(texts, vec!["Max Mustermann", "Hauptstraße 42"]);
    }
}
