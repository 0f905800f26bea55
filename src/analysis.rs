use rayon::prelude::*;

use crate::core::config::DetectorConfig;
use crate::core::model::PageAnalysis;
use crate::markers;
use crate::ocr::layout_builder::PageLayout;
use crate::ocr::tokens::TokenTable;

/// Runs every marker detector over one page.
#[derive(Debug, Clone, Default)]
pub struct PageAnalyzer {
    config: DetectorConfig,
}

impl PageAnalyzer {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Analyzes one page. A table that cannot be typed yields a page on
    /// which nothing was found.
    pub fn analyze(&self, table: &TokenTable, scan_page_num: usize) -> PageAnalysis {
        match PageLayout::build(table, self.config.line_tolerance_px) {
            Some(layout) => self.analyze_layout(&layout, scan_page_num),
            None => {
                log::debug!(
                    "page {}: unusable token table ({} rows)",
                    scan_page_num,
                    table.rows.len()
                );
                PageAnalysis::not_found(scan_page_num)
            }
        }
    }

    pub fn analyze_layout(&self, layout: &PageLayout, scan_page_num: usize) -> PageAnalysis {
        PageAnalysis {
            scan_page_num,
            letter_page_index: markers::detect_letter_page_index(layout),
            greeting: markers::detect_greeting(layout),
            goodbye: markers::detect_goodbye(layout),
            subject: markers::detect_subject(layout),
            address_block: markers::detect_address_block(layout, &self.config),
            date: markers::detect_date(layout, &self.config),
        }
    }

    /// Analyzes all pages in parallel. Results keep the input order and
    /// pages are numbered from 1.
    pub fn analyze_pages(&self, tables: &[TokenTable]) -> Vec<PageAnalysis> {
        tables
            .par_iter()
            .enumerate()
            .map(|(idx, table)| self.analyze(table, idx + 1))
            .collect()
    }

    /// Reading-order text of each page, for the page-pair classifier.
    pub fn page_texts(&self, tables: &[TokenTable]) -> Vec<String> {
        tables
            .par_iter()
            .map(|table| {
                PageLayout::build(table, self.config.line_tolerance_px)
                    .map(|layout| layout.plain_text())
                    .unwrap_or_default()
            })
            .collect()
    }
}
