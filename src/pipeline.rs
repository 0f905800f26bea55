use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::analysis::PageAnalyzer;
use crate::core::config::LetterConfig;
use crate::core::model::{Letter, PageAnalysis};
use crate::export::json_export::JsonExporter;
use crate::export::text_export::TextExporter;
use crate::export::Exporter;
use crate::ocr::tokens::TokenTable;
use crate::segment::grouper::{LetterGrouper, Transition};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// A TSV/JSON token file, or a directory of them read in file-name order.
    pub input: PathBuf,
    pub output: PathBuf,
    pub letter: LetterConfig,
}

impl PipelineConfig {
    pub fn new(input: PathBuf, output: PathBuf, letter: LetterConfig) -> Self {
        Self {
            input,
            output,
            letter,
        }
    }
}

/// Letters of a scanned document together with every scored transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    pub letters: Vec<Letter>,
    pub transitions: Vec<Transition>,
}

impl SplitReport {
    /// All pages in scan order.
    pub fn pages(&self) -> impl Iterator<Item = &PageAnalysis> {
        self.letters.iter().flat_map(|letter| letter.pages())
    }

    pub fn page_count(&self) -> usize {
        self.letters.iter().map(Letter::len).sum()
    }

    /// The transition that opened the letter starting at `scan_page_num`.
    pub fn transition_into(&self, scan_page_num: usize) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.to_page == scan_page_num)
    }
}

/// Analyzes pages in parallel and groups them into letters.
pub fn split_tables(tables: &[TokenTable], config: &LetterConfig) -> SplitReport {
    let pages = PageAnalyzer::new(config.detector.clone()).analyze_pages(tables);
    let grouping = LetterGrouper::from_config(&config.splitter).group(pages);
    SplitReport {
        letters: grouping.letters,
        transitions: grouping.transitions,
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn is_tsv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tsv"))
}

fn load_file(path: &Path) -> Result<Vec<TokenTable>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read token file {}", path.display()))?;
    let tables = if is_json(path) {
        TokenTable::from_json(&data)
    } else {
        TokenTable::from_tsv(&data)
    };
    tables.with_context(|| format!("failed to parse token file {}", path.display()))
}

/// Reads the page token tables from a file or a directory of files.
pub fn load_tables(input: &Path) -> Result<Vec<TokenTable>> {
    if !input.exists() {
        bail!("Input does not exist: {}", input.display());
    }
    if input.is_file() {
        return load_file(input);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input)
        .with_context(|| format!("failed to list {}", input.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && (is_json(path) || is_tsv(path)))
        .collect();
    files.sort();

    let mut tables = Vec::new();
    for path in &files {
        tables.extend(load_file(path)?);
    }
    log::debug!("loaded {} pages from {} files", tables.len(), files.len());
    Ok(tables)
}

pub fn build_report(config: &PipelineConfig) -> Result<SplitReport> {
    let tables = load_tables(&config.input)?;
    if tables.is_empty() {
        bail!("No pages found in {}", config.input.display());
    }
    Ok(split_tables(&tables, &config.letter))
}

pub fn export_report(report: &SplitReport, output: &Path) -> Result<()> {
    let json_exporter = JsonExporter::new(output.to_path_buf());
    json_exporter.export(report)?;

    let text_exporter = TextExporter::new(output.to_path_buf());
    text_exporter.export(report)?;

    Ok(())
}
