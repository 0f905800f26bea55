use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::core::model::{Letter, PageAnalysis};
use crate::export::Exporter;
use crate::pipeline::SplitReport;

/// What a downstream PDF splitter needs to cut and name one letter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterSummary<'a> {
    pub letter: usize,
    pub first_page: usize,
    pub last_page: usize,
    pub pages: Vec<usize>,
    pub date: Option<NaiveDate>,
    pub sender: Option<&'a str>,
    pub subject: Option<&'a str>,
}

impl<'a> LetterSummary<'a> {
    pub fn new(number: usize, letter: &'a Letter) -> Self {
        let (first_page, last_page) = letter.page_range();
        Self {
            letter: number,
            first_page,
            last_page,
            pages: letter.page_numbers(),
            date: letter.master_date(),
            sender: letter.master_sender(),
            subject: letter.master_subject(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, report: &SplitReport) -> Result<()> {
        fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("failed to create {}", self.out_dir.display()))?;

        let pages: Vec<&PageAnalysis> = report.pages().collect();
        fs::write(self.out_dir.join("pages.json"), serde_json::to_string_pretty(&pages)?)?;

        let letters: Vec<LetterSummary<'_>> = report
            .letters
            .iter()
            .enumerate()
            .map(|(idx, letter)| LetterSummary::new(idx + 1, letter))
            .collect();
        fs::write(self.out_dir.join("letters.json"), serde_json::to_string_pretty(&letters)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::RelPos;
    use crate::core::model::TextMarker;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    #[test]
    fn writes_pages_and_letter_summaries() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut first = PageAnalysis::not_found(1);
        first.subject = TextMarker::found("Rechnung", RelPos { x_rel: 0.1, y_rel: 0.3 });
        let mut letter = Letter::new(first);
        letter.push(PageAnalysis::not_found(2));
        let report = SplitReport {
            letters: vec![letter, Letter::new(PageAnalysis::not_found(3))],
            transitions: Vec::new(),
        };

        JsonExporter::new(dir.path().to_path_buf()).export(&report)?;

        let pages: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("pages.json"))?)?;
        assert_eq!(pages.as_array().map(Vec::len), Some(3));
        assert_eq!(pages[0]["subject"]["raw"], "Rechnung");
        assert_eq!(pages[2]["date"]["found"], false);

        let letters: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("letters.json"))?)?;
        assert_eq!(letters[0]["pages"], serde_json::json!([1, 2]));
        assert_eq!(letters[0]["subject"], "Rechnung");
        assert_eq!(letters[1]["first_page"], 3);
        assert_eq!(letters[1]["date"], Value::Null);
        Ok(())
    }

    #[test]
    fn dates_serialize_as_iso() -> Result<()> {
        let mut page = PageAnalysis::not_found(1);
        page.date.found = true;
        page.date.date_value = NaiveDate::from_ymd_opt(2023, 5, 12);
        let letter = Letter::new(page);
        let summary = serde_json::to_value(LetterSummary::new(1, &letter))?;
        assert_eq!(summary["date"], "2023-05-12");
        Ok(())
    }
}
