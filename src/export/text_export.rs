use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::Letter;
use crate::export::Exporter;
use crate::pipeline::SplitReport;

#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_letter(number: usize, letter: &Letter, report: &SplitReport) -> String {
        let (first, last) = letter.page_range();
        let date = letter
            .master_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());

        let mut out = format!("=== Letter {} (pages {}-{}) ===\n", number, first, last);
        out.push_str(&format!("Date:    {}\n", date));
        out.push_str(&format!("Sender:  {}\n", letter.master_sender().unwrap_or("-")));
        out.push_str(&format!("Subject: {}\n", letter.master_subject().unwrap_or("-")));
        match report.transition_into(first) {
            Some(transition) => out.push_str(&format!(
                "Split:   score {} ({})\n",
                transition.score,
                transition.factors.join(", ")
            )),
            None => out.push_str("Split:   first page\n"),
        }
        out
    }
}

impl Exporter for TextExporter {
    fn export(&self, report: &SplitReport) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut summary = format!(
            "{} pages, {} letters\n\n",
            report.page_count(),
            report.letters.len()
        );
        for (idx, letter) in report.letters.iter().enumerate() {
            summary.push_str(&Self::format_letter(idx + 1, letter, report));
            summary.push('\n');
        }

        fs::write(self.out_dir.join("summary.txt"), summary)?;
        Ok(())
    }
}
