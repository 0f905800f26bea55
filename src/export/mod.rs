pub mod json_export;
pub mod text_export;

use anyhow::Result;

use crate::pipeline::SplitReport;

pub use json_export::{JsonExporter, LetterSummary};
pub use text_export::TextExporter;

pub trait Exporter {
    fn export(&self, report: &SplitReport) -> Result<()>;
}
