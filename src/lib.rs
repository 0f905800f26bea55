pub mod analysis;
pub mod core;
pub mod export;
pub mod markers;
pub mod ocr;
pub mod pipeline;
pub mod segment;

pub use analysis::PageAnalyzer;
pub use core::config::{DetectorConfig, LetterConfig, SplitterConfig};
pub use core::model::{AddressBlock, DateMarker, Letter, LetterPageIndex, PageAnalysis, TextMarker};
pub use ocr::tokens::{RawToken, TokenTable};
pub use pipeline::{split_tables, SplitReport};
