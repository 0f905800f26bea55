use serde::Serialize;

use crate::core::config::SplitterConfig;
use crate::core::model::{Letter, PageAnalysis};
use crate::segment::scorer::{BoundaryScorer, HeuristicScorer};

/// The scored decision taken between two adjacent scanned pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from_page: usize,
    pub to_page: usize,
    pub score: i32,
    pub factors: Vec<String>,
    pub split: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grouping {
    pub letters: Vec<Letter>,
    pub transitions: Vec<Transition>,
}

/// Partitions an ordered page stream into letters in a single pass.
pub struct LetterGrouper<S = HeuristicScorer> {
    scorer: S,
    split_threshold: i32,
}

impl LetterGrouper<HeuristicScorer> {
    pub fn from_config(config: &SplitterConfig) -> Self {
        Self::new(HeuristicScorer::new(config.clone()), config.split_threshold)
    }
}

impl<S: BoundaryScorer> LetterGrouper<S> {
    pub fn new(scorer: S, split_threshold: i32) -> Self {
        Self {
            scorer,
            split_threshold,
        }
    }

    /// Consumes the pages in order. A page whose transition score exceeds
    /// the threshold closes the current letter and opens a new one; every
    /// other page joins the current letter.
    pub fn group<I>(&self, pages: I) -> Grouping
    where
        I: IntoIterator<Item = PageAnalysis>,
    {
        let mut pages = pages.into_iter();
        let mut letters = Vec::new();
        let mut transitions = Vec::new();

        let Some(first) = pages.next() else {
            log::debug!("no pages to group");
            return Grouping {
                letters,
                transitions,
            };
        };

        let mut current = Letter::new(first);
        for page in pages {
            let scored = self.scorer.score(current.last_page(), &page);
            let split = scored.score > self.split_threshold;
            let factors = if scored.factors.is_empty() {
                "None".to_string()
            } else {
                scored.factors.join(", ")
            };
            log::debug!(
                "{} at page {} (score: {}). factors: {}",
                if split { "split" } else { "continue" },
                page.scan_page_num,
                scored.score,
                factors
            );

            transitions.push(Transition {
                from_page: current.last_page().scan_page_num,
                to_page: page.scan_page_num,
                score: scored.score,
                factors: scored.factors,
                split,
            });

            if split {
                letters.push(std::mem::replace(&mut current, Letter::new(page)));
            } else {
                current.push(page);
            }
        }
        letters.push(current);

        log::info!("grouped {} pages into {} letters", transitions.len() + 1, letters.len());
        validate_letters(&letters);

        Grouping {
            letters,
            transitions,
        }
    }
}

/// Groups pages with the heuristic scorer.
pub fn group_pages_into_letters(pages: Vec<PageAnalysis>, config: &SplitterConfig) -> Vec<Letter> {
    LetterGrouper::from_config(config).group(pages).letters
}

/// Printed page indices of `letter` when they do not form a gap-free run,
/// in page order.
pub fn page_index_gaps(letter: &Letter) -> Option<Vec<u32>> {
    let indices: Vec<u32> = letter
        .pages()
        .iter()
        .filter(|page| page.letter_page_index.found)
        .filter_map(|page| page.letter_page_index.current)
        .collect();
    let (min, max) = (*indices.iter().min()?, *indices.iter().max()?);
    let expected: Vec<u32> = (min..=max).collect();
    (indices != expected).then_some(indices)
}

/// Warns about letters whose printed page indices skip or repeat. Advisory
/// only; returns the 1-based numbers of the flagged letters.
pub fn validate_letters(letters: &[Letter]) -> Vec<usize> {
    let mut flagged = Vec::new();
    for (idx, letter) in letters.iter().enumerate() {
        if let Some(found) = page_index_gaps(letter) {
            log::warn!(
                "letter {} has gaps in page indices. found: {:?}, scan pages: {:?}",
                idx + 1,
                found,
                letter.page_numbers()
            );
            flagged.push(idx + 1);
        }
    }
    flagged
}
