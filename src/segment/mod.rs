pub mod classifier;
pub mod grouper;
pub mod scorer;

pub use grouper::{group_pages_into_letters, Grouping, LetterGrouper, Transition};
pub use scorer::{BoundaryScorer, HeuristicScorer, TransitionScore};
