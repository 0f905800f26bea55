pub mod layout_builder;
pub mod tokens;

pub use layout_builder::{PageLayout, TextGroup};
pub use tokens::{PageTokens, RawToken, Token, TokenTable};
