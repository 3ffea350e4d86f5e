use thiserror::Error;

/// Domain-level outcomes the feed engine reports instead of crashing.
///
/// None of these are fatal: callers log them and keep the previous selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("no theme matches query: {0}")]
    NoMatch(String),
}

pub type FeedResult<T> = std::result::Result<T, FeedError>;
