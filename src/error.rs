//! Library error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    #[error("invalid story content: {0}")]
    Content(String),

    #[error("unknown chapter: {0}")]
    UnknownChapter(String),

    #[error("no chapter is being played")]
    NoChapter,

    #[error("storage error: {0}")]
    Store(String),

    #[error("playback cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoryError>;
