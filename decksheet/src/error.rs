use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::sheet::SheetLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingTab,
    InvalidQuantity(String),
    EmptyName,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseErrorKind::MissingTab => write!(f, "no tab between quantity and card name"),
            ParseErrorKind::InvalidQuantity(q) => {
                write!(f, "quantity {:?} is not a positive integer", q)
            }
            ParseErrorKind::EmptyName => write!(f, "card name is empty"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("decklist line {line}: {kind}")]
    Parse { line: usize, kind: ParseErrorKind },
    #[error("image couldn't be retrieved from {url}: status {status}")]
    Retrieval {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("scryfall has no card for {name:?}: {details}")]
    CardNotFound { name: String, details: String },
    #[error("scryfall answer for {name:?} has no large image uri")]
    MissingImageUri { name: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("couldn't read override table {}: {source}", path.display())]
    Overrides {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("too many cards in the deck to put on one template: {cards} cards, the limit is {capacity}")]
    CapacityExceeded { cards: usize, capacity: usize },
    #[error("template is {found:?} pixels, expected {expected:?}")]
    TemplateSize {
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("sheet layout {0:?} has an empty dimension or is too large")]
    InvalidLayout(SheetLayout),
    #[error("output directory {} is not empty", .0.display())]
    OutputDirNotEmpty(PathBuf),
    #[error("download task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Error {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
