use std::path::PathBuf;
use thiserror::Error;

/// The main error type for voccurate operations.
#[derive(Debug, Error)]
pub enum CurateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse VOC XML {path}: {message}")]
    XmlParse { path: PathBuf, message: String },

    #[error("Missing resource {path}: {message}")]
    MissingResource { path: PathBuf, message: String },

    #[error("Nothing to do: {message}")]
    EmptyResult { message: String },

    #[error("Image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to load font {path}: {message}")]
    Font { path: PathBuf, message: String },

    #[error("Invalid selection {index}: file has {len} object(s)")]
    InvalidSelection { index: usize, len: usize },

    #[error("No object is selected")]
    NothingSelected,

    #[error("Confidence threshold {0} is outside [0, 1]")]
    InvalidThreshold(f64),

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),

    #[error("Deleted {deleted} but could not delete {remaining}: {source}")]
    PairPartiallyDeleted {
        deleted: PathBuf,
        remaining: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid arguments: {message}")]
    InvalidArgument { message: String },
}

impl CurateError {
    pub(crate) fn xml_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::XmlParse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MissingResource {
            path: path.into(),
            message: message.into(),
        }
    }
}
