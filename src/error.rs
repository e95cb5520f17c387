// Error types for dataset loading and dashboard interaction
use crate::domain::key::KeyKind;
use thiserror::Error;

/// Failure to obtain the dataset. Any of these aborts dashboard construction.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode dataset: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("record {index} has an unparsable timestamp {value:?}")]
    Timestamp { index: usize, value: String },

    #[error("record {index} is missing {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("dataset is empty")]
    Empty,
}

#[derive(Debug, Error, PartialEq)]
pub enum DashboardError {
    #[error("unknown widget {0:?}")]
    UnknownWidget(String),

    #[error("unknown overlay layer {0:?}")]
    UnknownLayer(String),

    #[error("unknown participant {0:?}")]
    UnknownParticipant(String),

    #[error("a dataset supports at most {0} dimensions")]
    TooManyDimensions(usize),

    #[error("unknown dimension {0}")]
    UnknownDimension(usize),

    #[error("group {0} does not hold the requested reducer")]
    GroupMismatch(usize),

    #[error("{value:?} is not a valid {kind:?} key")]
    InvalidKey { kind: KeyKind, value: String },
}
