use std::fmt;

use thiserror::Error;

/// Pipeline stage a failure occurred in. Every user-facing error message
/// names its stage so the caller never has to show a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Extracting,
    Reviewing,
    Committing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Reviewing => "reviewing",
            Stage::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Errors from retrieving the raw scan source
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request did not complete within the configured timeout
    #[error("request timed out")]
    Timeout,

    /// The response (or uploaded payload) exceeded the configured ceiling
    #[error("content exceeds the {limit}-byte limit")]
    TooLarge { limit: usize },

    /// The server answered with a non-success status
    #[error("server returned HTTP {0}")]
    HttpError(u16),

    /// Network-layer failure before any HTTP status was received
    #[error("could not reach the source: {0}")]
    Unreachable(String),

    /// Uploaded payload does not declare an image MIME type
    #[error("unsupported content type: {0}")]
    InvalidType(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::HttpError(status.as_u16())
        } else {
            FetchError::Unreachable(err.to_string())
        }
    }
}

/// Errors from turning raw content into a draft
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Neither an ingredient block nor a step block could be found
    #[error("could not recognize a recipe in this source")]
    Unrecognized,

    /// The text-recognition capability failed on an image source
    #[error("text recognition failed: {0}")]
    Recognizer(String),
}

/// Non-fatal gaps in an extraction result. The draft is still returned so
/// the reviewer can fill in what the extractor missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractWarning {
    MissingIngredients,
    MissingSteps,
}

impl fmt::Display for ExtractWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractWarning::MissingIngredients => f.write_str("no ingredient list was found"),
            ExtractWarning::MissingSteps => f.write_str("no preparation steps were found"),
        }
    }
}

/// Errors from a call to the backing CRUD store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(String),

    #[error("store returned HTTP {0}")]
    Status(u16),

    #[error("could not decode store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            StoreError::Status(status.as_u16())
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}

/// Errors from persisting a reviewed draft
#[derive(Error, Debug)]
pub enum CommitError {
    /// The draft failed the validation gate; nothing was written
    #[error("draft is not ready to save: {0}")]
    Invalid(String),

    /// The recipe record was created but a later write failed. The id is
    /// surfaced so the caller can retry the remainder or delete the recipe.
    #[error("recipe {recipe_id} was only partially saved: {source}")]
    Partial {
        recipe_id: u64,
        #[source]
        source: StoreError,
    },

    /// The store rejected the very first write; no records exist
    #[error("recipe store is unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Top-level pipeline error, tagged with the stage that failed
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("fetching failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("extracting failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("committing failed: {0}")]
    Commit(#[from] CommitError),
}

impl ScanError {
    /// The stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            ScanError::Fetch(_) => Stage::Fetching,
            ScanError::Extract(_) => Stage::Extracting,
            ScanError::Commit(_) => Stage::Committing,
        }
    }
}
