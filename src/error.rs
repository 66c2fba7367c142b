//! Error types for the fetch, extraction and AI fallback stages.
//!
//! Every variant here is terminal for the operation that raised it. Per-file
//! problems (tags, renames) are logged and skipped instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("status code error: {code} {text}")]
    Status { code: u16, text: String },

    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not find album data on page")]
    NoAlbumData,

    #[error("could not find {storefront} track data on page")]
    NoTrackData { storefront: &'static str },

    #[error("failed to unmarshal album data: {0}")]
    Unmarshal(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API key is required")]
    MissingKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("AI API error: {status} - {body}")]
    Status { status: String, body: String },

    #[error("no response from AI")]
    EmptyResponse,

    #[error("failed to parse AI response: {error}. Content: {content}")]
    Parse {
        error: serde_json::Error,
        content: String,
    },

    #[error("failed to decode AI response: {0}")]
    Body(#[from] std::io::Error),
}
