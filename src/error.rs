// Error taxonomy for the player
// Every variant here is recoverable: callers log it and carry on with the view intact

use thiserror::Error;

/// Catalog load failed. The session stays empty until a later reload succeeds.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid catalog endpoint '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog endpoint answered with status {0}")]
    Status(u16),

    #[error("catalog response is not a track list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to scan {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("track '{0}' is not in the active list")]
    TrackNotFound(String),

    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
}

/// Failures translated from the media engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("engine refused to play: {0}")]
    Rejected(String),

    #[error("audio output unavailable: {0}")]
    Output(String),
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rejected(reason) | TransportError::Output(reason) => {
                SessionError::PlaybackRejected(reason)
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("key {key} is already bound to {existing}, cannot bind it to {requested}")]
    Conflict {
        key: String,
        existing: String,
        requested: String,
    },
}
