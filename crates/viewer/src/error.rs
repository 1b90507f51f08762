use thiserror::Error;

/// Model loading failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },

    /// Every candidate failed; `last` is the error of the final candidate
    #[error("model unavailable after {tried} candidate(s): {last}")]
    Unavailable { tried: usize, last: Box<AssetError> },

    #[error("no candidate URLs to load")]
    NoCandidates,
}

impl AssetError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        AssetError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(url: &str, reason: impl ToString) -> Self {
        AssetError::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Patient data failures
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}
