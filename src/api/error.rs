use thiserror::Error;

/// Failures talking to a market-data or index-membership source
#[derive(Debug, Error)]
pub enum DataError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{symbol}: provider error {code}: {description}")]
    Provider {
        symbol: String,
        code: String,
        description: String,
    },

    #[error("no data returned for {0}")]
    NoData(String),

    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for DataError {
    fn from(e: serde_json::Error) -> Self {
        DataError::Parse(e.to_string())
    }
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        DataError::Parse(e.to_string())
    }
}
