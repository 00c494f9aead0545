use crate::core::types::{ApiMessage, MarketStatus};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Submission deadline elapsed")]
    Timeout,

    #[error("Dispatcher is closed")]
    PoolClosed,

    #[error("Exchange returned an empty response body")]
    EmptyResponse,

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Exchange rejected request (status {status}): {}", join_messages(.messages))]
    Rejected {
        status: i32,
        messages: Vec<ApiMessage>,
    },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Unknown side: {0}")]
    UnknownSide(String),

    #[error("Exchange is not open for trading: {0}")]
    MarketClosed(MarketStatus),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::core::config::ConfigError),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Other error: {0}")]
    Other(String),
}

fn join_messages(messages: &[ApiMessage]) -> String {
    messages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_display_includes_code_and_text() {
        let err = ExchangeError::Rejected {
            status: 1,
            messages: vec![ApiMessage {
                code: "ERR-5010".to_string(),
                text: "symbol not found".to_string(),
            }],
        };

        let rendered = err.to_string();
        assert!(rendered.contains("status 1"), "missing status: {rendered}");
        assert!(rendered.contains("ERR-5010"), "missing code: {rendered}");
        assert!(
            rendered.contains("symbol not found"),
            "missing text: {rendered}"
        );
    }
}
