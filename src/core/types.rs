use crate::core::errors::ExchangeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbols tradable on the exchange.
pub mod symbols {
    pub const BTC: &str = "BTC";
    pub const ETH: &str = "ETH";
    pub const BCH: &str = "BCH";
    pub const LTC: &str = "LTC";
    pub const XRP: &str = "XRP";
    pub const BTC_JPY: &str = "BTC_JPY";
    pub const ETH_JPY: &str = "ETH_JPY";
    pub const BCH_JPY: &str = "BCH_JPY";
    pub const LTC_JPY: &str = "LTC_JPY";
    pub const XRP_JPY: &str = "XRP_JPY";
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl FromStr for Side {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            other => Err(ExchangeError::UnknownSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order execution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionType {
    Market,
    Limit,
}

impl ExecutionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
        }
    }
}

/// Operational state reported by `GET /public/v1/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Maintenance,
    Preopen,
    Open,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Maintenance => "MAINTENANCE",
            Self::Preopen => "PREOPEN",
            Self::Open => "OPEN",
        };
        f.write_str(s)
    }
}

/// One entry of the `messages` list carried by every response envelope
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiMessage {
    #[serde(rename = "message_code")]
    pub code: String,
    #[serde(rename = "message_string")]
    pub text: String,
}

impl fmt::Display for ApiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.code, self.text)
    }
}

/// Response envelope shared by all endpoints. A non-zero `status` is a
/// domain-level rejection and carries the message list.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub status: i32,
    #[serde(default)]
    pub responsetime: String,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Check the embedded status code and surface the payload.
    pub fn into_data(self) -> Result<Option<T>, ExchangeError> {
        if self.status == 0 {
            Ok(self.data)
        } else {
            Err(ExchangeError::Rejected {
                status: self.status,
                messages: self.messages,
            })
        }
    }
}

/// Payload of `GET /public/v1/status`
#[derive(Debug, Deserialize)]
pub struct StatusData {
    pub status: MarketStatus,
}

/// One ticker entry. The exchange reports all prices as decimal strings and
/// they are passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rate {
    pub ask: String,
    pub bid: String,
    pub high: String,
    pub last: String,
    pub low: String,
    pub symbol: String,
    pub timestamp: String,
    pub volume: String,
}

/// One open position from `GET /private/v1/openPositions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub position_id: u64,
    pub symbol: String,
    pub side: Side,
    pub size: String,
    #[serde(default)]
    pub orderd_size: String,
    pub price: String,
    #[serde(default)]
    pub loss_gain: String,
    #[serde(default)]
    pub leverage: String,
    #[serde(default)]
    pub losscut_price: String,
    pub timestamp: String,
}

/// One fill from `GET /private/v1/latestExecutions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fix {
    pub execution_id: u64,
    pub order_id: u64,
    #[serde(default)]
    pub position_id: Option<u64>,
    pub symbol: String,
    pub side: Side,
    #[serde(default)]
    pub settle_type: String,
    pub size: String,
    pub price: String,
    #[serde(default)]
    pub loss_gain: String,
    #[serde(default)]
    pub fee: String,
    pub timestamp: String,
}

/// Page cursor reported by list endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub count: u32,
}

/// Wire shape of `openPositions` data: a wrapped list that may be absent
/// entirely when there are no positions.
#[derive(Debug, Deserialize)]
pub struct PositionList {
    #[serde(default)]
    pub list: Vec<Position>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Wire shape of `latestExecutions` data.
#[derive(Debug, Deserialize)]
pub struct FixList {
    #[serde(default)]
    pub list: Vec<Fix>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}
