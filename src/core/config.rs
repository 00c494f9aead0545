use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

/// Production REST endpoint for the exchange.
pub const DEFAULT_BASE_URL: &str = "https://api.coin.z.com";

/// Minimum spacing between outbound requests. The exchange allows roughly
/// one call per 300ms; one extra millisecond keeps us on the safe side of
/// their clock.
pub const DEFAULT_PACING_INTERVAL: Duration = Duration::from_millis(301);

/// Total round-trip timeout applied by the HTTP transport.
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-submission deadline enforced independently of pacing.
pub const DEFAULT_SUBMIT_DEADLINE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: Secret<String>,
    pub secret_key: Secret<String>,
    pub base_url: Option<String>,
    pub transport_timeout: Duration,
    pub pacing_interval: Duration,
    pub submit_deadline: Duration,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ExchangeConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ExchangeConfig", 6)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("secret_key", "[REDACTED]")?;
        state.serialize_field("base_url", &self.base_url)?;
        state.serialize_field("transport_timeout_ms", &self.transport_timeout.as_millis())?;
        state.serialize_field("pacing_interval_ms", &self.pacing_interval.as_millis())?;
        state.serialize_field("submit_deadline_ms", &self.submit_deadline.as_millis())?;
        state.end()
    }
}

// Custom Deserialize implementation
impl<'de> Deserialize<'de> for ExchangeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ExchangeConfigHelper {
            api_key: String,
            secret_key: String,
            base_url: Option<String>,
            transport_timeout_ms: Option<u64>,
            pacing_interval_ms: Option<u64>,
            submit_deadline_ms: Option<u64>,
        }

        let helper = ExchangeConfigHelper::deserialize(deserializer)?;
        let mut config = Self::new(helper.api_key, helper.secret_key);
        config.base_url = helper.base_url;
        if let Some(ms) = helper.transport_timeout_ms {
            config.transport_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = helper.pacing_interval_ms {
            config.pacing_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = helper.submit_deadline_ms {
            config.submit_deadline = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

impl ExchangeConfig {
    /// Create a new configuration with API credentials
    #[must_use]
    pub fn new(api_key: String, secret_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            secret_key: Secret::new(secret_key),
            base_url: None,
            transport_timeout: DEFAULT_TRANSPORT_TIMEOUT,
            pacing_interval: DEFAULT_PACING_INTERVAL,
            submit_deadline: DEFAULT_SUBMIT_DEADLINE,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `GMOCOIN_API_KEY`)
    /// - `{PREFIX}_SECRET_KEY` (e.g., `GMOCOIN_SECRET_KEY`)
    /// - `{PREFIX}_BASE_URL` (optional)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let api_key_var = format!("{}_API_KEY", prefix.to_uppercase());
        let secret_key_var = format!("{}_SECRET_KEY", prefix.to_uppercase());
        let base_url_var = format!("{}_BASE_URL", prefix.to_uppercase());

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let secret_key = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;

        let mut config = Self::new(api_key, secret_key);
        config.base_url = env::var(&base_url_var).ok();
        Ok(config)
    }

    /// Check if this configuration has valid credentials for authenticated operations
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.secret_key.expose_secret().is_empty()
    }

    /// Set custom base URL
    #[must_use]
    pub fn base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the HTTP round-trip timeout
    #[must_use]
    pub const fn transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = timeout;
        self
    }

    /// Set the minimum interval between outbound requests
    #[must_use]
    pub const fn pacing_interval(mut self, interval: Duration) -> Self {
        self.pacing_interval = interval;
        self
    }

    /// Set the default per-submission deadline
    #[must_use]
    pub const fn submit_deadline(mut self, deadline: Duration) -> Self {
        self.submit_deadline = deadline;
        self
    }

    /// Resolve the base URL, falling back to the production endpoint
    #[must_use]
    pub fn resolved_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose_secret()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_exchange_contract() {
        let config = ExchangeConfig::new("key".to_string(), "secret".to_string());
        assert_eq!(config.pacing_interval, Duration::from_millis(301));
        assert_eq!(config.transport_timeout, Duration::from_secs(10));
        assert_eq!(config.submit_deadline, Duration::from_secs(3));
        assert_eq!(config.resolved_base_url(), DEFAULT_BASE_URL);
        assert!(config.has_credentials());
    }

    #[test]
    fn empty_credentials_are_detected() {
        let config = ExchangeConfig::new(String::new(), String::new());
        assert!(!config.has_credentials());
    }

    #[test]
    fn serialization_redacts_secrets() {
        let config = ExchangeConfig::new("my-key".to_string(), "my-secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("my-key"));
        assert!(!json.contains("my-secret"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn deserialization_applies_overrides() {
        let json = r#"{
            "api_key": "k",
            "secret_key": "s",
            "base_url": "https://testnet.example.com",
            "pacing_interval_ms": 500
        }"#;
        let config: ExchangeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.resolved_base_url(), "https://testnet.example.com");
        assert_eq!(config.pacing_interval, Duration::from_millis(500));
        assert_eq!(config.submit_deadline, DEFAULT_SUBMIT_DEADLINE);
    }
}
