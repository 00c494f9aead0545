use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signer trait for request authentication
///
/// The exchange authenticates every request, public endpoints included, with
/// a MAC over the build-time timestamp, HTTP method, request path and raw
/// body. Implementations must be pure: identical inputs yield identical
/// signatures and no state is carried between calls.
pub trait Signer: Send + Sync {
    /// Sign one request.
    ///
    /// # Arguments
    /// * `timestamp_ms` - Request timestamp in milliseconds since epoch
    /// * `method` - HTTP method (GET, POST, ...)
    /// * `path` - API path without base URL or query string (e.g. `/v1/ticker`)
    /// * `body` - Raw request body bytes, may be empty
    fn sign(
        &self,
        timestamp_ms: u64,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<String, ExchangeError>;
}

/// HMAC-SHA256 signer producing the hex-encoded `API-SIGN` header value
pub struct HmacSigner {
    secret_key: String,
}

impl HmacSigner {
    pub fn new(secret_key: String) -> Self {
        Self { secret_key }
    }
}

impl Signer for HmacSigner {
    fn sign(
        &self,
        timestamp_ms: u64,
        method: &str,
        path: &str,
        body: &[u8],
    ) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|_| ExchangeError::Signing("invalid secret key".to_string()))?;

        // Signature payload is timestamp + method + path + body, in that order.
        mac.update(timestamp_ms.to_string().as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body);

        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> HmacSigner {
        HmacSigner::new("test-secret".to_string())
    }

    #[test]
    fn signature_is_deterministic() {
        let a = signer().sign(1_614_000_000_000, "GET", "/v1/status", b"").unwrap();
        let b = signer().sign(1_614_000_000_000, "GET", "/v1/status", b"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn signature_is_hex_sha256() {
        let sig = signer().sign(1_614_000_000_000, "GET", "/v1/status", b"").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn every_input_is_bound_into_the_signature() {
        let base = signer().sign(1_614_000_000_000, "GET", "/v1/status", b"").unwrap();

        let variants = [
            signer().sign(1_614_000_000_001, "GET", "/v1/status", b"").unwrap(),
            signer().sign(1_614_000_000_000, "POST", "/v1/status", b"").unwrap(),
            signer().sign(1_614_000_000_000, "GET", "/v1/ticker", b"").unwrap(),
            signer()
                .sign(1_614_000_000_000, "GET", "/v1/status", b"{}")
                .unwrap(),
            HmacSigner::new("other-secret".to_string())
                .sign(1_614_000_000_000, "GET", "/v1/status", b"")
                .unwrap(),
        ];

        for (i, variant) in variants.iter().enumerate() {
            assert_ne!(&base, variant, "variant {i} collided with the base input");
        }
    }

    #[test]
    fn empty_body_is_valid_input() {
        assert!(signer().sign(0, "GET", "/v1/status", b"").is_ok());
    }
}
