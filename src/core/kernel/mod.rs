/// Transport kernel - everything between the typed API surface and the wire
///
/// The kernel has three layers:
///
/// - `Signer`: pluggable request authentication (`HmacSigner` implements the
///   exchange's HMAC-SHA256 scheme).
/// - `SignedEnvelope` / `Transport`: an immutable, fully-signed request and
///   the trait seam that executes exactly one round trip (`HttpTransport` in
///   production, instrumented fakes in tests).
/// - `Dispatcher`: the serialized worker that paces all outbound traffic and
///   hands each result back to exactly the caller that submitted it.
///
/// The kernel contains no endpoint-specific logic; the typed facade in
/// `crate::client` builds envelopes and decodes payloads.
pub mod dispatcher;
pub mod envelope;
pub mod signer;

pub use dispatcher::Dispatcher;
pub use envelope::{EnvelopeFactory, HttpTransport, Scope, SignedEnvelope, Transport};
pub use signer::{HmacSigner, Signer};
