/// Svix webhook signature verification
///
/// The identity provider delivers webhooks through Svix. Each delivery carries
/// three headers:
///
/// - `svix-id`: unique message id
/// - `svix-timestamp`: unix seconds when the message was signed
/// - `svix-signature`: space separated list of `v1,<base64 signature>`
///
/// The signature is HMAC-SHA256 over `"{id}.{timestamp}.{body}"` keyed with the
/// base64 part of the `whsec_...` signing secret. Verification must run on the
/// raw request body, before any JSON parsing.
///
/// # Example
///
/// ```
/// use imaginify_shared::webhook::signature::{SvixHeaders, WebhookVerifier};
///
/// let verifier = WebhookVerifier::new("whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw").unwrap();
/// let body = br#"{"type":"user.deleted","data":{"id":"user_1"}}"#;
///
/// let now = 1_700_000_000;
/// let signature = verifier.sign("msg_1", now, body);
/// let timestamp = now.to_string();
/// let headers = SvixHeaders {
///     id: "msg_1",
///     timestamp: &timestamp,
///     signature: &signature,
/// };
///
/// assert!(verifier.verify_at(&headers, body, now).is_ok());
/// assert!(verifier.verify_at(&headers, b"tampered", now).is_err());
/// ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

/// Prefix of signing secrets issued by Svix
const SECRET_PREFIX: &str = "whsec_";

/// Only `v1` signatures are understood
const SIGNATURE_VERSION: &str = "v1";

/// Accepted clock skew between the provider and us, in seconds
pub const TIMESTAMP_TOLERANCE_SECONDS: i64 = 5 * 60;

/// Reasons a delivery is rejected before dispatch
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// Signing secret could not be decoded
    #[error("Invalid signing secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid svix-timestamp header")]
    InvalidTimestamp,

    /// Timestamp too old or too far in the future
    #[error("Message timestamp outside of tolerance")]
    TimestampOutOfRange,

    #[error("No matching signature found")]
    NoMatchingSignature,
}

/// The three Svix headers of one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvixHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> SvixHeaders<'a> {
    /// Collects the headers through `lookup`, rejecting absent or blank ones
    ///
    /// Keeps this crate independent of any HTTP framework's header map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, VerifyError>
    where
        F: Fn(&'static str) -> Option<&'a str>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .ok_or(VerifyError::MissingHeader(name))
        };

        Ok(Self {
            id: get(HEADER_ID)?,
            timestamp: get(HEADER_TIMESTAMP)?,
            signature: get(HEADER_SIGNATURE)?,
        })
    }
}

/// Verifies deliveries signed with one signing secret
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl WebhookVerifier {
    /// Builds a verifier from a `whsec_<base64>` secret (prefix optional)
    pub fn new(secret: &str) -> Result<Self, VerifyError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);

        let key = STANDARD
            .decode(encoded)
            .map_err(|e| VerifyError::InvalidSecret(e.to_string()))?;

        if key.is_empty() {
            return Err(VerifyError::InvalidSecret("secret is empty".to_string()));
        }

        Ok(Self { key })
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    fn signed_mac(&self, msg_id: &str, timestamp: &str, payload: &[u8]) -> HmacSha256 {
        let mut mac = self.mac();
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac
    }

    /// Produces a `v1,<base64>` signature, as the provider would send it
    pub fn sign(&self, msg_id: &str, timestamp: i64, payload: &[u8]) -> String {
        let mac = self.signed_mac(msg_id, &timestamp.to_string(), payload);
        format!(
            "{},{}",
            SIGNATURE_VERSION,
            STANDARD.encode(mac.finalize().into_bytes())
        )
    }

    /// Verifies a delivery against the current wall clock
    pub fn verify(&self, headers: &SvixHeaders<'_>, payload: &[u8]) -> Result<(), VerifyError> {
        self.verify_at(headers, payload, chrono::Utc::now().timestamp())
    }

    /// Verifies a delivery as if the current time were `now` (unix seconds)
    pub fn verify_at(
        &self,
        headers: &SvixHeaders<'_>,
        payload: &[u8],
        now: i64,
    ) -> Result<(), VerifyError> {
        let timestamp: i64 = headers
            .timestamp
            .parse()
            .map_err(|_| VerifyError::InvalidTimestamp)?;

        if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECONDS.unsigned_abs() {
            return Err(VerifyError::TimestampOutOfRange);
        }

        let expected = self.signed_mac(headers.id, headers.timestamp, payload);

        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
            // verify_slice compares in constant time
            .any(|candidate| expected.clone().verify_slice(&candidate).is_ok());

        if matched {
            Ok(())
        } else {
            Err(VerifyError::NoMatchingSignature)
        }
    }
}
