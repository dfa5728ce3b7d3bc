//! Stripe webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 and sends the
//! result in the `Stripe-Signature` header as `t=<unix>,v1=<hex>`. More than
//! one `v1` entry appears while a signing secret is being rolled.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Errors from signature verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The header could not be parsed.
    #[error("malformed signature header: {0}")]
    Malformed(&'static str),

    /// The header carried no `v1` signatures.
    #[error("no v1 signatures in header")]
    NoSignatures,

    /// No signature matched the payload.
    #[error("signature mismatch")]
    Mismatch,

    /// The signed timestamp is outside the allowed tolerance.
    #[error("timestamp {timestamp} outside tolerance")]
    TimestampOutsideTolerance {
        /// The signed timestamp (Unix seconds).
        timestamp: i64,
    },
}

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp the signature was generated at.
    pub timestamp: i64,
    /// Decoded `v1` signatures.
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parse a header of the form `t=<unix>,v1=<hex>[,v1=<hex>...]`.
    ///
    /// Unknown keys such as the legacy `v0` scheme are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError::Malformed` for a missing or bad timestamp or
    /// non-hex signature, and `SignatureError::NoSignatures` when no `v1`
    /// entry is present.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    let ts = value
                        .parse::<i64>()
                        .map_err(|_| SignatureError::Malformed("invalid timestamp"))?;
                    timestamp = Some(ts);
                }
                "v1" => {
                    let sig = hex::decode(value)
                        .map_err(|_| SignatureError::Malformed("invalid v1 signature hex"))?;
                    signatures.push(sig);
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::Malformed("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Verifies webhook payloads against a signing secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: Option<i64>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance_seconds", &self.tolerance_seconds)
            .finish()
    }
}

impl WebhookVerifier {
    /// Create a verifier. A tolerance of zero disables the timestamp check.
    pub fn new(secret: impl Into<String>, tolerance_seconds: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_seconds: (tolerance_seconds > 0)
                .then(|| i64::try_from(tolerance_seconds).unwrap_or(i64::MAX)),
        }
    }

    /// Verify `payload` (the raw request body) against the signature header.
    ///
    /// # Errors
    ///
    /// Returns a `SignatureError` if the header is malformed, the timestamp is
    /// outside tolerance, or no signature matches.
    pub fn verify(
        &self,
        payload: &[u8],
        header: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureError> {
        let header = SignatureHeader::parse(header)?;

        if let Some(tolerance) = self.tolerance_seconds {
            let age = now.timestamp().saturating_sub(header.timestamp);
            if age.saturating_abs() > tolerance {
                return Err(SignatureError::TimestampOutsideTolerance {
                    timestamp: header.timestamp,
                });
            }
        }

        let mac = signed_mac(&self.secret, header.timestamp, payload);
        let valid = header
            .signatures
            .iter()
            .any(|sig| mac.clone().verify_slice(sig).is_ok());

        if valid {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}

/// Build a `Stripe-Signature` header value for `payload` signed at `timestamp`.
#[must_use]
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mac = signed_mac(secret, timestamp, payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key size"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac
}
