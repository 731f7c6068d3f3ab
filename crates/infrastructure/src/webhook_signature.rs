//! HMAC-SHA256 body signatures for webhook traffic in both directions.
//!
//! The header value has the form `sha256=<hex>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tempadmin_core::{AppError, AppResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-tempadmin-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Minimum shared secret length in bytes.
pub const MIN_WEBHOOK_SECRET_LENGTH: usize = 32;

/// Signs and verifies webhook bodies with a shared secret.
#[derive(Clone)]
pub struct WebhookSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for WebhookSigner {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WebhookSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl WebhookSigner {
    /// Creates a signer; the secret must hold at least [`MIN_WEBHOOK_SECRET_LENGTH`] bytes.
    pub fn new(secret: impl Into<Vec<u8>>) -> AppResult<Self> {
        let secret = secret.into();
        if secret.len() < MIN_WEBHOOK_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "webhook secret must be at least {MIN_WEBHOOK_SECRET_LENGTH} bytes"
            )));
        }

        Ok(Self { secret })
    }

    /// Returns the signature header value for `body`.
    pub fn sign(&self, body: &[u8]) -> AppResult<String> {
        Ok(format!("{SIGNATURE_PREFIX}{}", hex::encode(self.compute(body)?)))
    }

    /// Verifies a `sha256=<hex>` header against `body` in constant time.
    pub fn verify(&self, body: &[u8], header: &str) -> AppResult<()> {
        let rejected = || AppError::Unauthorized("webhook signature rejected".to_owned());

        let signature_hex = header.trim().strip_prefix(SIGNATURE_PREFIX).ok_or_else(rejected)?;
        let provided = hex::decode(signature_hex).map_err(|_| rejected())?;
        let expected = self.compute(body)?;

        if bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            Ok(())
        } else {
            Err(rejected())
        }
    }

    fn compute(&self, body: &[u8]) -> AppResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|error| AppError::Internal(format!("invalid webhook key: {error}")))?;
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use tempadmin_core::{AppError, AppResult};

    use super::WebhookSigner;

    const SECRET: &[u8] = b"webhook-secret-webhook-secret-0001";

    #[test]
    fn signature_round_trips_and_detects_tampering() -> AppResult<()> {
        let signer = WebhookSigner::new(SECRET)?;
        let header = signer.sign(br#"{"token":"abc"}"#)?;

        assert!(header.starts_with("sha256="));
        assert!(signer.verify(br#"{"token":"abc"}"#, header.as_str()).is_ok());
        assert!(matches!(
            signer.verify(br#"{"token":"abd"}"#, header.as_str()),
            Err(AppError::Unauthorized(_))
        ));
        Ok(())
    }

    #[test]
    fn malformed_headers_are_rejected() -> AppResult<()> {
        let signer = WebhookSigner::new(SECRET)?;

        assert!(signer.verify(b"{}", "").is_err());
        assert!(signer.verify(b"{}", "sha1=abcdef").is_err());
        assert!(signer.verify(b"{}", "sha256=not-hex").is_err());
        Ok(())
    }
}
