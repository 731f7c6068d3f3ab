//! HMAC-signed single-use approval tokens.
//!
//! A token is `base64url(payload || HMAC-SHA256(secret, payload))` where the
//! payload packs the request id, the action tag, the expiry in unix seconds
//! and a random nonce. The signature makes forged tokens detectable without
//! a lookup; the in-memory ledger enforces single use.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tempadmin_application::{ApprovalTokenIssuer, Clock, IssuedToken, TokenGrant};
use tempadmin_core::{AppError, AppResult, TokenError};
use tempadmin_domain::{ApprovalAction, RequestId};
use tracing::debug;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;
type Nonce = [u8; NONCE_LEN];

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;

const ID_LEN: usize = 16;
const NONCE_LEN: usize = 16;
const PAYLOAD_LEN: usize = ID_LEN + 1 + 8 + NONCE_LEN;
const MAC_LEN: usize = 32;
const TOKEN_LEN: usize = PAYLOAD_LEN + MAC_LEN;

#[derive(Debug, Clone, Copy)]
struct LedgerEntry {
    request_id: RequestId,
    action: ApprovalAction,
    expires_at: DateTime<Utc>,
    consumed: bool,
}

#[derive(Debug, Default)]
struct TokenLedger {
    entries: HashMap<Nonce, LedgerEntry>,
    expiry_index: BTreeMap<DateTime<Utc>, Vec<Nonce>>,
}

struct DecodedToken {
    request_id: RequestId,
    action: ApprovalAction,
    expires_at: DateTime<Utc>,
    nonce: Nonce,
}

/// Approval token issuer backed by an HMAC secret and a process-local ledger.
pub struct HmacApprovalTokenIssuer {
    secret: Vec<u8>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    ledger: Mutex<TokenLedger>,
}

impl HmacApprovalTokenIssuer {
    /// Creates an issuer; the secret must hold at least [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(
        secret: impl Into<Vec<u8>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AppError::validation(format!(
                "token signing secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if ttl <= Duration::zero() {
            return Err(AppError::validation(
                "approval token lifetime must be positive",
            ));
        }

        Ok(Self {
            secret,
            ttl,
            clock,
            ledger: Mutex::new(TokenLedger::default()),
        })
    }

    /// Validates and consumes a token as of `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> AppResult<TokenGrant> {
        let decoded = self.decode(token)?;
        if now >= decoded.expires_at {
            return Err(TokenError::Expired.into());
        }

        let mut ledger = self.ledger()?;
        let entry = ledger
            .entries
            .get_mut(&decoded.nonce)
            .filter(|entry| {
                entry.request_id == decoded.request_id
                    && entry.action == decoded.action
                    && entry.expires_at == decoded.expires_at
            })
            .ok_or(TokenError::Unknown)?;
        if entry.consumed {
            return Err(TokenError::AlreadyUsed.into());
        }
        entry.consumed = true;

        Ok(TokenGrant {
            request_id: entry.request_id,
            action: entry.action,
        })
    }

    /// Drops every ledger entry whose expiry is at or before `now`.
    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let mut ledger = self.ledger()?;
        let mut removed = 0;

        while let Some(slot) = ledger.expiry_index.first_entry() {
            if *slot.key() > now {
                break;
            }
            for nonce in slot.remove() {
                if ledger.entries.remove(&nonce).is_some() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            debug!(removed, "swept expired approval tokens");
        }
        Ok(removed)
    }

    /// Returns the number of tokens currently tracked.
    pub fn outstanding(&self) -> AppResult<usize> {
        Ok(self.ledger()?.entries.len())
    }

    fn ledger(&self) -> AppResult<MutexGuard<'_, TokenLedger>> {
        self.ledger
            .lock()
            .map_err(|error| AppError::Internal(format!("token ledger lock poisoned: {error}")))
    }

    fn sign(&self, payload: &[u8]) -> AppResult<[u8; MAC_LEN]> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|error| AppError::Internal(format!("invalid token signing key: {error}")))?;
        mac.update(payload);

        let mut tag = [0_u8; MAC_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(tag)
    }

    fn decode(&self, token: &str) -> AppResult<DecodedToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::Missing.into());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed)?;
        if bytes.len() != TOKEN_LEN {
            return Err(TokenError::Malformed.into());
        }
        let (payload, tag) = bytes.split_at(PAYLOAD_LEN);

        let action = ApprovalAction::from_wire_tag(payload[ID_LEN]).ok_or(TokenError::Malformed)?;

        let expected = self.sign(payload)?;
        if !bool::from(expected.as_slice().ct_eq(tag)) {
            return Err(TokenError::SignatureInvalid.into());
        }

        let mut id_bytes = [0_u8; ID_LEN];
        id_bytes.copy_from_slice(&payload[..ID_LEN]);
        let mut expiry_bytes = [0_u8; 8];
        expiry_bytes.copy_from_slice(&payload[ID_LEN + 1..ID_LEN + 9]);
        let mut nonce = [0_u8; NONCE_LEN];
        nonce.copy_from_slice(&payload[ID_LEN + 9..]);

        let expires_at = DateTime::from_timestamp(i64::from_be_bytes(expiry_bytes), 0)
            .ok_or(TokenError::Malformed)?;

        Ok(DecodedToken {
            request_id: RequestId::from_uuid(Uuid::from_bytes(id_bytes)),
            action,
            expires_at,
            nonce,
        })
    }
}

impl ApprovalTokenIssuer for HmacApprovalTokenIssuer {
    fn issue(&self, request_id: RequestId, action: ApprovalAction) -> AppResult<IssuedToken> {
        let now = self.clock.now();
        let expires_at = DateTime::from_timestamp((now + self.ttl).timestamp(), 0)
            .ok_or_else(|| AppError::Internal("approval token expiry out of range".to_owned()))?;

        let mut nonce = [0_u8; NONCE_LEN];
        getrandom::fill(&mut nonce).map_err(|error| {
            AppError::Internal(format!("failed to generate token nonce: {error}"))
        })?;

        let mut payload = Vec::with_capacity(TOKEN_LEN);
        payload.extend_from_slice(request_id.as_uuid().as_bytes());
        payload.push(action.wire_tag());
        payload.extend_from_slice(&expires_at.timestamp().to_be_bytes());
        payload.extend_from_slice(&nonce);
        let tag = self.sign(&payload)?;
        payload.extend_from_slice(&tag);

        let mut ledger = self.ledger()?;
        ledger.entries.insert(
            nonce,
            LedgerEntry {
                request_id,
                action,
                expires_at,
                consumed: false,
            },
        );
        ledger.expiry_index.entry(expires_at).or_default().push(nonce);

        Ok(IssuedToken {
            token: URL_SAFE_NO_PAD.encode(&payload),
            action,
            expires_at,
        })
    }

    fn validate(&self, token: &str) -> AppResult<TokenGrant> {
        self.validate_at(token, self.clock.now())
    }

    fn invalidate_request(&self, request_id: RequestId) -> AppResult<usize> {
        let mut ledger = self.ledger()?;
        let mut invalidated = 0;
        for entry in ledger.entries.values_mut() {
            if entry.request_id == request_id && !entry.consumed {
                entry.consumed = true;
                invalidated += 1;
            }
        }

        Ok(invalidated)
    }

    fn sweep_expired(&self) -> AppResult<usize> {
        self.sweep_expired_at(self.clock.now())
    }
}

#[cfg(test)]
mod tests;
