use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use hmac::Mac;
use proptest::prelude::*;
use tempadmin_application::ApprovalTokenIssuer;
use tempadmin_core::{AppError, AppResult, TokenError};
use tempadmin_domain::{ApprovalAction, RequestId};

use super::{HmacApprovalTokenIssuer, HmacSha256};
use crate::test_clock::{ManualClock, start_time};

const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

fn issuer_with_clock() -> AppResult<(HmacApprovalTokenIssuer, Arc<ManualClock>)> {
    let clock = Arc::new(ManualClock::new(start_time()));
    let issuer = HmacApprovalTokenIssuer::new(SECRET, Duration::minutes(15), clock.clone())?;
    Ok((issuer, clock))
}

fn token_error(result: AppResult<tempadmin_application::TokenGrant>) -> Option<TokenError> {
    match result {
        Err(AppError::Token(error)) => Some(error),
        _ => None,
    }
}

fn flip_byte(token: &str, index: usize) -> String {
    let mut bytes = URL_SAFE_NO_PAD.decode(token).unwrap_or_default();
    if let Some(byte) = bytes.get_mut(index) {
        *byte ^= 0x01;
    }
    URL_SAFE_NO_PAD.encode(bytes)
}

#[test]
fn short_secret_is_rejected() {
    let clock = Arc::new(ManualClock::new(start_time()));
    let result = HmacApprovalTokenIssuer::new(b"too-short".to_vec(), Duration::minutes(15), clock);
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[test]
fn issued_token_validates_exactly_once() -> AppResult<()> {
    let (issuer, _) = issuer_with_clock()?;
    let request_id = RequestId::new();
    let issued = issuer.issue(request_id, ApprovalAction::Approve)?;

    let grant = issuer.validate(issued.token.as_str())?;
    assert_eq!(grant.request_id, request_id);
    assert_eq!(grant.action, ApprovalAction::Approve);
    assert_eq!(issued.expires_at, start_time() + Duration::minutes(15));

    assert_eq!(
        token_error(issuer.validate(issued.token.as_str())),
        Some(TokenError::AlreadyUsed)
    );
    Ok(())
}

#[test]
fn tampered_payload_or_tag_fails_signature_check() -> AppResult<()> {
    let (issuer, _) = issuer_with_clock()?;
    let issued = issuer.issue(RequestId::new(), ApprovalAction::Deny)?;

    // Byte 0 sits in the request id, byte 60 in the MAC.
    for index in [0, 30, 60] {
        let forged = flip_byte(issued.token.as_str(), index);
        assert_eq!(
            token_error(issuer.validate(forged.as_str())),
            Some(TokenError::SignatureInvalid)
        );
    }

    // The genuine token is still usable after the failed attempts.
    assert!(issuer.validate(issued.token.as_str()).is_ok());
    Ok(())
}

#[test]
fn token_signed_with_another_secret_is_rejected() -> AppResult<()> {
    let clock = Arc::new(ManualClock::new(start_time()));
    let other = HmacApprovalTokenIssuer::new(
        b"ffffffffffffffffffffffffffffffff".to_vec(),
        Duration::minutes(15),
        clock.clone(),
    )?;
    let issuer = HmacApprovalTokenIssuer::new(SECRET, Duration::minutes(15), clock)?;
    let foreign = other.issue(RequestId::new(), ApprovalAction::Approve)?;

    assert_eq!(
        token_error(issuer.validate(foreign.token.as_str())),
        Some(TokenError::SignatureInvalid)
    );
    Ok(())
}

#[test]
fn expired_token_is_rejected_even_if_unused() -> AppResult<()> {
    let (issuer, clock) = issuer_with_clock()?;
    let issued = issuer.issue(RequestId::new(), ApprovalAction::Approve)?;

    clock.advance(Duration::minutes(15));

    assert_eq!(
        token_error(issuer.validate(issued.token.as_str())),
        Some(TokenError::Expired)
    );
    Ok(())
}

#[test]
fn validly_signed_token_from_previous_process_is_unknown() -> AppResult<()> {
    let (before_restart, _) = issuer_with_clock()?;
    let (after_restart, _) = issuer_with_clock()?;
    let issued = before_restart.issue(RequestId::new(), ApprovalAction::Approve)?;

    assert_eq!(
        token_error(after_restart.validate(issued.token.as_str())),
        Some(TokenError::Unknown)
    );
    Ok(())
}

#[test]
fn resigned_token_with_extended_expiry_is_unknown() -> AppResult<()> {
    let (issuer, _) = issuer_with_clock()?;
    let issued = issuer.issue(RequestId::new(), ApprovalAction::Approve)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(issued.token.as_str())
        .map_err(|error| AppError::Internal(error.to_string()))?;
    let mut payload = bytes.get(..41).map(<[u8]>::to_vec).unwrap_or_default();
    let extended = issued.expires_at.timestamp() + 3_600;
    if let Some(expiry) = payload.get_mut(17..25) {
        expiry.copy_from_slice(&extended.to_be_bytes());
    }
    let mut mac = HmacSha256::new_from_slice(SECRET)
        .map_err(|error| AppError::Internal(error.to_string()))?;
    mac.update(&payload);
    payload.extend_from_slice(&mac.finalize().into_bytes());

    assert_eq!(
        token_error(issuer.validate(URL_SAFE_NO_PAD.encode(&payload).as_str())),
        Some(TokenError::Unknown)
    );
    assert!(issuer.validate(issued.token.as_str()).is_ok());
    Ok(())
}

#[test]
fn missing_and_malformed_tokens_are_classified() -> AppResult<()> {
    let (issuer, _) = issuer_with_clock()?;

    assert_eq!(token_error(issuer.validate("")), Some(TokenError::Missing));
    assert_eq!(token_error(issuer.validate("   ")), Some(TokenError::Missing));
    assert_eq!(
        token_error(issuer.validate("not base64 at all!")),
        Some(TokenError::Malformed)
    );
    assert_eq!(
        token_error(issuer.validate(URL_SAFE_NO_PAD.encode([7_u8; 12]).as_str())),
        Some(TokenError::Malformed)
    );
    Ok(())
}

#[test]
fn deciding_invalidates_sibling_token() -> AppResult<()> {
    let (issuer, _) = issuer_with_clock()?;
    let request_id = RequestId::new();
    let approve = issuer.issue(request_id, ApprovalAction::Approve)?;
    let deny = issuer.issue(request_id, ApprovalAction::Deny)?;
    let unrelated = issuer.issue(RequestId::new(), ApprovalAction::Approve)?;

    issuer.validate(approve.token.as_str())?;
    assert_eq!(issuer.invalidate_request(request_id)?, 1);

    assert_eq!(
        token_error(issuer.validate(deny.token.as_str())),
        Some(TokenError::AlreadyUsed)
    );
    assert!(issuer.validate(unrelated.token.as_str()).is_ok());
    Ok(())
}

#[test]
fn sweep_drops_only_expired_entries() -> AppResult<()> {
    let (issuer, clock) = issuer_with_clock()?;
    issuer.issue(RequestId::new(), ApprovalAction::Approve)?;
    issuer.issue(RequestId::new(), ApprovalAction::Deny)?;
    clock.advance(Duration::minutes(10));
    let fresh = issuer.issue(RequestId::new(), ApprovalAction::Approve)?;

    clock.advance(Duration::minutes(6));
    assert_eq!(issuer.sweep_expired()?, 2);
    assert_eq!(issuer.outstanding()?, 1);
    assert!(issuer.validate(fresh.token.as_str()).is_ok());
    Ok(())
}

proptest! {
    #[test]
    fn arbitrary_strings_never_authorize(candidate in "[A-Za-z0-9_-]{0,120}") {
        let clock = Arc::new(ManualClock::new(start_time()));
        let issuer = HmacApprovalTokenIssuer::new(SECRET, Duration::minutes(15), clock);
        prop_assert!(issuer.is_ok());
        if let Ok(issuer) = issuer {
            let issued = issuer.issue(RequestId::new(), ApprovalAction::Approve);
            prop_assert!(issued.is_ok());
            prop_assert!(issuer.validate(candidate.as_str()).is_err());
        }
    }
}
