use serde_json::json;
use sconfig::token::{self, DEFAULT_TTL_SECS};
use sconfig::{sign_token, token_expiration, verify_token, Secret, SconfigError};

const SECRET: &str = "0123456789abcdef0123456789abcdef";
const NOW: i64 = 1_700_000_000_000;

#[test]
fn test_roundtrip_before_expiry() {
    let secret = Secret::from(SECRET);

    for payload in [
        json!("user-42"),
        json!(1234),
        json!(false),
        json!({"user": "alice", "roles": ["admin"]}),
    ] {
        let minted = sign_token(&payload, &secret, DEFAULT_TTL_SECS).unwrap();
        assert!(verify_token(&minted, &payload, &secret), "payload {payload}");
    }
}

#[test]
fn test_expired_at_and_after_expiry_instant() {
    // Goal: a token is invalid from exactly `e` onward.
    let secret = Secret::from(SECRET);
    let payload = json!("session");
    let minted = token::sign_at(&payload, &secret, 60, NOW).unwrap();
    let expiry = token_expiration(&minted).unwrap();
    assert_eq!(expiry, NOW + 60_000);

    assert!(token::verify_at(&minted, &payload, &secret, expiry - 1));
    assert!(!token::verify_at(&minted, &payload, &secret, expiry));
    assert!(!token::verify_at(&minted, &payload, &secret, expiry + 1));
}

#[test]
fn test_single_character_tamper_is_rejected() {
    // Goal: flipping any character of any segment breaks verification.
    let secret = Secret::from(SECRET);
    let payload = json!({"order": 7});
    let minted = token::sign_at(&payload, &secret, 3600, NOW).unwrap();
    assert!(token::verify_at(&minted, &payload, &secret, NOW));

    for (i, original) in minted.char_indices() {
        if original == '.' {
            continue;
        }
        let replacement = if original == 'A' { 'B' } else { 'A' };
        let mut tampered = minted.clone();
        tampered.replace_range(i..i + 1, &replacement.to_string());
        assert!(
            !token::verify_at(&tampered, &payload, &secret, NOW),
            "tampered token accepted at index {i}"
        );
    }
}

#[test]
fn test_wrong_payload_or_secret_is_rejected() {
    let secret = Secret::from(SECRET);
    let minted = sign_token(&json!("a"), &secret, 60).unwrap();

    assert!(!verify_token(&minted, &json!("b"), &secret));
    assert!(!verify_token(
        &minted,
        &json!("a"),
        &Secret::from("fedcba9876543210fedcba9876543210")
    ));
    assert!(!verify_token(&minted, &json!(null), &secret));
}

#[test]
fn test_malformed_tokens_fail_closed() {
    let secret = Secret::from(SECRET);
    let payload = json!("x");

    for bad in ["", "a.b", "a.b.c.d", "!!.??.##", "e30=.e30=.e30="] {
        assert!(!verify_token(bad, &payload, &secret), "accepted {bad:?}");
    }
}

#[test]
fn test_sign_rejects_bad_inputs() {
    assert!(matches!(
        sign_token(&json!("x"), &Secret::from("short"), 60),
        Err(SconfigError::InvalidSecretLength)
    ));
    assert!(matches!(
        sign_token(&json!(null), &Secret::from(SECRET), 60),
        Err(SconfigError::MissingPayload)
    ));
}

#[test]
fn test_expiration_does_not_authenticate() {
    // The header is readable with no secret at all, even when the
    // signature segments are garbage.
    let minted = token::sign_at(&json!("x"), &Secret::from(SECRET), 10, NOW).unwrap();
    let header = minted.split('.').next().unwrap();
    let forged = format!("{header}.forged.forged");

    assert_eq!(token_expiration(&forged), Some(NOW + 10_000));
    assert!(token::expires_at(&forged).is_some());
    assert!(!verify_token(&forged, &json!("x"), &Secret::from(SECRET)));
    assert_eq!(token_expiration("garbage"), None);
}
