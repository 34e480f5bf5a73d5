//! Double-submit CSRF tokens.
//!
//! A [`CsrfSecret`] is generated once per client and kept in a cookie the
//! browser cannot read. Tokens handed to the page are `"{salt}-{tag}"` where
//! `tag = HMAC-SHA256(secret, salt)`. Any number of tokens may be issued from
//! the same secret; each one stays valid for as long as the secret does.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore, distributions::Alphanumeric};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SECRET_LEN: usize = 18;
const SALT_LEN: usize = 8;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    #[error("csrf secret missing")]
    MissingSecret,

    #[error("csrf secret malformed")]
    MalformedSecret,

    #[error("csrf token missing")]
    MissingToken,

    #[error("csrf token malformed")]
    MalformedToken,

    #[error("csrf token does not match secret")]
    Mismatch,
}

/// Per-client signing secret.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfSecret(Vec<u8>);

impl CsrfSecret {
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse the cookie form produced by [`CsrfSecret::encode`].
    pub fn parse(encoded: &str) -> Result<Self, CsrfError> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CsrfError::MissingSecret);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| CsrfError::MalformedSecret)?;
        if bytes.len() != SECRET_LEN {
            return Err(CsrfError::MalformedSecret);
        }

        Ok(Self(bytes))
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    fn sign(&self, salt: &str) -> Result<Vec<u8>, CsrfError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).map_err(|_| CsrfError::MalformedSecret)?;
        mac.update(salt.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl core::fmt::Debug for CsrfSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CsrfSecret(..)")
    }
}

/// Issue a fresh token bound to `secret`.
pub fn issue_token(secret: &CsrfSecret) -> Result<String, CsrfError> {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();

    let tag = URL_SAFE_NO_PAD.encode(secret.sign(&salt)?);
    Ok(format!("{salt}-{tag}"))
}

/// Verify that `token` was issued from `secret`.
pub fn verify_token(secret: &CsrfSecret, token: &str) -> Result<(), CsrfError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CsrfError::MissingToken);
    }

    // Salt is alphanumeric, so the first '-' is the separator even though the
    // base64url tag may itself contain '-'.
    let (salt, tag) = token.split_once('-').ok_or(CsrfError::MalformedToken)?;
    if salt.is_empty() || tag.is_empty() {
        return Err(CsrfError::MalformedToken);
    }

    let provided = URL_SAFE_NO_PAD
        .decode(tag)
        .map_err(|_| CsrfError::MalformedToken)?;
    let expected = secret.sign(salt)?;

    if provided.len() != expected.len() {
        return Err(CsrfError::Mismatch);
    }
    if bool::from(provided.ct_eq(&expected)) {
        Ok(())
    } else {
        tracing::debug!("csrf token tag mismatch");
        Err(CsrfError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let secret = CsrfSecret::generate();
        let token = issue_token(&secret).unwrap();

        assert!(verify_token(&secret, &token).is_ok());
    }

    #[test]
    fn tokens_are_reusable_and_distinct() {
        let secret = CsrfSecret::generate();
        let a = issue_token(&secret).unwrap();
        let b = issue_token(&secret).unwrap();

        assert_ne!(a, b);
        assert!(verify_token(&secret, &a).is_ok());
        assert!(verify_token(&secret, &b).is_ok());
        assert!(verify_token(&secret, &a).is_ok());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let secret = CsrfSecret::generate();
        let other = CsrfSecret::generate();
        let token = issue_token(&other).unwrap();

        assert_eq!(verify_token(&secret, &token), Err(CsrfError::Mismatch));
    }

    #[test]
    fn tampered_salt_is_rejected() {
        let secret = CsrfSecret::generate();
        let token = issue_token(&secret).unwrap();
        let (_, tag) = token.split_once('-').unwrap();
        let forged = format!("AAAAAAAA-{tag}");

        assert_eq!(verify_token(&secret, &forged), Err(CsrfError::Mismatch));
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let secret = CsrfSecret::generate();

        assert_eq!(verify_token(&secret, ""), Err(CsrfError::MissingToken));
        assert_eq!(verify_token(&secret, "nodash"), Err(CsrfError::MalformedToken));
        assert_eq!(verify_token(&secret, "-abc"), Err(CsrfError::MalformedToken));
        assert_eq!(verify_token(&secret, "salt-***"), Err(CsrfError::MalformedToken));
    }

    #[test]
    fn secret_round_trips_through_cookie_form() {
        let secret = CsrfSecret::generate();
        let parsed = CsrfSecret::parse(&secret.encode()).unwrap();

        assert_eq!(parsed, secret);
        assert_eq!(CsrfSecret::parse(""), Err(CsrfError::MissingSecret));
        assert_eq!(CsrfSecret::parse("short"), Err(CsrfError::MalformedSecret));
    }
}
