//! Signed tokens for the identity-verification callback URL.
//!
//! The provider's hosted flow redirects the person back to this service with
//! an inspection ID in the query string. That pull path would otherwise be
//! unauthenticated, so registration embeds a short-lived HMAC token bound to
//! the user and an expiry; the callback handler verifies it before trusting
//! anything else in the request.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a callback token fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The expiry timestamp has passed.
    Expired,
    /// The token does not match the subject and expiry.
    Mismatch,
}

/// Mints a callback token bound to a subject and expiry.
///
/// `expires_at` is a unix timestamp in seconds; the token is the lowercase
/// hex HMAC-SHA256 of `"{subject}.{expires_at}"`.
pub fn mint_token(secret: &str, subject: &str, expires_at: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(format!("{subject}.{expires_at}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a callback token against its subject, expiry, and the clock.
///
/// Expiry is checked first so an expired-but-otherwise-valid token reports
/// `Expired`; the HMAC comparison is constant-time.
///
/// # Errors
///
/// Returns `TokenError::Expired` or `TokenError::Mismatch`.
pub fn verify_token(
    secret: &str,
    subject: &str,
    expires_at: i64,
    token: &str,
    now: i64,
) -> Result<(), TokenError> {
    if now >= expires_at {
        return Err(TokenError::Expired);
    }

    let expected = mint_token(secret, subject, expires_at);
    if timing_safe_eq(token, &expected) {
        Ok(())
    } else {
        Err(TokenError::Mismatch)
    }
}

/// Constant-time string comparison.
fn timing_safe_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (a_byte, b_byte) in a.as_bytes().iter().zip(b.as_bytes()) {
        result |= a_byte ^ b_byte;
    }

    result == 0
}
