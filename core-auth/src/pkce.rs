//! PKCE (RFC 7636) verifier and challenge generation.
//!
//! The verifier never leaves the device except in the final token exchange;
//! only the S256 challenge is sent with the authorization request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::fmt::Write;

const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Generate a code verifier from 32 bytes of OS-seeded randomness.
///
/// The result is URL-safe base64 without padding, 43 characters long.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 challenge: `BASE64URL_NOPAD(SHA256(verifier))`.
///
/// ```
/// use core_auth::pkce::derive_challenge;
///
/// // RFC 7636 appendix B
/// assert_eq!(
///     derive_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
/// );
/// ```
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Random anti-CSRF `state` value, 16 bytes hex-encoded.
pub fn generate_state() -> String {
    let mut bytes = [0u8; STATE_BYTES];
    rand::thread_rng().fill(&mut bytes);
    bytes.iter().fold(String::with_capacity(STATE_BYTES * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}
