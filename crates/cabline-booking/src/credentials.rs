// SPDX-FileCopyrightText: 2026 Cabline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Password hashing and one-time codes for registration and password reset.
//!
//! Passwords are stored as Argon2id PHC strings with a salt drawn from the
//! system CSPRNG. One-time codes are six decimal digits.

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use cabline_core::CablineError;
use chrono::{DateTime, TimeDelta, Utc};
use rand::Rng;
use ring::rand::{SecureRandom, SystemRandom};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hash a password into a self-describing PHC string.
pub fn hash_password(password: &str) -> Result<String, CablineError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; 16];
    rng.fill(&mut salt)
        .map_err(|_| CablineError::Internal("failed to generate password salt".to_string()))?;
    let salt = SaltString::encode_b64(&salt)
        .map_err(|e| CablineError::Internal(format!("invalid password salt: {e}")))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CablineError::Internal(format!("password hashing failed: {e}")))
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, phc: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// A fresh six-digit code.
pub fn generate_otp() -> String {
    let code: u32 = rand::rngs::OsRng.gen_range(100_000..1_000_000);
    code.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Valid,
    Mismatch,
    Expired,
    /// No code has been issued for this session.
    Missing,
}

/// Compare a typed code with the one issued at `issued_at`.
pub fn check_otp(
    expected: Option<&str>,
    issued_at: Option<DateTime<Utc>>,
    typed: &str,
    now: DateTime<Utc>,
    ttl: TimeDelta,
) -> OtpCheck {
    let (Some(expected), Some(issued_at)) = (expected, issued_at) else {
        return OtpCheck::Missing;
    };
    if now - issued_at > ttl {
        return OtpCheck::Expired;
    }
    let typed: String = typed.chars().filter(|c| !c.is_whitespace()).collect();
    if typed == expected {
        OtpCheck::Valid
    } else {
        OtpCheck::Mismatch
    }
}

/// Loose shape check: one `@`, non-empty local part, dotted domain.
pub fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}
