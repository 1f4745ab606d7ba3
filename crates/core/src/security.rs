//! Password hashing for stored user credentials.
//!
//! Hashes are PBKDF2-HMAC-SHA256 with a random 16 byte salt, stored as
//! `pbkdf2-sha256$<iterations>$<salt hex>$<digest hex>`.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
pub const DEFAULT_ITERATIONS: u32 = 100_000;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PasswordHashError {
    #[error("password hash is malformed: {0}")]
    Malformed(&'static str),
    #[error("password must not be empty")]
    EmptyPassword,
}

pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    hash_password_with(password, DEFAULT_ITERATIONS)
}

pub fn hash_password_with(password: &str, iterations: u32) -> Result<String, PasswordHashError> {
    if password.is_empty() {
        return Err(PasswordHashError::EmptyPassword);
    }
    if iterations == 0 {
        return Err(PasswordHashError::Malformed("iterations must be positive"));
    }

    let mut salt = [0_u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = derive(password.as_bytes(), &salt, iterations);

    Ok(format!("{SCHEME}${iterations}${}${}", hex::encode(salt), hex::encode(digest)))
}

/// Returns `Ok(false)` on a wrong password and `Err` only when the stored hash is unusable.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordHashError> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(expected), None) =
        (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(PasswordHashError::Malformed("expected four `$` separated fields"));
    };

    if scheme != SCHEME {
        return Err(PasswordHashError::Malformed("unsupported scheme"));
    }
    let iterations = iterations
        .parse::<u32>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or(PasswordHashError::Malformed("iterations must be a positive integer"))?;
    let salt = hex::decode(salt).map_err(|_| PasswordHashError::Malformed("salt is not hex"))?;
    let expected =
        hex::decode(expected).map_err(|_| PasswordHashError::Malformed("digest is not hex"))?;

    let actual = derive(password.as_bytes(), &salt, iterations);
    Ok(bool::from(actual.as_slice().ct_eq(expected.as_slice())))
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut output = [0_u8; 32];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut output);
    output
}
