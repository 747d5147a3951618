use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::instrument;

type HmacSha256 = Hmac<Sha256>;

#[instrument(skip(password))]
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

#[instrument(skip(password, hash))]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Compares secrets without leaking their length or the position of the
/// first difference: both sides are MACed under a fresh key and the tags
/// are checked in constant time.
pub fn secrets_match(expected: &str, given: &str) -> bool {
    if expected.is_empty() {
        return false;
    }

    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);

    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(expected.as_bytes());
    let expected_tag = mac.finalize().into_bytes();

    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(given.as_bytes());
    mac.verify_slice(&expected_tag).is_ok()
}
