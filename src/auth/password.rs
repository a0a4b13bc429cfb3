use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::user::models::UserModel;

type HmacSha256 = Hmac<Sha256>;

/// Generates a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Keyed hash of a plaintext password under the given salt.
/// Returns None if the MAC cannot be keyed; callers treat that as "no match".
pub fn hash_password(salt: &str, plaintext: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes()).ok()?;
    mac.update(plaintext.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Sets a new password on the user: fresh salt, recomputed hash.
/// Callers must reject empty plaintexts before calling; persistence is theirs too.
pub fn set_password(user: &mut UserModel, plaintext: &str) {
    let salt = generate_salt();
    let hashed = hash_password(&salt, plaintext).unwrap_or_default();
    user.salt = salt;
    user.hashed_password = hashed;
}

/// Checks a plaintext against the stored salt + hash by exact equality.
/// Any failure to recompute the hash counts as a mismatch, never an error.
pub fn verify_password(user: &UserModel, plaintext: &str) -> bool {
    if user.salt.is_empty() {
        return false;
    }

    match hash_password(&user.salt, plaintext) {
        Some(hashed) => hashed == user.hashed_password,
        None => false,
    }
}
