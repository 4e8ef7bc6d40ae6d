//! Random identifiers for sessions, principals and generated secrets.

use rand::{rngs::OsRng, RngCore};

/// Default token size in bytes (256 bits of entropy).
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate a hex-encoded token from OS entropy.
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/// Generate a hex-encoded token of `bytes` random bytes.
///
/// The output is `2 * bytes` characters from `[0-9a-f]`, so it never contains
/// the `.` separator used by signed session values.
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}
