//! Canonical parameter signing
//!
//! Produces the provider's request signature: SHA-1 over the sorted
//! `key=value` tokens of all truthy parameters joined with `&`, with the
//! secret appended directly.

use crate::models::ParamSet;
use sha1::{Digest, Sha1};

/// Build the string that gets hashed. Falsy values are skipped and tokens
/// are sorted byte-wise on their rendered form, not on their keys.
pub fn canonical_string(params: &ParamSet, secret: &str) -> String {
    let mut tokens: Vec<String> = params
        .truthy()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();
    tokens.sort_unstable();

    let mut canonical = tokens.join("&");
    canonical.push_str(secret);
    canonical
}

/// Lowercase hex SHA-1 of the canonical string.
pub fn sign(params: &ParamSet, secret: &str) -> String {
    let digest = Sha1::digest(canonical_string(params, secret).as_bytes());
    hex::encode(digest)
}
