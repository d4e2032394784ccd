//! Signed direct uploads to a media CDN
//!
//! A trusted signing endpoint computes a canonical signature over the upload
//! parameters; an untrusted client uses it to post a multipart upload
//! straight to the provider without ever seeing the account secret.

pub mod client;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod signer;

pub use error::{Error, Result};
