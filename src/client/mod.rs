//! Browser-style upload client
//!
//! Requests a signature, then posts a signed multipart upload straight to
//! the provider with progress reporting and a single typed outcome.

pub mod destroy;
pub mod mime;
pub mod mock;
pub mod progress;
pub mod signature;
pub mod uploader;

pub use destroy::{destroy, DestroyOutcome};
pub use mock::MockSignatureSource;
pub use progress::ProgressTracker;
pub use signature::HttpSignatureClient;
pub use uploader::{UploadPayload, UploadState, Uploader};

use crate::models::{ParamSet, ParamValue, SignatureKind, SignedParams};
use crate::{Error, Result};
use async_trait::async_trait;

/// Anything that can turn intent parameters into a signature.
#[async_trait]
pub trait SignatureSource: Send + Sync {
    async fn request_signature(
        &self,
        kind: SignatureKind,
        intent: &ParamSet,
    ) -> Result<SignedParams>;
}

/// Value of the provider's error body, or the raw text when it has none.
pub(crate) fn provider_error_message(body: &str) -> String {
    match serde_json::from_str::<crate::models::ProviderErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.to_string(),
    }
}

/// A request that never got a response carries status 0.
pub(crate) fn transport_failure(e: reqwest::Error) -> Error {
    Error::Transport {
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        message: e.to_string(),
    }
}

/// `signedData` must carry the endpoint's `timestamp`; without it the
/// provider rejects the upload as a signature mismatch.
pub(crate) fn check_signed_params(signed: &SignedParams, status: u16) -> Result<()> {
    if signed.signature.is_empty() {
        return Err(Error::Protocol {
            status,
            message: "Signing response has an empty signature".to_string(),
        });
    }

    match signed.signed_data.get("timestamp") {
        Some(ts @ (ParamValue::Integer(_) | ParamValue::Float(_))) if ts.is_truthy() => Ok(()),
        _ => Err(Error::Protocol {
            status,
            message: "Signing response lacks timestamp".to_string(),
        }),
    }
}
