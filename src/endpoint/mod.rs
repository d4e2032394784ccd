//! Signing endpoint
//!
//! The only holder of the private secret. Applies the signing policy to a
//! caller's intent, mints a fresh `timestamp`, and signs the result.

pub mod policy;
pub mod server;

pub use policy::SigningPolicy;
pub use server::{router, AppState};

use crate::client::SignatureSource;
use crate::models::{ParamSet, SignatureKind, SignedParams, SigningConfig};
use crate::signer;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::fmt;

pub struct SigningEndpoint {
    secret: Option<String>,
    policy: SigningPolicy,
}

impl SigningEndpoint {
    pub fn new(config: SigningConfig) -> Self {
        Self {
            secret: config.api_secret.filter(|s| !s.is_empty()),
            policy: config.policy,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Sign `intent` with a timestamp taken from the current clock.
    pub fn sign_intent(&self, kind: SignatureKind, intent: &ParamSet) -> Result<SignedParams> {
        self.sign_intent_at(kind, intent, Utc::now().timestamp())
    }

    pub fn sign_intent_at(
        &self,
        kind: SignatureKind,
        intent: &ParamSet,
        timestamp: i64,
    ) -> Result<SignedParams> {
        let secret = self
            .secret
            .as_deref()
            .ok_or_else(|| Error::Configuration("signing secret is not configured".to_string()))?;

        let mut signed_data = self.policy.apply(kind, intent)?;
        signed_data.insert("timestamp", timestamp);

        let signature = signer::sign(&signed_data, secret);
        tracing::debug!(
            "Signed {:?} request over {} parameters",
            kind,
            signed_data.len()
        );

        Ok(SignedParams {
            signature,
            signed_data,
        })
    }
}

impl fmt::Debug for SigningEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningEndpoint")
            .field("configured", &self.is_configured())
            .field("policy", &self.policy)
            .finish()
    }
}

/// In-process signing, for server-side callers that hold the secret.
#[async_trait]
impl SignatureSource for SigningEndpoint {
    async fn request_signature(
        &self,
        kind: SignatureKind,
        intent: &ParamSet,
    ) -> Result<SignedParams> {
        self.sign_intent(kind, intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParamValue;
    use pretty_assertions::assert_eq;

    fn endpoint(secret: Option<&str>) -> SigningEndpoint {
        SigningEndpoint::new(SigningConfig {
            api_secret: secret.map(str::to_string),
            policy: SigningPolicy::default()
                .with_fixed_upload_preset(Some("testing".to_string()))
                .with_fixed_folder(Some("sa".to_string())),
        })
    }

    #[test]
    fn test_sign_intent_matches_fixture() {
        let signed = endpoint(Some("topsecret"))
            .sign_intent_at(SignatureKind::Upload, &ParamSet::new(), 1700000000)
            .unwrap();

        assert_eq!(signed.signature, "04338dc6e7c544cb5791f79eeb518dc79cbf6175");
        assert_eq!(
            signed.signed_data,
            ParamSet::new()
                .with("folder", "sa")
                .with("timestamp", 1700000000i64)
                .with("upload_preset", "testing")
        );
    }

    #[test]
    fn test_signature_covers_exactly_signed_data() {
        let signed = endpoint(Some("topsecret"))
            .sign_intent_at(
                SignatureKind::Destroy,
                &ParamSet::new().with("public_id", "dreams/abc"),
                1700000000,
            )
            .unwrap();

        assert_eq!(
            signed.signature,
            signer::sign(&signed.signed_data, "topsecret")
        );
        assert_eq!(signed.signature, "6eb0109269c832d3f9da62ca61927967448bd936");
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        for secret in [None, Some("")] {
            let endpoint = endpoint(secret);
            assert!(!endpoint.is_configured());

            let err = endpoint
                .sign_intent(SignatureKind::Upload, &ParamSet::new())
                .unwrap_err();
            assert!(matches!(err, Error::Configuration(_)));
        }
    }

    #[test]
    fn test_each_call_mints_timestamp() {
        let signed = endpoint(Some("topsecret"))
            .sign_intent(SignatureKind::Upload, &ParamSet::new())
            .unwrap();

        match signed.signed_data.get("timestamp") {
            Some(ParamValue::Integer(ts)) => assert!(*ts > 1_700_000_000),
            other => panic!("unexpected timestamp: {:?}", other),
        }
    }

    #[test]
    fn test_client_timestamp_is_replaced() {
        let signed = endpoint(Some("topsecret"))
            .sign_intent_at(
                SignatureKind::Upload,
                &ParamSet::new().with("timestamp", 42i64),
                1700000000,
            )
            .unwrap();

        assert_eq!(
            signed.signed_data.get("timestamp"),
            Some(&ParamValue::Integer(1700000000))
        );
    }

    #[test]
    fn test_debug_does_not_print_secret() {
        let rendered = format!("{:?}", endpoint(Some("topsecret")));
        assert!(!rendered.contains("topsecret"));
    }

    #[tokio::test]
    async fn test_in_process_signature_source() {
        let endpoint = endpoint(Some("topsecret"));
        let signed = endpoint
            .request_signature(SignatureKind::Upload, &ParamSet::new())
            .await
            .unwrap();
        assert!(signed.signed_data.contains_key("timestamp"));
    }
}
