use super::SignatureSource;
use crate::models::{ParamSet, SignatureKind, SignedParams};
use crate::{signer, Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Signs locally with a fixed secret and timestamp, recording every request.
#[derive(Clone)]
pub struct MockSignatureSource {
    secret: String,
    timestamp: i64,
    extra: ParamSet,
    fail_with_status: Option<u16>,
    requests: Arc<Mutex<Vec<(SignatureKind, ParamSet)>>>,
}

impl MockSignatureSource {
    pub fn new() -> Self {
        Self {
            secret: "mock-secret".to_string(),
            timestamp: 1700000000,
            extra: ParamSet::new(),
            fail_with_status: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Fields the mock adds to every signed set, as a server policy would.
    pub fn with_signed_field(
        mut self,
        key: impl Into<String>,
        value: impl Into<crate::models::ParamValue>,
    ) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn failing_with(mut self, status: u16) -> Self {
        self.fail_with_status = Some(status);
        self
    }

    pub fn get_request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<(SignatureKind, ParamSet)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockSignatureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignatureSource for MockSignatureSource {
    async fn request_signature(
        &self,
        kind: SignatureKind,
        intent: &ParamSet,
    ) -> Result<SignedParams> {
        self.requests.lock().unwrap().push((kind, intent.clone()));

        if let Some(status) = self.fail_with_status {
            return Err(Error::Transport {
                status,
                message: "mock signing failure".to_string(),
            });
        }

        let mut signed_data: ParamSet = intent
            .truthy()
            .chain(self.extra.truthy())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        signed_data.insert("timestamp", self.timestamp);

        Ok(SignedParams {
            signature: signer::sign(&signed_data, &self.secret),
            signed_data,
        })
    }
}
