use super::{check_signed_params, transport_failure, SignatureSource};
use crate::models::{ParamSet, SignatureKind, SignatureRequest, SignedParams};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;

/// Calls a remote `POST /signature` endpoint.
pub struct HttpSignatureClient {
    client: Client,
    url: String,
}

impl HttpSignatureClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::new_with_client(url, Client::new())
    }

    pub fn new_with_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SignatureSource for HttpSignatureClient {
    async fn request_signature(
        &self,
        kind: SignatureKind,
        intent: &ParamSet,
    ) -> Result<SignedParams> {
        let request = SignatureRequest {
            data_to_sign: intent.clone(),
            kind,
        };

        tracing::debug!("Requesting {:?} signature from {}", kind, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to reach signing endpoint: {}", e);
                transport_failure(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(transport_failure)?;

        if !status.is_success() {
            tracing::error!("Signing endpoint error (status {}): {}", status, body);
            return Err(Error::Transport {
                status: status.as_u16(),
                message: format!("Signing failed: {}", body),
            });
        }

        // A misconfigured endpoint may answer with a plain diagnostic string.
        let signed: SignedParams = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Unexpected signing response: {}\nBody: {}", e, body);
            Error::Protocol {
                status: status.as_u16(),
                message: format!("Invalid signing response: {}", e),
            }
        })?;

        check_signed_params(&signed, status.as_u16())?;

        Ok(signed)
    }
}
