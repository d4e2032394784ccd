use super::mime::{data_uri_header, detect_mime};
use super::progress::{progress_stream, ProgressCallback};
use super::{provider_error_message, transport_failure, HttpSignatureClient, SignatureSource};
use crate::models::{ClientConfig, SignatureKind, SignedParams, UploadResponse, RESERVED_PARAMS};
use crate::{Error, Result};
use base64::Engine as _;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

type SuccessCallback = Box<dyn FnOnce(&UploadResponse) + Send>;
type ErrorCallback = Box<dyn FnOnce(&Error) + Send>;
type StateCallback = Box<dyn Fn(UploadState) + Send + Sync>;

/// The file sent in the `file` field.
#[derive(Debug, Clone)]
pub enum UploadPayload {
    /// `data:<mime>;base64,<data>`, sent as a plain form field.
    DataUri(String),
    /// Raw bytes, sent as a file part.
    File {
        data: Bytes,
        file_name: String,
        mime: Option<String>,
    },
}

impl UploadPayload {
    pub fn data_uri(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with("data:") || !uri.contains(',') {
            return Err(Error::InvalidPayload(
                "expected a data URI of the form data:<mime>;base64,<data>".to_string(),
            ));
        }
        Ok(UploadPayload::DataUri(uri))
    }

    pub fn data_uri_from_bytes(bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        UploadPayload::DataUri(format!("{}{}", data_uri_header(bytes), encoded))
    }

    pub fn file(data: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        UploadPayload::File {
            data: data.into(),
            file_name: file_name.into(),
            mime: None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            UploadPayload::DataUri(uri) => uri.len(),
            UploadPayload::File { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_part(self, chunk_size: usize, on_progress: Option<ProgressCallback>) -> Result<Part> {
        match self {
            UploadPayload::DataUri(uri) => {
                let data = Bytes::from(uri.into_bytes());
                let len = data.len() as u64;
                let body = Body::wrap_stream(progress_stream(data, chunk_size, on_progress));
                Ok(Part::stream_with_length(body, len))
            }
            UploadPayload::File {
                data,
                file_name,
                mime,
            } => {
                let mime = mime.unwrap_or_else(|| detect_mime(&data).to_string());
                let len = data.len() as u64;
                let body = Body::wrap_stream(progress_stream(data, chunk_size, on_progress));
                Ok(Part::stream_with_length(body, len)
                    .file_name(file_name)
                    .mime_str(&mime)?)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    AwaitingSignature,
    Uploading,
    Succeeded,
    Failed,
}

/// Current state of an attempt plus whoever is watching it.
struct StateMachine {
    state: UploadState,
    observer: Option<StateCallback>,
}

impl StateMachine {
    fn transition(&mut self, next: UploadState) {
        debug!("Upload state {:?} -> {:?}", self.state, next);
        self.state = next;
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }
}

/// One signed upload attempt.
///
/// Observers are optional notifications; the value returned by
/// [`Uploader::start`] is the outcome. Exactly one of the success or error
/// observers fires, and it agrees with the returned result. There is no
/// retry; build a new `Uploader` for another attempt.
pub struct Uploader {
    config: ClientConfig,
    signer: Arc<dyn SignatureSource>,
    http: Client,
    payload: UploadPayload,
    on_progress: Option<ProgressCallback>,
    on_state_change: Option<StateCallback>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl Uploader {
    pub fn new(
        config: ClientConfig,
        signer: Arc<dyn SignatureSource>,
        payload: UploadPayload,
    ) -> Self {
        Self {
            config,
            signer,
            http: Client::new(),
            payload,
            on_progress: None,
            on_state_change: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Sign through the remote endpoint at `config.signature_url`.
    pub fn with_remote_signing(config: ClientConfig, payload: UploadPayload) -> Self {
        let signer = Arc::new(HttpSignatureClient::new(config.signature_url.clone()));
        Self::new(config, signer, payload)
    }

    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Called on every transition out of `Idle`, ending in `Succeeded` or
    /// `Failed`.
    pub fn on_state_change(mut self, callback: impl Fn(UploadState) + Send + Sync + 'static) -> Self {
        self.on_state_change = Some(Box::new(callback));
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&UploadResponse) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnOnce(&Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub async fn start(self) -> Result<UploadResponse> {
        let Uploader {
            config,
            signer,
            http,
            payload,
            on_progress,
            on_state_change,
            on_success,
            on_error,
        } = self;

        let mut machine = StateMachine {
            state: UploadState::Idle,
            observer: on_state_change,
        };

        let outcome = transfer(
            &config,
            signer.as_ref(),
            &http,
            payload,
            on_progress,
            &mut machine,
        )
        .await;

        match &outcome {
            Ok(response) => {
                machine.transition(UploadState::Succeeded);
                info!(
                    "Uploaded {} ({} bytes)",
                    response.public_id,
                    response.bytes.unwrap_or_default()
                );
                if let Some(callback) = on_success {
                    callback(response);
                }
            }
            Err(e) => {
                machine.transition(UploadState::Failed);
                error!("Upload failed: {}", e);
                if let Some(callback) = on_error {
                    callback(e);
                }
            }
        }

        outcome
    }
}

async fn transfer(
    config: &ClientConfig,
    signer: &dyn SignatureSource,
    http: &Client,
    payload: UploadPayload,
    on_progress: Option<ProgressCallback>,
    machine: &mut StateMachine,
) -> Result<UploadResponse> {
    let api_key = config
        .provider
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| Error::Configuration("public API key is not configured".to_string()))?;

    if payload.is_empty() {
        return Err(Error::InvalidPayload("payload is empty".to_string()));
    }

    machine.transition(UploadState::AwaitingSignature);
    let signed = signer
        .request_signature(SignatureKind::Upload, &config.upload_intent())
        .await?;

    machine.transition(UploadState::Uploading);
    let file = payload.into_part(config.chunk_size, on_progress)?;
    let form = signed_form(signed, api_key).part("file", file);

    let url = config.provider.upload_url();
    debug!("Posting signed upload to {}", url);

    let response = http
        .post(&url)
        .header("X-Requested-With", "XMLHttpRequest")
        .multipart(form)
        .send()
        .await
        .map_err(transport_failure)?;

    read_upload_response(response).await
}

/// Every signed field verbatim, plus `signature` and `api_key`. Reserved
/// keys in the signed set are skipped so each field appears once.
pub(crate) fn signed_form(signed: SignedParams, api_key: &str) -> Form {
    let form = signed
        .signed_data
        .iter()
        .filter(|(key, _)| {
            let reserved = *key != "timestamp" && RESERVED_PARAMS.contains(&key.as_str());
            if reserved {
                warn!("Ignoring reserved field {} in signed data", key);
            }
            !reserved
        })
        .fold(Form::new(), |form, (key, value)| {
            form.text(key.clone(), value.to_string())
        });

    form.text("signature", signed.signature)
        .text("api_key", api_key.to_string())
}

async fn read_upload_response(response: reqwest::Response) -> Result<UploadResponse> {
    let status = response.status();
    let body = response.text().await.map_err(transport_failure)?;

    if !status.is_success() {
        let message = provider_error_message(&body);
        error!("Provider upload error (status {}): {}", status, message);
        return Err(Error::Transport {
            status: status.as_u16(),
            message,
        });
    }

    let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| Error::Protocol {
        status: status.as_u16(),
        message: format!("Invalid upload response: {}", e),
    })?;

    if parsed.public_id.is_empty() {
        return Err(Error::Protocol {
            status: status.as_u16(),
            message: "Upload response has an empty public_id".to_string(),
        });
    }

    Ok(parsed)
}
