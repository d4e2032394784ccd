//! Data models and structures
//!
//! Defines the signable parameter set, the signing endpoint's wire format,
//! the provider's upload response, and runtime configuration.

use crate::endpoint::SigningPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";
const DEFAULT_SIGNATURE_URL: &str = "http://127.0.0.1:3000/signature";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Keys a client may never choose or receive back in a signed set.
/// `timestamp` is minted by the endpoint; the rest are appended to the
/// provider request, not signed.
pub const RESERVED_PARAMS: &[&str] = &["timestamp", "signature", "api_key", "file"];

/// A scalar parameter value. Arrays and objects are not signable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl ParamValue {
    /// Empty text, zero, NaN, `false` and null are falsy and never signed.
    pub fn is_truthy(&self) -> bool {
        match self {
            ParamValue::Text(s) => !s.is_empty(),
            ParamValue::Integer(n) => *n != 0,
            ParamValue::Float(f) => *f != 0.0 && !f.is_nan(),
            ParamValue::Bool(b) => *b,
            ParamValue::Null => false,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Null => f.write_str("null"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Mapping from parameter name to scalar value. Storage order carries no
/// meaning; the signer sorts rendered tokens itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Entries whose value is truthy.
    pub fn truthy(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter().filter(|(_, v)| v.is_truthy())
    }

    pub fn retain_truthy(&mut self) {
        self.0.retain(|_, v| v.is_truthy());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// What the caller intends to do with the signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    #[default]
    Upload,
    Destroy,
}

/// Body of `POST /signature`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    #[serde(default)]
    pub data_to_sign: ParamSet,
    #[serde(default)]
    pub kind: SignatureKind,
}

/// Response of `POST /signature`: the signature and the exact parameters
/// it covers, including the server-minted `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedParams {
    pub signature: String,
    pub signed_data: ParamSet,
}

/// Success body of the provider's upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub public_id: String,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Provider error body: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: ProviderErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ProviderErrorDetail {
    pub message: String,
}

// Configuration

/// Public account settings. Safe to hand to clients.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub cloud_name: String,
    pub api_key: Option<String>,
    pub api_base: String,
}

impl ProviderConfig {
    pub fn new(cloud_name: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/auto/upload", self.api_base, self.cloud_name)
    }

    pub fn destroy_url(&self) -> String {
        format!("{}/v1_1/{}/image/destroy", self.api_base, self.cloud_name)
    }
}

/// Server-only settings. The secret never leaves this struct.
#[derive(Clone, Default)]
pub struct SigningConfig {
    pub api_secret: Option<String>,
    pub policy: SigningPolicy,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("policy", &self.policy)
            .finish()
    }
}

/// Settings for the upload client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub provider: ProviderConfig,
    pub signature_url: String,
    pub upload_preset: Option<String>,
    pub folder: Option<String>,
    pub chunk_size: usize,
}

impl ClientConfig {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            signature_url: DEFAULT_SIGNATURE_URL.to_string(),
            upload_preset: None,
            folder: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Intent parameters for an upload: preset and destination folder.
    pub fn upload_intent(&self) -> ParamSet {
        ParamSet::new()
            .with("upload_preset", self.upload_preset.clone())
            .with("folder", self.folder.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub signing: SigningConfig,
    pub client: ClientConfig,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let cloud_name = non_empty("PUBLIC_CLOUDINARY_NAME").ok_or_else(|| {
            crate::Error::Configuration("PUBLIC_CLOUDINARY_NAME not set".to_string())
        })?;

        let provider = ProviderConfig::new(cloud_name, non_empty("PUBLIC_CLOUDINARY_KEY"))
            .with_api_base(
                non_empty("CLOUDINARY_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            );

        let upload_preset = non_empty("CLOUDINARY_UPLOAD_PRESET");
        let folder = non_empty("CLOUDINARY_FOLDER");

        let signing = SigningConfig {
            api_secret: non_empty("CLOUDINARY_SECRET"),
            policy: SigningPolicy::default()
                .with_fixed_upload_preset(upload_preset.clone())
                .with_fixed_folder(folder.clone()),
        };

        let mut client = ClientConfig::new(provider.clone());
        client.upload_preset = upload_preset;
        client.folder = folder;
        if let Some(url) = non_empty("SIGNATURE_URL") {
            client.signature_url = url;
        }

        Ok(Self {
            provider,
            signing,
            client,
            bind_addr: non_empty("SIGNING_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        })
    }
}
