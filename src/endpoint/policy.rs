use crate::models::{ParamSet, SignatureKind, RESERVED_PARAMS};
use crate::{Error, Result};

const UPLOAD_PARAMS: &[&str] = &[
    "upload_preset",
    "folder",
    "public_id",
    "tags",
    "context",
    "overwrite",
    "invalidate",
];

const DESTROY_PARAMS: &[&str] = &["public_id", "invalidate", "resource_type", "type"];

/// Decides which intent parameters get signed for each request kind.
///
/// Client intent is advisory: keys outside the allow-list are dropped and a
/// fixed preset or folder replaces whatever the client asked for.
#[derive(Debug, Clone)]
pub struct SigningPolicy {
    upload_preset: Option<String>,
    folder: Option<String>,
    upload_params: Vec<String>,
    destroy_params: Vec<String>,
}

impl Default for SigningPolicy {
    fn default() -> Self {
        Self {
            upload_preset: None,
            folder: None,
            upload_params: UPLOAD_PARAMS.iter().map(|s| s.to_string()).collect(),
            destroy_params: DESTROY_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SigningPolicy {
    pub fn with_fixed_upload_preset(mut self, preset: Option<String>) -> Self {
        self.upload_preset = preset.filter(|p| !p.is_empty());
        self
    }

    pub fn with_fixed_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder.filter(|f| !f.is_empty());
        self
    }

    pub fn with_upload_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upload_params = params.into_iter().map(Into::into).collect();
        self
    }

    fn allowed(&self, kind: SignatureKind) -> &[String] {
        match kind {
            SignatureKind::Upload => &self.upload_params,
            SignatureKind::Destroy => &self.destroy_params,
        }
    }

    /// Reduce client intent to the authoritative set of fields to sign.
    /// The result never contains falsy values or reserved keys.
    pub fn apply(&self, kind: SignatureKind, intent: &ParamSet) -> Result<ParamSet> {
        let allowed = self.allowed(kind);

        let mut signed: ParamSet = intent
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .filter(|(key, _)| allowed.iter().any(|a| a == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if kind == SignatureKind::Upload {
            if let Some(preset) = &self.upload_preset {
                signed.insert("upload_preset", preset.as_str());
            }
            if let Some(folder) = &self.folder {
                signed.insert("folder", folder.as_str());
            }
        }

        signed.retain_truthy();

        if kind == SignatureKind::Destroy && !signed.contains_key("public_id") {
            return Err(Error::InvalidIntent(
                "destroy requires a public_id".to_string(),
            ));
        }

        Ok(signed)
    }
}
