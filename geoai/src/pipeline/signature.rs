//! Pipeline identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GeoAiError;
use crate::provider::ProviderConfig;

/// Configuration that identifies one pipeline instance.
///
/// Two signatures select the same instance only if every field is equal,
/// including each nested provider field and the full model parameter tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSignature {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    pub model_id: String,
    #[serde(default)]
    pub model_params: Value,
}

impl PipelineSignature {
    pub fn new(provider: ProviderConfig, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
            model_params: Value::Null,
        }
    }

    /// Attaches model parameters, builder style.
    pub fn with_model_params(mut self, params: Value) -> Self {
        self.model_params = params;
        self
    }

    /// Canonical JSON form used as the registry key.
    ///
    /// Object keys serialise in sorted order, so deep-equal signatures give
    /// identical keys regardless of how their maps were built.
    pub fn cache_key(&self) -> Result<String, GeoAiError> {
        let value = serde_json::to_value(self)
            .map_err(|e| GeoAiError::InvalidInput(format!("unserialisable signature: {}", e)))?;
        Ok(value.to_string())
    }
}
