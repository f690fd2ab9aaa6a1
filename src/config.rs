//! Configuration for the HTTP collaborators and the geocoding resolver.
//!
//! Every struct has a `Default` and deserializes with missing fields filled
//! from it, so hosts can load a partial config from any serde format.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::polyline::Bounds;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Explicit key, takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Default region bias (ccTLD code).
    pub region: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            api_key: None,
            region: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionsConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            api_key_env: "GOOGLE_MAPS_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// OpenAI-compatible chat endpoint used for optimization and recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            api_key_env: "GOOGLE_GENAI_API_KEY".to_string(),
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on concurrent geocode requests per batch.
    pub max_in_flight: usize,
    /// Viewport bias sent with every lookup.
    pub bias: Option<Bounds>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 8,
            bias: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub geocoder: GeocoderConfig,
    pub directions: DirectionsConfig,
    pub llm: LlmConfig,
    pub resolver: ResolverConfig,
}

/// Explicit key first, then the named environment variable.
pub(crate) fn resolve_api_key(explicit: Option<&str>, env_var: &str) -> Result<String, ProviderError> {
    if let Some(key) = explicit {
        return Ok(key.to_string());
    }
    std::env::var(env_var)
        .ok()
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ProviderError::NotConfigured(format!("set {} env var", env_var)))
}
