//! Application configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file,
//! then environment variables. The result is validated once at startup
//! and passed explicitly to the components that need it.

use crate::core::error::{OdrnaError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default OpenAI-compatible completion endpoint
pub const DEFAULT_LLM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default completion model
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub plan: PlanLimits,
    pub assistant: AssistantConfig,
}

/// Completion collaborator settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key; the assistant degrades to a configuration reply without it
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    /// Upper bound for a single completion round trip
    pub timeout_secs: u64,
    /// Sampling temperature. The assistant is conversational, so the
    /// default sits above the usual "deterministic" range.
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_URL.into(),
            model: DEFAULT_LLM_MODEL.into(),
            timeout_secs: 30,
            temperature: 0.7,
        }
    }
}

/// Local persistence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one JSON document per collection
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".odrna"),
        }
    }
}

/// Hosted store settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Base URL of the hosted REST store
    pub url: Option<String>,
    pub api_key: Option<String>,
    /// Already-authenticated user; sync no-ops without one
    pub user_id: Option<String>,
    /// Upper bound for a single push or pull
    pub timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            api_key: None,
            user_id: None,
            timeout_secs: 10,
        }
    }
}

/// Per-collection record limits of the free plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlanLimits {
    pub tasks: usize,
    pub events: usize,
    pub transactions: usize,
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            tasks: 5,
            events: 5,
            transactions: 5,
        }
    }
}

/// Assistant gating
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Restrict the assistant to premium subscribers
    pub premium_only: bool,
}

impl AppConfig {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without applying environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            OdrnaError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Override values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("LLM_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = non_empty("LLM_API_URL") {
            self.llm.api_url = url;
        }
        if let Some(model) = non_empty("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = non_empty("SUPABASE_URL") {
            self.sync.url = Some(url);
            self.sync.enabled = true;
        }
        if let Some(key) = non_empty("SUPABASE_ANON_KEY") {
            self.sync.api_key = Some(key);
        }
        if let Some(user) = non_empty("ODRNA_USER_ID") {
            self.sync.user_id = Some(user);
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.llm.timeout_secs == 0 || self.sync.timeout_secs == 0 {
            return Err(OdrnaError::Config("timeouts must be positive".into()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(OdrnaError::Config(format!(
                "llm.temperature ({}) must be within 0.0..=2.0",
                self.llm.temperature
            )));
        }

        if self.sync.enabled && (self.sync.url.is_none() || self.sync.api_key.is_none()) {
            return Err(OdrnaError::Config(
                "sync.enabled requires sync.url and sync.api_key".into(),
            ));
        }

        Ok(())
    }

    /// Whether the completion collaborator has a credential
    pub fn llm_configured(&self) -> bool {
        self.llm
            .api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}
