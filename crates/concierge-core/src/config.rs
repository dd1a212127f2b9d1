use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConciergeError, Result};

/// Per-tenant configuration.
///
/// One file per tenant, loaded at registration time and passed down the
/// call chain as a value. Credentials are never written into the process
/// environment; each tenant carries its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantConfig {
    #[serde(default)]
    pub tenant: TenantSection,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub faq: FaqConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub career: CareerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TenantConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TenantConfig = toml::from_str(&content)?;
        info!("Tenant config loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file is missing
    /// or unparseable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load tenant config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Tenant config saved to {}", path.display());
        Ok(())
    }

    /// Check that the tenant can actually serve conversations.
    ///
    /// A failed check disables this tenant only; other tenants keep running.
    pub fn validate(&self) -> Result<()> {
        if self.tenant.client_id.is_empty() {
            return Err(ConciergeError::NotConfigured(
                "client_id is empty".to_string(),
            ));
        }
        if self.provider.api_key.is_empty() {
            return Err(ConciergeError::NotConfigured(format!(
                "{}: provider.api_key is missing",
                self.tenant.client_id
            )));
        }
        if !(0.0..=1.0).contains(&self.faq.threshold) {
            return Err(ConciergeError::Config(format!(
                "faq.threshold must be within 0..=1, got {}",
                self.faq.threshold
            )));
        }
        Ok(())
    }
}

/// Tenant identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantSection {
    /// Stable tenant key used for session storage and routing.
    pub client_id: String,
    /// Human-readable name used in prompts.
    pub display_name: String,
}

/// LLM and embedding endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub embed_model: String,
    /// OpenAI-compatible API base.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            embed_model: "text-embedding-ada-002".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 60,
        }
    }
}

/// FAQ short-circuit matcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqConfig {
    /// Minimum top-match cosine similarity to answer from the cache.
    pub threshold: f32,
    /// How many nearest entries to consider per query.
    pub top_n: usize,
}

impl Default for FaqConfig {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            top_n: 7,
        }
    }
}

/// Retrieval and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chunks retrieved per query.
    pub top_k: usize,
    /// MMR diversity weight; 1.0 means pure relevance.
    pub mmr_lambda: f32,
    /// Whether MMR re-ranking is applied at all.
    pub use_mmr: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            mmr_lambda: 0.25,
            use_mmr: true,
        }
    }
}

/// Career search settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerConfig {
    /// Live listings page to fetch.
    pub listings_url: String,
}

/// Conversation-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Intent classification strategy: "menu" or "llm".
    pub classifier: String,
    /// Menu options surfaced once lead capture completes.
    pub quick_replies: Vec<String>,
    /// Fixed reply when classification cannot route the message.
    pub fallback_message: String,
    /// Fixed reply when a sub-flow fails.
    pub error_message: String,
    /// Maximum inbound message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            classifier: "menu".to_string(),
            quick_replies: vec![
                "Start a project".to_string(),
                "Looking for a job".to_string(),
                "Explore services".to_string(),
            ],
            fallback_message: "Sorry I didn't get that. Could you please repeat it?".to_string(),
            error_message: "Something went wrong on our end. Please try again after a little \
                            while. Apologies for the inconvenience."
                .to_string(),
            max_message_length: 2000,
        }
    }
}

/// Email validation settings.
///
/// Only the syntactic check is mandatory. The resolver check needs outbound
/// network access and is off by default so restricted environments work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub check_domain_resolves: bool,
}

/// Session persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding per-tenant session databases.
    pub session_db_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_db_dir: "data/sessions".to_string(),
        }
    }
}
