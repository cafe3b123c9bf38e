use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ParleyError, Result};

/// Top-level configuration for the Parley client.
///
/// Loaded from `~/.parley/config.toml` by default. Every section falls
/// back to its defaults when absent, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub suggestions: SuggestionConfig,
}

impl ParleyConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParleyConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
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
        let content =
            toml::to_string_pretty(self).map_err(|e| ParleyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the persisted session state.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.parley".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl GeneralConfig {
    /// The data directory with a leading `~` expanded to the home directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }
}

/// Base URLs of the external services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Identity REST surface (`/send-otp`, `/verify-otp`, `/user`).
    pub identity_url: String,
    /// Transcript REST surface (`/chat`).
    pub history_url: String,
    /// NLU webhook, posted to directly.
    pub nlu_url: String,
    /// Grammar-correction endpoint, posted to directly.
    pub grammar_url: String,
    /// Per-request timeout applied to every HTTP call.
    pub request_timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            identity_url: "http://localhost:3000/api".to_string(),
            history_url: "http://localhost:3000/api".to_string(),
            nlu_url: "http://localhost:5005/webhooks/rest/webhook".to_string(),
            grammar_url: "https://api.languagetoolplus.com/v2/check".to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Name used in the greeting.
    pub assistant_name: String,
    /// Pass outgoing queries through the grammar-correction service.
    pub grammar_correction: bool,
    /// Language code sent to the grammar-correction service.
    pub grammar_language: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            assistant_name: "SSN College Chatbot".to_string(),
            grammar_correction: true,
            grammar_language: "en-US".to_string(),
        }
    }
}

/// Input suggestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Static topics always offered as completions.
    pub topics: Vec<String>,
    /// Maximum match score (0.0 = exact, 1.0 = anything) for a suggestion.
    pub threshold: f64,
    /// Inputs shorter than this produce no suggestions.
    pub min_input_chars: usize,
    /// Maximum number of suggestions returned.
    pub max_results: usize,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            topics: ["Admissions", "Departments", "Scholarships", "Placements", "Events"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            threshold: 0.4,
            min_input_chars: 2,
            max_results: 5,
        }
    }
}

/// Expand `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") || path.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let rest = path.get(2..).unwrap_or("");
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}
