//! CLI argument definitions for the Parley client.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use parley_core::ParleyConfig;

/// Parley: a terminal front-end for the college chatbot.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Directory holding the local session file.
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Base URL of the identity and history service.
    #[arg(long = "identity-url")]
    pub identity_url: Option<String>,

    /// NLU webhook URL.
    #[arg(long = "nlu-url")]
    pub nlu_url: Option<String>,

    /// Send queries without grammar correction.
    #[arg(long = "no-grammar")]
    pub no_grammar: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flag overrides on top of a loaded config.
    ///
    /// `--identity-url` moves the history surface too, since both live on
    /// the same server.
    pub fn apply_overrides(&self, config: &mut ParleyConfig) {
        if let Some(ref dir) = self.data_dir {
            config.general.data_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(ref url) = self.identity_url {
            config.endpoints.identity_url = url.clone();
            config.endpoints.history_url = url.clone();
        }
        if let Some(ref url) = self.nlu_url {
            config.endpoints.nlu_url = url.clone();
        }
        if self.no_grammar {
            config.chat.grammar_correction = false;
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
