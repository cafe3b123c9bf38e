//! Best-effort grammar correction of outgoing queries.

use std::sync::Arc;

use parley_client::{apply_edits, GrammarService};

/// Runs outgoing text through a [`GrammarService`]. Never fails: any
/// service error leaves the text exactly as typed.
#[derive(Clone)]
pub struct TextNormalizer {
    service: Option<Arc<dyn GrammarService>>,
    language: String,
}

impl TextNormalizer {
    pub fn new(service: Arc<dyn GrammarService>, language: impl Into<String>) -> Self {
        Self {
            service: Some(service),
            language: language.into(),
        }
    }

    /// A normalizer that passes everything through untouched.
    pub fn disabled() -> Self {
        Self {
            service: None,
            language: String::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    pub async fn normalize(&self, text: &str) -> String {
        let Some(service) = &self.service else {
            return text.to_string();
        };
        match service.check(text, &self.language).await {
            Ok(edits) => {
                let corrected = apply_edits(text, &edits);
                if corrected != text {
                    tracing::debug!(edits = edits.len(), "Applied grammar corrections");
                }
                corrected
            }
            Err(e) => {
                tracing::warn!(error = %e, "Grammar correction failed, sending text as typed");
                text.to_string()
            }
        }
    }
}
