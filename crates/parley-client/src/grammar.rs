//! Grammar-correction service client and edit application.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::ClientError;
use crate::http::check_status;

/// One suggested correction. `offset` and `length` count UTF-16 code
/// units, as the correction service reports them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GrammarEdit {
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replacement {
    pub value: String,
}

impl GrammarEdit {
    pub fn new(offset: usize, length: usize, replacement: &str) -> Self {
        Self {
            offset,
            length,
            replacements: vec![Replacement {
                value: replacement.to_string(),
            }],
        }
    }
}

/// The grammar-correction surface.
#[async_trait]
pub trait GrammarService: Send + Sync {
    async fn check(&self, text: &str, language: &str) -> Result<Vec<GrammarEdit>, ClientError>;
}

/// Apply the first replacement of every edit, last offset first, so that
/// earlier offsets stay valid while later text changes length.
///
/// Edits without replacements, or whose range no longer fits the text or
/// splits a surrogate pair, are skipped.
pub fn apply_edits(text: &str, edits: &[GrammarEdit]) -> String {
    let mut ordered: Vec<&GrammarEdit> = edits.iter().collect();
    ordered.sort_by(|a, b| b.offset.cmp(&a.offset));

    let mut out = text.to_string();
    for edit in ordered {
        let Some(replacement) = edit.replacements.first() else {
            continue;
        };
        let range = edit.offset.checked_add(edit.length).and_then(|end| {
            let start = utf16_to_byte(&out, edit.offset)?;
            let end = utf16_to_byte(&out, end)?;
            Some(start..end)
        });
        let Some(range) = range else {
            tracing::debug!(
                offset = edit.offset,
                length = edit.length,
                "Skipping out-of-range grammar edit"
            );
            continue;
        };
        out.replace_range(range, &replacement.value);
    }
    out
}

/// Byte index of a UTF-16 offset, or `None` past the end or inside a
/// surrogate pair.
fn utf16_to_byte(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for (byte, c) in text.char_indices() {
        if units == offset {
            return Some(byte);
        }
        if units > offset {
            return None;
        }
        units += c.len_utf16();
    }
    (units == offset).then_some(text.len())
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    matches: Vec<GrammarEdit>,
}

/// HTTP implementation of [`GrammarService`] for a LanguageTool-style
/// `/v2/check` endpoint (form-encoded request, JSON response).
#[derive(Clone)]
pub struct HttpGrammarClient {
    client: Client,
    url: String,
}

impl HttpGrammarClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl GrammarService for HttpGrammarClient {
    async fn check(&self, text: &str, language: &str) -> Result<Vec<GrammarEdit>, ClientError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("text", text), ("language", language)])
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: CheckResponse = response.json().await?;
        Ok(parsed.matches)
    }
}
