//! NLU backend client and reply normalization.

use async_trait::async_trait;
use parley_core::{BotReply, Button};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::check_status;

/// The NLU backend.
#[async_trait]
pub trait NluService: Send + Sync {
    /// Send `text` on behalf of `sender` and return the merged reply.
    async fn ask(&self, sender: &str, text: &str) -> Result<BotReply, ClientError>;
}

/// One element of the backend's reply array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NluFragment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub buttons: Option<Vec<Button>>,
}

/// Merge reply fragments into one [`BotReply`].
///
/// Non-empty texts are joined with a line break in arrival order, then split
/// into trimmed display lines. The last image wins. Only the first fragment
/// carries quick replies.
pub fn merge_fragments(fragments: &[NluFragment]) -> BotReply {
    let combined = fragments
        .iter()
        .filter_map(|f| f.text.as_deref())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let lines = if combined.is_empty() {
        Vec::new()
    } else {
        combined.split('\n').map(|l| l.trim().to_string()).collect()
    };

    let image = fragments
        .iter()
        .filter_map(|f| f.image.clone())
        .filter(|i| !i.is_empty())
        .last();

    let buttons = fragments
        .first()
        .and_then(|f| f.buttons.clone())
        .unwrap_or_default();

    BotReply {
        lines,
        buttons,
        image,
    }
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    sender: &'a str,
    message: &'a str,
}

/// HTTP implementation of [`NluService`] posting to a REST webhook.
#[derive(Clone)]
pub struct HttpNluClient {
    client: Client,
    url: String,
}

impl HttpNluClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl NluService for HttpNluClient {
    async fn ask(&self, sender: &str, text: &str) -> Result<BotReply, ClientError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AskRequest {
                sender,
                message: text,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let fragments: Vec<NluFragment> = response.json().await?;
        tracing::debug!(fragments = fragments.len(), "NLU reply received");
        Ok(merge_fragments(&fragments))
    }
}
