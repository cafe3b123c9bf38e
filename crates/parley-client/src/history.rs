//! Server-held transcript: load on authentication, append turns, delete all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parley_core::Message;
use reqwest::Client;
use serde::Serialize;

use crate::error::ClientError;
use crate::http::{check_status, endpoint, with_bearer};

/// The transcript REST surface.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch the stored transcript for `user_id`, oldest first.
    async fn load(&self, user_id: &str, token: &str) -> Result<Vec<Message>, ClientError>;

    /// Store one transcript entry.
    async fn append(&self, user_id: &str, message: &Message, token: &str)
        -> Result<(), ClientError>;

    /// Delete the whole stored transcript for `user_id`.
    async fn clear(&self, user_id: &str, token: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest<'a> {
    user_id: &'a str,
    text: String,
    is_user: bool,
    timestamp: DateTime<Utc>,
}

impl<'a> AppendRequest<'a> {
    fn new(user_id: &'a str, message: &Message) -> Self {
        Self {
            user_id,
            text: message.text.to_plain(),
            is_user: message.is_user,
            timestamp: message.timestamp,
        }
    }
}

/// HTTP implementation of [`HistoryStore`].
#[derive(Clone)]
pub struct HttpHistoryClient {
    client: Client,
    base_url: String,
}

impl HttpHistoryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl HistoryStore for HttpHistoryClient {
    async fn load(&self, user_id: &str, token: &str) -> Result<Vec<Message>, ClientError> {
        let url = endpoint(&self.base_url, &format!("chat/{}", user_id));
        let response = with_bearer(self.client.get(&url), token).send().await?;
        let response = check_status(response).await?;
        let messages: Vec<Message> = response.json().await?;
        tracing::debug!(user_id = %user_id, count = messages.len(), "History loaded");
        Ok(messages)
    }

    async fn append(
        &self,
        user_id: &str,
        message: &Message,
        token: &str,
    ) -> Result<(), ClientError> {
        let url = endpoint(&self.base_url, "chat");
        let response = with_bearer(self.client.post(&url), token)
            .json(&AppendRequest::new(user_id, message))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn clear(&self, user_id: &str, token: &str) -> Result<(), ClientError> {
        let url = endpoint(&self.base_url, &format!("chat/{}", user_id));
        let response = with_bearer(self.client.delete(&url), token).send().await?;
        check_status(response).await?;
        tracing::info!(user_id = %user_id, "Server transcript deleted");
        Ok(())
    }
}
