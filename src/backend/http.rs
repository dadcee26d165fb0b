//! HTTP implementation of [`ChatBackend`]
//!
//! Talks JSON to the answer service with `reqwest`. Every transport failure
//! is mapped into the crate taxonomy here so callers never see raw
//! `reqwest` errors.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::types::{AskRequest, AskResponse, ChatSummary, CreatedChat, ModelMode, StoredMessage};
use super::ChatBackend;
use crate::config::BackendConfig;
use crate::error::{RagChatError, Result};

/// Answer backend reached over HTTP
///
/// # Examples
///
/// ```
/// use ragchat::backend::HttpBackend;
/// use ragchat::config::BackendConfig;
///
/// let backend = HttpBackend::new(&BackendConfig::default()).unwrap();
/// assert_eq!(backend.base_url().as_str(), "http://localhost:8000/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Creates a backend client from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be built
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            RagChatError::Config(format!("Invalid backend URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RagChatError::Config(format!(
                "Backend URL cannot be used as a base: {}",
                config.base_url
            ))
            .into());
        }

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(RagChatError::Http)?;

        tracing::info!(
            "Initialized HTTP backend: base_url={}, timeout={:?}",
            base_url,
            config.timeout_seconds
        );

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RagChatError::Config(format!("Backend URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and returns the response if its status is a success
    ///
    /// A 404 is reported as `NotFound(not_found_id)` when an id is given.
    async fn execute(
        &self,
        request: RequestBuilder,
        not_found_id: Option<&str>,
    ) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("Backend request failed: {}", e);
            RagChatError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = not_found_id {
                return Err(RagChatError::NotFound(id.to_string()).into());
            }
        }
        if !status.is_success() {
            tracing::warn!("Backend returned error status {}", status);
            return Err(RagChatError::Status {
                status: status.as_u16(),
            }
            .into());
        }

        Ok(response)
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            tracing::error!("Failed to parse backend response: {}", e);
            RagChatError::Transport(format!("Invalid response from server: {}", e)).into()
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse> {
        let url = self.endpoint(&["ask"])?;
        tracing::debug!(
            chat_id = %request.chat_id,
            source_mode = %request.source_mode,
            history = request.conversation_history.as_ref().map(Vec::len).unwrap_or(0),
            "POST {}",
            url
        );
        let response = self
            .execute(self.client.post(url).json(request), None)
            .await?;
        Self::json(response).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let url = self.endpoint(&["chats"])?;
        tracing::debug!("GET {}", url);
        let response = self.execute(self.client.get(url), None).await?;
        Self::json(response).await
    }

    async fn create_chat(&self) -> Result<CreatedChat> {
        let url = self.endpoint(&["chats"])?;
        tracing::debug!("POST {}", url);
        let response = self.execute(self.client.post(url), None).await?;
        Self::json(response).await
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<()> {
        let url = self.endpoint(&["chats", chat_id])?;
        tracing::debug!("DELETE {}", url);
        self.execute(self.client.delete(url), Some(chat_id)).await?;
        Ok(())
    }

    async fn chat_messages(&self, chat_id: &str) -> Result<Vec<StoredMessage>> {
        let url = self.endpoint(&["chats", chat_id, "messages"])?;
        tracing::debug!("GET {}", url);
        let response = self.execute(self.client.get(url), Some(chat_id)).await?;
        Self::json(response).await
    }

    async fn model_mode(&self) -> Result<String> {
        let url = self.endpoint(&["model", "mode"])?;
        let response = self.execute(self.client.get(url), None).await?;
        let body: ModelMode = Self::json(response).await?;
        Ok(body.mode)
    }

    async fn set_model_mode(&self, mode: &str) -> Result<String> {
        let url = self.endpoint(&["model", "mode"])?;
        let payload = ModelMode {
            mode: mode.to_string(),
        };
        let response = self
            .execute(self.client.post(url).json(&payload), None)
            .await?;
        let body: ModelMode = Self::json(response).await?;
        Ok(if body.mode.is_empty() {
            payload.mode
        } else {
            body.mode
        })
    }
}
