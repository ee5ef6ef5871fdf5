use async_trait::async_trait;
use reqwest::StatusCode;

use crate::identity::UserId;
use crate::models::payload::CloudPayload;
use crate::sync::remote::{RemoteError, RemoteStore};

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        RemoteError::Transport(e.to_string())
    }
}

/// HTTP-backed remote store: one JSON document per user at
/// `{base}/user-data/{user}`. GET reads the row (404 means no row yet), PUT
/// upserts it. There is no realtime channel here; the scheduler's pull
/// interval covers remote changes.
pub struct RestRemote {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestRemote {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn row_url(&self, user: &UserId) -> String {
        format!(
            "{}/user-data/{}",
            self.base_url.trim_end_matches('/'),
            user.as_str()
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn fetch(&self, user: &UserId) -> Result<Option<CloudPayload>, RemoteError> {
        let response = self
            .authorize(self.http.get(self.row_url(user)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        let raw = response.text().await?;
        if raw.trim().is_empty() || raw.trim() == "null" {
            return Ok(None);
        }
        let payload = serde_json::from_str(&raw)?;
        Ok(Some(payload))
    }

    async fn upsert(&self, user: &UserId, payload: &CloudPayload) -> Result<(), RemoteError> {
        let response = self
            .authorize(self.http.put(self.row_url(user)).json(payload))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
