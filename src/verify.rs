//! Out-of-band verification over the backend HTTP API
//!
//! Some UI actions are only trustworthy once the backend reflects them. The
//! verifier reads JSON resources and polls them with the same bounded poller
//! the UI waits use.

use crate::error::Result;
use crate::poll::{poll_until, PollOptions, PollOutcome, Tick};
use reqwest::StatusCode;
use serde_json::Value;

pub struct ApiVerifier {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiVerifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` as JSON. `None` on 404; other error statuses are errors.
    pub async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            log::debug!("GET {} -> 404", path);
            return Ok(None);
        }
        let body = response.error_for_status()?.json::<Value>().await?;
        Ok(Some(body))
    }

    pub async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.get_json(path).await?.is_some())
    }

    /// Poll `path` until its JSON satisfies `predicate`
    pub async fn wait_for_json<F>(
        &self,
        path: &str,
        predicate: F,
        options: &PollOptions,
    ) -> Result<PollOutcome<Value>>
    where
        F: Fn(&Value) -> bool,
    {
        let predicate = &predicate;
        poll_until(options, None, move || async move {
            Ok(Tick::from_option(
                self.get_json(path).await?.filter(|body| predicate(body)),
            ))
        })
        .await
    }

    /// Poll until `path` answers 404, e.g. after deleting through the UI
    pub async fn wait_for_removal(
        &self,
        path: &str,
        options: &PollOptions,
    ) -> Result<PollOutcome<()>> {
        poll_until(options, None, move || async move {
            Ok(Tick::when(!self.exists(path).await?))
        })
        .await
    }
}

/// True if `body` is an array containing an object whose `field` equals `value`
pub fn contains_entry(body: &Value, field: &str, value: &str) -> bool {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .any(|item| item.get(field).and_then(Value::as_str) == Some(value))
        })
        .unwrap_or(false)
}
