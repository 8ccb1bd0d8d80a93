//! reqwest-backed [`NotesService`] talking to the tessera notes endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tessera_core::defaults::{CLIENT_BASE_URL, CLIENT_TIMEOUT_SECS};
use tessera_core::{Discussion, Error, Note, NotesPollResponse, Result};

use crate::service::{NotesEndpoints, NotesService};

/// Connection settings for [`HttpNotesService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesClientConfig {
    pub base_url: String,
    /// Personal access token sent as a bearer credential.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for NotesClientConfig {
    fn default() -> Self {
        Self {
            base_url: CLIENT_BASE_URL.to_string(),
            token: None,
            timeout_secs: CLIENT_TIMEOUT_SECS,
        }
    }
}

impl NotesClientConfig {
    /// Load from `TESSERA_URL`, `TESSERA_TOKEN` and `TESSERA_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("TESSERA_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.base_url),
            token: lookup("TESSERA_TOKEN").filter(|v| !v.trim().is_empty()),
            timeout_secs: lookup("TESSERA_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct NoteBody<'a> {
    note: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    discussion_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP implementation of [`NotesService`].
pub struct HttpNotesService {
    client: Client,
    config: NotesClientConfig,
}

impl HttpNotesService {
    pub fn new(config: NotesClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "notes",
            component = "http_service",
            base_url = %config.base_url,
            timeout_secs = config.timeout_secs,
            "Initializing notes HTTP service"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(NotesClientConfig::from_env())
    }

    pub fn config(&self) -> &NotesClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let mut req = self
            .client
            .request(method, &url)
            .header("Accept", "application/json");

        if let Some(ref token) = self.config.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }
        req
    }

    async fn send<T: DeserializeOwned>(&self, op: &str, req: RequestBuilder) -> Result<T> {
        let response = req
            .send()
            .await
            .map_err(|e| Error::Request(format!("{} request failed: {}", op, e)))?;

        let response = error_for_status(response).await?;
        debug!(
            subsystem = "notes",
            component = "http_service",
            op,
            "Request succeeded"
        );

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Serialization(format!("Failed to parse {} response: {}", op, e)))
    }
}

/// Turn a non-2xx response into [`Error::Remote`], preferring the server's
/// `{"error": ...}` message over the raw body.
async fn error_for_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(Error::Remote { status, message })
}

#[async_trait]
impl NotesService for HttpNotesService {
    async fn fetch_discussions(&self, endpoints: &NotesEndpoints) -> Result<Vec<Discussion>> {
        let req = self.request(Method::GET, &endpoints.discussions_path);
        self.send("fetch_discussions", req).await
    }

    async fn update_note(&self, note_id: i64, content: &str) -> Result<Note> {
        let req = self
            .request(Method::PUT, &format!("/notes/{}", note_id))
            .json(&NoteBody {
                note: content,
                discussion_id: None,
            });
        self.send("update_note", req).await
    }

    async fn create_note(
        &self,
        endpoints: &NotesEndpoints,
        content: &str,
        discussion_id: Option<&str>,
    ) -> Result<Discussion> {
        let req = self
            .request(Method::POST, &endpoints.notes_path)
            .json(&NoteBody {
                note: content,
                discussion_id,
            });
        self.send("create_note", req).await
    }

    async fn poll(
        &self,
        endpoints: &NotesEndpoints,
        last_fetched_at: Option<i64>,
    ) -> Result<NotesPollResponse> {
        let mut req = self.request(Method::GET, &endpoints.notes_path);
        if let Some(ts) = last_fetched_at {
            req = req.query(&[("last_fetched_at", ts)]);
        }
        self.send("poll", req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = NotesClientConfig::from_lookup(|_| None);
        assert_eq!(config, NotesClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TESSERA_URL", "https://notes.example.com/"),
            ("TESSERA_TOKEN", "tsr-abc"),
            ("TESSERA_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let config = NotesClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.base_url, "https://notes.example.com/");
        assert_eq!(config.token.as_deref(), Some("tsr-abc"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_config_ignores_blank_token_and_bad_timeout() {
        let config = NotesClientConfig::from_lookup(|k| match k {
            "TESSERA_TOKEN" => Some("  ".to_string()),
            "TESSERA_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert!(config.token.is_none());
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_note_body_omits_missing_discussion() {
        let body = serde_json::to_value(NoteBody {
            note: "hi",
            discussion_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "note": "hi" }));
    }
}
