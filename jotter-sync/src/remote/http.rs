//! HTTP implementation of the remote store.
//!
//! Talks to a plain REST endpoint: `GET/POST {base}/notes` and
//! `GET/PUT/DELETE {base}/notes/{id}`, JSON bodies throughout.

use super::RemoteStore;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use jotter_types::{NoteId, RemoteNote};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for the HTTP remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the notes endpoint.
    pub base_url: String,
    /// Per-request timeout (seconds), enforced at the HTTP client level so
    /// every request the orchestrator issues is bounded.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            timeout_secs: 30,
        }
    }
}

/// REST client for the remote notes store.
pub struct HttpRemote {
    config: RemoteConfig,
    client: Client,
}

impl HttpRemote {
    /// Creates a client with the configured per-request timeout applied.
    #[must_use]
    pub fn new(config: RemoteConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self { config, client }
    }

    fn notes_url(&self) -> String {
        format!("{}/notes", self.config.base_url)
    }

    fn note_url(&self, id: &NoteId) -> String {
        format!("{}/notes/{}", self.config.base_url, id)
    }

    /// Turns a non-success response into `Rejected`, keeping the body as
    /// the message.
    async fn rejected(response: Response) -> SyncError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        SyncError::Rejected { status, message }
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch(&self, id: &NoteId) -> SyncResult<Option<RemoteNote>> {
        debug!("fetching note {id} from remote");

        let response = self
            .client
            .get(self.note_url(id))
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("fetch failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let status = response.status().as_u16();
        let note = response.json::<RemoteNote>().await.map_err(|e| {
            SyncError::Rejected {
                status,
                message: format!("undecodable body: {e}"),
            }
        })?;
        Ok(Some(note))
    }

    async fn create(&self, note: &RemoteNote) -> SyncResult<()> {
        debug!("creating note {} on remote", note.id);

        let response = self
            .client
            .post(self.notes_url())
            .json(note)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("create failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn replace(&self, note: &RemoteNote) -> SyncResult<()> {
        debug!("replacing note {} on remote", note.id);

        let response = self
            .client
            .put(self.note_url(&note.id))
            .json(note)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("replace failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> SyncResult<()> {
        let response = self
            .client
            .delete(self.note_url(id))
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("delete failed: {e}")))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::rejected(response).await);
        }

        info!("deleted note {id} on remote");
        Ok(())
    }

    async fn ping(&self) -> SyncResult<()> {
        self.client
            .head(self.notes_url())
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("ping failed: {e}")))?;
        Ok(())
    }
}
