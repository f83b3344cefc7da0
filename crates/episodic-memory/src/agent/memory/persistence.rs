//! JSON snapshots of a session's memory

use super::conversation::ChatHistory;
use super::episode::EpisodeId;
use super::store::EpisodicStore;
use crate::error::{EpisodicError, EpisodicResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot format version written by this crate
pub const SNAPSHOT_VERSION: u32 = 1;

/// One stored episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Canonical keywords
    pub hrid: String,

    /// Embedding of `hrid`
    pub embedding: Vec<f32>,

    /// Summary, possibly empty
    pub summary: String,
}

impl EpisodeRecord {
    /// Id of the recorded episode
    pub fn id(&self) -> EpisodeId {
        EpisodeId::new(self.hrid.clone(), self.embedding.clone())
    }
}

/// Episodes plus transcript of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Format version
    pub version: u32,

    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,

    /// Session the transcript belongs to
    pub session_id: String,

    /// Stored episodes in insertion order
    pub episodes: Vec<EpisodeRecord>,

    /// Transcript, oldest first
    pub history: ChatHistory,
}

impl MemorySnapshot {
    /// Capture `store` and `history`
    pub async fn capture(
        store: &dyn EpisodicStore,
        history: &ChatHistory,
        session_id: &str,
    ) -> EpisodicResult<Self> {
        let episodes = store
            .entries()
            .await?
            .into_iter()
            .map(|(id, summary)| EpisodeRecord {
                hrid: id.hrid().to_string(),
                embedding: id.embedding().to_vec(),
                summary,
            })
            .collect();

        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            session_id: session_id.to_string(),
            episodes,
            history: history.clone(),
        })
    }

    /// Replace the contents of `store` with the recorded episodes.
    ///
    /// Returns the session id and transcript for the caller to adopt.
    pub async fn apply(self, store: &dyn EpisodicStore) -> EpisodicResult<(String, ChatHistory)> {
        if self.version != SNAPSHOT_VERSION {
            return Err(EpisodicError::validation(
                "version",
                format!("must be {SNAPSHOT_VERSION}"),
                self.version.to_string(),
            ));
        }

        store.clear().await?;
        for record in self.episodes {
            let id = record.id();
            store.set(id, record.summary).await?;
        }
        Ok((self.session_id, self.history))
    }

    /// Write as pretty JSON
    pub async fn write(&self, path: impl AsRef<Path>) -> EpisodicResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        tracing::debug!(path = %path.display(), episodes = self.episodes.len(), "Snapshot written");
        Ok(())
    }

    /// Read a snapshot written by [`MemorySnapshot::write`]
    pub async fn read(path: impl AsRef<Path>) -> EpisodicResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
