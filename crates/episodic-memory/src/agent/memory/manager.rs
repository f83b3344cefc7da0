//! Conversation memory - the per-turn load/save orchestrator

use super::config::EpisodicMemoryConfig;
use super::conversation::{generate_session_id, render_buffer, ChatHistory};
use super::episode::EpisodeId;
use super::identifier::EpisodeIdentifier;
use super::merger::{EpisodeMerger, MergeOutcome};
use super::persistence::MemorySnapshot;
use super::store::{EpisodicStore, ScoredEpisode};
use super::summarizer::EpisodeSummarizer;
use crate::error::EpisodicResult;
use episodic_llm::{ChatMessage, EmbeddingOracle, LanguageOracle};
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, Span};
use uuid::Uuid;

/// Episodes retrieved for one turn, handed back to [`ConversationMemory::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct RelevantEpisodes {
    owner: Uuid,
    turn: u64,
    entries: Vec<ScoredEpisode>,
}

impl RelevantEpisodes {
    /// Turn that produced this retrieval
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Hits, most similar first
    pub fn entries(&self) -> &[ScoredEpisode] {
        &self.entries
    }

    /// Number of hits
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was retrieved
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Context produced by [`ConversationMemory::load`]
#[derive(Debug, Clone)]
pub struct LoadedMemory {
    /// Trailing `2k` messages
    pub history: Vec<ChatMessage>,

    /// `history` rendered as prefixed lines
    pub history_buffer: String,

    /// Non-empty summaries of the relevant episodes, one per line
    pub episode: String,

    /// Retrieval to pass back to `save`
    pub relevant: RelevantEpisodes,
}

/// What [`ConversationMemory::save`] did
#[derive(Debug, Clone, Default)]
pub struct TurnReport {
    /// Turn the report belongs to
    pub turn: u64,

    /// Episodes whose summary was rewritten
    pub summarized: Vec<EpisodeId>,

    /// Episodes whose summary update failed
    pub failed: Vec<EpisodeId>,

    /// Merge result, when a merge was attempted and did not fail
    pub merge: Option<MergeOutcome>,

    /// The retrieval was stale or already saved; only history was recorded
    pub stale: bool,
}

/// Episodic memory of one conversation session
///
/// `load` is called with the user's input before the host answers, `save`
/// afterwards with the answer. Both take `&mut self`, so one session cannot
/// interleave turns.
pub struct ConversationMemory {
    store: Arc<dyn EpisodicStore>,
    identifier: EpisodeIdentifier,
    summarizer: EpisodeSummarizer,
    merger: EpisodeMerger,
    history: ChatHistory,
    config: EpisodicMemoryConfig,
    session_id: String,
    instance: Uuid,
    turn: u64,
    pending: Option<u64>,
    span: Span,
}

fn session_span(session_id: &str) -> Span {
    tracing::info_span!("conversation_memory", session_id = %session_id)
}

impl ConversationMemory {
    /// Create a session over `store`
    pub fn new(
        llm: Arc<dyn LanguageOracle>,
        embedder: Arc<dyn EmbeddingOracle>,
        store: Arc<dyn EpisodicStore>,
        config: EpisodicMemoryConfig,
    ) -> EpisodicResult<Self> {
        config.validate()?;

        let session_id = generate_session_id();
        let span = session_span(&session_id);

        Ok(Self {
            identifier: EpisodeIdentifier::new(llm.clone(), embedder.clone(), config.clone()),
            summarizer: EpisodeSummarizer::new(llm.clone(), config.clone()),
            merger: EpisodeMerger::new(llm, embedder, store.clone(), config.clone()),
            store,
            history: ChatHistory::new(),
            config,
            session_id,
            instance: Uuid::new_v4(),
            turn: 0,
            pending: None,
            span,
        }
        .with_span_tree())
    }

    /// Use an explicit session id.
    ///
    /// Rebuilds the session span, replacing one set by [`Self::with_span`].
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self.span = session_span(&self.session_id);
        self.with_span_tree()
    }

    /// Emit events inside `span`; components log in child spans of it
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self.with_span_tree()
    }

    fn with_span_tree(mut self) -> Self {
        let parent = self.span.clone();
        self.identifier = self
            .identifier
            .with_span(tracing::info_span!(parent: &parent, "episode_identifier"));
        self.summarizer = self
            .summarizer
            .with_span(tracing::info_span!(parent: &parent, "episode_summarizer"));
        self.merger = self
            .merger
            .with_span(tracing::info_span!(parent: &parent, "episode_merger"));
        self
    }

    /// Retrieve the episodic context for `input`.
    ///
    /// Never fails: when identification or retrieval fails the turn simply
    /// has no relevant episodes.
    pub async fn load(&mut self, input: &str) -> LoadedMemory {
        self.turn += 1;
        self.pending = Some(self.turn);
        let turn = self.turn;

        let history = self.history.trailing(self.config.history_window()).to_vec();
        let history_buffer =
            render_buffer(&history, &self.config.human_prefix, &self.config.ai_prefix);

        let entries = self
            .retrieve(&history, input)
            .instrument(tracing::info_span!(parent: &self.span, "load", turn))
            .await;

        let episode = entries
            .iter()
            .map(|hit| hit.summary.as_str())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        LoadedMemory {
            history,
            history_buffer,
            episode,
            relevant: RelevantEpisodes {
                owner: self.instance,
                turn,
                entries,
            },
        }
    }

    async fn retrieve(&self, history: &[ChatMessage], input: &str) -> Vec<ScoredEpisode> {
        let id = match self.identifier.identify(history, input).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Identification failed, no episodic context this turn");
                return Vec::new();
            }
        };

        match self.store.exists(&id).await {
            Ok(true) => {}
            Ok(false) => {
                if let Err(e) = self.store.set(id.clone(), String::new()).await {
                    tracing::warn!(error = %e, episode = %id.hrid(), "Could not register episode");
                }
            }
            Err(e) => tracing::warn!(error = %e, episode = %id.hrid(), "Store lookup failed"),
        }

        match self.store.get_k_closest(&id, self.config.k).await {
            Ok(hits) => {
                tracing::debug!(
                    episode = %id.hrid(),
                    hits = hits.len(),
                    top_score = hits.first().map(|h| h.score),
                    "Relevant episodes retrieved"
                );
                hits
            }
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed, no episodic context this turn");
                Vec::new()
            }
        }
    }

    /// Record the exchange and fold it into the relevant episodes.
    ///
    /// History is always appended. Summaries and merging only run when
    /// `relevant` comes from the latest `load` of this instance and was not
    /// saved before.
    pub async fn save(
        &mut self,
        relevant: RelevantEpisodes,
        input: &str,
        output: &str,
    ) -> TurnReport {
        let recent = self.history.trailing(self.config.history_window()).to_vec();
        self.history.push_exchange(input, output);

        let mut report = TurnReport {
            turn: relevant.turn,
            ..TurnReport::default()
        };

        if relevant.owner != self.instance || self.pending != Some(relevant.turn) {
            tracing::warn!(
                parent: &self.span,
                turn = relevant.turn,
                current = self.turn,
                foreign = (relevant.owner != self.instance),
                "Stale, foreign or already saved retrieval, episodes not updated"
            );
            report.stale = true;
            return report;
        }
        self.pending = None;

        let span = tracing::info_span!(parent: &self.span, "save", turn = relevant.turn);
        self.fold_in(&relevant, &recent, input, output, &mut report)
            .instrument(span)
            .await;
        report
    }

    async fn fold_in(
        &self,
        relevant: &RelevantEpisodes,
        recent: &[ChatMessage],
        input: &str,
        output: &str,
        report: &mut TurnReport,
    ) {
        let mut jobs = Vec::with_capacity(relevant.len());
        for hit in relevant.entries() {
            if jobs.iter().any(|(id, _): &(EpisodeId, String)| id == &hit.id) {
                continue;
            }
            match self.store.get(&hit.id).await {
                Ok(Some(existing)) => jobs.push((hit.id.clone(), existing)),
                Ok(None) => {
                    tracing::debug!(
                        episode = %hit.id.hrid(),
                        "Episode gone since load, not summarized"
                    );
                }
                Err(e) => {
                    tracing::warn!(error = %e, episode = %hit.id.hrid(), "Store lookup failed");
                    report.failed.push(hit.id.clone());
                }
            }
        }

        for (id, result) in self
            .summarizer
            .update_many(jobs, recent, input, output)
            .await
        {
            let written = match result {
                Ok(summary) => self.store.set(id.clone(), summary).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => report.summarized.push(id),
                Err(e) => {
                    tracing::warn!(error = %e, episode = %id.hrid(), "Summary update failed");
                    report.failed.push(id);
                }
            }
        }

        match self.merger.merge(relevant.entries()).await {
            Ok(outcome) => report.merge = Some(outcome),
            Err(e) => tracing::warn!(error = %e, "Merge aborted, episodes left as they were"),
        }

        tracing::info!(
            summarized = report.summarized.len(),
            failed = report.failed.len(),
            merged = report.merge.as_ref().map(MergeOutcome::is_merged).unwrap_or(false),
            "Turn saved"
        );
    }

    /// Forget the transcript; stored episodes and a pending turn are kept
    pub fn clear(&mut self) {
        self.history.clear();
        tracing::info!(parent: &self.span, "Conversation history cleared");
    }

    /// Episode store
    pub fn store(&self) -> Arc<dyn EpisodicStore> {
        self.store.clone()
    }

    /// Raw transcript
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Configuration
    pub fn config(&self) -> &EpisodicMemoryConfig {
        &self.config
    }

    /// Number of the latest turn started by `load`
    pub fn current_turn(&self) -> u64 {
        self.turn
    }

    /// Capture the store and the transcript
    pub async fn snapshot(&self) -> EpisodicResult<MemorySnapshot> {
        MemorySnapshot::capture(self.store.as_ref(), &self.history, &self.session_id).await
    }

    /// Replace the store contents and the transcript with `snapshot`
    pub async fn restore(&mut self, snapshot: MemorySnapshot) -> EpisodicResult<()> {
        let (session_id, history) = snapshot.apply(self.store.as_ref()).await?;
        self.session_id = session_id;
        self.history = history;
        self.pending = None;
        tracing::info!(
            parent: &self.span,
            session_id = %self.session_id,
            messages = self.history.len(),
            "Memory restored"
        );
        Ok(())
    }

    /// Write a snapshot to `path` as JSON
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> EpisodicResult<()> {
        self.snapshot().await?.write(path).await
    }

    /// Restore from a JSON snapshot at `path`
    pub async fn load_snapshot(&mut self, path: impl AsRef<Path>) -> EpisodicResult<()> {
        let snapshot = MemorySnapshot::read(path).await?;
        self.restore(snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::InMemoryEpisodicStore;
    use super::*;
    use crate::prompts::{IDENTIFY_LABEL, MERGE_LABEL, SUMMARIZE_LABEL};
    use crate::error::EpisodicError;
    use async_trait::async_trait;
    use episodic_llm::testing::{FixedEmbeddings, ScriptedOracle};
    use std::io;

    fn memory(llm: Arc<ScriptedOracle>) -> ConversationMemory {
        ConversationMemory::new(
            llm,
            Arc::new(FixedEmbeddings::new(16)),
            Arc::new(InMemoryEpisodicStore::new()),
            EpisodicMemoryConfig::default(),
        )
        .unwrap()
    }

    fn scripted() -> Arc<ScriptedOracle> {
        Arc::new(ScriptedOracle::new(|req| {
            Ok(match req.label.as_deref() {
                Some(IDENTIFY_LABEL) => "tea, drinks".to_string(),
                Some(SUMMARIZE_LABEL) => "Likes tea.".to_string(),
                _ => String::new(),
            })
        }))
    }

    #[tokio::test]
    async fn test_load_registers_the_episode() {
        let mut mem = memory(scripted());
        let loaded = mem.load("I love tea").await;

        assert_eq!(loaded.relevant.turn(), 1);
        assert_eq!(loaded.relevant.len(), 1);
        assert_eq!(loaded.relevant.entries()[0].id.hrid(), "drinks,tea");
        assert!((loaded.relevant.entries()[0].score - 1.0).abs() < 1e-6);
        assert_eq!(loaded.episode, "");
        assert!(loaded.history.is_empty());
    }

    #[tokio::test]
    async fn test_save_summarizes_and_records_history() {
        let llm = scripted();
        let mut mem = memory(llm.clone());
        let loaded = mem.load("I love tea").await;
        let report = mem.save(loaded.relevant, "I love tea", "Tea is great.").await;

        assert!(!report.stale);
        assert_eq!(report.summarized.len(), 1);
        assert_eq!(report.merge, Some(MergeOutcome::Skipped { candidates: 1 }));
        assert!(llm.calls_labelled(MERGE_LABEL).is_empty());
        assert_eq!(mem.history().len(), 2);

        let next = mem.load("Any tea tips?").await;
        assert_eq!(next.episode, "Likes tea.");
        assert_eq!(next.history_buffer, "Human: I love tea\nAI: Tea is great.");
    }

    #[tokio::test]
    async fn test_saving_twice_only_records_history() {
        let llm = scripted();
        let mut mem = memory(llm.clone());
        let loaded = mem.load("I love tea").await;

        let first = mem.save(loaded.relevant.clone(), "I love tea", "ok").await;
        let second = mem.save(loaded.relevant, "again", "ok").await;

        assert!(!first.stale);
        assert!(second.stale);
        assert_eq!(llm.calls_labelled(SUMMARIZE_LABEL).len(), 1);
        assert_eq!(mem.history().len(), 4);
    }

    #[tokio::test]
    async fn test_identification_failure_degrades() {
        let mut mem = memory(Arc::new(ScriptedOracle::unavailable()));
        let loaded = mem.load("hello").await;
        assert!(loaded.relevant.is_empty());
        assert_eq!(loaded.episode, "");

        let report = mem.save(loaded.relevant, "hello", "hi").await;
        assert!(report.summarized.is_empty());
        assert_eq!(mem.history().len(), 2);
        assert!(mem.store().is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let result = ConversationMemory::new(
            scripted(),
            Arc::new(FixedEmbeddings::new(4)),
            Arc::new(InMemoryEpisodicStore::new()),
            EpisodicMemoryConfig::default().with_k(0),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_session_id() {
        let mem = memory(scripted()).with_session_id("session-1");
        assert_eq!(mem.session_id(), "session-1");
        assert_eq!(mem.current_turn(), 0);
    }

    #[tokio::test]
    async fn test_clear_keeps_the_pending_turn() {
        let llm = scripted();
        let mut mem = memory(llm.clone());
        let loaded = mem.load("I like tea").await;
        mem.clear();

        let report = mem.save(loaded.relevant, "I like tea", "ok").await;
        assert!(!report.stale);
        assert_eq!(report.summarized.len(), 1);
        assert_eq!(llm.calls_labelled(SUMMARIZE_LABEL).len(), 1);
        assert_eq!(mem.history().len(), 2);
    }

    #[tokio::test]
    async fn test_retrieval_from_another_session_is_stale() {
        let llm = scripted();
        let store: Arc<dyn EpisodicStore> = Arc::new(InMemoryEpisodicStore::new());
        let open = || {
            ConversationMemory::new(
                llm.clone(),
                Arc::new(FixedEmbeddings::new(16)),
                store.clone(),
                EpisodicMemoryConfig::default(),
            )
            .unwrap()
        };
        let mut alice = open();
        let mut bob = open();

        let bob_loaded = bob.load("I like tea").await;
        let alice_loaded = alice.load("Tea please").await;
        assert_eq!(bob_loaded.relevant.turn(), alice_loaded.relevant.turn());

        let report = alice.save(bob_loaded.relevant, "Tea please", "ok").await;
        assert!(report.stale);
        assert!(llm.calls_labelled(SUMMARIZE_LABEL).is_empty());

        // the rejected value did not consume alice's own turn
        let report = alice.save(alice_loaded.relevant, "Tea please", "ok").await;
        assert!(!report.stale);
        assert_eq!(llm.calls_labelled(SUMMARIZE_LABEL).len(), 1);
    }

    #[derive(Clone, Default)]
    struct Capture(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_logs_carry_the_explicit_session_id() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let generated = tracing::subscriber::with_default(subscriber, || {
            let mem = memory(scripted());
            let generated = mem.session_id().to_string();
            let mut mem = mem.with_session_id("session-1");
            mem.clear();
            generated
        });

        let logs = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(logs.contains("session_id=session-1"), "{logs}");
        assert!(!logs.contains(&generated), "{logs}");
    }

    struct BrokenStore;

    fn broken(operation: &str) -> EpisodicError {
        EpisodicError::storage(operation, io::Error::new(io::ErrorKind::Other, "disk gone"))
    }

    #[async_trait]
    impl EpisodicStore for BrokenStore {
        async fn get(&self, _id: &EpisodeId) -> EpisodicResult<Option<String>> {
            Err(broken("get"))
        }

        async fn set(&self, _id: EpisodeId, _summary: String) -> EpisodicResult<()> {
            Err(broken("set"))
        }

        async fn exists(&self, _id: &EpisodeId) -> EpisodicResult<bool> {
            Err(broken("exists"))
        }

        async fn delete(&self, _id: &EpisodeId) -> EpisodicResult<bool> {
            Err(broken("delete"))
        }

        async fn get_k_closest(
            &self,
            _query: &EpisodeId,
            _k: usize,
        ) -> EpisodicResult<Vec<ScoredEpisode>> {
            Err(broken("get_k_closest"))
        }

        async fn clear(&self) -> EpisodicResult<()> {
            Err(broken("clear"))
        }

        async fn len(&self) -> EpisodicResult<usize> {
            Err(broken("len"))
        }

        async fn entries(&self) -> EpisodicResult<Vec<(EpisodeId, String)>> {
            Err(broken("entries"))
        }
    }

    #[tokio::test]
    async fn test_failing_store_degrades_to_no_context() {
        let llm = scripted();
        let mut mem = ConversationMemory::new(
            llm.clone(),
            Arc::new(FixedEmbeddings::new(16)),
            Arc::new(BrokenStore),
            EpisodicMemoryConfig::default(),
        )
        .unwrap();

        let loaded = mem.load("I like tea").await;
        assert!(loaded.relevant.is_empty());

        let report = mem.save(loaded.relevant, "I like tea", "ok").await;
        assert!(!report.stale);
        assert!(report.summarized.is_empty());
        assert_eq!(mem.history().len(), 2);

        let err = mem.snapshot().await.unwrap_err();
        assert!(matches!(err, EpisodicError::Storage { .. }));
        assert!(err.to_string().contains("entries"));
    }
}
