use episodic_llm::testing::{FixedEmbeddings, ScriptedOracle};
use episodic_memory::agent::memory::{describe_store, pairwise_similarities};
use episodic_memory::prompts::{IDENTIFY_LABEL, MERGE_LABEL, SUMMARIZE_LABEL};
use episodic_memory::{
    ConversationMemory, EpisodicMemoryConfig, EpisodicStore, InMemoryEpisodicStore, MergeOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const FRANCISCO_KEYWORDS: &str = "greeting, human, introduction, name, meeting, ai, chat";
const FRANCISCO_HRID: &str = "ai,chat,greeting,human,introduction,meeting,name";

fn session(
    llm: Arc<ScriptedOracle>,
    embeddings: FixedEmbeddings,
    store: Arc<InMemoryEpisodicStore>,
) -> ConversationMemory {
    ConversationMemory::new(llm, Arc::new(embeddings), store, EpisodicMemoryConfig::default())
        .unwrap()
}

/// Oracle answering identification with `keywords[n]` on the n-th turn
fn turn_oracle(keywords: Vec<&'static str>, merge_reply: &'static str) -> Arc<ScriptedOracle> {
    let turn = AtomicUsize::new(0);
    Arc::new(ScriptedOracle::new(move |req| {
        Ok(match req.label.as_deref() {
            Some(IDENTIFY_LABEL) => {
                let n = turn.fetch_add(1, Ordering::SeqCst);
                keywords[n.min(keywords.len() - 1)].to_string()
            }
            Some(SUMMARIZE_LABEL) => {
                let prompt = req.last_content();
                if prompt.contains("(tea)") {
                    "Likes green tea.".to_string()
                } else if prompt.contains("(drinks,tea)") {
                    "Drinks tea every morning.".to_string()
                } else {
                    "Talked about something.".to_string()
                }
            }
            Some(MERGE_LABEL) => merge_reply.to_string(),
            _ => String::new(),
        })
    }))
}

fn drink_embeddings() -> FixedEmbeddings {
    FixedEmbeddings::new(3)
        .with("tea", vec![1.0, 0.0, 0.0])
        .with("drinks,tea", vec![0.99, 0.1, 0.0])
        .with("beverages,tea", vec![0.0, 0.0, 1.0])
        .with("weather", vec![0.0, 1.0, 0.0])
}

#[tokio::test]
async fn francisco_introduces_himself() {
    let llm = Arc::new(ScriptedOracle::new(|req| {
        Ok(match req.label.as_deref() {
            Some(IDENTIFY_LABEL) => FRANCISCO_KEYWORDS.to_string(),
            Some(SUMMARIZE_LABEL) => "The human introduced himself as Francisco.".to_string(),
            _ => String::new(),
        })
    }));
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm, FixedEmbeddings::new(16), store.clone());

    let loaded = memory.load("Hi! I'm Francisco").await;
    let entries = store.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.hrid(), FRANCISCO_HRID);
    assert_eq!(entries[0].1, "");
    assert_eq!(loaded.relevant.entries()[0].id, entries[0].0);

    let report = memory
        .save(loaded.relevant, "Hi! I'm Francisco", "Hello Francisco, nice to meet you!")
        .await;
    assert_eq!(report.summarized.len(), 1);

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].1.contains("Francisco"));
}

#[tokio::test]
async fn query_episode_ranks_first_with_full_similarity() {
    let llm = turn_oracle(vec!["weather", "tea"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm, drink_embeddings(), store);

    let first = memory.load("Nice weather today").await;
    memory.save(first.relevant, "Nice weather today", "Indeed.").await;

    let loaded = memory.load("I had tea").await;
    let hits = loaded.relevant.entries();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id.hrid(), "tea");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!(hits[1].score.abs() < 1e-6);
}

#[tokio::test]
async fn converging_episodes_are_merged() {
    let llm = turn_oracle(
        vec!["tea", "tea, drinks"],
        r#"Sure! {"summary": "Likes green tea and drinks it every morning.", "categories": "tea, beverages"}"#,
    );
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm.clone(), drink_embeddings(), store.clone());

    let first = memory.load("I like green tea").await;
    let report = memory.save(first.relevant, "I like green tea", "Nice.").await;
    assert_eq!(report.merge, Some(MergeOutcome::Skipped { candidates: 1 }));

    let second = memory.load("I drink it every morning").await;
    assert_eq!(second.relevant.len(), 2);
    assert_eq!(second.episode, "Likes green tea.");

    let report = memory
        .save(second.relevant, "I drink it every morning", "Good habit.")
        .await;
    let Some(MergeOutcome::Merged { merged_into, retired }) = report.merge.clone() else {
        panic!("expected a merge, got {:?}", report.merge);
    };
    assert_eq!(merged_into.hrid(), "beverages,tea");
    assert_eq!(retired.len(), 2);

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, "Likes green tea and drinks it every morning.");

    let merge_prompt = llm.calls_labelled(MERGE_LABEL)[0].last_content().to_string();
    assert!(merge_prompt.contains("Drinks tea every morning.\n\nLikes green tea."));
}

#[tokio::test]
async fn malformed_merge_reply_keeps_every_episode() {
    let llm = turn_oracle(vec!["tea", "tea, drinks"], "I am not sure how to merge these.");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm, drink_embeddings(), store.clone());

    let first = memory.load("I like green tea").await;
    memory.save(first.relevant, "I like green tea", "Nice.").await;
    let second = memory.load("I drink it every morning").await;
    let report = memory
        .save(second.relevant, "I drink it every morning", "Good habit.")
        .await;

    assert!(report.merge.is_none());
    assert_eq!(report.summarized.len(), 2);
    assert_eq!(store.len().await.unwrap(), 2);
}

#[tokio::test]
async fn unrelated_episodes_are_not_merged() {
    let llm = turn_oracle(vec!["weather", "tea"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm.clone(), drink_embeddings(), store.clone());

    for input in ["Nice weather today", "I had tea"] {
        let loaded = memory.load(input).await;
        let report = memory.save(loaded.relevant, input, "ok").await;
        assert_eq!(report.merge, Some(MergeOutcome::Skipped { candidates: 1 }));
    }
    assert_eq!(store.len().await.unwrap(), 2);
    assert!(llm.calls_labelled(MERGE_LABEL).is_empty());
}

#[tokio::test]
async fn stale_retrieval_is_not_summarized() {
    let llm = turn_oracle(vec!["tea"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm.clone(), drink_embeddings(), store.clone());

    let abandoned = memory.load("I like tea").await;
    let current = memory.load("I like tea a lot").await;

    let report = memory.save(abandoned.relevant, "I like tea", "ok").await;
    assert!(report.stale);
    assert!(llm.calls_labelled(SUMMARIZE_LABEL).is_empty());
    assert_eq!(memory.history().len(), 2);

    let report = memory.save(current.relevant, "I like tea a lot", "ok").await;
    assert!(!report.stale);
    assert_eq!(llm.calls_labelled(SUMMARIZE_LABEL).len(), 1);
}

#[tokio::test]
async fn clear_forgets_history_but_not_episodes() {
    let llm = turn_oracle(vec!["tea"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm, drink_embeddings(), store.clone());

    let loaded = memory.load("I like tea").await;
    memory.save(loaded.relevant, "I like tea", "ok").await;
    memory.clear();

    assert!(memory.history().is_empty());
    assert_eq!(store.len().await.unwrap(), 1);

    let loaded = memory.load("More tea?").await;
    assert_eq!(loaded.episode, "Likes green tea.");
    assert!(loaded.history.is_empty());
}

#[tokio::test]
async fn snapshot_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let llm = turn_oracle(vec!["weather", "tea"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm.clone(), drink_embeddings(), store.clone());
    for input in ["Nice weather today", "I had tea"] {
        let loaded = memory.load(input).await;
        memory.save(loaded.relevant, input, "ok").await;
    }
    memory.save_snapshot(&path).await.unwrap();

    let restored_store = Arc::new(InMemoryEpisodicStore::new());
    let mut restored = session(llm, drink_embeddings(), restored_store.clone());
    restored.load_snapshot(&path).await.unwrap();

    assert_eq!(restored.session_id(), memory.session_id());
    assert_eq!(restored.history(), memory.history());
    assert_eq!(
        restored_store.entries().await.unwrap(),
        store.entries().await.unwrap()
    );
    assert_eq!(
        describe_store(restored_store.as_ref()).await.unwrap(),
        describe_store(store.as_ref()).await.unwrap()
    );
}

#[tokio::test]
async fn pairwise_diagnostics_cover_every_pair() {
    let llm = turn_oracle(vec!["weather", "tea", "tea, drinks"], "");
    let store = Arc::new(InMemoryEpisodicStore::new());
    let mut memory = session(llm, drink_embeddings(), store.clone());
    for input in ["sunny", "tea", "more tea"] {
        memory.load(input).await;
    }

    let ids: Vec<_> = store
        .entries()
        .await
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    let pairs = pairwise_similarities(&ids);
    assert_eq!(pairs.len(), 3);

    let close = pairs
        .iter()
        .find(|(a, b, _)| a.hrid() == "tea" && b.hrid() == "drinks,tea")
        .unwrap();
    assert!(close.2 > 0.9);
}
