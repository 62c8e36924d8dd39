use std::sync::Arc;

use petmind_core::aggregation::{AggregationStrategy, MemoryAggregator, MemorySources};
use petmind_core::config::MemoryConfig;
use petmind_core::memory::{
    ChatHistoryStore, ChatRole, FactsMemorySource, HashingEmbedder, NewProfile,
    SqliteChatHistory, SqliteProfileStore, SqliteVectorIndex, DEFAULT_COLLECTION,
};
use petmind_core::state::{AgentState, MemorySource, PetmindDb};

const BREED_FACTS: &[&str] = &[
    "St. Bernards are historically used for rescue in the Alps.",
    "Poodles need regular grooming.",
    "Greyhounds are sprinters and love short bursts of running.",
];

async fn seeded_db(db: &PetmindDb) {
    let embedder = HashingEmbedder::default();
    let index = SqliteVectorIndex::new(db, DEFAULT_COLLECTION);
    for fact in BREED_FACTS {
        index
            .add_document(fact, embedder.embed_text(fact))
            .await
            .unwrap();
    }

    let chat = SqliteChatHistory::new(db);
    chat.append_exchange("u1", "Hi", "Hello").await.unwrap();

    let profiles = SqliteProfileStore::new(db);
    profiles
        .record(
            "u1",
            &NewProfile {
                category: "Labrador".into(),
                age: 3,
                name: "Buddy".into(),
                descriptor: "energetic".into(),
                timestamp: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_end_to_end_both_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let db = PetmindDb::open_at(dir.path().join("petmind.db")).unwrap();
    seeded_db(&db).await;

    for strategy in [AggregationStrategy::Parallel, AggregationStrategy::Sequential] {
        let config = MemoryConfig {
            strategy,
            facts_k: 1,
            ..Default::default()
        };
        let sources = MemorySources::sqlite(&db, &config).unwrap();
        let aggregator = MemoryAggregator::from_config(sources, &config).unwrap();

        let state = aggregator
            .aggregate(AgentState::new("What breed is good for rescue?", "u1"))
            .await
            .unwrap();

        assert_eq!(state.chat_memory.as_deref(), Some("Human: Hi\nAgent: Hello"));
        let profile = state.profile_memory.as_deref().unwrap();
        assert!(profile.contains("Buddy"));
        assert!(profile.contains("Labrador"));
        assert_eq!(
            state.facts_memory.as_deref(),
            Some("St. Bernards are historically used for rescue in the Alps.")
        );
        assert!(state.unavailable.is_empty());
        assert!(state.answer.is_none());
    }
}

#[tokio::test]
async fn test_new_user_gets_empty_memory() {
    let db = PetmindDb::open_in_memory().unwrap();
    seeded_db(&db).await;

    let config = MemoryConfig::default();
    let aggregator =
        MemoryAggregator::from_config(MemorySources::sqlite(&db, &config).unwrap(), &config)
            .unwrap();

    let state = aggregator
        .aggregate(AgentState::new("Any tips for grooming?", "someone-new"))
        .await
        .unwrap();

    assert_eq!(state.chat_memory.as_deref(), Some(""));
    assert_eq!(state.profile_memory.as_deref(), Some(""));
    assert!(state.facts_memory.unwrap().contains("Poodles"));
}

#[tokio::test]
async fn test_broken_table_degrades_only_its_source() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petmind.db");
    let db = PetmindDb::open_at(&path).unwrap();
    seeded_db(&db).await;
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute("DROP TABLE questionnaire", [])
        .unwrap();

    let sources = MemorySources {
        facts: FactsMemorySource::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(SqliteVectorIndex::new(&db, DEFAULT_COLLECTION)),
        ),
        chat_history: Arc::new(SqliteChatHistory::new(&db)),
        profile: Arc::new(SqliteProfileStore::new(&db)),
    };
    let aggregator = MemoryAggregator::new(sources, AggregationStrategy::Parallel);

    let (state, report) = aggregator
        .aggregate_with_report(AgentState::new("rescue dogs", "u1"))
        .await
        .unwrap();

    assert!(state.is_unavailable(MemorySource::Profile));
    assert_eq!(report.failed_sources(), vec![MemorySource::Profile]);
    assert_eq!(state.chat_memory.as_deref(), Some("Human: Hi\nAgent: Hello"));
}

#[test]
fn test_history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("petmind.db");

    tokio_test::block_on(async {
        let db = PetmindDb::open_at(&path).unwrap();
        let chat = SqliteChatHistory::new(&db);
        chat.append("u1", ChatRole::Human, "Is a Labrador good with kids?")
            .await
            .unwrap();
        chat.append("u1", ChatRole::Agent, "Usually, yes.")
            .await
            .unwrap();
    });

    tokio_test::block_on(async {
        let db = PetmindDb::open_at(&path).unwrap();
        let messages = SqliteChatHistory::new(&db).load("u1").await.unwrap();
        let roles: Vec<ChatRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::Human, ChatRole::Agent]);
        assert_eq!(messages[1].content, "Usually, yes.");
    });
}
