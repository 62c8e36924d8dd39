//! # Memory Aggregator
//!
//! Fetches facts, chat history and profile for one request and merges them
//! into an [`AgentState`].
//!
//! A source failure degrades only its own field. The aggregation itself fails
//! when the input is invalid, when every source failed, or when the request
//! timeout expires.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::MemoryConfig;
use crate::memory::{
    render_facts, render_transcript, ChatHistoryStore, FactQuery, FactsMemorySource, MemoryError,
    ProfileStore, SqliteChatHistory, SqliteProfileStore, SqliteVectorIndex,
};
use crate::state::{AgentState, MemorySource, PetmindDb};

use super::pipeline::Pipeline;
use super::report::{AggregationReport, SourceOutcome};
use super::strategy::AggregationStrategy;

/// Default number of fact documents per query
pub const DEFAULT_FACTS_K: i64 = 5;

/// The three injected memory sources
#[derive(Clone)]
pub struct MemorySources {
    pub facts: FactsMemorySource,
    pub chat_history: Arc<dyn ChatHistoryStore>,
    pub profile: Arc<dyn ProfileStore>,
}

impl MemorySources {
    /// SQLite-backed sources sharing one database, with the configured embedder
    pub fn sqlite(db: &PetmindDb, config: &MemoryConfig) -> Result<Self, MemoryError> {
        let embedder = config.embedding.build()?;
        let index = Arc::new(SqliteVectorIndex::new(db, config.collection.clone()));
        Ok(Self {
            facts: FactsMemorySource::new(embedder, index),
            chat_history: Arc::new(SqliteChatHistory::new(db)),
            profile: Arc::new(SqliteProfileStore::new(db)),
        })
    }
}

/// One source that failed, for the aggregate error
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: MemorySource,
    pub error: MemoryError,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

fn summarize(failures: &[SourceFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why an aggregation produced no state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("all memory sources failed: {}", summarize(.0))]
    AllSourcesFailed(Vec<SourceFailure>),
    #[error("aggregation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result of fetching one source
struct Fetched {
    source: MemorySource,
    result: Result<(String, usize), MemoryError>,
    elapsed: Duration,
}

/// Orchestrates the memory sources under one strategy
#[derive(Clone)]
pub struct MemoryAggregator {
    sources: MemorySources,
    strategy: AggregationStrategy,
    facts_k: i64,
    request_timeout: Option<Duration>,
}

impl MemoryAggregator {
    pub fn new(sources: MemorySources, strategy: AggregationStrategy) -> Self {
        Self {
            sources,
            strategy,
            facts_k: DEFAULT_FACTS_K,
            request_timeout: None,
        }
    }

    /// Build with strategy, `k` and timeout taken from a validated config
    pub fn from_config(
        sources: MemorySources,
        config: &MemoryConfig,
    ) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;
        Ok(Self::new(sources, config.strategy)
            .with_facts_k(config.facts_k)
            .with_request_timeout(config.request_timeout()))
    }

    pub fn with_facts_k(mut self, k: i64) -> Self {
        self.facts_k = k;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn strategy(&self) -> AggregationStrategy {
        self.strategy
    }

    /// Populate the three memory fields of `state`
    pub async fn aggregate(&self, state: AgentState) -> Result<AgentState, AggregateError> {
        self.aggregate_with_report(state)
            .await
            .map(|(state, _)| state)
    }

    /// Like [`aggregate`](Self::aggregate), also returning per-source outcomes
    pub async fn aggregate_with_report(
        &self,
        state: AgentState,
    ) -> Result<(AgentState, AggregationReport), AggregateError> {
        state
            .validate()
            .map_err(|e| AggregateError::InvalidArgument(e.to_string()))?;
        if self.facts_k <= 0 {
            return Err(AggregateError::InvalidArgument(format!(
                "facts k must be positive, got {}",
                self.facts_k
            )));
        }

        match self.request_timeout {
            // Dropping the inner future on expiry abandons every in-flight source call.
            Some(limit) => tokio::time::timeout(limit, self.run(state))
                .await
                .map_err(|_| AggregateError::TimedOut(limit))?,
            None => self.run(state).await,
        }
    }

    async fn run(
        &self,
        mut state: AgentState,
    ) -> Result<(AgentState, AggregationReport), AggregateError> {
        let started = Instant::now();
        let mut report = AggregationReport::new(self.strategy);
        let mut failures = Vec::new();

        tracing::debug!(
            "Aggregating memory for user '{}' ({})",
            state.user_id,
            self.strategy
        );

        match self.strategy {
            AggregationStrategy::Parallel => {
                let (facts, chat, profile) = tokio::join!(
                    self.fetch(MemorySource::Facts, &state),
                    self.fetch(MemorySource::ChatHistory, &state),
                    self.fetch(MemorySource::Profile, &state),
                );
                let fetched = [facts, chat, profile];

                if let Some(fatal) = fetched.iter().find_map(fatal_error) {
                    return Err(fatal);
                }
                for outcome in fetched {
                    merge(&mut state, &mut report, &mut failures, outcome);
                }
            }
            AggregationStrategy::Sequential => {
                let mut pipeline = Pipeline::new();
                while let Some(source) = pipeline.stage.source() {
                    let outcome = self.fetch(source, &state).await;
                    if let Some(fatal) = fatal_error(&outcome) {
                        return Err(fatal);
                    }
                    merge(&mut state, &mut report, &mut failures, outcome);
                    pipeline.advance();
                }
            }
        }

        report.elapsed_ms = millis(started.elapsed());

        if failures.len() == MemorySource::all().len() {
            tracing::warn!("Every memory source failed for user '{}'", state.user_id);
            return Err(AggregateError::AllSourcesFailed(failures));
        }

        tracing::debug!(
            "Aggregated memory for user '{}' in {}ms",
            state.user_id,
            report.elapsed_ms
        );
        Ok((state, report))
    }

    /// Fetch and render one source, seeded from the current state
    async fn fetch(&self, source: MemorySource, state: &AgentState) -> Fetched {
        let started = Instant::now();
        let result = match source {
            MemorySource::Facts => {
                let query = match &state.embedded_question {
                    Some(vector) => FactQuery::Vector(vector.clone()),
                    None => FactQuery::Text(state.question.clone()),
                };
                self.sources
                    .facts
                    .search(query, self.facts_k)
                    .await
                    .map(|docs| (render_facts(&docs), docs.len()))
            }
            MemorySource::ChatHistory => self
                .sources
                .chat_history
                .load(&state.user_id)
                .await
                .map(|messages| (render_transcript(&messages), messages.len())),
            MemorySource::Profile => self
                .sources
                .profile
                .latest_summary(&state.user_id)
                .await
                .map(|lines| (lines.join("\n"), lines.len())),
        };

        Fetched {
            source,
            result,
            elapsed: started.elapsed(),
        }
    }
}

fn fatal_error(fetched: &Fetched) -> Option<AggregateError> {
    match &fetched.result {
        Err(err) if err.is_fatal() => Some(AggregateError::InvalidArgument(format!(
            "{}: {}",
            fetched.source, err
        ))),
        _ => None,
    }
}

fn merge(
    state: &mut AgentState,
    report: &mut AggregationReport,
    failures: &mut Vec<SourceFailure>,
    fetched: Fetched,
) {
    let elapsed_ms = millis(fetched.elapsed);
    let outcome = match fetched.result {
        Ok((rendered, items)) => {
            tracing::debug!(
                "Loaded {} {} item(s) in {}ms",
                items,
                fetched.source,
                elapsed_ms
            );
            state.set_memory(fetched.source, rendered);
            SourceOutcome::Loaded { items, elapsed_ms }
        }
        Err(error) => {
            tracing::warn!("{} memory unavailable: {}", fetched.source, error);
            state.mark_unavailable(fetched.source, &error);
            let reason = error.to_string();
            failures.push(SourceFailure {
                source: fetched.source,
                error,
            });
            SourceOutcome::Failed { reason, elapsed_ms }
        }
    };
    report.outcomes.insert(fetched.source, outcome);
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
