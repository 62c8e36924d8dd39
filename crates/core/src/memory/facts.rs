//! # Facts Memory Source
//!
//! Semantic fact retrieval: embed the query, ask the vector index for the
//! nearest documents, hand back their content ranked by similarity.
//!
//! ```text
//! FactQuery::Text ──Embedder──► Vec<f32> ──VectorIndex──► Vec<FactDocument>
//! FactQuery::Vector ─────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::MemoryError;

/// Text to vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// Vector to ranked documents
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `limit` documents, most similar first
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<FactDocument>, MemoryError>;
}

/// A retrieved content chunk. Transient; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactDocument {
    pub content: String,
    /// Similarity score, higher is closer
    pub score: f32,
}

/// What to search for
#[derive(Debug, Clone, PartialEq)]
pub enum FactQuery {
    Text(String),
    Vector(Vec<f32>),
}

impl FactQuery {
    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Vector(vector) => vector.is_empty(),
        }
    }
}

impl From<&str> for FactQuery {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FactQuery {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<f32>> for FactQuery {
    fn from(vector: Vec<f32>) -> Self {
        Self::Vector(vector)
    }
}

/// Vector-similarity search over a document collection
#[derive(Clone)]
pub struct FactsMemorySource {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl FactsMemorySource {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Search for up to `k` documents.
    ///
    /// `k <= 0` fails before any backend call; an empty query returns no
    /// documents without embedding anything.
    pub async fn search(
        &self,
        query: impl Into<FactQuery>,
        k: i64,
    ) -> Result<Vec<FactDocument>, MemoryError> {
        if k <= 0 {
            return Err(MemoryError::InvalidArgument(format!(
                "k must be positive, got {}",
                k
            )));
        }
        let query = query.into();
        if query.is_empty() {
            tracing::debug!("Empty facts query, skipping backend");
            return Ok(Vec::new());
        }

        let vector = match query {
            FactQuery::Text(text) => self.embedder.embed(&text).await?,
            FactQuery::Vector(vector) => vector,
        };

        let limit = usize::try_from(k).unwrap_or(usize::MAX);
        let mut documents = self.index.query(&vector, limit).await?;

        // Collaborators are interchangeable; do not trust their ordering.
        documents.sort_by(|a, b| b.score.total_cmp(&a.score));
        documents.truncate(limit);

        tracing::debug!("Retrieved {} fact documents", documents.len());
        Ok(documents)
    }
}

/// Join document contents one per line
pub fn render_facts(documents: &[FactDocument]) -> String {
    documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MemoryError::Embedding("model offline".into()));
            }
            Ok(vec![1.0, 0.0])
        }
    }

    #[derive(Default)]
    struct CountingIndex {
        calls: AtomicUsize,
        down: bool,
    }

    #[async_trait]
    impl VectorIndex for CountingIndex {
        async fn query(
            &self,
            _vector: &[f32],
            limit: usize,
        ) -> Result<Vec<FactDocument>, MemoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down {
                return Err(MemoryError::IndexUnavailable("connection refused".into()));
            }
            let docs = vec![
                FactDocument {
                    content: "Beagles have a keen nose.".into(),
                    score: 0.2,
                },
                FactDocument {
                    content: "St. Bernards are historically used for rescue.".into(),
                    score: 0.9,
                },
                FactDocument {
                    content: "Newfoundlands are strong swimmers.".into(),
                    score: 0.7,
                },
            ];
            Ok(docs.into_iter().take(limit).collect())
        }
    }

    fn source(
        embedder: CountingEmbedder,
        index: CountingIndex,
    ) -> (FactsMemorySource, Arc<CountingEmbedder>, Arc<CountingIndex>) {
        let embedder = Arc::new(embedder);
        let index = Arc::new(index);
        (
            FactsMemorySource::new(embedder.clone(), index.clone()),
            embedder,
            index,
        )
    }

    #[tokio::test]
    async fn test_non_positive_k_fails_without_backend_calls() {
        let (facts, embedder, index) =
            source(CountingEmbedder::default(), CountingIndex::default());

        for k in [0, -1, -50] {
            let err = facts.search("rescue dog", k).await.unwrap_err();
            assert!(matches!(err, MemoryError::InvalidArgument(_)));
        }
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_query_skips_backend() {
        let (facts, embedder, index) =
            source(CountingEmbedder::default(), CountingIndex::default());

        assert!(facts.search("   ", 5).await.unwrap().is_empty());
        assert!(facts.search(Vec::<f32>::new(), 5).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_results_ranked_by_similarity() {
        let (facts, _, _) = source(CountingEmbedder::default(), CountingIndex::default());

        let docs = facts.search("rescue dog", 3).await.unwrap();
        let scores: Vec<f32> = docs.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.2]);
        assert!(render_facts(&docs).starts_with("St. Bernards"));
    }

    #[tokio::test]
    async fn test_vector_query_skips_embedding() {
        let (facts, embedder, index) =
            source(CountingEmbedder::default(), CountingIndex::default());

        let docs = facts.search(vec![0.3_f32, 0.4], 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
        assert_eq!(index.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failures_are_typed() {
        let (facts, _, index) = source(
            CountingEmbedder {
                fail: true,
                ..Default::default()
            },
            CountingIndex::default(),
        );
        assert!(matches!(
            facts.search("rescue", 2).await,
            Err(MemoryError::Embedding(_))
        ));
        assert_eq!(index.calls.load(Ordering::SeqCst), 0);

        let (facts, _, _) = source(
            CountingEmbedder::default(),
            CountingIndex {
                down: true,
                ..Default::default()
            },
        );
        assert!(matches!(
            facts.search("rescue", 2).await,
            Err(MemoryError::IndexUnavailable(_))
        ));
    }
}
