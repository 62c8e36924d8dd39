//! # SQLite Vector Index
//!
//! Brute-force cosine search over the `facts` table. Embeddings are stored as
//! JSON arrays, one named collection per document set. Good enough for a
//! local deployment; swap in a dedicated index behind [`VectorIndex`] for
//! anything large.

use async_trait::async_trait;
use rusqlite::params;

use super::error::MemoryError;
use super::facts::{FactDocument, VectorIndex};
use crate::state::db::PetmindDb;

/// Default collection holding breed facts
pub const DEFAULT_COLLECTION: &str = "dog_breeds";

/// SQLite-backed vector index over one collection
pub struct SqliteVectorIndex {
    db: PetmindDb,
    collection: String,
}

impl SqliteVectorIndex {
    /// Create from shared PetmindDb connection
    pub fn new(db: &PetmindDb, collection: impl Into<String>) -> Self {
        Self {
            db: db.clone(),
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store a document with its embedding
    pub async fn add_document(
        &self,
        content: &str,
        embedding: Vec<f32>,
    ) -> Result<i64, MemoryError> {
        if embedding.is_empty() {
            return Err(MemoryError::InvalidArgument(
                "embedding must not be empty".into(),
            ));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(MemoryError::InvalidArgument(
                "embedding must contain only finite values".into(),
            ));
        }
        let collection = self.collection.clone();
        let content = content.to_string();
        let encoded = serde_json::to_string(&embedding)
            .map_err(|e| MemoryError::InvalidArgument(format!("unencodable embedding: {}", e)))?;

        self.db
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO facts (collection, content, embedding) VALUES (?1, ?2, ?3)",
                    params![collection, content, encoded],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Number of documents in this collection
    pub async fn count(&self) -> Result<i64, MemoryError> {
        let collection = self.collection.clone();
        self.db
            .with_connection(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM facts WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<FactDocument>, MemoryError> {
        let collection = self.collection.clone();
        let query = vector.to_vec();

        self.db
            .with_connection(move |conn| {
                let mut stmt = conn
                    .prepare("SELECT id, content, embedding FROM facts WHERE collection = ?1")?;
                let rows = stmt
                    .query_map(params![collection], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut scored = Vec::with_capacity(rows.len());
                for (id, content, raw) in rows {
                    let embedding: Vec<f32> = match serde_json::from_str(&raw) {
                        Ok(embedding) => embedding,
                        Err(e) => {
                            tracing::warn!("Skipping fact {} with bad embedding: {}", id, e);
                            continue;
                        }
                    };
                    scored.push(FactDocument {
                        score: cosine_similarity(&query, &embedding),
                        content,
                    });
                }

                scored.sort_by(|a, b| b.score.total_cmp(&a.score));
                scored.truncate(limit);
                Ok(scored)
            })
            .await
            .map_err(|err| match err {
                MemoryError::Storage { message, .. } => MemoryError::IndexUnavailable(message),
                other => other,
            })
    }
}

/// Cosine similarity; mismatched or zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
