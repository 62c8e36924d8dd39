//! # Profile Store
//!
//! Latest questionnaire answers about the user's pet. Older rows stay in the
//! table for audit; only the newest one per user is ever surfaced.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::error::MemoryError;
use crate::state::db::{decode_timestamp, encode_timestamp, PetmindDb};

/// A stored questionnaire row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: i64,
    /// Breed or other category of the subject
    pub category: String,
    pub age: i64,
    pub name: String,
    /// Free-text description (temperament)
    pub descriptor: String,
    pub timestamp: DateTime<Utc>,
}

impl ProfileRecord {
    /// Human-readable one-line summary
    pub fn summary(&self, user_id: &str) -> String {
        format!(
            "{} has a {}-year-old {} named {}, described as {}.",
            user_id, self.age, self.category, self.name, self.descriptor
        )
    }
}

/// Questionnaire answers to record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub category: String,
    pub age: i64,
    pub name: String,
    #[serde(default)]
    pub descriptor: String,
    /// Defaults to now
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Read access to profile summaries
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Most recent record for a user, if any
    async fn latest_record(&self, user_id: &str) -> Result<Option<ProfileRecord>, MemoryError>;

    /// Zero or one summary line. An empty vec means "no profile", not a failure.
    async fn latest_summary(&self, user_id: &str) -> Result<Vec<String>, MemoryError> {
        Ok(self
            .latest_record(user_id)
            .await?
            .map(|record| record.summary(user_id))
            .into_iter()
            .collect())
    }
}

/// SQLite-backed profile store over the `questionnaire` table
pub struct SqliteProfileStore {
    db: PetmindDb,
}

impl SqliteProfileStore {
    /// Create from shared PetmindDb connection
    pub fn new(db: &PetmindDb) -> Self {
        Self {
            db: db.clone(),
        }
    }

    /// Insert a questionnaire row (intake flows and seeding)
    pub async fn record(
        &self,
        user_id: &str,
        profile: &NewProfile,
    ) -> Result<ProfileRecord, MemoryError> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::InvalidArgument("user_id is required".into()));
        }
        let user_id = user_id.to_string();
        let profile = profile.clone();
        let timestamp = profile
            .timestamp
            .unwrap_or_else(Utc::now)
            .trunc_subsecs(6);

        self.db
            .with_connection(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO questionnaire (user_id, breed, age, name, temperament, timestamp)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        user_id,
                        profile.category,
                        profile.age,
                        profile.name,
                        profile.descriptor,
                        encode_timestamp(&timestamp)
                    ],
                )?;

                Ok(ProfileRecord {
                    id: conn.last_insert_rowid(),
                    category: profile.category,
                    age: profile.age,
                    name: profile.name,
                    descriptor: profile.descriptor,
                    timestamp,
                })
            })
            .await
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn latest_record(&self, user_id: &str) -> Result<Option<ProfileRecord>, MemoryError> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::InvalidArgument("user_id is required".into()));
        }
        let user_id = user_id.to_string();

        self.db
            .with_connection(move |conn| {
                let row = conn
                    .query_row(
                        r#"
                        SELECT id, breed, age, name, temperament, timestamp
                        FROM questionnaire
                        WHERE user_id = ?1
                        ORDER BY julianday(timestamp) DESC, timestamp DESC, id DESC
                        LIMIT 1
                        "#,
                        params![user_id],
                        |row| {
                            Ok((
                                row.get::<_, i64>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, String>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                row.map(|(id, category, age, name, descriptor, timestamp)| {
                    Ok(ProfileRecord {
                        id,
                        category,
                        age,
                        name,
                        descriptor,
                        timestamp: decode_timestamp(&timestamp)?,
                    })
                })
                .transpose()
            })
            .await
    }
}
