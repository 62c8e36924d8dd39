//! # Chat History Store
//!
//! Ordered human/agent turns per user, persisted in the `chat_history` table.
//! Timestamps are strictly increasing per user even when two turns land in
//! the same microsecond.

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};

use super::error::MemoryError;
use crate::state::db::{decode_timestamp, encode_timestamp, PetmindDb};

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    Human,
    Agent,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Agent => "agent",
        }
    }

    /// Map a stored role token, ignoring case. `ai` is the legacy agent token.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "human" => Some(Self::Human),
            "agent" | "ai" => Some(Self::Agent),
            _ => None,
        }
    }

    /// Prefix used in rendered transcripts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Agent => "Agent",
        }
    }
}

/// One turn in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Persistent, ordered chat history
#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    /// Append one message atomically
    async fn append(
        &self,
        user_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, MemoryError>;

    /// Append a human turn and the agent's reply; both persist or neither does
    async fn append_exchange(
        &self,
        user_id: &str,
        human: &str,
        agent: &str,
    ) -> Result<(ChatMessage, ChatMessage), MemoryError>;

    /// All messages for a user, oldest first. Unknown users yield an empty vec.
    async fn load(&self, user_id: &str) -> Result<Vec<ChatMessage>, MemoryError>;
}

/// Render messages as alternating `Human: …` / `Agent: …` lines
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.role.label(), msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// SQLite-backed chat history using the shared PetmindDb connection
pub struct SqliteChatHistory {
    db: PetmindDb,
}

impl SqliteChatHistory {
    /// Create from shared PetmindDb connection
    pub fn new(db: &PetmindDb) -> Self {
        Self {
            db: db.clone(),
        }
    }
}

fn validate_user(user_id: &str) -> Result<(), MemoryError> {
    if user_id.trim().is_empty() {
        return Err(MemoryError::InvalidArgument("user_id is required".into()));
    }
    Ok(())
}

/// Insert inside an open transaction, bumping the timestamp past the user's latest turn
fn insert_message(
    tx: &Transaction<'_>,
    user_id: &str,
    role: ChatRole,
    content: &str,
) -> Result<ChatMessage, MemoryError> {
    let last: Option<String> = tx
        .query_row(
            r#"
            SELECT timestamp FROM chat_history
            WHERE user_id = ?1
            ORDER BY julianday(timestamp) DESC, timestamp DESC, id DESC
            LIMIT 1
            "#,
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;

    let mut timestamp = Utc::now().trunc_subsecs(6);
    if let Some(last) = last.as_deref().map(decode_timestamp).transpose()? {
        if timestamp <= last {
            timestamp = last + Duration::microseconds(1);
        }
    }

    tx.execute(
        "INSERT INTO chat_history (user_id, role, message, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, role.as_str(), content, encode_timestamp(&timestamp)],
    )?;

    Ok(ChatMessage {
        id: tx.last_insert_rowid(),
        role,
        content: content.to_string(),
        timestamp,
    })
}

#[async_trait]
impl ChatHistoryStore for SqliteChatHistory {
    async fn append(
        &self,
        user_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, MemoryError> {
        validate_user(user_id)?;
        let user_id = user_id.to_string();
        let content = content.to_string();

        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                let message = insert_message(&tx, &user_id, role, &content)?;
                tx.commit()?;
                Ok(message)
            })
            .await
    }

    async fn append_exchange(
        &self,
        user_id: &str,
        human: &str,
        agent: &str,
    ) -> Result<(ChatMessage, ChatMessage), MemoryError> {
        validate_user(user_id)?;
        let user_id = user_id.to_string();
        let human = human.to_string();
        let agent = agent.to_string();

        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                let question = insert_message(&tx, &user_id, ChatRole::Human, &human)?;
                let reply = insert_message(&tx, &user_id, ChatRole::Agent, &agent)?;
                tx.commit()?;
                Ok((question, reply))
            })
            .await
    }

    async fn load(&self, user_id: &str) -> Result<Vec<ChatMessage>, MemoryError> {
        validate_user(user_id)?;
        let user_id = user_id.to_string();

        let messages = self
            .db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, role, message, timestamp
                    FROM chat_history
                    WHERE user_id = ?1
                    ORDER BY julianday(timestamp) ASC, timestamp ASC, id ASC
                    "#,
                )?;

                let rows = stmt
                    .query_map(params![user_id], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(id, role, content, timestamp)| {
                        let role = ChatRole::parse(&role).ok_or_else(|| {
                            MemoryError::malformed(format!(
                                "unknown chat role '{}' (id {})",
                                role, id
                            ))
                        })?;
                        Ok(ChatMessage {
                            id,
                            role,
                            content,
                            timestamp: decode_timestamp(&timestamp)?,
                        })
                    })
                    .collect::<Result<Vec<_>, MemoryError>>()
            })
            .await?;

        tracing::debug!("Loaded {} chat messages", messages.len());
        Ok(messages)
    }
}
