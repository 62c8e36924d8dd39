//! # Memory Module
//!
//! The three independently-failing memory sources behind the aggregator.
//!
//! ## Architecture
//!
//! ```text
//! ChatHistoryStore (chat_history)   ProfileStore (questionnaire)   FactsMemorySource
//!          ↓                                 ↓                     Embedder + VectorIndex
//!   SqliteChatHistory               SqliteProfileStore            HttpEmbedder | HashingEmbedder
//!                                                                  SqliteVectorIndex (facts)
//! ```

pub mod chat_history;
pub mod embedding;
pub mod error;
pub mod facts;
pub mod profile;
pub mod vector_index;

pub use chat_history::{
    render_transcript, ChatHistoryStore, ChatMessage, ChatRole, SqliteChatHistory,
};
pub use embedding::{HashingEmbedder, HttpEmbedder};
pub use error::{MemoryError, StorageErrorKind};
pub use facts::{render_facts, Embedder, FactDocument, FactQuery, FactsMemorySource, VectorIndex};
pub use profile::{NewProfile, ProfileRecord, ProfileStore, SqliteProfileStore};
pub use vector_index::{cosine_similarity, SqliteVectorIndex, DEFAULT_COLLECTION};
