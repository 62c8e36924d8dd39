//! # PetMind Core
//!
//! Conversational memory for a pet-advice agent. Three independent sources
//! (semantic breed facts, chat history, owner profile) are fetched for each
//! question and merged into one [`state::AgentState`].
//!
//! ## Architecture
//!
//! - `memory/` - The memory sources and their SQLite/HTTP implementations
//! - `aggregation/` - Parallel and sequential aggregation strategies
//! - `state/` - Agent state and the shared database handle
//! - `config` - JSON config with `PETMIND_*` overrides
//!
//! ## Usage
//!
//! ```rust,ignore
//! use petmind_core::aggregation::{MemoryAggregator, MemorySources};
//! use petmind_core::config::MemoryConfig;
//! use petmind_core::state::{AgentState, PetmindDb};
//!
//! let config = MemoryConfig::resolve(None)?;
//! let db = PetmindDb::open_at(&config.db_path)?;
//! let aggregator = MemoryAggregator::from_config(MemorySources::sqlite(&db, &config)?, &config)?;
//! let state = aggregator
//!     .aggregate(AgentState::new("What breed is good for rescue?", "u1"))
//!     .await?;
//! ```

pub mod aggregation;
pub mod config;
pub mod memory;
pub mod state;
