//! # Memory Aggregation
//!
//! Combines the three memory sources into one [`AgentState`](crate::state::AgentState).
//!
//! ## Strategies
//!
//! ```text
//! Parallel:    ┌ facts ────────┐
//!              ├ chat_history ─┼─► merge ─► AgentState
//!              └ profile ──────┘
//!
//! Sequential:  facts ─► chat_history ─► profile ─► AgentState
//! ```

pub mod aggregator;
pub mod pipeline;
pub mod report;
pub mod strategy;

pub use aggregator::{
    AggregateError, MemoryAggregator, MemorySources, SourceFailure, DEFAULT_FACTS_K,
};
pub use pipeline::{Pipeline, PipelineStage};
pub use report::{AggregationReport, SourceOutcome};
pub use strategy::AggregationStrategy;
