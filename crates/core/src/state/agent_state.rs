//! # Agent State
//!
//! The record threaded through one request: the question, who asked it, and
//! the three memory fields filled in by the aggregator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::memory::MemoryError;

/// Prefix of every degraded placeholder written into a memory field
pub const UNAVAILABLE_PREFIX: &str = "[unavailable]";

/// One of the three memory dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    /// Semantic fact store
    Facts,
    /// Chronological chat history
    ChatHistory,
    /// Latest questionnaire profile
    Profile,
}

impl MemorySource {
    /// Sequential pipeline order
    pub fn all() -> [MemorySource; 3] {
        [
            MemorySource::Facts,
            MemorySource::ChatHistory,
            MemorySource::Profile,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facts => "facts",
            Self::ChatHistory => "chat_history",
            Self::Profile => "profile",
        }
    }

    /// Placeholder stored in the field when this source fails
    pub fn placeholder(&self, error: &MemoryError) -> String {
        format!("{} {} memory: {}", UNAVAILABLE_PREFIX, self.as_str(), error)
    }
}

impl fmt::Display for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work passed through the aggregation pipeline
///
/// Memory fields are independently optional. `Some("")` means the source ran
/// and found nothing; a failed source leaves a placeholder starting with
/// [`UNAVAILABLE_PREFIX`] and is listed in `unavailable`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_question: Option<Vec<f32>>,
    pub user_id: String,
    /// Where this session's relational data lives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_store: Option<String>,
    #[serde(default)]
    pub chat_memory: Option<String>,
    #[serde(default)]
    pub profile_memory: Option<String>,
    #[serde(default)]
    pub facts_memory: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    /// Sources that failed during the last aggregation
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub unavailable: BTreeSet<MemorySource>,
}

impl AgentState {
    /// Create a state seeded with a question and a user
    pub fn new(question: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_session_store(mut self, location: impl Into<String>) -> Self {
        self.session_store = Some(location.into());
        self
    }

    pub fn with_embedded_question(mut self, vector: Vec<f32>) -> Self {
        self.embedded_question = Some(vector);
        self
    }

    /// Check the fields that must be present before aggregation begins
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.user_id.trim().is_empty() {
            return Err(MemoryError::InvalidArgument("user_id is required".into()));
        }
        if self.question.trim().is_empty() && self.embedded_question.is_none() {
            return Err(MemoryError::InvalidArgument("question is required".into()));
        }
        Ok(())
    }

    fn memory_slot(&mut self, source: MemorySource) -> &mut Option<String> {
        match source {
            MemorySource::Facts => &mut self.facts_memory,
            MemorySource::ChatHistory => &mut self.chat_memory,
            MemorySource::Profile => &mut self.profile_memory,
        }
    }

    /// Store a successfully loaded memory and clear any earlier failure flag
    pub fn set_memory(&mut self, source: MemorySource, value: String) {
        *self.memory_slot(source) = Some(value);
        self.unavailable.remove(&source);
    }

    /// Record a failed source with its placeholder
    pub fn mark_unavailable(&mut self, source: MemorySource, error: &MemoryError) {
        *self.memory_slot(source) = Some(source.placeholder(error));
        self.unavailable.insert(source);
    }

    pub fn is_unavailable(&self, source: MemorySource) -> bool {
        self.unavailable.contains(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_user_and_question() {
        assert!(AgentState::new("Which breed?", "u1").validate().is_ok());
        assert!(AgentState::new("Which breed?", "  ").validate().is_err());
        assert!(AgentState::new("", "u1").validate().is_err());
        assert!(AgentState::new("", "u1")
            .with_embedded_question(vec![0.1, 0.2])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_empty_and_failed_are_distinct() {
        let mut state = AgentState::new("q", "u1");
        state.set_memory(MemorySource::ChatHistory, String::new());
        state.mark_unavailable(
            MemorySource::Profile,
            &MemoryError::unavailable("connection refused"),
        );

        assert_eq!(state.chat_memory.as_deref(), Some(""));
        assert!(!state.is_unavailable(MemorySource::ChatHistory));

        let profile = state.profile_memory.as_deref().unwrap();
        assert!(profile.starts_with(UNAVAILABLE_PREFIX));
        assert!(profile.contains("connection refused"));
        assert!(state.is_unavailable(MemorySource::Profile));
        assert_eq!(state.facts_memory, None);
    }

    #[test]
    fn test_state_serializes_without_empty_flags() {
        let state = AgentState::new("q", "u1");
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("unavailable").is_none());
        assert_eq!(json["user_id"], "u1");
    }
}
