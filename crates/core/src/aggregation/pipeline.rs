//! # Pipeline Stages
//!
//! Stage order of the sequential strategy.

use serde::{Deserialize, Serialize};

use crate::state::MemorySource;

/// Stage of the sequential pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Searching the semantic fact store
    Facts,
    /// Loading the chat transcript
    ChatHistory,
    /// Loading the latest profile summary
    Profile,
    /// Every stage has run
    Complete,
}

impl PipelineStage {
    /// Source fetched by this stage
    pub fn source(&self) -> Option<MemorySource> {
        match self {
            Self::Facts => Some(MemorySource::Facts),
            Self::ChatHistory => Some(MemorySource::ChatHistory),
            Self::Profile => Some(MemorySource::Profile),
            Self::Complete => None,
        }
    }
}

/// The sequential state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stage: PipelineStage,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            stage: PipelineStage::Facts,
        }
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next stage. A degraded stage still advances.
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            PipelineStage::Facts => PipelineStage::ChatHistory,
            PipelineStage::ChatHistory => PipelineStage::Profile,
            PipelineStage::Profile | PipelineStage::Complete => PipelineStage::Complete,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_visits_sources_in_order() {
        let mut pipeline = Pipeline::new();
        let mut visited = Vec::new();
        while let Some(source) = pipeline.stage.source() {
            visited.push(source);
            pipeline.advance();
        }

        assert_eq!(visited, MemorySource::all().to_vec());
        assert_eq!(pipeline.stage, PipelineStage::Complete);
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut pipeline = Pipeline::new();
        for _ in 0..5 {
            pipeline.advance();
        }

        assert_eq!(pipeline.stage, PipelineStage::Complete);
        assert_eq!(pipeline.stage.source(), None);
    }
}
