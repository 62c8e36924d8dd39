//! # Aggregation Report
//!
//! Per-source outcome of one aggregation, for logs and API callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::strategy::AggregationStrategy;
use crate::state::MemorySource;

/// Terminal state of a single source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Loaded `items` records (messages, profile lines or documents)
    Loaded { items: usize, elapsed_ms: u64 },
    /// Degraded to a placeholder
    Failed { reason: String, elapsed_ms: u64 },
}

impl SourceOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Outcome of every source plus total wall time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationReport {
    pub strategy: AggregationStrategy,
    pub outcomes: BTreeMap<MemorySource, SourceOutcome>,
    pub elapsed_ms: u64,
}

impl AggregationReport {
    pub fn new(strategy: AggregationStrategy) -> Self {
        Self {
            strategy,
            outcomes: BTreeMap::new(),
            elapsed_ms: 0,
        }
    }

    /// Sources that degraded, in pipeline order
    pub fn failed_sources(&self) -> Vec<MemorySource> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_loaded())
            .map(|(source, _)| *source)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_sources() {
        let mut report = AggregationReport::new(AggregationStrategy::Parallel);
        report.outcomes.insert(
            MemorySource::Facts,
            SourceOutcome::Loaded {
                items: 3,
                elapsed_ms: 12,
            },
        );
        report.outcomes.insert(
            MemorySource::Profile,
            SourceOutcome::Failed {
                reason: "locked".into(),
                elapsed_ms: 1,
            },
        );

        assert_eq!(report.failed_sources(), vec![MemorySource::Profile]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"]["profile"]["status"], "failed");
    }
}
