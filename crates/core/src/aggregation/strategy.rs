//! # Aggregation Strategy
//!
//! How the three memory sources are scheduled for one request.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution strategy, fixed when the aggregator is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationStrategy {
    /// All sources at once, each seeded only from the input state
    #[default]
    Parallel,
    /// facts → chat history → profile, each stage sees the earlier results
    Sequential,
}

impl AggregationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" | "concurrent" => Ok(Self::Parallel),
            "sequential" | "pipeline" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown strategy '{}' (expected parallel or sequential)",
                other
            )),
        }
    }
}
