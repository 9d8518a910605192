use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Structured pass/fail result of the quality validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether every heuristic passed
    pub accepted: bool,
    /// Names of the failing heuristics, in evaluation order
    pub reasons: Vec<String>,
    /// Raw numeric value of each heuristic, keyed by metric name
    pub metrics: BTreeMap<String, f64>,
}

impl Verdict {
    pub fn rejected(reason: &str) -> Self {
        Self {
            accepted: false,
            reasons: vec![reason.to_string()],
            metrics: BTreeMap::new(),
        }
    }

    /// Check whether a named heuristic failed
    pub fn failed(&self, reason: &str) -> bool {
        self.reasons.iter().any(|r| r == reason)
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let metrics = self
            .metrics
            .iter()
            .map(|(k, v)| format!("{}={:.2}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        if self.accepted {
            format!("accepted ({})", metrics)
        } else {
            format!("rejected [{}] ({})", self.reasons.join(", "), metrics)
        }
    }
}
