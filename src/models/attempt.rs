use std::fmt;

use serde::Serialize;

use super::Verdict;

/// One LLM invocation within the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Draft,
    PersonaRewrite,
    Polish,
    SimpleFallback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PersonaRewrite => "persona_rewrite",
            Self::Polish => "polish",
            Self::SimpleFallback => "simple_fallback",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a single stage call, kept for diagnostics only
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAttempt {
    pub stage: Stage,
    /// Pipeline attempt this call belongs to (starts at 1)
    pub attempt_number: u32,
    pub model_id: String,
    pub raw_output: Option<String>,
    pub normalized_output: Option<String>,
    pub validator_verdict: Option<Verdict>,
    /// Failure message when the call did not produce usable text
    pub failure: Option<String>,
}

impl GenerationAttempt {
    pub fn new(stage: Stage, attempt_number: u32, model_id: &str) -> Self {
        Self {
            stage,
            attempt_number,
            model_id: model_id.to_string(),
            raw_output: None,
            normalized_output: None,
            validator_verdict: None,
            failure: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none() && self.normalized_output.is_some()
    }
}
