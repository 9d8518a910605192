use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::heuristics::{DocumentCheckConfig, QualityConfig, RelaxedGateConfig};
use crate::llm::{DEFAULT_MODELS, PromptLimits};
use crate::models::Stage;

/// Minimum usable output length per stage, in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageLengths {
    pub draft: usize,
    pub persona_rewrite: usize,
    pub polish: usize,
    pub simple_fallback: usize,
}

impl Default for StageLengths {
    fn default() -> Self {
        Self {
            draft: 500,
            persona_rewrite: 500,
            polish: 500,
            simple_fallback: 200,
        }
    }
}

impl StageLengths {
    pub fn min_for(&self, stage: Stage) -> usize {
        match stage {
            Stage::Draft => self.draft,
            Stage::PersonaRewrite => self.persona_rewrite,
            Stage::Polish => self.polish,
            Stage::SimpleFallback => self.simple_fallback,
        }
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Full quality gate thresholds
    pub quality: QualityConfig,
    /// Relaxed gate for last-resort output
    pub relaxed: RelaxedGateConfig,
    /// Pre-publication checks on the finished document
    pub document: DocumentCheckConfig,
    pub stage_lengths: StageLengths,
    pub prompt_limits: PromptLimits,
    /// Full-chain attempts before the legacy fallback
    pub max_attempts: u32,
    /// Ranked model identifiers, most preferred first
    pub models: Vec<String>,
    /// Author written into the front matter
    pub author: String,
    /// Replaces the built-in style guide when set
    pub style_guide: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quality: QualityConfig::default(),
            relaxed: RelaxedGateConfig::default(),
            document: DocumentCheckConfig::default(),
            stage_lengths: StageLengths::default(),
            prompt_limits: PromptLimits::default(),
            max_attempts: 3,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            author: "rldhkstopic".to_string(),
            style_guide: None,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Put a preferred model at the front of the ranked list
    pub fn with_preferred_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model {
            self.models.retain(|m| *m != model);
            self.models.insert(0, model);
        }
        self
    }
}
