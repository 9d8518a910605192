use tracing::debug;

use super::normalize;
use crate::llm::{GenerationError, TextGenerationClient};
use crate::models::Stage;

/// Text produced by one stage call
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// Provider output as received
    pub raw: String,
    /// Trimmed and post-processed output
    pub normalized: String,
}

/// Invokes the generation client for one stage and post-processes the result.
///
/// Never retries on its own: a rejected model comes back as
/// [`GenerationError::ModelUnavailable`] so the caller can pick the next one.
pub struct StageRunner<'a, C: ?Sized> {
    client: &'a C,
}

impl<'a, C: TextGenerationClient + ?Sized> StageRunner<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    pub async fn run(
        &self,
        stage: Stage,
        prompt: &str,
        model_id: &str,
    ) -> Result<StageOutput, GenerationError> {
        if prompt.trim().is_empty() {
            return Err(GenerationError::failed(format!("empty prompt for {} stage", stage)));
        }

        debug!(
            "Stage {}: calling {} ({} prompt chars)",
            stage,
            model_id,
            prompt.chars().count()
        );
        let raw = self.client.generate(prompt, model_id).await?;

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GenerationError::failed(format!("{} stage returned empty text", stage)));
        }

        let normalized = normalize(trimmed).trim().to_string();
        Ok(StageOutput { raw, normalized })
    }
}
