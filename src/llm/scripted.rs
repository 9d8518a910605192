//! Scripted test double for [`TextGenerationClient`].

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerationError, TextGenerationClient};

/// Canned reply for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    ModelUnavailable,
    Failed(String),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// One recorded call
#[derive(Debug, Clone)]
pub struct Call {
    pub prompt: String,
    pub model_id: String,
}

/// Replies by prompt substring or call order.
///
/// Rules are checked first (model rules, then prompt-substring rules, in
/// insertion order); otherwise the next queued reply is used. An empty queue
/// fails the call.
#[derive(Default)]
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Reply>>,
    by_prompt: Vec<(String, Reply)>,
    unavailable_models: Vec<String>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies consumed in call order
    pub fn with_replies(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            queue: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Reply to any prompt containing `needle`
    pub fn on_prompt(mut self, needle: &str, reply: Reply) -> Self {
        self.by_prompt.push((needle.to_string(), reply));
        self
    }

    /// Reject every call made with `model_id`
    pub fn reject_model(mut self, model_id: &str) -> Self {
        self.unavailable_models.push(model_id.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose prompt contains `needle`
    pub fn calls_matching(&self, needle: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.prompt.contains(needle))
            .collect()
    }
}

#[async_trait]
impl TextGenerationClient for ScriptedClient {
    async fn generate(&self, prompt: &str, model_id: &str) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(Call {
            prompt: prompt.to_string(),
            model_id: model_id.to_string(),
        });

        if self.unavailable_models.iter().any(|m| m == model_id) {
            return Err(GenerationError::ModelUnavailable {
                model: model_id.to_string(),
                message: "404 NOT_FOUND".to_string(),
            });
        }

        let reply = self
            .by_prompt
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.queue.lock().unwrap().pop_front());

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::ModelUnavailable) => Err(GenerationError::ModelUnavailable {
                model: model_id.to_string(),
                message: "404 NOT_FOUND".to_string(),
            }),
            Some(Reply::Failed(message)) => Err(GenerationError::GenerationFailed(message)),
            None => Err(GenerationError::failed("no scripted reply left")),
        }
    }
}
