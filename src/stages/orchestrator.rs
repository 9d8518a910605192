use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{FailurePolicy, PipelineRecipe, PromptTemplate, StageRunner};
use crate::config::PipelineConfig;
use crate::heuristics::{validate, validate_relaxed};
use crate::llm::{GenerationError, PromptContext, TextGenerationClient, escalation_clause};
use crate::models::{
    FinalDocument, GenerationAttempt, PipelineRun, Quality, ResearchBundle, Stage, Topic, Verdict,
    kst_timestamp,
};

/// Terminal failures of a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The first stage produced nothing usable; later stages never ran
    #[error("draft stage produced no usable text: {0}")]
    EmptyDraft(String),
    /// Every attempt and the legacy fallback were rejected
    #[error("generation budget exhausted after {attempts} attempts: {reason}")]
    BudgetExhausted { attempts: u32, reason: String },
}

/// Ranked model candidates with a cursor that only moves forward.
///
/// A model that reported itself unavailable is never tried again in the
/// same run, so later stages start from the surviving candidate.
#[derive(Debug, Clone)]
pub struct ModelRoster {
    candidates: Vec<String>,
    cursor: usize,
}

impl ModelRoster {
    pub fn new(models: &[String]) -> Self {
        let mut candidates: Vec<String> = Vec::new();
        for model in models {
            let model = model.trim();
            if !model.is_empty() && !candidates.iter().any(|c| c == model) {
                candidates.push(model.to_string());
            }
        }
        Self {
            candidates,
            cursor: 0,
        }
    }

    pub fn current(&self) -> Option<&str> {
        self.candidates.get(self.cursor).map(String::as_str)
    }

    pub fn mark_unavailable(&mut self) {
        if self.cursor < self.candidates.len() {
            self.cursor += 1;
        }
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len() - self.cursor
    }
}

struct RunState {
    roster: ModelRoster,
    attempts: Vec<GenerationAttempt>,
}

impl RunState {
    /// Attach a verdict to the call that produced `text`
    fn record_verdict(&mut self, text: &str, verdict: &Verdict) {
        if let Some(attempt) = self
            .attempts
            .iter_mut()
            .rev()
            .find(|a| a.succeeded() && a.normalized_output.as_deref() == Some(text))
        {
            attempt.validator_verdict = Some(verdict.clone());
        }
    }
}

/// Drives a topic through its recipe, the quality gate, retries and the
/// legacy fallback.
///
/// Calls are strictly sequential: each stage consumes the previous
/// stage's output.
pub struct PipelineOrchestrator<'a, C: ?Sized> {
    runner: StageRunner<'a, C>,
    config: PipelineConfig,
}

impl<'a, C: TextGenerationClient + ?Sized> PipelineOrchestrator<'a, C> {
    pub fn new(client: &'a C, config: PipelineConfig) -> Self {
        Self {
            runner: StageRunner::new(client),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(
        &self,
        topic: &Topic,
        research: &ResearchBundle,
    ) -> Result<PipelineRun, PipelineError> {
        let recipe = PipelineRecipe::for_topic(topic);
        let ctx = PromptContext {
            topic,
            research,
            style_guide: self.config.style_guide.as_deref(),
            limits: &self.config.prompt_limits,
        };
        let mut state = RunState {
            roster: ModelRoster::new(&self.config.models),
            attempts: Vec::new(),
        };
        let max_attempts = if recipe.retryable {
            self.config.max_attempts.max(1)
        } else {
            1
        };

        info!(
            "Pipeline: \"{}\" with {} recipe ({} stages, {} models)",
            topic.title,
            recipe.name,
            recipe.stages.len(),
            state.roster.remaining()
        );

        let mut previous: Option<Verdict> = None;

        for attempt in 1..=max_attempts {
            let escalation = (attempt > 1)
                .then(|| escalation_clause(attempt, max_attempts, previous.as_ref()));
            if attempt > 1 {
                info!("Attempt {} of {} with escalated draft prompt", attempt, max_attempts);
            }

            let text = self
                .run_recipe(&recipe, &ctx, attempt, escalation.as_deref(), &mut state)
                .await?;

            let verdict = validate(text.as_str(), &self.config.quality);
            state.record_verdict(&text, &verdict);

            if verdict.accepted {
                info!("Attempt {}: {}", attempt, verdict.summary());
                return Ok(self.finish(topic, text, Quality::Accepted, verdict, state));
            }
            warn!("Attempt {} of {}: {}", attempt, max_attempts, verdict.summary());

            if !recipe.retryable {
                let relaxed = validate_relaxed(text.as_str(), &self.config.relaxed);
                if relaxed.accepted {
                    warn!("Keeping {} output as best effort ({})", recipe.name, relaxed.summary());
                    return Ok(self.finish(topic, text, Quality::BestEffort, verdict, state));
                }
                error!("{} output rejected by relaxed gate: {}", recipe.name, relaxed.summary());
                return Err(PipelineError::BudgetExhausted {
                    attempts: attempt,
                    reason: relaxed.reasons.join(", "),
                });
            }

            previous = Some(verdict);
        }

        self.legacy_fallback(topic, &ctx, max_attempts + 1, state).await
    }

    /// Run every stage of the recipe once, returning the last usable text
    async fn run_recipe(
        &self,
        recipe: &PipelineRecipe,
        ctx: &PromptContext<'_>,
        attempt: u32,
        escalation: Option<&str>,
        state: &mut RunState,
    ) -> Result<String, PipelineError> {
        let mut current: Option<String> = None;

        for (index, descriptor) in recipe.stages.iter().enumerate() {
            let mut prompt = descriptor.template.render(ctx, current.as_deref());
            if let (0, Some(clause)) = (index, escalation) {
                prompt.push_str("\n\n");
                prompt.push_str(clause);
            }

            match self.invoke(descriptor.stage, &prompt, attempt, state).await {
                Ok(text) => current = Some(text),
                Err(reason) => match (descriptor.on_failure, current.is_some()) {
                    (FailurePolicy::CarryForward, true) => {
                        warn!(
                            "Stage {} failed ({}); carrying previous output forward",
                            descriptor.stage, reason
                        );
                    }
                    _ => {
                        error!("Stage {} failed: {}", descriptor.stage, reason);
                        return Err(PipelineError::EmptyDraft(reason));
                    }
                },
            }
        }

        current.ok_or_else(|| PipelineError::EmptyDraft(format!("{} recipe has no stages", recipe.name)))
    }

    /// One stage call, moving down the model roster on unavailability
    async fn invoke(
        &self,
        stage: Stage,
        prompt: &str,
        attempt: u32,
        state: &mut RunState,
    ) -> Result<String, String> {
        let min_chars = self.config.stage_lengths.min_for(stage);

        loop {
            let Some(model) = state.roster.current().map(str::to_string) else {
                return Err("no model candidates left".to_string());
            };
            let mut record = GenerationAttempt::new(stage, attempt, &model);

            match self.runner.run(stage, prompt, &model).await {
                Ok(output) => {
                    let chars = output.normalized.chars().count();
                    record.raw_output = Some(output.raw);
                    record.normalized_output = Some(output.normalized.clone());

                    if chars < min_chars {
                        let reason = format!(
                            "{} output too short: {} chars (minimum {})",
                            stage, chars, min_chars
                        );
                        warn!("{} via {}", reason, model);
                        record.failure = Some(reason.clone());
                        state.attempts.push(record);
                        return Err(reason);
                    }

                    debug!("Stage {} via {}: {} chars", stage, model, chars);
                    state.attempts.push(record);
                    return Ok(output.normalized);
                }
                Err(e @ GenerationError::ModelUnavailable { .. }) => {
                    warn!("{}; trying next model", e);
                    record.failure = Some(e.to_string());
                    state.attempts.push(record);
                    state.roster.mark_unavailable();
                }
                Err(e) => {
                    record.failure = Some(e.to_string());
                    state.attempts.push(record);
                    return Err(e.to_string());
                }
            }
        }
    }

    /// Last resort once the retry budget is spent; only the relaxed gate applies
    async fn legacy_fallback(
        &self,
        topic: &Topic,
        ctx: &PromptContext<'_>,
        attempt: u32,
        mut state: RunState,
    ) -> Result<PipelineRun, PipelineError> {
        info!("Retry budget exhausted; running legacy fallback");

        let prompt = PromptTemplate::SimpleFallback.render(ctx, None);
        let text = self
            .invoke(Stage::SimpleFallback, &prompt, attempt, &mut state)
            .await
            .map_err(|reason| PipelineError::BudgetExhausted {
                attempts: attempt,
                reason: format!("legacy fallback failed: {}", reason),
            })?;

        let relaxed = validate_relaxed(text.as_str(), &self.config.relaxed);
        if !relaxed.accepted {
            error!("Legacy fallback rejected: {}", relaxed.summary());
            return Err(PipelineError::BudgetExhausted {
                attempts: attempt,
                reason: format!("legacy fallback rejected: {}", relaxed.reasons.join(", ")),
            });
        }

        let verdict = validate(text.as_str(), &self.config.quality);
        state.record_verdict(&text, &verdict);
        warn!("Legacy fallback kept as best effort ({})", verdict.summary());
        Ok(self.finish(topic, text, Quality::BestEffort, verdict, state))
    }

    fn finish(
        &self,
        topic: &Topic,
        body: String,
        quality: Quality,
        verdict: Verdict,
        state: RunState,
    ) -> PipelineRun {
        let date = kst_timestamp(Utc::now());
        PipelineRun {
            document: FinalDocument::from_topic(topic, body, date, &self.config.author),
            quality,
            verdict,
            attempts: state.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ESCALATION_MARKER;
    use crate::llm::scripted::{Reply, ScriptedClient};
    use crate::models::Category;

    const DRAFT: &str = "너는 구성 작가다";
    const PERSONA: &str = "시니컬한";
    const POLISH: &str = "교정 및 포맷팅";
    const FALLBACK: &str = "다음 주제에 대해";

    fn korean_post(label: &str) -> String {
        let mut text = format!("## {}\n\n", label);
        for i in 0..20 {
            text.push_str(&format!(
                "러스트의 소유권 규칙은 {}번째 예제에서도 메모리 안전성을 보장한다.\n",
                i
            ));
        }
        text
    }

    /// Hangul text in the noun-ending register; fails only the terminal check
    fn noun_ending_post() -> String {
        (0..20)
            .map(|i| format!("빌림 검사기 덕분에 {}번째 예제에서도 데이터 경합을 막을 수 있음\n", i))
            .collect()
    }

    fn english_post() -> String {
        (0..20)
            .map(|i| format!("The ownership rules in Rust guarantee memory safety in example {}.\n", i))
            .collect()
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            models: vec!["m1".to_string(), "m2".to_string(), "m3".to_string()],
            ..Default::default()
        }
    }

    fn topic() -> Topic {
        Topic::new("러스트 소유권", "빌림 검사기 정리", Category::Dev)
    }

    #[test]
    fn test_model_roster_dedups_and_moves_forward() {
        let models: Vec<String> = ["m1", "m2", "m1", " ", "m3"].iter().map(|m| m.to_string()).collect();
        let mut roster = ModelRoster::new(&models);

        assert_eq!(roster.remaining(), 3);
        assert_eq!(roster.current(), Some("m1"));

        roster.mark_unavailable();
        assert_eq!(roster.current(), Some("m2"));

        roster.mark_unavailable();
        roster.mark_unavailable();
        roster.mark_unavailable();
        assert_eq!(roster.current(), None);
        assert_eq!(roster.remaining(), 0);
    }

    #[tokio::test]
    async fn test_chained_run_accepted() {
        let client = ScriptedClient::with_replies([
            Reply::text(korean_post("초안")),
            Reply::text(korean_post("재작성")),
            Reply::text(korean_post("교정")),
        ]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        assert_eq!(run.quality, Quality::Accepted);
        assert!(run.verdict.accepted);
        assert!(run.document.body.starts_with("## 교정"));
        assert_eq!(run.document.author, "rldhkstopic");
        assert!(run.document.date.ends_with("+0900"));
        assert_eq!(client.calls().len(), 3);
        assert!(client.calls_matching(PERSONA)[0].prompt.contains("## 초안"));
        assert!(client.calls_matching(POLISH)[0].prompt.contains("## 재작성"));

        let last = run.attempts.last().unwrap();
        assert_eq!(last.stage, Stage::Polish);
        assert!(last.validator_verdict.as_ref().is_some_and(|v| v.accepted));
    }

    #[tokio::test]
    async fn test_unavailable_model_is_never_retried() {
        let client = ScriptedClient::with_replies([
            Reply::text(korean_post("초안")),
            Reply::text(korean_post("재작성")),
            Reply::text(korean_post("교정")),
        ])
        .reject_model("m1");
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        let models: Vec<String> = client.calls().into_iter().map(|c| c.model_id).collect();
        assert_eq!(models, vec!["m1", "m2", "m2", "m2"]);
        assert_eq!(run.quality, Quality::Accepted);
        assert_eq!(run.attempts[0].model_id, "m1");
        assert!(run.attempts[0].failure.is_some());
    }

    #[tokio::test]
    async fn test_rejected_attempts_escalate_draft_prompt() {
        let mut replies: Vec<Reply> = (0..6).map(|_| Reply::text(english_post())).collect();
        replies.extend((0..3).map(|_| Reply::text(korean_post("본문"))));
        let client = ScriptedClient::with_replies(replies);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        let drafts = client.calls_matching(DRAFT);
        assert_eq!(drafts.len(), 3);
        assert!(!drafts[0].prompt.contains(ESCALATION_MARKER));
        assert!(drafts[1].prompt.contains(ESCALATION_MARKER));
        assert!(drafts[2].prompt.contains(ESCALATION_MARKER));
        assert!(drafts[2].prompt.contains("재시도 3/3"));
        assert!(client.calls_matching(FALLBACK).is_empty());

        assert_eq!(run.quality, Quality::Accepted);
        assert_eq!(run.attempts.last().unwrap().attempt_number, 3);
    }

    #[tokio::test]
    async fn test_legacy_fallback_is_best_effort() {
        let client = ScriptedClient::new()
            .on_prompt(FALLBACK, Reply::text(noun_ending_post()))
            .on_prompt(DRAFT, Reply::text(english_post()))
            .on_prompt(PERSONA, Reply::text(english_post()))
            .on_prompt(POLISH, Reply::text(english_post()));
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        assert!(run.is_best_effort());
        assert!(!run.verdict.accepted);
        assert!(run.verdict.failed(crate::heuristics::TERMINAL_RATIO));
        assert_eq!(client.calls_matching(DRAFT).len(), 3);
        assert_eq!(client.calls_matching(FALLBACK).len(), 1);

        let last = run.attempts.last().unwrap();
        assert_eq!(last.stage, Stage::SimpleFallback);
        assert_eq!(last.attempt_number, 4);
    }

    #[tokio::test]
    async fn test_rejected_legacy_fallback_exhausts_budget() {
        let client = ScriptedClient::new().on_prompt("", Reply::text(english_post()));
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let err = orchestrator
            .run(&topic(), &ResearchBundle::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::BudgetExhausted { attempts: 4, .. }));
        assert_eq!(client.calls().len(), 10);
    }

    #[tokio::test]
    async fn test_empty_draft_aborts_run() {
        let client = ScriptedClient::with_replies([Reply::text("")]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let err = orchestrator
            .run(&topic(), &ResearchBundle::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyDraft(_)));
        assert_eq!(client.calls().len(), 1);
        assert!(client.calls_matching(PERSONA).is_empty());
        assert!(client.calls_matching(POLISH).is_empty());
    }

    #[tokio::test]
    async fn test_short_draft_aborts_run() {
        let client = ScriptedClient::with_replies([Reply::text("짧은 초안이다.")]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let err = orchestrator
            .run(&topic(), &ResearchBundle::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("too short"));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_all_models_unavailable_aborts_run() {
        let client = ScriptedClient::new()
            .reject_model("m1")
            .reject_model("m2")
            .reject_model("m3");
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let err = orchestrator
            .run(&topic(), &ResearchBundle::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EmptyDraft(_)));
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_persona_rewrite_carries_draft_forward() {
        let client = ScriptedClient::with_replies([
            Reply::text(korean_post("초안")),
            Reply::Failed("upstream timeout".to_string()),
            Reply::text(korean_post("교정")),
        ]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        assert!(client.calls_matching(POLISH)[0].prompt.contains("## 초안"));
        assert!(run.document.body.starts_with("## 교정"));
    }

    #[tokio::test]
    async fn test_failed_rewrite_and_polish_keep_draft() {
        let client = ScriptedClient::with_replies([
            Reply::text(korean_post("초안")),
            Reply::text("너무 짧다."),
            Reply::Failed("upstream timeout".to_string()),
        ]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic(), &ResearchBundle::default()).await.unwrap();

        assert_eq!(run.quality, Quality::Accepted);
        assert!(run.document.body.starts_with("## 초안"));
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_digest_is_single_shot() {
        let mut topic = topic();
        topic.source = "bloomberg_rss".to_string();
        let client = ScriptedClient::with_replies([Reply::text(korean_post("전일 이슈 개요"))]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic, &ResearchBundle::default()).await.unwrap();

        assert_eq!(run.quality, Quality::Accepted);
        assert_eq!(client.calls().len(), 1);
        assert!(client.calls()[0].prompt.contains("애널리스트"));
    }

    #[tokio::test]
    async fn test_diary_uses_relaxed_gate_without_retry() {
        let topic = Topic::new("야근한 날", "장애 대응", Category::Daily);
        let client = ScriptedClient::with_replies([Reply::text(noun_ending_post())]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let run = orchestrator.run(&topic, &ResearchBundle::default()).await.unwrap();

        assert!(run.is_best_effort());
        assert_eq!(client.calls().len(), 1);
        assert!(client.calls()[0].prompt.contains("일기 작가"));
    }

    #[tokio::test]
    async fn test_rejected_diary_exhausts_budget_after_one_call() {
        let topic = Topic::new("야근한 날", "장애 대응", Category::Daily);
        let client = ScriptedClient::with_replies([Reply::text(english_post())]);
        let orchestrator = PipelineOrchestrator::new(&client, config());

        let err = orchestrator
            .run(&topic, &ResearchBundle::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::BudgetExhausted { attempts: 1, .. }));
        assert_eq!(client.calls().len(), 1);
    }
}
