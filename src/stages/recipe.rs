use crate::llm::{
    PromptContext, diary_prompt, digest_prompt, draft_prompt, fallback_prompt, persona_prompt,
    polish_prompt,
};
use crate::models::{Category, Stage, Topic};

/// Prompt family a stage renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    Draft,
    DigestDraft,
    DiaryDraft,
    PersonaRewrite,
    Polish,
    SimpleFallback,
}

impl PromptTemplate {
    /// Render the prompt. Rewrite templates read `previous`, the rest read the topic.
    pub fn render(&self, ctx: &PromptContext<'_>, previous: Option<&str>) -> String {
        match self {
            Self::Draft => draft_prompt(ctx),
            Self::DigestDraft => digest_prompt(ctx),
            Self::DiaryDraft => diary_prompt(ctx),
            Self::SimpleFallback => fallback_prompt(ctx),
            Self::PersonaRewrite => persona_prompt(previous.unwrap_or_default()),
            Self::Polish => polish_prompt(previous.unwrap_or_default()),
        }
    }
}

/// What happens to the run when a stage produces nothing usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The attempt fails outright
    Abort,
    /// Keep the previous stage's output and continue
    CarryForward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub stage: Stage,
    pub template: PromptTemplate,
    pub on_failure: FailurePolicy,
}

impl StageDescriptor {
    const fn new(stage: Stage, template: PromptTemplate, on_failure: FailurePolicy) -> Self {
        Self {
            stage,
            template,
            on_failure,
        }
    }
}

/// Ordered stages for one kind of post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRecipe {
    pub name: &'static str,
    pub stages: Vec<StageDescriptor>,
    /// Whether a rejected result triggers another full attempt
    pub retryable: bool,
}

impl PipelineRecipe {
    /// Draft, persona rewrite, then polish
    pub fn chained() -> Self {
        Self {
            name: "chained",
            stages: vec![
                StageDescriptor::new(Stage::Draft, PromptTemplate::Draft, FailurePolicy::Abort),
                StageDescriptor::new(
                    Stage::PersonaRewrite,
                    PromptTemplate::PersonaRewrite,
                    FailurePolicy::CarryForward,
                ),
                StageDescriptor::new(Stage::Polish, PromptTemplate::Polish, FailurePolicy::CarryForward),
            ],
            retryable: true,
        }
    }

    pub fn digest() -> Self {
        Self::single_shot("digest", PromptTemplate::DigestDraft)
    }

    pub fn diary() -> Self {
        Self::single_shot("diary", PromptTemplate::DiaryDraft)
    }

    fn single_shot(name: &'static str, template: PromptTemplate) -> Self {
        Self {
            name,
            stages: vec![StageDescriptor::new(Stage::Draft, template, FailurePolicy::Abort)],
            retryable: false,
        }
    }

    /// Pick the recipe for a topic: digests first, then the diary category
    pub fn for_topic(topic: &Topic) -> Self {
        if topic.is_digest() {
            Self::digest()
        } else if topic.category == Category::Daily {
            Self::diary()
        } else {
            Self::chained()
        }
    }
}
