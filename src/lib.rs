pub mod config;
pub mod heuristics;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use config::{PipelineConfig, StageLengths};
pub use heuristics::{
    DocumentCheckConfig, DocumentReport, QualityConfig, RelaxedGateConfig, check_document, validate,
    validate_relaxed,
};
pub use io::{
    EmitError, JekyllEmitter, PostEmitter, RequestQueue, RequestSource, TopicFile,
    strip_front_matter,
};
pub use llm::{GeminiClient, GeminiConfig, GenerationError, TextGenerationClient};
pub use models::{Category, FinalDocument, PipelineRun, Quality, ResearchBundle, Topic, Verdict};
pub use stages::{PipelineError, PipelineOrchestrator, PipelineRecipe, normalize};
