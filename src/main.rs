use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use postsmith::{
    EmitError, GeminiClient, GeminiConfig, JekyllEmitter, PipelineConfig, PipelineOrchestrator,
    PostEmitter, RequestQueue, RequestSource, ResearchBundle, TopicFile, normalize,
    check_document, strip_front_matter, validate, validate_relaxed,
};

#[derive(Parser)]
#[command(name = "postsmith")]
#[command(author, version, about = "Blog post generation pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate posts from queued requests or a topic list
    Generate {
        /// Request directory (request_*.json files)
        #[arg(long, conflicts_with = "topics")]
        requests: Option<PathBuf>,

        /// Where handled request files are moved
        #[arg(long)]
        processed: Option<PathBuf>,

        /// Topic list file (JSON array)
        #[arg(long)]
        topics: Option<PathBuf>,

        /// Research notes injected into every prompt
        #[arg(long)]
        research: Option<PathBuf>,

        /// Output directory for posts
        #[arg(long, default_value = JekyllEmitter::DEFAULT_DIR)]
        posts_dir: PathBuf,

        /// Pipeline config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Style guide file replacing the built-in one
        #[arg(long)]
        style_guide: Option<PathBuf>,

        /// Full-chain attempts before the legacy fallback
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Ranked model identifiers (repeatable)
        #[arg(long = "model")]
        models: Vec<String>,

        /// Process every pending topic instead of only the first
        #[arg(long)]
        all: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the quality gate on a markdown file
    Validate {
        /// Post or plain markdown file
        input: PathBuf,

        /// Pipeline config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Post-process a markdown file
    Normalize {
        input: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

struct GenerateArgs {
    requests: Option<PathBuf>,
    processed: Option<PathBuf>,
    topics: Option<PathBuf>,
    research: Option<PathBuf>,
    posts_dir: PathBuf,
    config: Option<PathBuf>,
    style_guide: Option<PathBuf>,
    max_attempts: Option<u32>,
    models: Vec<String>,
    all: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            requests,
            processed,
            topics,
            research,
            posts_dir,
            config,
            style_guide,
            max_attempts,
            models,
            all,
            verbose,
        } => {
            setup_logging(verbose);
            generate(GenerateArgs {
                requests,
                processed,
                topics,
                research,
                posts_dir,
                config,
                style_guide,
                max_attempts,
                models,
                all,
            })
            .await
        }
        Commands::Validate {
            input,
            config,
            verbose,
        } => {
            setup_logging(verbose);
            validate_file(input, config)
        }
        Commands::Normalize {
            input,
            output,
            verbose,
        } => {
            setup_logging(verbose);
            normalize_file(input, output)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path),
        None => Ok(PipelineConfig::default()),
    }
}

async fn generate(args: GenerateArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts;
    }
    if !args.models.is_empty() {
        config.models = args.models;
    }
    if let Some(path) = &args.style_guide {
        let guide = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read style guide: {:?}", path))?;
        config.style_guide = Some(guide);
    }

    let gemini = GeminiConfig::from_env()?;
    let config = config.with_preferred_model(gemini.preferred_model.clone());
    let client = GeminiClient::new(gemini)?;

    let research = match &args.research {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read research notes: {:?}", path))?;
            ResearchBundle::from_text(text)
        }
        None => ResearchBundle::default(),
    };
    info!(
        "Research: {} chars, {} sources",
        research.raw_text.chars().count(),
        research.sources.len()
    );

    let mut source: Box<dyn RequestSource> = match &args.topics {
        Some(path) => Box::new(TopicFile::open(path)?),
        None => {
            let requests = args
                .requests
                .unwrap_or_else(|| PathBuf::from(RequestQueue::DEFAULT_DIR));
            let processed = args
                .processed
                .unwrap_or_else(|| PathBuf::from(RequestQueue::DEFAULT_PROCESSED_DIR));
            Box::new(RequestQueue::open(&requests, &processed)?)
        }
    };

    let emitter = JekyllEmitter::new(&args.posts_dir);
    let orchestrator = PipelineOrchestrator::new(&client, config);

    let mut written = 0;
    let mut failed = 0;

    while let Some(topic) = source.next()? {
        match orchestrator.run(&topic, &research).await {
            Ok(run) => {
                info!(
                    "\"{}\": {} after {} stage calls",
                    topic.title,
                    run.quality,
                    run.attempts.len()
                );
                let report = check_document(&run.document, &orchestrator.config().document);
                for warning in &report.warnings {
                    warn!("\"{}\": {}", topic.title, warning);
                }

                if report.is_valid() {
                    match emitter.emit(&run.document) {
                        Ok(path) => {
                            written += 1;
                            info!("Post written to {:?}", path);
                        }
                        Err(EmitError::AlreadyExists(path)) => {
                            warn!("Skipping existing post {:?}", path);
                        }
                        Err(e) => return Err(e.into()),
                    }
                    source.mark_done()?;
                } else {
                    failed += 1;
                    error!(
                        "\"{}\" failed document check: {}",
                        topic.title,
                        report.errors.join(", ")
                    );
                }
            }
            Err(e) => {
                failed += 1;
                error!("\"{}\" failed: {}", topic.title, e);
            }
        }

        if !args.all {
            break;
        }
    }

    info!("Complete: {} written, {} failed", written, failed);
    if failed > 0 && written == 0 {
        bail!("no post generated ({} failed)", failed);
    }
    Ok(())
}

fn validate_file(input: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read file: {:?}", input))?;
    let body = strip_front_matter(&content);

    let verdict = validate(body, &config.quality);
    let relaxed = validate_relaxed(body, &config.relaxed);

    println!("Quality Report");
    println!("==============");
    println!("Full gate:    {}", verdict.summary());
    println!("Relaxed gate: {}", relaxed.summary());
    println!();
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    if !verdict.accepted {
        bail!("{:?} rejected: {}", input, verdict.reasons.join(", "));
    }
    Ok(())
}

fn normalize_file(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read file: {:?}", input))?;
    let normalized = normalize(&content);

    match output {
        Some(path) => {
            std::fs::write(&path, normalized)
                .with_context(|| format!("Failed to write file: {:?}", path))?;
            info!("Normalized text written to {:?}", path);
        }
        None => print!("{}", normalized),
    }
    Ok(())
}
