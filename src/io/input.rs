use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::{Category, Topic};

/// Supplies units of work to the pipeline
pub trait RequestSource {
    /// Next topic, or `None` when there is nothing left to do
    fn next(&mut self) -> Result<Option<Topic>>;

    /// Acknowledge the topic last returned by [`RequestSource::next`]
    fn mark_done(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A persisted post request as written by the chat bot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRequest {
    #[serde(rename = "Category", default)]
    pub category: String,
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Situation", default)]
    pub situation: String,
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "Memo", default)]
    pub memo: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub requested_at: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

impl PostRequest {
    /// Description assembled from the non-empty free-text fields
    pub fn description(&self) -> String {
        [
            ("상황", &self.situation),
            ("행동", &self.action),
            ("메모", &self.memo),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("{}: {}", label, value.trim()))
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn into_topic(self) -> Topic {
        let mut topic = Topic::new(
            self.topic.trim(),
            self.description(),
            Category::parse(&self.category),
        );
        if let Some(source) = self.source.filter(|s| !s.trim().is_empty()) {
            topic.source = source;
        }
        topic
    }
}

/// Directory of `request_*.json` files, consumed oldest first
pub struct RequestQueue {
    processed_dir: PathBuf,
    pending: VecDeque<PathBuf>,
    current: Option<PathBuf>,
}

impl RequestQueue {
    pub const DEFAULT_DIR: &'static str = "_auto_post_requests";
    pub const DEFAULT_PROCESSED_DIR: &'static str = "_auto_post_requests_processed";

    /// Scan `request_dir`; a missing directory is an empty queue
    pub fn open(request_dir: &Path, processed_dir: &Path) -> Result<Self> {
        let mut pending = Vec::new();

        if request_dir.is_dir() {
            let entries = std::fs::read_dir(request_dir)
                .with_context(|| format!("Failed to read request directory: {:?}", request_dir))?;
            for entry in entries {
                let path = entry?.path();
                if is_request_file(&path) {
                    pending.push(path);
                }
            }
        }

        // File names embed the request timestamp
        pending.sort();
        info!("Request queue: {} pending in {:?}", pending.len(), request_dir);

        Ok(Self {
            processed_dir: processed_dir.to_path_buf(),
            pending: pending.into(),
            current: None,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn is_request_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("request_") && n.ends_with(".json"))
}

/// Parse a single request file
pub fn parse_request_file(path: &Path) -> Result<PostRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse request file: {:?}", path))
}

impl RequestSource for RequestQueue {
    fn next(&mut self) -> Result<Option<Topic>> {
        while let Some(path) = self.pending.pop_front() {
            match parse_request_file(&path) {
                Ok(request) if !request.topic.trim().is_empty() => {
                    debug!("Request {:?}: \"{}\"", path, request.topic);
                    self.current = Some(path);
                    return Ok(Some(request.into_topic()));
                }
                Ok(_) => warn!("Skipping request without a topic: {:?}", path),
                Err(e) => warn!("Skipping unreadable request: {:#}", e),
            }
        }
        self.current = None;
        Ok(None)
    }

    /// Move the current request file into the processed directory
    fn mark_done(&mut self) -> Result<()> {
        let Some(path) = self.current.take() else {
            return Ok(());
        };
        std::fs::create_dir_all(&self.processed_dir).with_context(|| {
            format!("Failed to create processed directory: {:?}", self.processed_dir)
        })?;

        let target = match path.file_name() {
            Some(name) => self.processed_dir.join(name),
            None => return Ok(()),
        };
        std::fs::rename(&path, &target)
            .with_context(|| format!("Failed to move {:?} to {:?}", path, target))?;
        debug!("Moved request to {:?}", target);
        Ok(())
    }
}

/// Generated topic list: a JSON array of topics yielded in order
pub struct TopicFile {
    topics: VecDeque<Topic>,
}

impl TopicFile {
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topic file: {:?}", path))?;
        let topics: Vec<Topic> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse topic file: {:?}", path))?;
        Ok(Self {
            topics: topics.into(),
        })
    }
}

impl RequestSource for TopicFile {
    fn next(&mut self) -> Result<Option<Topic>> {
        Ok(self.topics.pop_front())
    }
}
