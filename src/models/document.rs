use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use super::{GenerationAttempt, Topic, Verdict};

/// How a successful run cleared the quality gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Passed every heuristic of the full validator
    Accepted,
    /// Produced after the retry budget ran out; only the relaxed gate passed
    BestEffort,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::BestEffort => f.write_str("best-effort"),
        }
    }
}

/// Validated post ready to be persisted
#[derive(Debug, Clone, Serialize)]
pub struct FinalDocument {
    pub title: String,
    pub body: String,
    pub category: String,
    pub tags: Vec<String>,
    /// Front matter timestamp, `YYYY-MM-DD HH:MM:SS +0900`
    pub date: String,
    pub author: String,
    /// Reference link carried over from the topic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl FinalDocument {
    pub fn from_topic(topic: &Topic, body: String, date: String, author: &str) -> Self {
        Self {
            title: topic.title.clone(),
            body,
            category: topic.category.to_string(),
            tags: topic.tags.clone(),
            date,
            author: author.to_string(),
            source_url: topic.source_url.clone(),
        }
    }

    /// Calendar day part of the timestamp
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Front matter timestamp in Korea Standard Time
pub fn kst_timestamp(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(KST_OFFSET_SECS) {
        Some(kst) => now.with_timezone(&kst).format("%Y-%m-%d %H:%M:%S %z").to_string(),
        None => now.format("%Y-%m-%d %H:%M:%S %z").to_string(),
    }
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub document: FinalDocument,
    pub quality: Quality,
    /// Verdict of the full validator on the final text
    pub verdict: Verdict,
    pub attempts: Vec<GenerationAttempt>,
}

impl PipelineRun {
    pub fn is_best_effort(&self) -> bool {
        self.quality == Quality::BestEffort
    }
}
