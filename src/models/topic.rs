use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Content category of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Dev,
    Study,
    Daily,
    #[default]
    Document,
}

impl Category {
    /// Parse a category label, falling back to `Document` for anything unknown
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "dev" => Self::Dev,
            "study" => Self::Study,
            "daily" => Self::Daily,
            _ => Self::Document,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Study => "study",
            Self::Daily => "daily",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

/// Sources whose topics are rendered as a news digest instead of a regular post
pub const DIGEST_SOURCES: &[&str] = &["bloomberg_rss", "digest"];

/// A unit of work: what to write about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

fn default_source() -> String {
    "auto".to_string()
}

impl Topic {
    pub fn new(title: impl Into<String>, description: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category,
            tags: Vec::new(),
            source: default_source(),
            source_url: None,
        }
    }

    /// Whether this topic is a collected-news digest
    pub fn is_digest(&self) -> bool {
        DIGEST_SOURCES.contains(&self.source.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("Dev"), Category::Dev);
        assert_eq!(Category::parse(" daily "), Category::Daily);
        assert_eq!(Category::parse("stock"), Category::Document);
    }

    #[test]
    fn test_parse_topic_json() {
        let json = r#"{
            "title": "2026-10-15 전일 경제 뉴스 정리",
            "description": "전일 뉴스 요약",
            "category": "document",
            "tags": ["경제뉴스", "시장"],
            "source": "bloomberg_rss",
            "source_url": "https://feeds.bloomberg.com/markets/news.rss"
        }"#;

        let topic: Topic = serde_json::from_str(json).unwrap();

        assert_eq!(topic.category, Category::Document);
        assert_eq!(topic.tags.len(), 2);
        assert!(topic.is_digest());
    }

    #[test]
    fn test_topic_defaults() {
        let topic: Topic = serde_json::from_str(r#"{"title": "Rust 소유권"}"#).unwrap();

        assert_eq!(topic.category, Category::Document);
        assert_eq!(topic.source, "auto");
        assert!(topic.source_url.is_none());
        assert!(!topic.is_digest());
    }
}
