use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::models::FinalDocument;

/// Failures persisting a document
#[derive(Debug, Error)]
pub enum EmitError {
    /// A post with the same day and title already exists; not a pipeline defect
    #[error("post already exists: {0:?}")]
    AlreadyExists(PathBuf),
    #[error("failed to write {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persists a validated document and returns where it went
pub trait PostEmitter {
    fn emit(&self, document: &FinalDocument) -> Result<PathBuf, EmitError>;
}

static SLUG_DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

/// File-name slug: word characters (Hangul included), whitespace as `-`
pub fn slugify(title: &str) -> String {
    let slug = SLUG_DISALLOWED.replace_all(title, "");
    let slug = WHITESPACE.replace_all(&slug, "-");
    let slug = HYPHENS.replace_all(&slug, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Jekyll `_posts` directory writer
pub struct JekyllEmitter {
    posts_dir: PathBuf,
}

impl JekyllEmitter {
    pub const DEFAULT_DIR: &'static str = "_posts";

    pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
        }
    }

    pub fn path_for(&self, document: &FinalDocument) -> PathBuf {
        self.posts_dir
            .join(format!("{}-{}.md", document.day(), slugify(&document.title)))
    }

    /// Full file content: front matter, a blank line, then the body
    pub fn render(document: &FinalDocument) -> String {
        format!("{}\n\n{}", front_matter(document), render_body(document))
    }
}

/// YAML double-quoted scalar
fn yaml_quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn front_matter(document: &FinalDocument) -> String {
    let mut fm = format!(
        "---\nlayout: post\ntitle: {}\ndate: {}\nauthor: {}\ncategory: {}",
        yaml_quote(&document.title),
        document.date,
        document.author,
        document.category,
    );
    if !document.tags.is_empty() {
        let tags: Vec<String> = document.tags.iter().map(|t| yaml_quote(t)).collect();
        fm.push_str(&format!("\ntags: [{}]", tags.join(", ")));
    }
    fm.push_str("\nviews: 0\n---");
    fm
}

/// Body with a References section added when footnotes have nowhere to point
fn render_body(document: &FinalDocument) -> String {
    let mut body = document.body.trim().to_string();
    if body.contains("[^") && !body.contains("## References") {
        body.push_str("\n\n## References\n\n");
        if let Some(url) = &document.source_url {
            body.push_str(&format!("[^1]: {}\n", url));
        }
    }
    body
}

/// Body of a rendered post, without its front matter
pub fn strip_front_matter(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("---\n") else {
        return text;
    };
    match rest.find("\n---") {
        Some(end) => rest[end + 4..].trim_start_matches('\n'),
        None => text,
    }
}

fn write_new(path: &Path, content: &str) -> Result<(), EmitError> {
    let write_failed = |source| EmitError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(EmitError::AlreadyExists(path.to_path_buf()));
        }
        Err(e) => return Err(write_failed(e)),
    };
    file.write_all(content.as_bytes()).map_err(write_failed)
}

impl PostEmitter for JekyllEmitter {
    fn emit(&self, document: &FinalDocument) -> Result<PathBuf, EmitError> {
        std::fs::create_dir_all(&self.posts_dir).map_err(|source| EmitError::WriteFailed {
            path: self.posts_dir.clone(),
            source,
        })?;

        let path = self.path_for(document);
        write_new(&path, &Self::render(document))?;
        info!("Wrote post to {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn document(title: &str, body: &str) -> FinalDocument {
        FinalDocument {
            title: title.to_string(),
            body: body.to_string(),
            category: "dev".to_string(),
            tags: vec!["rust".to_string(), "async".to_string()],
            date: "2026-10-16 09:30:00 +0900".to_string(),
            author: "rldhkstopic".to_string(),
            source_url: Some("https://tokio.rs/blog".to_string()),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("러스트 비동기: tokio 정리!"), "러스트-비동기-tokio-정리");
        assert_eq!(slugify("  a -- b  "), "a-b");
        assert_eq!(slugify("???"), "untitled");
    }

    #[test]
    fn test_front_matter() {
        let rendered = JekyllEmitter::render(&document("\"Send\" 바운드 이해", "본문이다."));

        assert!(rendered.starts_with("---\nlayout: post\ntitle: \"\\\"Send\\\" 바운드 이해\"\n"));
        assert!(rendered.contains("date: 2026-10-16 09:30:00 +0900\n"));
        assert!(rendered.contains("tags: [\"rust\", \"async\"]\nviews: 0\n---\n\n본문이다."));
    }

    #[test]
    fn test_front_matter_escapes_backslashes() {
        let mut doc = document(r"C:\path 경로 정리", "본문이다.");
        doc.tags = vec![r#"say "hi""#.to_string(), r"a\b".to_string()];

        let rendered = JekyllEmitter::render(&doc);

        assert!(rendered.contains(r#"title: "C:\\path 경로 정리""#));
        assert!(rendered.contains(r#"tags: ["say \"hi\"", "a\\b"]"#));
    }

    #[test]
    fn test_references_appended_for_footnotes() {
        let rendered = JekyllEmitter::render(&document("각주", "런타임 구조다[^1]."));
        assert!(rendered.ends_with("## References\n\n[^1]: https://tokio.rs/blog\n"));

        let rendered = JekyllEmitter::render(&document(
            "각주",
            "런타임 구조다[^1].\n\n## References\n\n[^1]: https://example.com",
        ));
        assert_eq!(rendered.matches("## References").count(), 1);
    }

    #[test]
    fn test_strip_front_matter() {
        let rendered = JekyllEmitter::render(&document("제목", "## 개요\n\n본문이다."));

        assert_eq!(strip_front_matter(&rendered), "## 개요\n\n본문이다.");
        assert_eq!(strip_front_matter("본문만 있다."), "본문만 있다.");
        assert_eq!(strip_front_matter("---\n닫히지 않음"), "---\n닫히지 않음");
    }

    #[test]
    fn test_emit_writes_once() {
        let dir = TempDir::new().unwrap();
        let emitter = JekyllEmitter::new(dir.path().join("_posts"));
        let doc = document("러스트 비동기", "본문이다.");

        let path = emitter.emit(&doc).unwrap();
        assert!(path.ends_with("2026-10-16-러스트-비동기.md"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("본문이다."));

        let err = emitter.emit(&doc).unwrap_err();
        assert!(matches!(err, EmitError::AlreadyExists(p) if p == path));
    }
}
