use crate::error::{Error, Result};
use chrono::Utc;
use corex_types::{DocStatus, Frontmatter, MemoryDoc, MemoryDocument, SessionId};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const FENCE: &str = "---";

/// Durable three-file scratchpad for a session: `task_plan.md`,
/// `findings.md`, `progress.md` under
/// `<workspace_root>/<workspace_id>/sessions/<session_id>/`. Every path is
/// resolved through [`corex_core::resolve_within`] before any I/O, so a
/// crafted document name or a symlink planted inside the session directory
/// can't redirect a write outside the workspace root.
///
/// Writes within one process are serialized by `lock`; cross-process
/// coordination is explicitly out of scope.
pub struct MemoryStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new(workspace_root: &Path, workspace_id: &str, session_id: &SessionId) -> Self {
        let root = corex_core::session_root(workspace_root, workspace_id, session_id.as_str());
        Self { root, lock: Mutex::new(()) }
    }

    fn doc_path(&self, doc: MemoryDoc) -> Result<PathBuf> {
        corex_core::resolve_within(&self.root, doc.file_name()).map_err(Error::from)
    }

    /// Read a document's frontmatter and body. A missing document is not an
    /// error: it's treated as an empty, not-yet-started document so callers
    /// don't need a separate "does it exist" check before first write.
    pub async fn read(&self, doc: MemoryDoc, session_id: &SessionId) -> Result<MemoryDocument> {
        let path = self.doc_path(doc)?;
        let _guard = self.lock.lock().await;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_document(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(MemoryDocument { metadata: Frontmatter::new(doc.title(), session_id.as_str()), body: String::new() })
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Atomically replace a document's body, refreshing `updated_at`.
    /// Preserves the prior `created_at` and `session_id` if the document
    /// already existed.
    pub async fn write(&self, doc: MemoryDoc, body: impl Into<String>, session_id: &SessionId) -> Result<()> {
        let path = self.doc_path(doc)?;
        let _guard = self.lock.lock().await;

        let mut metadata = match tokio::fs::read_to_string(&path).await {
            Ok(existing) => parse_document(&existing)?.metadata,
            Err(_) => Frontmatter::new(doc.title(), session_id.as_str()),
        };
        metadata.updated_at = Utc::now();

        self.write_atomic(&path, &metadata, &body.into()).await
    }

    /// Append `body` under a timestamped header. Used for the append-only
    /// findings/progress documents; also legal on `task_plan` for agent
    /// revisions that don't replace the whole plan.
    pub async fn append(&self, doc: MemoryDoc, body: impl AsRef<str>, session_id: &SessionId) -> Result<()> {
        let path = self.doc_path(doc)?;
        let _guard = self.lock.lock().await;

        let (mut metadata, mut existing_body) = match tokio::fs::read_to_string(&path).await {
            Ok(existing) => {
                let parsed = parse_document(&existing)?;
                (parsed.metadata, parsed.body)
            }
            Err(_) => (Frontmatter::new(doc.title(), session_id.as_str()), String::new()),
        };
        metadata.updated_at = Utc::now();

        if !existing_body.is_empty() && !existing_body.ends_with('\n') {
            existing_body.push('\n');
        }
        existing_body.push_str(&format!("\n### {}\n\n{}\n", metadata.updated_at.to_rfc3339(), body.as_ref()));

        self.write_atomic(&path, &metadata, &existing_body).await
    }

    pub async fn mark_status(&self, doc: MemoryDoc, status: DocStatus, session_id: &SessionId) -> Result<()> {
        let path = self.doc_path(doc)?;
        let _guard = self.lock.lock().await;
        let MemoryDocument { mut metadata, body } = match tokio::fs::read_to_string(&path).await {
            Ok(existing) => parse_document(&existing)?,
            Err(_) => MemoryDocument { metadata: Frontmatter::new(doc.title(), session_id.as_str()), body: String::new() },
        };
        metadata.status = status;
        metadata.updated_at = Utc::now();
        self.write_atomic(&path, &metadata, &body).await
    }

    async fn write_atomic(&self, path: &Path, metadata: &Frontmatter, body: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let rendered = render_document(metadata, body)?;
        let tmp_path = path.with_extension("md.tmp");
        tokio::fs::write(&tmp_path, rendered).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

fn render_document(metadata: &Frontmatter, body: &str) -> Result<String> {
    let yaml = serde_yaml::to_string(metadata).map_err(|e| Error::Config(format!("frontmatter serialization: {e}")))?;
    Ok(format!("{FENCE}\n{yaml}{FENCE}\n\n{body}"))
}

fn parse_document(content: &str) -> Result<MemoryDocument> {
    let rest = content.strip_prefix(FENCE).ok_or_else(|| {
        Error::Config("document is missing a YAML frontmatter fence".into())
    })?;
    let end = rest
        .find(FENCE)
        .ok_or_else(|| Error::Config("document frontmatter has no closing fence".into()))?;
    let yaml = &rest[..end];
    let body = rest[end + FENCE.len()..].trim_start_matches('\n');

    let metadata: Frontmatter =
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("invalid frontmatter: {e}")))?;
    Ok(MemoryDocument { metadata, body: body.to_string() })
}
