use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which of the three working-memory documents an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryDoc {
    TaskPlan,
    Findings,
    Progress,
}

impl MemoryDoc {
    pub fn file_name(&self) -> &'static str {
        match self {
            MemoryDoc::TaskPlan => "task_plan.md",
            MemoryDoc::Findings => "findings.md",
            MemoryDoc::Progress => "progress.md",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            MemoryDoc::TaskPlan => "Task Plan",
            MemoryDoc::Findings => "Findings",
            MemoryDoc::Progress => "Progress",
        }
    }
}

/// Status recorded in a document's YAML frontmatter (`§6.3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    InProgress,
    Completed,
    Failed,
}

/// Frontmatter metadata carried by every working-memory document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub session_id: String,
    pub status: DocStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Additional free-form metadata (e.g. a findings entry's source url).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Frontmatter {
    pub fn new(title: impl Into<String>, session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            session_id: session_id.into(),
            status: DocStatus::InProgress,
            created_at: now,
            updated_at: now,
            extra: BTreeMap::new(),
        }
    }
}

/// A document as returned by `read()`: frontmatter plus markdown body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub metadata: Frontmatter,
    pub body: String,
}
