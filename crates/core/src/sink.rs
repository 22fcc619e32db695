//! Hand-off point for finished task drafts.
//!
//! The relay never stores drafts itself; when a session ends it passes the
//! final draft to a [`DraftSink`], which owns downstream storage or sync.

use crate::task_draft::TaskDraft;
use async_trait::async_trait;
use tracing::info;

/// Receives the final draft of each session.
#[async_trait]
pub trait DraftSink: Send + Sync {
    async fn submit(&self, session_id: &str, draft: TaskDraft) -> anyhow::Result<()>;
}

/// A sink that records drafts in the structured log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDraftSink;

#[async_trait]
impl DraftSink for LogDraftSink {
    async fn submit(&self, session_id: &str, draft: TaskDraft) -> anyhow::Result<()> {
        info!(
            session_id,
            title = ?draft.title,
            assignee = ?draft.assignee,
            due_date = ?draft.due_date,
            priority = ?draft.priority,
            "Task draft finalized."
        );
        Ok(())
    }
}
