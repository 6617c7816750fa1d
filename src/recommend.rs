use serde::Serialize;

use crate::catalog::{Catalog, SessionRef};
use crate::models::SessionStatus;
use crate::progress::ProgressStore;

pub const DEFAULT_REVIEW_LIMIT: usize = 3;

/// First session, in catalog order, that has no progress yet or is still
/// marked not started.
pub fn next_recommended<'a, P>(catalog: &'a Catalog, progress: &P) -> Option<SessionRef<'a>>
where
    P: ProgressStore + ?Sized,
{
    catalog.sessions().find(|r| {
        matches!(
            progress.status(r.topic_id(), r.session_id()),
            None | Some(SessionStatus::NotStarted)
        )
    })
}

/// Sessions marked as needing work, in catalog order, at most `limit` of them.
pub fn sessions_needing_review<'a, P>(
    catalog: &'a Catalog,
    progress: &P,
    limit: usize,
) -> Vec<SessionRef<'a>>
where
    P: ProgressStore + ?Sized,
{
    catalog
        .sessions()
        .filter(|r| progress.status(r.topic_id(), r.session_id()) == Some(SessionStatus::NeedsWork))
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    pub topic_id: String,
    pub topic_title: String,
    pub session_id: String,
    pub session_title: String,
    pub duration_minutes: u32,
    pub status: SessionStatus,
}

impl SessionEntry {
    pub fn new<P: ProgressStore + ?Sized>(r: SessionRef<'_>, progress: &P) -> Self {
        Self {
            topic_id: r.topic.id.clone(),
            topic_title: r.topic.title.clone(),
            session_id: r.session.id.clone(),
            session_title: r.session.title.clone(),
            duration_minutes: r.session.duration_minutes(),
            status: progress
                .status(r.topic_id(), r.session_id())
                .unwrap_or(SessionStatus::NotStarted),
        }
    }
}

// What the dashboard offers as one-key actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickActions {
    pub next: Option<SessionEntry>,
    pub needs_review: Vec<SessionEntry>,
}

pub fn quick_actions<P>(catalog: &Catalog, progress: &P, review_limit: usize) -> QuickActions
where
    P: ProgressStore + ?Sized,
{
    QuickActions {
        next: next_recommended(catalog, progress).map(|r| SessionEntry::new(r, progress)),
        needs_review: sessions_needing_review(catalog, progress, review_limit)
            .into_iter()
            .map(|r| SessionEntry::new(r, progress))
            .collect(),
    }
}
