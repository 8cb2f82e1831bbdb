//! Mux webhook handling.
//!
//! Events are turned into a [`WebhookPlan`] by a pure mapping, then applied to
//! the lesson and video rows through the repository.

pub mod events;
pub mod signature;

pub use events::{plan, LessonLookup, MuxEvent, WebhookPlan};

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::Lesson;
use crate::db::CourseRepository;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookOutcome {
    pub lesson_id: Option<Uuid>,
    pub videos_updated: u64,
}

async fn resolve_lesson(repo: &dyn CourseRepository, lookups: &[LessonLookup]) -> Result<Option<Lesson>> {
    for lookup in lookups {
        let found = match lookup {
            LessonLookup::ById(id) => repo.get_lesson(*id).await?,
            LessonLookup::ByUploadId(upload_id) => repo.find_lesson_by_upload_id(upload_id).await?,
            LessonLookup::ByAssetId(asset_id) => repo.find_lesson_by_asset_id(asset_id).await?,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

pub async fn apply(repo: &dyn CourseRepository, event_kind: &str, plan: &WebhookPlan) -> Result<WebhookOutcome> {
    let mut outcome = WebhookOutcome::default();

    match resolve_lesson(repo, &plan.lookups).await? {
        Some(lesson) => {
            repo.update_lesson_video(lesson.id, &plan.lesson_update).await?;
            info!(
                "Lesson {} updated from {} (status: {:?})",
                lesson.id,
                event_kind,
                plan.lesson_update.upload_status
            );
            outcome.lesson_id = Some(lesson.id);
        }
        None => warn!("No lesson matches {} ({:?})", event_kind, plan.lookups),
    }

    if let Some((asset_id, status)) = &plan.video_status {
        outcome.videos_updated = repo.set_video_status_by_asset(asset_id, *status).await?;
    }

    Ok(outcome)
}
