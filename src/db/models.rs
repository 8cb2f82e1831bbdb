use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, UnknownVariant> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, UnknownVariant> {
                value.parse()
            }
        }
    };
}

text_enum!(
    /// Lifecycle of a lesson's video, driven by upload brokering and Mux webhooks.
    UploadStatus, "upload status", {
        Pending => "pending",
        Uploading => "uploading",
        Processing => "processing",
        Ready => "ready",
        Error => "error",
    }
);

text_enum!(CourseStatus, "course status", {
    Draft => "draft",
    Published => "published",
});

text_enum!(VideoStatus, "video status", {
    Processing => "processing",
    Ready => "ready",
    Error => "error",
});

text_enum!(Role, "role", {
    Coach => "coach",
    Student => "student",
});

/// Renders whole seconds as `m:ss`; `None` and zero render as `0:00`.
pub fn format_duration(seconds: Option<i32>) -> String {
    match seconds {
        Some(s) if s > 0 => format!("{}:{:02}", s / 60, s % 60),
        _ => "0:00".to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: Uuid,
    pub coach_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[sqlx(try_from = "String")]
    pub status: CourseStatus,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub coach_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub status: Option<CourseStatus>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewModule {
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: Uuid,
    pub module_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub mux_upload_id: Option<String>,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    #[sqlx(try_from = "String")]
    pub upload_status: UploadStatus,
    pub video_duration: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    pub module_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

/// Columns a coach may edit directly. Video columns are owned by the Mux flow.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order_index: Option<i32>,
}

/// Video-related columns written by upload brokering and webhook handling.
/// `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonVideoUpdate {
    pub mux_upload_id: Option<String>,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub upload_status: Option<UploadStatus>,
    pub video_duration: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub upload_status: UploadStatus,
    pub video_duration: Option<i32>,
    pub duration_label: String,
}

impl From<Lesson> for LessonSummary {
    fn from(lesson: Lesson) -> Self {
        Self {
            duration_label: format_duration(lesson.video_duration),
            id: lesson.id,
            title: lesson.title,
            description: lesson.description,
            order_index: lesson.order_index,
            mux_asset_id: lesson.mux_asset_id,
            mux_playback_id: lesson.mux_playback_id,
            upload_status: lesson.upload_status,
            video_duration: lesson.video_duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<LessonSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseOutline {
    #[serde(flatten)]
    pub course: Course,
    pub modules: Vec<ModuleWithLessons>,
}

impl CourseOutline {
    /// Groups lessons under their modules. Input order is preserved within each module.
    pub fn assemble(course: Course, modules: Vec<Module>, lessons: Vec<Lesson>) -> Self {
        let mut grouped: Vec<ModuleWithLessons> = modules
            .into_iter()
            .map(|module| ModuleWithLessons { module, lessons: Vec::new() })
            .collect();

        for lesson in lessons {
            if let Some(entry) = grouped.iter_mut().find(|m| m.module.id == lesson.module_id) {
                entry.lessons.push(lesson.into());
            }
        }

        Self { course, modules: grouped }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(student_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            enrolled_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseOutline,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnrolledStudent {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LessonProgress {
    pub id: Uuid,
    pub student_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: bool,
    pub progress_seconds: i32,
    pub last_watched_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressUpdate {
    pub student_id: Uuid,
    pub lesson_id: Uuid,
    pub completed: Option<bool>,
    pub progress_seconds: Option<i32>,
}

impl ProgressUpdate {
    /// Folds this update into the stored row. Omitted fields keep their stored
    /// value and `completed_at` is stamped only the first time the lesson is completed.
    pub fn merge(&self, existing: Option<&LessonProgress>, now: DateTime<Utc>) -> LessonProgress {
        let completed = self
            .completed
            .or(existing.map(|p| p.completed))
            .unwrap_or(false);
        let completed_at = existing
            .and_then(|p| p.completed_at)
            .or_else(|| completed.then_some(now));

        LessonProgress {
            id: existing.map_or_else(Uuid::new_v4, |p| p.id),
            student_id: self.student_id,
            lesson_id: self.lesson_id,
            completed,
            progress_seconds: self
                .progress_seconds
                .or(existing.map(|p| p.progress_seconds))
                .unwrap_or(0),
            last_watched_at: now,
            completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Thread {
    pub id: Uuid,
    pub course_id: Uuid,
    pub lesson_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub course_id: Uuid,
    pub lesson_id: Option<Uuid>,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reply {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    pub author_id: Uuid,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadWithReplies {
    #[serde(flatten)]
    pub thread: Thread,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub course_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub duration: Option<i32>,
    pub created_by: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub status: VideoStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub course_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub duration: Option<i32>,
    #[serde(alias = "user_id")]
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub mux_asset_id: Option<String>,
    pub mux_playback_id: Option<String>,
    pub duration: Option<i32>,
    pub status: Option<VideoStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(module_id: Uuid, title: &str, order_index: i32) -> Lesson {
        let now = Utc::now();
        Lesson {
            id: Uuid::new_v4(),
            module_id,
            title: title.to_string(),
            description: None,
            order_index,
            mux_upload_id: None,
            mux_asset_id: None,
            mux_playback_id: None,
            upload_status: UploadStatus::Pending,
            video_duration: Some(95),
            created_at: now,
            updated_at: now,
        }
    }

    fn module(course_id: Uuid, title: &str, order_index: i32) -> Module {
        let now = Utc::now();
        Module {
            id: Uuid::new_v4(),
            course_id,
            title: title.to_string(),
            description: None,
            order_index,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "0:00");
        assert_eq!(format_duration(Some(0)), "0:00");
        assert_eq!(format_duration(Some(5)), "0:05");
        assert_eq!(format_duration(Some(95)), "1:35");
        assert_eq!(format_duration(Some(3600)), "60:00");
    }

    #[test]
    fn test_text_enums_parse() {
        assert_eq!("ready".parse::<UploadStatus>().unwrap(), UploadStatus::Ready);
        assert_eq!(UploadStatus::try_from("uploading".to_string()).unwrap(), UploadStatus::Uploading);
        assert!("done".parse::<UploadStatus>().is_err());
        assert_eq!(CourseStatus::Draft.as_str(), "draft");
        assert_eq!(serde_json::to_value(VideoStatus::Error).unwrap(), "error");
    }

    #[test]
    fn test_error_variants_convert_from_text() {
        assert_eq!(UploadStatus::try_from("error".to_string()).unwrap(), UploadStatus::Error);
        assert_eq!(VideoStatus::try_from("error".to_string()).unwrap(), VideoStatus::Error);

        let err = VideoStatus::try_from("failed".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "unknown video status value: failed");
    }

    fn progress_update(completed: Option<bool>, seconds: Option<i32>) -> ProgressUpdate {
        ProgressUpdate {
            student_id: Uuid::nil(),
            lesson_id: Uuid::nil(),
            completed,
            progress_seconds: seconds,
        }
    }

    #[test]
    fn test_progress_completed_at_is_stamped_once() {
        let first = Utc::now() - chrono::Duration::days(1);
        let later = Utc::now();

        let watching = progress_update(None, Some(30)).merge(None, first);
        assert!(!watching.completed);
        assert_eq!(watching.progress_seconds, 30);
        assert!(watching.completed_at.is_none());

        let done = progress_update(Some(true), None).merge(Some(&watching), first);
        assert_eq!(done.id, watching.id);
        assert_eq!(done.progress_seconds, 30);
        assert_eq!(done.completed_at, Some(first));

        let rewatched = progress_update(Some(true), Some(45)).merge(Some(&done), later);
        assert_eq!(rewatched.completed_at, Some(first));
        assert_eq!(rewatched.last_watched_at, later);
        assert_eq!(rewatched.progress_seconds, 45);

        let reset = progress_update(Some(false), None).merge(Some(&rewatched), later);
        assert!(!reset.completed);
        assert_eq!(reset.completed_at, Some(first));
    }

    #[test]
    fn test_progress_first_write_completed() {
        let now = Utc::now();
        let progress = progress_update(Some(true), None).merge(None, now);
        assert!(progress.completed);
        assert_eq!(progress.progress_seconds, 0);
        assert_eq!(progress.completed_at, Some(now));
    }

    #[test]
    fn test_profile_role() {
        let now = Utc::now();
        let mut profile = Profile {
            id: Uuid::new_v4(),
            email: None,
            full_name: None,
            avatar_url: None,
            role: Some("coach".to_string()),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(profile.role(), Some(Role::Coach));

        profile.role = Some("admin".to_string());
        assert_eq!(profile.role(), None);
    }

    #[test]
    fn test_course_outline_groups_lessons() {
        let now = Utc::now();
        let course = Course {
            id: Uuid::new_v4(),
            coach_id: Uuid::new_v4(),
            title: "Serve mechanics".to_string(),
            description: None,
            price: Some(49.0),
            status: CourseStatus::Draft,
            thumbnail_url: None,
            created_at: now,
            updated_at: now,
        };
        let intro = module(course.id, "Intro", 0);
        let drills = module(course.id, "Drills", 1);
        let lessons = vec![
            lesson(drills.id, "Toss", 0),
            lesson(intro.id, "Welcome", 0),
            lesson(drills.id, "Contact", 1),
            lesson(Uuid::new_v4(), "Orphan", 0),
        ];

        let outline = CourseOutline::assemble(course, vec![intro, drills], lessons);

        assert_eq!(outline.modules.len(), 2);
        assert_eq!(outline.modules[0].lessons.len(), 1);
        assert_eq!(outline.modules[1].lessons[0].title, "Toss");
        assert_eq!(outline.modules[1].lessons[1].title, "Contact");
        assert_eq!(outline.modules[1].lessons[1].duration_label, "1:35");

        let json = serde_json::to_value(&outline).unwrap();
        assert_eq!(json["title"], "Serve mechanics");
        assert_eq!(json["status"], "draft");
        assert_eq!(json["modules"][0]["title"], "Intro");
    }
}
