use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{
    Course, CoursePatch, CourseStatus, EnrolledStudent, Enrollment, Lesson, LessonPatch,
    LessonProgress, LessonVideoUpdate, Module, NewCourse, NewLesson, NewModule, NewReply,
    NewThread, NewVideo, Profile, ProfileUpdate, ProgressUpdate, Reply, Thread, UploadStatus, Video,
    VideoPatch, VideoStatus,
};
use crate::error::{AppError, DatabaseError};
use crate::Result;

/// Storage port for the course catalog. Handlers only see this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>>;
    /// Creates the profile row on first call; later calls only overwrite the given fields.
    async fn upsert_profile(
        &self,
        id: Uuid,
        email: Option<String>,
        update: &ProfileUpdate,
    ) -> Result<Profile>;

    async fn create_course(&self, course: &NewCourse) -> Result<Course>;
    async fn get_course(&self, id: Uuid) -> Result<Option<Course>>;
    async fn update_course(&self, id: Uuid, patch: &CoursePatch) -> Result<Option<Course>>;
    async fn list_courses_by_coach(&self, coach_id: Uuid) -> Result<Vec<Course>>;

    async fn create_module(&self, module: &NewModule) -> Result<Module>;
    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<Module>>;

    async fn create_lesson(&self, lesson: &NewLesson) -> Result<Lesson>;
    async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>>;
    async fn update_lesson(&self, id: Uuid, patch: &LessonPatch) -> Result<Option<Lesson>>;
    async fn list_lessons_by_module(&self, module_id: Uuid) -> Result<Vec<Lesson>>;
    /// Lessons of every module in the course, ordered by module then lesson position.
    async fn list_lessons_by_course(&self, course_id: Uuid) -> Result<Vec<Lesson>>;
    async fn find_lesson_by_upload_id(&self, upload_id: &str) -> Result<Option<Lesson>>;
    async fn find_lesson_by_asset_id(&self, asset_id: &str) -> Result<Option<Lesson>>;
    async fn update_lesson_video(
        &self,
        id: Uuid,
        update: &LessonVideoUpdate,
    ) -> Result<Option<Lesson>>;

    async fn create_video(&self, video: &NewVideo) -> Result<Video>;
    async fn update_video(&self, id: Uuid, patch: &VideoPatch) -> Result<Option<Video>>;
    async fn set_video_status_by_asset(&self, asset_id: &str, status: VideoStatus) -> Result<u64>;

    async fn create_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Enrollment>;
    async fn get_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>>;
    async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>>;
    async fn list_students_by_course(&self, course_id: Uuid) -> Result<Vec<EnrolledStudent>>;

    async fn upsert_progress(&self, update: &ProgressUpdate) -> Result<LessonProgress>;
    async fn get_progress(&self, student_id: Uuid, lesson_id: Uuid) -> Result<Option<LessonProgress>>;

    async fn create_thread(&self, thread: &NewThread) -> Result<Thread>;
    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>>;
    async fn list_threads_by_course(&self, course_id: Uuid) -> Result<Vec<Thread>>;
    async fn create_reply(&self, thread_id: Uuid, reply: &NewReply) -> Result<Option<Reply>>;
    async fn list_replies(&self, thread_id: Uuid) -> Result<Vec<Reply>>;
}

pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self::new(Arc::new(pool)))
    }

    /// Builds a pool that connects on first use.
    pub fn new_lazy(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> &PgPool {
        self.pool.as_ref()
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    pub async fn begin_transaction(&self) -> Result<Transaction<'_, Postgres>> {
        Ok(self.pool.as_ref().begin().await?)
    }

    async fn insert_reply_with_transaction(
        &self,
        thread_id: Uuid,
        reply: &NewReply,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<Option<Reply>> {
        let now = Utc::now();

        let touched = sqlx::query("UPDATE threads SET updated_at = $1 WHERE id = $2")
            .bind(now)
            .bind(thread_id)
            .execute(&mut **transaction)
            .await?;

        if touched.rows_affected() == 0 {
            return Ok(None);
        }

        let reply = sqlx::query_as::<_, Reply>(
            r#"
            INSERT INTO replies (id, thread_id, author_id, body, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(thread_id)
        .bind(reply.author_id)
        .bind(&reply.body)
        .bind(now)
        .fetch_one(&mut **transaction)
        .await?;

        Ok(Some(reply))
    }

    async fn upsert_progress_with_transaction(
        &self,
        update: &ProgressUpdate,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<LessonProgress> {
        let existing = sqlx::query_as::<_, LessonProgress>(
            "SELECT * FROM lesson_progress WHERE student_id = $1 AND lesson_id = $2 FOR UPDATE",
        )
        .bind(update.student_id)
        .bind(update.lesson_id)
        .fetch_optional(&mut **transaction)
        .await?;

        let merged = update.merge(existing.as_ref(), Utc::now());

        let progress = sqlx::query_as::<_, LessonProgress>(
            r#"
            INSERT INTO lesson_progress (id, student_id, lesson_id, completed, progress_seconds,
                                         last_watched_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, lesson_id) DO UPDATE SET
                completed = EXCLUDED.completed,
                progress_seconds = EXCLUDED.progress_seconds,
                last_watched_at = EXCLUDED.last_watched_at,
                completed_at = COALESCE(lesson_progress.completed_at, EXCLUDED.completed_at)
            RETURNING *
            "#,
        )
        .bind(merged.id)
        .bind(merged.student_id)
        .bind(merged.lesson_id)
        .bind(merged.completed)
        .bind(merged.progress_seconds)
        .bind(merged.last_watched_at)
        .bind(merged.completed_at)
        .fetch_one(&mut **transaction)
        .await?;

        Ok(progress)
    }
}

#[async_trait]
impl CourseRepository for DbOperations {
    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(profile)
    }

    async fn upsert_profile(
        &self,
        id: Uuid,
        email: Option<String>,
        update: &ProfileUpdate,
    ) -> Result<Profile> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, email, full_name, avatar_url, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (id) DO UPDATE SET
                email = COALESCE($2, profiles.email),
                full_name = COALESCE($3, profiles.full_name),
                avatar_url = COALESCE($4, profiles.avatar_url),
                role = COALESCE($5, profiles.role),
                updated_at = $6
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(&update.full_name)
        .bind(&update.avatar_url)
        .bind(update.role.map(|r| r.as_str()))
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(profile)
    }

    async fn create_course(&self, course: &NewCourse) -> Result<Course> {
        let now = Utc::now();
        let course = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, coach_id, title, description, price, status, thumbnail_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(course.coach_id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(course.price)
        .bind(CourseStatus::Draft.as_str())
        .bind(&course.thumbnail_url)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(course)
    }

    async fn update_course(&self, id: Uuid, patch: &CoursePatch) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                status = COALESCE($5, status),
                thumbnail_url = COALESCE($6, thumbnail_url),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.price)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.thumbnail_url)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(course)
    }

    async fn list_courses_by_coach(&self, coach_id: Uuid) -> Result<Vec<Course>> {
        let courses = sqlx::query_as::<_, Course>(
            "SELECT * FROM courses WHERE coach_id = $1 ORDER BY created_at DESC",
        )
        .bind(coach_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(courses)
    }

    async fn create_module(&self, module: &NewModule) -> Result<Module> {
        let now = Utc::now();
        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (id, course_id, title, description, order_index, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(module.course_id)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.order_index)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(module)
    }

    async fn list_modules(&self, course_id: Uuid) -> Result<Vec<Module>> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT * FROM modules WHERE course_id = $1 ORDER BY order_index, created_at",
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(modules)
    }

    async fn create_lesson(&self, lesson: &NewLesson) -> Result<Lesson> {
        let now = Utc::now();
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (id, module_id, title, description, order_index, upload_status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lesson.module_id)
        .bind(&lesson.title)
        .bind(&lesson.description)
        .bind(lesson.order_index)
        .bind(UploadStatus::Pending.as_str())
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(lesson)
    }

    async fn get_lesson(&self, id: Uuid) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(lesson)
    }

    async fn update_lesson(&self, id: Uuid, patch: &LessonPatch) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            UPDATE lessons SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                order_index = COALESCE($4, order_index),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.order_index)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(lesson)
    }

    async fn list_lessons_by_module(&self, module_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE module_id = $1 ORDER BY order_index, created_at",
        )
        .bind(module_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(lessons)
    }

    async fn list_lessons_by_course(&self, course_id: Uuid) -> Result<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.* FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            ORDER BY m.order_index, l.order_index, l.created_at
            "#,
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(lessons)
    }

    async fn find_lesson_by_upload_id(&self, upload_id: &str) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE mux_upload_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(upload_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(lesson)
    }

    async fn find_lesson_by_asset_id(&self, asset_id: &str) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM lessons WHERE mux_asset_id = $1 ORDER BY updated_at DESC LIMIT 1",
        )
        .bind(asset_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(lesson)
    }

    async fn update_lesson_video(
        &self,
        id: Uuid,
        update: &LessonVideoUpdate,
    ) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            UPDATE lessons SET
                mux_upload_id = COALESCE($2, mux_upload_id),
                mux_asset_id = COALESCE($3, mux_asset_id),
                mux_playback_id = COALESCE($4, mux_playback_id),
                upload_status = COALESCE($5, upload_status),
                video_duration = COALESCE($6, video_duration),
                updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.mux_upload_id)
        .bind(&update.mux_asset_id)
        .bind(&update.mux_playback_id)
        .bind(update.upload_status.map(|s| s.as_str()))
        .bind(update.video_duration)
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(lesson)
    }

    async fn create_video(&self, video: &NewVideo) -> Result<Video> {
        let now = Utc::now();
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (id, title, description, mux_asset_id, mux_playback_id, course_id,
                                lesson_id, duration, created_by, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.mux_asset_id)
        .bind(&video.mux_playback_id)
        .bind(video.course_id)
        .bind(video.lesson_id)
        .bind(video.duration)
        .bind(video.created_by)
        .bind(VideoStatus::Processing.as_str())
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(video)
    }

    async fn update_video(&self, id: Uuid, patch: &VideoPatch) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            UPDATE videos SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                mux_asset_id = COALESCE($4, mux_asset_id),
                mux_playback_id = COALESCE($5, mux_playback_id),
                duration = COALESCE($6, duration),
                status = COALESCE($7, status),
                updated_at = $8
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(&patch.mux_asset_id)
        .bind(&patch.mux_playback_id)
        .bind(patch.duration)
        .bind(patch.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(video)
    }

    async fn set_video_status_by_asset(&self, asset_id: &str, status: VideoStatus) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE videos SET status = $1, updated_at = $2 WHERE mux_asset_id = $3",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(asset_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let enrollment = Enrollment::new(student_id, course_id);
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, enrolled_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.course_id)
        .bind(enrollment.enrolled_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(enrollment)
    }

    async fn get_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(enrollment)
    }

    async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>> {
        let enrollments = sqlx::query_as::<_, Enrollment>(
            "SELECT * FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at DESC",
        )
        .bind(student_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(enrollments)
    }

    async fn list_students_by_course(&self, course_id: Uuid) -> Result<Vec<EnrolledStudent>> {
        let students = sqlx::query_as::<_, EnrolledStudent>(
            r#"
            SELECT e.id AS enrollment_id, e.student_id, e.enrolled_at,
                   p.full_name, p.email, p.avatar_url
            FROM enrollments e
            LEFT JOIN profiles p ON p.id = e.student_id
            WHERE e.course_id = $1
            ORDER BY e.enrolled_at
            "#,
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(students)
    }

    async fn upsert_progress(&self, update: &ProgressUpdate) -> Result<LessonProgress> {
        let mut transaction = self.begin_transaction().await?;

        match self.upsert_progress_with_transaction(update, &mut transaction).await {
            Ok(progress) => {
                transaction.commit().await?;
                Ok(progress)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    async fn get_progress(&self, student_id: Uuid, lesson_id: Uuid) -> Result<Option<LessonProgress>> {
        let progress = sqlx::query_as::<_, LessonProgress>(
            "SELECT * FROM lesson_progress WHERE student_id = $1 AND lesson_id = $2",
        )
        .bind(student_id)
        .bind(lesson_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(progress)
    }

    async fn create_thread(&self, thread: &NewThread) -> Result<Thread> {
        let now = Utc::now();
        let thread = sqlx::query_as::<_, Thread>(
            r#"
            INSERT INTO threads (id, course_id, lesson_id, author_id, title, body, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(thread.course_id)
        .bind(thread.lesson_id)
        .bind(thread.author_id)
        .bind(&thread.title)
        .bind(&thread.body)
        .bind(now)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(thread)
    }

    async fn get_thread(&self, id: Uuid) -> Result<Option<Thread>> {
        let thread = sqlx::query_as::<_, Thread>("SELECT * FROM threads WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(thread)
    }

    async fn list_threads_by_course(&self, course_id: Uuid) -> Result<Vec<Thread>> {
        let threads = sqlx::query_as::<_, Thread>(
            "SELECT * FROM threads WHERE course_id = $1 ORDER BY created_at DESC",
        )
        .bind(course_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(threads)
    }

    async fn create_reply(&self, thread_id: Uuid, reply: &NewReply) -> Result<Option<Reply>> {
        let mut transaction = self.begin_transaction().await?;

        let result = self
            .insert_reply_with_transaction(thread_id, reply, &mut transaction)
            .await;

        match result {
            Ok(Some(reply)) => {
                transaction.commit().await?;
                Ok(Some(reply))
            }
            Ok(None) => {
                transaction.rollback().await?;
                Ok(None)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e)
            }
        }
    }

    async fn list_replies(&self, thread_id: Uuid) -> Result<Vec<Reply>> {
        let replies = sqlx::query_as::<_, Reply>(
            "SELECT * FROM replies WHERE thread_id = $1 ORDER BY created_at",
        )
        .bind(thread_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(replies)
    }
}
