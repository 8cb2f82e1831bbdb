//! Database module for the course platform.
//!
//! Row models, the [`CourseRepository`] port, its Postgres implementation and
//! the read paths that stitch several rows into a course outline.

pub mod models;
pub mod operations;

pub use models::{
    Course, CourseOutline, Enrollment, EnrolledCourse, Lesson, LessonVideoUpdate, Module,
    Profile, Role, UploadStatus, VideoStatus,
};
pub use operations::{CourseRepository, DbOperations};

#[cfg(test)]
pub use operations::MockCourseRepository;

use futures::future::try_join_all;
use uuid::Uuid;

use crate::error::AppError;
use crate::Result;

/// Course row plus its modules and lessons, both ordered by `order_index`.
pub async fn load_course_outline(repo: &dyn CourseRepository, course_id: Uuid) -> Result<CourseOutline> {
    let course = repo
        .get_course(course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Course"))?;

    outline_for(repo, course).await
}

async fn outline_for(repo: &dyn CourseRepository, course: Course) -> Result<CourseOutline> {
    let modules = repo.list_modules(course.id).await?;
    let lessons = repo.list_lessons_by_course(course.id).await?;
    Ok(CourseOutline::assemble(course, modules, lessons))
}

pub async fn load_coach_courses(repo: &dyn CourseRepository, coach_id: Uuid) -> Result<Vec<CourseOutline>> {
    let courses = repo.list_courses_by_coach(coach_id).await?;
    try_join_all(courses.into_iter().map(|course| outline_for(repo, course))).await
}

/// Enrollments of a student, each with the enrolled course's outline.
/// Enrollments whose course has since been removed are skipped.
pub async fn load_enrolled_courses(repo: &dyn CourseRepository, student_id: Uuid) -> Result<Vec<EnrolledCourse>> {
    let enrollments = repo.list_enrollments_by_student(student_id).await?;

    let loaded = try_join_all(enrollments.into_iter().map(|enrollment| async move {
        match load_course_outline(repo, enrollment.course_id).await {
            Ok(course) => Ok(Some(EnrolledCourse { enrollment, course })),
            Err(AppError::DatabaseError(crate::error::DatabaseError::NotFound(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }))
    .await?;

    Ok(loaded.into_iter().flatten().collect())
}
