use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::load_enrolled_courses;
use crate::db::models::ProgressUpdate;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

pub async fn create_enrollment(
    req: web::Json<EnrollmentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let enrollment = state.repo.create_enrollment(req.student_id, req.course_id).await?;
    info!("Student {} enrolled in course {}", enrollment.student_id, enrollment.course_id);
    Ok(HttpResponse::Created().json(enrollment))
}

pub async fn get_enrollment(
    path: web::Path<(Uuid, Uuid)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (student_id, course_id) = path.into_inner();
    let enrollment = state
        .repo
        .get_enrollment(student_id, course_id)
        .await?
        .ok_or_else(|| AppError::not_found("Enrollment"))?;
    Ok(HttpResponse::Ok().json(enrollment))
}

pub async fn list_student_courses(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let courses = load_enrolled_courses(state.repo.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(courses))
}

pub async fn list_course_students(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let students = state.repo.list_students_by_course(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(students))
}

pub async fn upsert_progress(
    req: web::Json<ProgressUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.progress_seconds.map_or(false, |s| s < 0) {
        return Err(AppError::ValidationError("progress_seconds must not be negative".into()));
    }

    let progress = state.repo.upsert_progress(&req).await?;
    Ok(HttpResponse::Ok().json(progress))
}

pub async fn get_progress(
    path: web::Path<(Uuid, Uuid)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (student_id, lesson_id) = path.into_inner();
    let progress = state
        .repo
        .get_progress(student_id, lesson_id)
        .await?
        .ok_or_else(|| AppError::not_found("Progress"))?;
    Ok(HttpResponse::Ok().json(progress))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::db::models::{Enrollment, LessonProgress};
    use crate::db::MockCourseRepository;
    use crate::error::DatabaseError;
    use actix_web::{http::StatusCode, test, App};
    use chrono::Utc;
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn app_state(repo: MockCourseRepository) -> web::Data<AppState> {
        let settings = Settings::new_for_test().unwrap();
        web::Data::new(AppState::with_repository(settings, Arc::new(repo)).unwrap())
    }

    #[actix_web::test]
    async fn test_enroll_and_duplicate() {
        let student_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();
        let mut repo = MockCourseRepository::new();
        let mut calls = 0;
        repo.expect_create_enrollment()
            .with(eq(student_id), eq(course_id))
            .times(2)
            .returning(move |student_id, course_id| {
                calls += 1;
                if calls == 1 {
                    Ok(Enrollment::new(student_id, course_id))
                } else {
                    Err(DatabaseError::Duplicate("already enrolled".into()).into())
                }
            });

        let app = test::init_service(
            App::new()
                .app_data(app_state(repo))
                .route("/api/enrollments", web::post().to(create_enrollment)),
        )
        .await;

        let body = serde_json::json!({ "student_id": student_id, "course_id": course_id });

        let req = test::TestRequest::post().uri("/api/enrollments").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::post().uri("/api/enrollments").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_missing_enrollment_is_404() {
        let mut repo = MockCourseRepository::new();
        repo.expect_get_enrollment().returning(|_, _| Ok(None));

        let app = test::init_service(
            App::new()
                .app_data(app_state(repo))
                .route("/api/enrollments/{student_id}/{course_id}", web::get().to(get_enrollment)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/enrollments/{}/{}", Uuid::new_v4(), Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_progress_upsert() {
        let mut repo = MockCourseRepository::new();
        repo.expect_upsert_progress()
            .withf(|update| update.completed == Some(true))
            .times(1)
            .returning(|update| {
                let now = Utc::now();
                Ok(LessonProgress {
                    id: Uuid::new_v4(),
                    student_id: update.student_id,
                    lesson_id: update.lesson_id,
                    completed: true,
                    progress_seconds: update.progress_seconds.unwrap_or(0),
                    last_watched_at: now,
                    completed_at: Some(now),
                })
            });

        let app = test::init_service(
            App::new()
                .app_data(app_state(repo))
                .route("/api/progress", web::put().to(upsert_progress)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/progress")
            .set_json(serde_json::json!({
                "student_id": Uuid::new_v4(),
                "lesson_id": Uuid::new_v4(),
                "completed": true,
                "progress_seconds": 120
            }))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["completed"], true);
        assert_eq!(body["progress_seconds"], 120);
        assert!(!body["completed_at"].is_null());

        let req = test::TestRequest::put()
            .uri("/api/progress")
            .set_json(serde_json::json!({
                "student_id": Uuid::new_v4(),
                "lesson_id": Uuid::new_v4(),
                "progress_seconds": -1
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
