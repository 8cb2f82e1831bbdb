//! HTTP surface. Every route lives under `/api`.

pub mod courses;
pub mod discussions;
pub mod enrollments;
pub mod mux;

use actix_web::web;

use crate::auth::handlers as auth;
use crate::error::AppError;
use crate::health_check;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            // Mux
            .route("/mux/upload-url", web::post().to(mux::create_upload_url))
            .route("/mux/upload/{upload_id}", web::get().to(mux::get_upload_status))
            .route("/mux/asset/{asset_id}", web::get().to(mux::get_asset))
            .route("/mux/webhook", web::post().to(mux::webhook))
            // Catalog
            .route("/courses", web::post().to(courses::create_course))
            .route("/courses/{id}", web::get().to(courses::get_course))
            .route("/courses/{id}", web::patch().to(courses::update_course))
            .route("/coaches/{coach_id}/courses", web::get().to(courses::list_coach_courses))
            .route("/modules", web::post().to(courses::create_module))
            .route("/courses/{id}/modules", web::get().to(courses::list_course_modules))
            .route("/lessons", web::post().to(courses::create_lesson))
            .route("/lessons/{id}", web::get().to(courses::get_lesson))
            .route("/lessons/{id}", web::patch().to(courses::update_lesson))
            .route("/modules/{module_id}/lessons", web::get().to(courses::list_module_lessons))
            .route("/videos", web::post().to(courses::create_video))
            .route("/videos/{id}", web::patch().to(courses::update_video))
            // Enrollment and progress
            .route("/enrollments", web::post().to(enrollments::create_enrollment))
            .route(
                "/enrollments/{student_id}/{course_id}",
                web::get().to(enrollments::get_enrollment),
            )
            .route("/students/{student_id}/courses", web::get().to(enrollments::list_student_courses))
            .route("/courses/{id}/students", web::get().to(enrollments::list_course_students))
            .route("/progress", web::put().to(enrollments::upsert_progress))
            .route("/progress/{student_id}/{lesson_id}", web::get().to(enrollments::get_progress))
            // Discussion
            .route("/threads", web::post().to(discussions::create_thread))
            .route("/courses/{id}/threads", web::get().to(discussions::list_course_threads))
            .route("/threads/{id}", web::get().to(discussions::get_thread))
            .route("/threads/{id}/replies", web::post().to(discussions::create_reply))
            // Auth and profiles
            .route("/auth/signup", web::post().to(auth::signup))
            .route("/auth/login", web::post().to(auth::login))
            .route("/auth/logout", web::post().to(auth::logout))
            .route("/auth/me", web::get().to(auth::me))
            .route("/auth/profile", web::put().to(auth::update_my_profile))
            .route("/me/courses", web::get().to(auth::my_courses))
            .route("/profiles/{id}", web::get().to(auth::get_profile)),
    );
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::ValidationError(format!("{} must not be blank", field)));
    }
    Ok(())
}

fn require_optional_text(field: &str, value: Option<&str>) -> Result<(), AppError> {
    value.map_or(Ok(()), |v| require_text(field, v))
}

fn require_price(price: Option<f64>) -> Result<(), AppError> {
    match price {
        Some(p) if p.is_nan() || p < 0.0 => {
            Err(AppError::ValidationError("price must not be negative".into()))
        }
        _ => Ok(()),
    }
}
