use actix_web::{web, HttpResponse};
use tracing::info;
use uuid::Uuid;

use super::{require_optional_text, require_price, require_text};
use crate::db::models::{CoursePatch, LessonPatch, NewCourse, NewLesson, NewModule, NewVideo, VideoPatch};
use crate::db::{load_coach_courses, load_course_outline};
use crate::error::AppError;
use crate::AppState;

pub async fn create_course(
    req: web::Json<NewCourse>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("title", &req.title)?;
    require_price(req.price)?;

    let course = state.repo.create_course(&req).await?;
    info!("Course {} created by coach {}", course.id, course.coach_id);
    Ok(HttpResponse::Created().json(course))
}

pub async fn get_course(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let outline = load_course_outline(state.repo.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outline))
}

pub async fn update_course(
    path: web::Path<Uuid>,
    req: web::Json<CoursePatch>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_optional_text("title", req.title.as_deref())?;
    require_price(req.price)?;

    let course = state
        .repo
        .update_course(path.into_inner(), &req)
        .await?
        .ok_or_else(|| AppError::not_found("Course"))?;
    Ok(HttpResponse::Ok().json(course))
}

pub async fn list_coach_courses(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let courses = load_coach_courses(state.repo.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(courses))
}

pub async fn create_module(
    req: web::Json<NewModule>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("title", &req.title)?;

    let module = state.repo.create_module(&req).await?;
    Ok(HttpResponse::Created().json(module))
}

pub async fn list_course_modules(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let outline = load_course_outline(state.repo.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outline.modules))
}

pub async fn create_lesson(
    req: web::Json<NewLesson>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("title", &req.title)?;

    let lesson = state.repo.create_lesson(&req).await?;
    Ok(HttpResponse::Created().json(lesson))
}

pub async fn get_lesson(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let lesson = state
        .repo
        .get_lesson(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Lesson"))?;
    Ok(HttpResponse::Ok().json(lesson))
}

pub async fn update_lesson(
    path: web::Path<Uuid>,
    req: web::Json<LessonPatch>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_optional_text("title", req.title.as_deref())?;

    let lesson = state
        .repo
        .update_lesson(path.into_inner(), &req)
        .await?
        .ok_or_else(|| AppError::not_found("Lesson"))?;
    Ok(HttpResponse::Ok().json(lesson))
}

pub async fn list_module_lessons(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let lessons = state.repo.list_lessons_by_module(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(lessons))
}

pub async fn create_video(
    req: web::Json<NewVideo>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("title", &req.title)?;

    let video = state.repo.create_video(&req).await?;
    info!("Video {} recorded (asset: {:?})", video.id, video.mux_asset_id);
    Ok(HttpResponse::Created().json(video))
}

pub async fn update_video(
    path: web::Path<Uuid>,
    req: web::Json<VideoPatch>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_optional_text("title", req.title.as_deref())?;

    let video = state
        .repo
        .update_video(path.into_inner(), &req)
        .await?
        .ok_or_else(|| AppError::not_found("Video"))?;
    Ok(HttpResponse::Ok().json(video))
}
