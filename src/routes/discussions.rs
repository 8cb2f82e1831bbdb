use actix_web::{web, HttpResponse};
use uuid::Uuid;

use super::require_text;
use crate::db::models::{NewReply, NewThread, ThreadWithReplies};
use crate::error::AppError;
use crate::AppState;

pub async fn create_thread(
    req: web::Json<NewThread>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("title", &req.title)?;
    require_text("body", &req.body)?;

    let thread = state.repo.create_thread(&req).await?;
    Ok(HttpResponse::Created().json(thread))
}

pub async fn list_course_threads(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let threads = state.repo.list_threads_by_course(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(threads))
}

pub async fn get_thread(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let thread_id = path.into_inner();
    let thread = state
        .repo
        .get_thread(thread_id)
        .await?
        .ok_or_else(|| AppError::not_found("Thread"))?;
    let replies = state.repo.list_replies(thread_id).await?;

    Ok(HttpResponse::Ok().json(ThreadWithReplies { thread, replies }))
}

pub async fn create_reply(
    path: web::Path<Uuid>,
    req: web::Json<NewReply>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_text("body", &req.body)?;

    let reply = state
        .repo
        .create_reply(path.into_inner(), &req)
        .await?
        .ok_or_else(|| AppError::not_found("Thread"))?;
    Ok(HttpResponse::Created().json(reply))
}
