use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::extractor::AuthenticatedUser;
use crate::db::models::{Profile, ProfileUpdate, Role};
use crate::db::{load_coach_courses, load_enrolled_courses};
use crate::error::{AppError, AuthError};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Where the frontend should send a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Home {
    Coach,
    Student,
    Onboarding,
}

impl Home {
    pub fn for_profile(profile: Option<&Profile>) -> Self {
        match profile.and_then(Profile::role) {
            Some(Role::Coach) => Home::Coach,
            Some(Role::Student) => Home::Student,
            None => Home::Onboarding,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub profile: Option<Profile>,
    pub home: Home,
}

fn require_credentials(email: &str, password: &str) -> Result<(), AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::ValidationError("Email and password are required".into()));
    }
    Ok(())
}

pub async fn signup(
    req: web::Json<SignUpRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_credentials(&req.email, &req.password)?;
    info!("Received sign-up request for email: {}", req.email);

    let metadata = serde_json::json!({
        "full_name": req.full_name,
        "role": req.role,
    });
    let outcome = state.auth.sign_up(&req.email, &req.password, metadata).await?;

    match Uuid::parse_str(&outcome.user.id) {
        Ok(user_id) => {
            let update = ProfileUpdate {
                full_name: req.full_name.clone(),
                avatar_url: None,
                role: req.role,
            };
            if let Err(e) = state
                .repo
                .upsert_profile(user_id, Some(req.email.clone()), &update)
                .await
            {
                error!("Failed to create profile for {}: {}", user_id, e);
            }
        }
        Err(_) => warn!("Sign-up returned a non-UUID user id: {}", outcome.user.id),
    }

    Ok(HttpResponse::Created().json(outcome))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    require_credentials(&req.email, &req.password)?;
    info!("Received login request for email: {}", req.email);

    match state.auth.sign_in(&req.email, &req.password).await {
        Ok(session) => {
            info!("Login successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(session))
        }
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.auth.sign_out(&user.token).await?;
    info!("User {} signed out", user.user_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully logged out"
    })))
}

pub async fn me(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state.repo.get_profile(user.user_id).await?;
    let home = Home::for_profile(profile.as_ref());

    Ok(HttpResponse::Ok().json(MeResponse {
        user_id: user.user_id,
        email: user.email,
        profile,
        home,
    }))
}

pub async fn update_my_profile(
    user: AuthenticatedUser,
    req: web::Json<ProfileUpdate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .repo
        .upsert_profile(user.user_id, user.email.clone(), &req)
        .await?;
    info!("Profile {} updated (role: {:?})", profile.id, profile.role);

    Ok(HttpResponse::Ok().json(profile))
}

/// Courses of the caller: owned courses for coaches, enrollments for students.
pub async fn my_courses(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state.repo.get_profile(user.user_id).await?;

    match Home::for_profile(profile.as_ref()) {
        Home::Coach => {
            let courses = load_coach_courses(state.repo.as_ref(), user.user_id).await?;
            Ok(HttpResponse::Ok().json(courses))
        }
        Home::Student => {
            let courses = load_enrolled_courses(state.repo.as_ref(), user.user_id).await?;
            Ok(HttpResponse::Ok().json(courses))
        }
        Home::Onboarding => Err(AuthError::Forbidden("Choose a role before browsing courses".into()).into()),
    }
}

pub async fn get_profile(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .repo
        .get_profile(path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("Profile"))?;

    Ok(HttpResponse::Ok().json(profile))
}
