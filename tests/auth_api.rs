use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use kohza_server::{routes, AppState, Settings};
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{body_partial_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn settings(server: &MockServer) -> Settings {
    let mut settings = Settings::new_for_test().unwrap();
    settings.supabase.url = server.uri();
    settings.supabase.anon_key = "anon-key".into();
    settings
}

fn access_token(user_id: Uuid) -> String {
    let claims = json!({
        "sub": user_id.to_string(),
        "aud": "authenticated",
        "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        "email": "coach@kohza.app",
        "role": "authenticated",
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test_secret")).unwrap()
}

fn session_body(user_id: Uuid) -> serde_json::Value {
    json!({
        "access_token": access_token(user_id),
        "refresh_token": "refresh-1",
        "expires_in": 3600,
        "token_type": "bearer",
        "user": {
            "id": user_id.to_string(),
            "email": "coach@kohza.app",
            "user_metadata": { "full_name": "Casey Coach" },
            "created_at": "2024-01-01T00:00:00Z"
        }
    })
}

#[actix_web::test]
async fn test_login_returns_session() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon-key"))
        .and(body_partial_json(json!({ "email": "coach@kohza.app" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body(user_id)))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::lazy(settings(&server)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "coach@kohza.app", "password": "password123" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert_eq!(body["user"]["id"], user_id.to_string());
    assert_eq!(body["refresh_token"], "refresh-1");
}

#[actix_web::test]
async fn test_invalid_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;

    let state = AppState::lazy(settings(&server)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "nonexistent@kohza.app", "password": "wrongpassword" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 401);
    let body: serde_json::Value = test::read_body_json(response).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid login credentials"));
}

#[actix_web::test]
async fn test_signup_rejected_by_auth_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": 422,
            "msg": "Password should be at least 6 characters"
        })))
        .mount(&server)
        .await;

    let state = AppState::lazy(settings(&server)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({ "email": "new@kohza.app", "password": "123", "role": "student" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 400);
}

#[actix_web::test]
async fn test_logout() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let token = access_token(user_id);
    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let state = AppState::lazy(settings(&server)).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);

    let response = test::TestRequest::post()
        .uri("/api/auth/logout")
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}

#[actix_web::test]
async fn test_login_times_out_on_slow_auth_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(session_body(Uuid::new_v4()))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut settings = settings(&server);
    settings.supabase.request_timeout_secs = 1;
    let state = AppState::lazy(settings).unwrap();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::configure),
    )
    .await;

    let response = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "coach@kohza.app", "password": "password123" }))
        .send_request(&app)
        .await;

    assert_eq!(response.status(), 500);
}
