use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use dotenv::dotenv;
use kohza_server::config::CorsConfig;
use kohza_server::{routes, AppError, AppState, Settings};
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cors(config: &CorsConfig) -> Cors {
    let cors = if config.allow_any_origin {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> kohza_server::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging; actix's `log` records are bridged into tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = Settings::new()?;
    info!(
        "Configuration loaded (environment: {}, development: {})",
        config.environment,
        config.is_development()
    );

    let state = AppState::new(config.clone()).await?;
    if !state.video.is_configured() {
        info!("Mux credentials missing, uploads will use simulation mode");
    }
    let state = web::Data::new(state);

    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at http://{}:{}", config.server.host, config.server.port);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    Ok(())
}
