mod config;
mod db;
mod errors;
mod filter;
mod handlers;
mod middleware;
mod models;
mod routes;
mod utils;

use actix_cors::Cors;
use actix_web::{App, HttpServer};
use config::AppConfig;
use db::Database;
use routes::AppState;
use std::io;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::product::list_products,
        handlers::product::get_product,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::health::HealthChecks,
            handlers::auth::SignupRequest,
            handlers::auth::LoginRequest,
            handlers::auth::AuthResponse,
            handlers::auth::AuthData,
            handlers::auth::UserResponse,
            handlers::product::ProductListResponse,
            handlers::product::ProductResponse,
            filter::Pagination,
            models::product::Product,
            models::user::Claims,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Authentication", description = "Signup and login, gated by the client API key"),
        (name = "Products", description = "Catalogue endpoints requiring an API key and a bearer token")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{
                ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
            };

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Session token from /api/signup or /api/login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(
                    middleware::api_key::API_KEY_HEADER,
                ))),
            );
        }
    }
}

fn config_error(e: errors::AppError) -> io::Error {
    error!(error = %e, "Startup failed");
    io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
        .init();

    let config = AppConfig::from_env().map_err(config_error)?;

    let database = Database::new(&config.db_path)
        .map_err(|e| config_error(errors::AppError::Storage(e)))?;
    info!(db_path = %config.db_path, "Database initialized");

    let state = AppState::new(config, database);

    if let Some(path) = state.config.seed_products.as_deref() {
        db::seed::seed_products(&state.products, path)
            .await
            .map_err(config_error)?;
    }

    let bind_address = state.config.bind_address();

    info!(bind_address = %bind_address, "Starting storefront API server");
    info!("Available endpoints:");
    info!("   GET  /api/health        - Health check (public)");
    info!("   POST /api/signup        - Register new user (apikey)");
    info!("   POST /api/login         - Login user (apikey)");
    info!("   GET  /api/product       - List products (apikey + bearer)");
    info!("   GET  /api/product/{{id}}  - Get product (apikey + bearer)");
    info!(
        swagger_url = format!("http://{}/swagger-ui/", bind_address),
        "Swagger UI available"
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static(
                    middleware::api_key::API_KEY_HEADER,
                ),
            ])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .configure(|cfg| routes::configure(cfg, &state))
    })
    .bind(&bind_address)?
    .run()
    .await
}
