use crate::config::AppConfig;
use crate::db::product_repository::ProductRepository;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize, ToSchema)]
pub struct HealthChecks {
    pub jwt_configured: bool,
    pub jwt_uses_default: bool,
    pub database: bool,
}

/// Public health check endpoint with dependency checks
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health(
    config: web::Data<AppConfig>,
    product_repo: web::Data<ProductRepository>,
) -> impl Responder {
    let jwt_uses_default = config.jwt_uses_default();
    let database = product_repo.is_available();

    if jwt_uses_default {
        warn!("Health check: Using default JWT secret - NOT SECURE FOR PRODUCTION");
    }

    let healthy = database && !jwt_uses_default;

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            jwt_configured: !jwt_uses_default,
            jwt_uses_default,
            database,
        },
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
