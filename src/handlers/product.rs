use crate::db::product_repository::ProductRepository;
use crate::errors::AppError;
use crate::filter::{self, Pagination, ParamOutcome};
use crate::models::product::Product;
use crate::models::user::Claims;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct ProductListResponse {
    pub data: Vec<Product>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductResponse {
    pub data: Product,
}

/// Decodes the raw query string. Undecodable input yields no parameters
/// rather than rejecting the request.
fn query_pairs(raw: &str) -> Vec<(String, String)> {
    web::Query::<Vec<(String, String)>>::from_query(raw)
        .map(web::Query::into_inner)
        .unwrap_or_else(|e| {
            debug!(error = %e, "Ignoring undecodable query string");
            Vec::new()
        })
}

/// List products visible to an authenticated caller
#[utoipa::path(
    get,
    path = "/api/product",
    params(
        ("search" = Option<String>, Query, description = "Case-insensitive substring of name or description"),
        ("price" = Option<String>, Query, description = "Inclusive price range as `min-max`; malformed ranges are ignored"),
        ("active" = Option<bool>, Query, description = "Filter on the active flag"),
        ("page" = Option<usize>, Query, description = "1-based page number"),
        ("limit" = Option<usize>, Query, description = "Page size, capped at 100")
    ),
    responses(
        (status = 200, description = "Matching products", body = ProductListResponse),
        (status = 400, description = "Missing bearer token"),
        (status = 401, description = "Missing API key or invalid token"),
        (status = 500, description = "Internal server error")
    ),
    security(("api_key" = [], "bearer_auth" = [])),
    tag = "Products"
)]
#[instrument(name = "handler::list_products", skip_all, fields(user_id = %claims.sub))]
pub async fn list_products(
    claims: web::ReqData<Claims>,
    product_repo: web::Data<ProductRepository>,
    req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let pairs = query_pairs(req.query_string());
    let resolved = filter::resolve(&pairs);

    for outcome in resolved.ignored() {
        match outcome {
            ParamOutcome::IgnoredMalformed { key, value } => {
                debug!(key = %key, value = %value, "Ignoring malformed query parameter")
            }
            ParamOutcome::Unrecognized(key) => {
                debug!(key = %key, "Ignoring unrecognized query parameter")
            }
            ParamOutcome::Applied(_) => {}
        }
    }

    let products = product_repo
        .list(&resolved.filter, resolved.pagination)
        .await?;

    info!(count = products.len(), "Products listed");

    Ok(HttpResponse::Ok().json(ProductListResponse {
        data: products,
        pagination: resolved.pagination,
    }))
}

/// Fetch a single product by id
#[utoipa::path(
    get,
    path = "/api/product/{id}",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Missing bearer token"),
        (status = 401, description = "Missing API key or invalid token"),
        (status = 404, description = "Product not found")
    ),
    security(("api_key" = [], "bearer_auth" = [])),
    tag = "Products"
)]
pub async fn get_product(
    product_repo: web::Data<ProductRepository>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    match product_repo.get_by_id(&id).await? {
        Some(product) => Ok(HttpResponse::Ok().json(ProductResponse { data: product })),
        None => Err(AppError::NotFound(format!("Product {} not found", id))),
    }
}
