use crate::db::product_repository::ProductRepository;
use crate::errors::AppError;
use crate::models::product::NewProduct;
use std::fs;
use tracing::info;

/// Loads a JSON array of products into an empty catalogue.
/// Returns how many products were written; a non-empty catalogue is left alone.
pub async fn seed_products(repo: &ProductRepository, path: &str) -> Result<usize, AppError> {
    if !repo.is_empty()? {
        info!(path = %path, "Catalogue already populated, skipping seed");
        return Ok(0);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read seed file '{}': {}", path, e)))?;
    let products: Vec<NewProduct> = serde_json::from_str(&raw)
        .map_err(|e| AppError::Config(format!("Invalid seed file '{}': {}", path, e)))?;

    let count = products.len();
    for product in products {
        repo.create(product).await?;
    }

    info!(path = %path, count, "Catalogue seeded");
    Ok(count)
}
