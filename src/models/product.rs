use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub count_in_stock: u32,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for the catalogue write path.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(default)]
    pub count_in_stock: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Product name is required".to_string()));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(AppError::Validation(
                "Product price must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_product(self) -> Product {
        let now = Utc::now();
        Product {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            image: self.image,
            price: self.price,
            count_in_stock: self.count_in_stock,
            description: self.description,
            active: self.active,
            created_at: now,
            updated_at: now,
        }
    }
}
