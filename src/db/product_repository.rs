use crate::db::{decode, encode, Database, StorageError};
use crate::errors::AppError;
use crate::filter::{Pagination, ProductFilter};
use crate::models::product::{NewProduct, Product};
use bincode::{Decode, Encode};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

const PRODUCTS_TREE: &str = "products";

#[derive(Debug, Encode, Decode)]
struct StoredProduct {
    id: String,
    name: String,
    image: String,
    price: f64,
    count_in_stock: u32,
    description: String,
    active: bool,
    created_at: i64, // millis
    updated_at: i64,
}

impl From<Product> for StoredProduct {
    fn from(product: Product) -> Self {
        StoredProduct {
            id: product.id,
            name: product.name,
            image: product.image,
            price: product.price,
            count_in_stock: product.count_in_stock,
            description: product.description,
            active: product.active,
            created_at: product.created_at.timestamp_millis(),
            updated_at: product.updated_at.timestamp_millis(),
        }
    }
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(millis).ok_or(StorageError::InvalidTimestamp(millis))
}

impl TryFrom<StoredProduct> for Product {
    type Error = StorageError;

    fn try_from(stored: StoredProduct) -> Result<Self, Self::Error> {
        Ok(Product {
            created_at: timestamp(stored.created_at)?,
            updated_at: timestamp(stored.updated_at)?,
            id: stored.id,
            name: stored.name,
            image: stored.image,
            price: stored.price,
            count_in_stock: stored.count_in_stock,
            description: stored.description,
            active: stored.active,
        })
    }
}

#[derive(Clone)]
pub struct ProductRepository {
    db: Database,
}

impl ProductRepository {
    pub fn new(db: Database) -> Self {
        ProductRepository { db }
    }

    pub async fn create(&self, input: NewProduct) -> Result<Product, AppError> {
        input.validate()?;
        let product = input.into_product();

        let products = self.db.tree(PRODUCTS_TREE)?;
        let encoded = encode(&StoredProduct::from(product.clone()))?;
        products
            .insert(product.id.as_bytes(), encoded)
            .map_err(StorageError::from)?;

        info!(product_id = %product.id, name = %product.name, "Product created in database");

        Ok(product)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Product>, StorageError> {
        let products = self.db.tree(PRODUCTS_TREE)?;

        match products.get(id.as_bytes())? {
            Some(data) => Ok(Some(Product::try_from(decode::<StoredProduct>(&data)?)?)),
            None => Ok(None),
        }
    }

    /// Returns matching products ordered by creation time, then id.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        pagination: Option<Pagination>,
    ) -> Result<Vec<Product>, StorageError> {
        let products = self.db.tree(PRODUCTS_TREE)?;

        let mut matched = Vec::new();
        for entry in products.iter() {
            let (_, data) = entry?;
            let product = Product::try_from(decode::<StoredProduct>(&data)?)?;
            if filter.matches(&product) {
                matched.push(product);
            }
        }

        matched.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = matched.len();
        let page = match pagination {
            Some(p) => matched.into_iter().skip(p.offset).take(p.limit).collect(),
            None => matched,
        };

        debug!(total, returned = page.len(), "Product listing resolved");

        Ok(page)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.db.tree(PRODUCTS_TREE)?.is_empty())
    }

    /// Readiness check used by the health handler.
    pub fn is_available(&self) -> bool {
        self.db.tree(PRODUCTS_TREE).is_ok()
    }
}
