use crate::errors::{AppError, Result};
use dotenv::dotenv;
use std::env;
use tracing::{info, warn};

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub api_key: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub auth_rate_limit_per_minute: u32,
    pub seed_products: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", 8080u16)?;
        let db_path = env::var("DB_PATH").unwrap_or_else(|_| "./data/storefront.sled".to_string());

        let api_key = env::var("API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::Config("Missing environment variable 'API_KEY'".to_string()))?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, falling back to the default secret - NOT SECURE FOR PRODUCTION");
                DEFAULT_JWT_SECRET.to_string()
            }
        };

        let token_ttl_hours = parse_var("TOKEN_TTL_HOURS", 24i64)?;
        if token_ttl_hours <= 0 {
            return Err(AppError::Config("TOKEN_TTL_HOURS must be positive".to_string()));
        }
        let auth_rate_limit_per_minute = parse_var("AUTH_RATE_LIMIT_PER_MINUTE", 5u32)?;
        let seed_products = env::var("SEED_PRODUCTS").ok().filter(|p| !p.is_empty());

        info!(host = %host, port, db_path = %db_path, "Configuration loaded");

        Ok(Self {
            host,
            port,
            db_path,
            api_key,
            jwt_secret,
            token_ttl_hours,
            auth_rate_limit_per_minute,
            seed_products,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn jwt_uses_default(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            db_path: String::new(),
            api_key: "test-api-key".to_string(),
            jwt_secret: "test-secret-key".to_string(),
            token_ttl_hours: 24,
            auth_rate_limit_per_minute: 100,
            seed_products: None,
        }
    }
}
