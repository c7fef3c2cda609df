pub mod product_repository;
pub mod seed;
pub mod user_repository;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("failed to encode record: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode record: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("invalid record key: {0}")]
    InvalidKey(#[from] std::str::Utf8Error),

    #[error("stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

#[derive(Clone)]
pub struct Database {
    pub db: sled::Db,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Database { db })
    }

    #[cfg(test)]
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Database { db })
    }

    pub fn tree(&self, name: &str) -> Result<sled::Tree, StorageError> {
        Ok(self.db.open_tree(name)?)
    }
}

pub(crate) fn encode<T: bincode::Encode>(value: &T) -> Result<Vec<u8>, StorageError> {
    Ok(bincode::encode_to_vec(value, bincode::config::standard())?)
}

pub(crate) fn decode<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T, StorageError> {
    let (value, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}
