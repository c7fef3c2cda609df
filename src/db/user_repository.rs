use crate::db::{decode, encode, Database, StorageError};
use crate::models::user::User;
use bincode::{Decode, Encode};
use std::str;
use tracing::info;

const USERS_TREE: &str = "users";
const EMAIL_INDEX_TREE: &str = "user_email_index";

#[derive(Debug, Encode, Decode)]
struct StoredUser {
    id: String,
    name: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    created_at: i64, // Store as timestamp
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        StoredUser {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            created_at: user.created_at.timestamp(),
        }
    }
}

impl From<StoredUser> for User {
    fn from(stored: StoredUser) -> Self {
        User {
            id: stored.id,
            name: stored.name,
            email: stored.email,
            phone: stored.phone,
            password_hash: stored.password_hash,
            created_at: chrono::DateTime::from_timestamp(stored.created_at, 0)
                .unwrap_or_else(chrono::Utc::now),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CreateUserOutcome {
    Created,
    EmailTaken,
}

#[derive(Clone)]
pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        UserRepository { db }
    }

    /// Inserts the user unless the (lowercased) email is already registered.
    /// The email index entry is claimed atomically before the record is written.
    pub async fn create(&self, mut user: User) -> Result<(User, CreateUserOutcome), StorageError> {
        let users = self.db.tree(USERS_TREE)?;
        let email_index = self.db.tree(EMAIL_INDEX_TREE)?;

        user.email = normalize_email(&user.email);

        let claimed = email_index.compare_and_swap(
            user.email.as_bytes(),
            None as Option<&[u8]>,
            Some(user.id.as_bytes()),
        )?;
        if claimed.is_err() {
            return Ok((user, CreateUserOutcome::EmailTaken));
        }

        let encoded = encode(&StoredUser::from(user.clone()))?;
        if let Err(e) = users.insert(user.id.as_bytes(), encoded) {
            email_index.remove(user.email.as_bytes())?;
            return Err(e.into());
        }

        info!(user_id = %user.id, "User created in database");

        Ok((user, CreateUserOutcome::Created))
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, StorageError> {
        let users = self.db.tree(USERS_TREE)?;

        match users.get(id.as_bytes())? {
            Some(data) => Ok(Some(User::from(decode::<StoredUser>(&data)?))),
            None => Ok(None),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email_index = self.db.tree(EMAIL_INDEX_TREE)?;

        match email_index.get(normalize_email(email).as_bytes())? {
            Some(user_id) => {
                let id = str::from_utf8(&user_id)?;
                self.get_by_id(id).await
            }
            None => Ok(None),
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
