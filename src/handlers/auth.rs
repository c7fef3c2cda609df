use crate::db::user_repository::{CreateUserOutcome, UserRepository};
use crate::errors::AppError;
use crate::models::user::User;
use crate::utils::auth::{hash_password, verify_password, TokenService};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub data: AuthData,
}

#[derive(Serialize, ToSchema)]
pub struct AuthData {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
        }
    }
}

fn issue_token(tokens: &TokenService, user: &User) -> Result<String, AppError> {
    tokens.issue(user).map_err(|e| {
        error!(error = ?e, user_id = %user.id, "Failed to generate JWT");
        AppError::Internal("Failed to generate token".to_string())
    })
}

/// Register a new user and issue a session token
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 409, description = "Email already registered")
    ),
    security(("api_key" = [])),
    tag = "Authentication"
)]
pub async fn signup(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    info!(email = %payload.email, "Signup attempt");

    if payload.name.trim().is_empty() || !payload.email.contains('@') || payload.password.len() < 8 {
        warn!(email = %payload.email, "Signup failed: invalid input");
        return Err(AppError::Validation(
            "Invalid input. Name and a valid email are required; password must be at least 8 characters."
                .to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = ?e, "Failed to hash password");
        AppError::Internal("Failed to hash password".to_string())
    })?;

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: payload.name.trim().to_string(),
        email: payload.email,
        phone: payload.phone.filter(|p| !p.trim().is_empty()),
        password_hash,
        created_at: chrono::Utc::now(),
    };

    let (user, outcome) = user_repo.create(user).await?;
    if outcome == CreateUserOutcome::EmailTaken {
        warn!(email = %user.email, "Signup failed: email already exists");
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let token = issue_token(&tokens, &user)?;

    info!(user_id = %user.id, "User registered successfully");

    Ok(HttpResponse::Created().json(AuthResponse {
        data: AuthData {
            token,
            user: user.into(),
        },
    }))
}

/// Login an existing user
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials or API key")
    ),
    security(("api_key" = [])),
    tag = "Authentication"
)]
pub async fn login(
    user_repo: web::Data<UserRepository>,
    tokens: web::Data<TokenService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    info!(email = %payload.email, "Login attempt");

    let user = match user_repo.get_by_email(&payload.email).await? {
        Some(u) if verify_password(&payload.password, &u.password_hash) => u,
        _ => {
            warn!(email = %payload.email, "Login failed: invalid credentials");
            return Err(AppError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    let token = issue_token(&tokens, &user)?;

    info!(user_id = %user.id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(AuthResponse {
        data: AuthData {
            token,
            user: user.into(),
        },
    }))
}
