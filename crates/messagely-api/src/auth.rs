use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use messagely_db::Database;
use messagely_types::api::{Claims, LoginRequest, RegisterRequest, TokenResponse};

use crate::error::{ApiError, run_blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation("Username must be 3 to 32 characters.".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters.".into()));
    }
    if [&req.first_name, &req.last_name, &req.phone].iter().any(|f| f.trim().is_empty()) {
        return Err(ApiError::Validation("First name, last name and phone are required.".into()));
    }

    let token = run_blocking(move || {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        // Uniqueness is decided by the insert, not a prior lookup
        let created = state
            .db
            .create_user(&req.username, &password_hash, &req.first_name, &req.last_name, &req.phone)?;
        if !created {
            return Err(ApiError::Conflict(format!("Username '{}' is taken.", req.username)));
        }
        state.db.update_login_timestamp(&req.username)?;

        info!(username = %req.username, "user registered");
        Ok(create_token(&state.jwt_secret, &req.username, state.token_ttl)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let token = run_blocking(move || {
        let user = state.db.get_user(&req.username)?.ok_or(ApiError::Unauthenticated)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for '{}' unreadable: {}", user.username, e))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| {
                warn!(username = %req.username, "failed login");
                ApiError::Unauthenticated
            })?;

        state.db.update_login_timestamp(&user.username)?;

        Ok(create_token(&state.jwt_secret, &user.username, state.token_ttl)?)
    })
    .await?;

    Ok(Json(TokenResponse { token }))
}

pub fn create_token(secret: &str, username: &str, ttl: chrono::Duration) -> anyhow::Result<String> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    Ok(token_data.claims)
}
