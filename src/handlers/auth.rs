//! Signup, login, and logout with bearer sessions.

use crate::auth::SessionUser;
use crate::error::ApiError;
use crate::storage::models::User;
use crate::storage::Storage;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::State;
use axum::http::{Extensions, StatusCode};
use axum::Json;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

/// Sessions live for 30 days; the cleanup task prunes expired rows.
const SESSION_TTL_SECS: i64 = 30 * 86_400;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn signup(
    State(storage): State<Storage>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    let email = req.email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::Validation(
            "email must be a valid address".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let conn = storage.conn()?;
    let taken: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
        [&email],
        |row| row.get(0),
    )?;
    if taken {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email,
        created_at: Utc::now().timestamp(),
    };
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![user.id, user.name, user.email, password_hash, user.created_at],
    )?;

    let token = issue_session(&conn, &user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"status": "success", "token": token, "data": {"user": user}})),
    ))
}

pub async fn login(
    State(storage): State<Storage>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let email = req.email.trim().to_lowercase();
    let conn = storage.conn()?;
    let found: Option<(User, String)> = conn
        .query_row(
            "SELECT id, name, email, created_at, password_hash
             FROM users WHERE email = ?1",
            [&email],
            |row| Ok((User::from_row(row)?, row.get(4)?)),
        )
        .optional()?;

    // One message for both unknown email and wrong password.
    let (user, password_hash) =
        found.ok_or_else(|| ApiError::Auth("Incorrect email or password".to_string()))?;
    let parsed = PasswordHash::new(&password_hash)
        .map_err(|e| ApiError::Internal(format!("Stored password hash invalid: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed)
        .map_err(|_| ApiError::Auth("Incorrect email or password".to_string()))?;

    let token = issue_session(&conn, &user.id)?;
    Ok(Json(
        serde_json::json!({"status": "success", "token": token, "data": {"user": user}}),
    ))
}

pub async fn logout(
    State(storage): State<Storage>,
    extensions: Extensions,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = extensions
        .get::<SessionUser>()
        .ok_or_else(|| ApiError::Auth("Not logged in".to_string()))?;

    let conn = storage.conn()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", [&session.token])?;
    tracing::info!("User {} logged out", session.user_id);
    Ok(Json(serde_json::json!({"status": "success"})))
}

fn issue_session(conn: &Connection, user_id: &str) -> Result<String, ApiError> {
    let token = hex::encode(rand::random::<[u8; 32]>());
    let now = Utc::now().timestamp();
    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![token, user_id, now, now + SESSION_TTL_SECS],
    )?;
    Ok(token)
}
