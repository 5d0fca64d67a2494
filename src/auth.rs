//! Bearer session-token middleware.

use crate::error::ApiError;
use crate::storage::Storage;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use rusqlite::OptionalExtension;

/// The authenticated caller, attached to request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub token: String,
}

/// Verifies the `Authorization: Bearer` session token on every
/// authenticated request.
pub async fn auth_middleware(
    State(storage): State<Storage>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?
        .to_string();

    let user_id = {
        let conn = storage.conn()?;
        let now = Utc::now().timestamp();
        conn.query_row(
            "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
            rusqlite::params![token, now],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .ok_or_else(|| ApiError::Auth("Invalid or expired session".to_string()))?
    };

    request.extensions_mut().insert(SessionUser { user_id, token });
    Ok(next.run(request).await)
}
