//! Background cleanup: prune expired sessions.

use crate::error::ApiError;
use crate::storage::Storage;
use std::time::Duration;
use tokio::time;

pub fn spawn_session_cleanup(storage: Storage) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(3600)); // hourly
        loop {
            interval.tick().await;
            match prune_sessions(&storage) {
                Ok(pruned) if pruned > 0 => {
                    tracing::debug!("Pruned {} expired sessions", pruned);
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Session cleanup error: {}", e),
            }
        }
    });
}

fn prune_sessions(storage: &Storage) -> Result<usize, ApiError> {
    let conn = storage.conn()?;
    let now = chrono::Utc::now().timestamp();
    let pruned = conn.execute("DELETE FROM sessions WHERE expires_at < ?1", [now])?;
    Ok(pruned)
}
