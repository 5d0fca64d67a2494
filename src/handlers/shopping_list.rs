//! Shopping-list handlers: the pre-trip staging list.

use crate::error::ApiError;
use crate::storage::models::ListEntry;
use crate::storage::Storage;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddListItemRequest {
    #[serde(default)]
    pub grocery_item_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateListItemRequest {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub checked: Option<bool>,
}

pub async fn list_entries(
    State(storage): State<Storage>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut stmt = conn.prepare(
        "SELECT id, grocery_item_id, description, quantity, price, checked, created_at
         FROM shopping_list ORDER BY created_at, rowid",
    )?;
    let items = stmt
        .query_map([], ListEntry::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"items": items}}),
    ))
}

/// Adding a description that is already on the list bumps its quantity
/// by one instead of creating a second entry.
pub async fn add_entry(
    State(storage): State<Storage>,
    Json(req): Json<AddListItemRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::Validation("description is required".to_string()));
    }
    if let Some(price) = req.price {
        if price < 0.0 {
            return Err(ApiError::Validation(
                "price must be a non-negative number".to_string(),
            ));
        }
    }

    let conn = storage.conn()?;
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM shopping_list WHERE description = ?1",
            [description],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        conn.execute(
            "UPDATE shopping_list SET quantity = quantity + 1 WHERE id = ?1",
            [&id],
        )?;
        let entry = fetch_entry(&conn, &id)?;
        return Ok((
            StatusCode::OK,
            Json(serde_json::json!({"status": "success", "data": {"item": entry}})),
        ));
    }

    let entry = ListEntry {
        id: Uuid::new_v4().to_string(),
        grocery_item_id: req.grocery_item_id,
        description: description.to_string(),
        quantity: 1,
        price: req.price.unwrap_or(0.0),
        checked: false,
        created_at: Utc::now().timestamp(),
    };
    conn.execute(
        "INSERT INTO shopping_list (id, grocery_item_id, description, quantity, price, checked, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            entry.id,
            entry.grocery_item_id,
            entry.description,
            entry.quantity,
            entry.price,
            entry.checked,
            entry.created_at,
        ],
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"status": "success", "data": {"item": entry}})),
    ))
}

pub async fn update_entry(
    State(storage): State<Storage>,
    Path(id): Path<String>,
    Json(req): Json<UpdateListItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut entry = fetch_entry(&conn, &id)?;

    if let Some(description) = req.description {
        let description = description.trim();
        if description.is_empty() {
            return Err(ApiError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        entry.description = description.to_string();
    }
    if let Some(quantity) = req.quantity {
        // Reaching zero is a delete, which the client confirms and
        // sends to the remove endpoint.
        if quantity < 1 {
            return Err(ApiError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }
        entry.quantity = quantity;
    }
    if let Some(checked) = req.checked {
        entry.checked = checked;
    }

    conn.execute(
        "UPDATE shopping_list SET description = ?1, quantity = ?2, checked = ?3
         WHERE id = ?4",
        rusqlite::params![entry.description, entry.quantity, entry.checked, entry.id],
    )?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"item": entry}}),
    ))
}

/// Idempotent: removing an already-removed entry also succeeds.
pub async fn remove_entry(
    State(storage): State<Storage>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = storage.conn()?;
    conn.execute("DELETE FROM shopping_list WHERE id = ?1", [&id])?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(State(storage): State<Storage>) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let deleted = conn.execute("DELETE FROM shopping_list", [])?;
    Ok(Json(
        serde_json::json!({"status": "success", "data": {"deleted": deleted}}),
    ))
}

fn fetch_entry(conn: &Connection, id: &str) -> Result<ListEntry, ApiError> {
    conn.query_row(
        "SELECT id, grocery_item_id, description, quantity, price, checked, created_at
         FROM shopping_list WHERE id = ?1",
        [id],
        ListEntry::from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Shopping list item not found".to_string()))
}
