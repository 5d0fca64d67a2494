//! Cart item handlers, plus the autofill and restock lookups that feed
//! the add-item form.

use crate::cart;
use crate::error::ApiError;
use crate::handlers::trips::fetch_trip;
use crate::storage::models::{GroceryItem, Unit};
use crate::storage::Storage;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub barcode: String,
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub unit: Unit,
    #[serde(default)]
    pub total: Option<f64>,
    pub grocery_id: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateItemRequest {
    pub barcode: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub unit: Option<Unit>,
    pub total: Option<f64>,
}

pub async fn list_items(
    State(storage): State<Storage>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    fetch_trip(&conn, &id)?;

    let mut stmt = conn.prepare(
        "SELECT id, barcode, description, price, quantity, unit, total, grocery_id
         FROM items WHERE grocery_id = ?1 ORDER BY rowid",
    )?;
    let items = stmt
        .query_map([&id], GroceryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"groceryItems": items}}),
    ))
}

pub async fn create_item(
    State(storage): State<Storage>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let barcode = req.barcode.trim();
    if barcode.is_empty() {
        return Err(ApiError::Validation("barcode is required".to_string()));
    }
    let description = req.description.trim();
    if description.is_empty() {
        return Err(ApiError::Validation("description is required".to_string()));
    }
    // Zero means "price not yet known"; only negatives are invalid.
    if req.price < 0.0 {
        return Err(ApiError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }
    if req.quantity < 1 {
        return Err(ApiError::Validation(
            "quantity must be a positive integer".to_string(),
        ));
    }
    let total = checked_total(req.total, req.price, req.quantity)?;

    let conn = storage.conn()?;
    fetch_trip(&conn, &req.grocery_id)?;

    let item = GroceryItem {
        id: Uuid::new_v4().to_string(),
        barcode: barcode.to_string(),
        description: description.to_string(),
        price: req.price,
        quantity: req.quantity,
        unit: req.unit,
        total,
        grocery_id: req.grocery_id,
    };
    conn.execute(
        "INSERT INTO items (id, barcode, description, price, quantity, unit, total, grocery_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            item.id,
            item.barcode,
            item.description,
            item.price,
            item.quantity,
            item.unit,
            item.total,
            item.grocery_id,
        ],
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"status": "success", "data": {"groceryItem": item}})),
    ))
}

pub async fn update_item(
    State(storage): State<Storage>,
    Path(item_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut item = fetch_item(&conn, &item_id)?;

    if let Some(barcode) = req.barcode {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(ApiError::Validation("barcode must not be empty".to_string()));
        }
        item.barcode = barcode.to_string();
    }
    if let Some(description) = req.description {
        let description = description.trim();
        if description.is_empty() {
            return Err(ApiError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        item.description = description.to_string();
    }
    if let Some(price) = req.price {
        if price < 0.0 {
            return Err(ApiError::Validation(
                "price must be a non-negative number".to_string(),
            ));
        }
        item.price = price;
    }
    if let Some(quantity) = req.quantity {
        if quantity < 1 {
            return Err(ApiError::Validation(
                "quantity must be a positive integer".to_string(),
            ));
        }
        item.quantity = quantity;
    }
    if let Some(unit) = req.unit {
        item.unit = unit;
    }
    item.total = checked_total(req.total, item.price, item.quantity)?;

    conn.execute(
        "UPDATE items SET barcode = ?1, description = ?2, price = ?3,
                quantity = ?4, unit = ?5, total = ?6
         WHERE id = ?7",
        rusqlite::params![
            item.barcode,
            item.description,
            item.price,
            item.quantity,
            item.unit,
            item.total,
            item.id,
        ],
    )?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"groceryItem": item}}),
    ))
}

/// Idempotent: deleting an already-deleted item also succeeds.
pub async fn delete_item(
    State(storage): State<Storage>,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = storage.conn()?;
    conn.execute("DELETE FROM items WHERE id = ?1", [&item_id])?;
    Ok(StatusCode::NO_CONTENT)
}

/// Historical items whose description contains the query, newest entry
/// per description, for prefilling the add-item form.
pub async fn autofill(
    State(storage): State<Storage>,
    Path(query): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let pattern = format!("%{}%", escape_like(&query));
    let mut stmt = conn.prepare(
        "SELECT id, barcode, description, price, quantity, unit, total, grocery_id
         FROM items
         WHERE rowid IN (
             SELECT MAX(rowid) FROM items
             WHERE description LIKE ?1 ESCAPE '\\'
             GROUP BY description
         )
         ORDER BY rowid DESC
         LIMIT 10",
    )?;
    let items = stmt
        .query_map([&pattern], GroceryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"groceryItems": items}}),
    ))
}

/// Restock suggestions: items from the most recent trips, newest trip
/// first.
pub async fn last_grocery_items(
    State(storage): State<Storage>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut stmt = conn.prepare(
        "SELECT i.id, i.barcode, i.description, i.price, i.quantity, i.unit,
                i.total, i.grocery_id
         FROM items i
         JOIN trips t ON t.id = i.grocery_id
         ORDER BY t.created_at DESC, i.rowid DESC
         LIMIT 20",
    )?;
    let items = stmt
        .query_map([], GroceryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"lastGroceryItems": items}}),
    ))
}

/// The line total is always derived server-side; a client-supplied
/// value may only confirm it.
fn checked_total(claimed: Option<f64>, price: f64, quantity: i64) -> Result<f64, ApiError> {
    let total = cart::line_total(price, quantity);
    if let Some(claimed) = claimed {
        if !cart::approx_eq(claimed, total) {
            return Err(ApiError::Validation(
                "total does not match price * quantity".to_string(),
            ));
        }
    }
    Ok(total)
}

fn fetch_item(conn: &Connection, id: &str) -> Result<GroceryItem, ApiError> {
    conn.query_row(
        "SELECT id, barcode, description, price, quantity, unit, total, grocery_id
         FROM items WHERE id = ?1",
        [id],
        GroceryItem::from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Item not found".to_string()))
}

fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
