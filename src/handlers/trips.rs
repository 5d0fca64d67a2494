//! Trip handlers: CRUD, checkout, and the previous-carts report.

use crate::cart;
use crate::error::ApiError;
use crate::storage::models::{PaymentMethod, Trip};
use crate::storage::Storage;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Double-option deserializer: a present JSON `null` becomes `Some(None)`
/// while an absent field stays `None`, letting an update clear the budget.
fn deserialize_double_option<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    pub store_name: String,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// Partial trip update. Covers both store/budget edits and the checkout
/// payload. `budget` distinguishes "absent" from "null" so an edit can
/// clear the limit.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTripRequest {
    pub store_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub budget: Option<Option<f64>>,
    pub checkout_date: Option<i64>,
    pub total_amount: Option<f64>,
    pub paid_with: Option<PaymentMethod>,
    pub amount_tendered: Option<f64>,
}

/// One row of the previous-carts report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub id: String,
    pub store_name: String,
    pub budget: Option<f64>,
    pub total_amount: f64,
}

pub async fn create_trip(
    State(storage): State<Storage>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let store_name = req.store_name.trim();
    if store_name.is_empty() {
        return Err(ApiError::Validation("storeName is required".to_string()));
    }
    if let Some(budget) = req.budget {
        if budget < 0.0 {
            return Err(ApiError::Validation(
                "budget must be a non-negative number".to_string(),
            ));
        }
    }

    let trip = Trip {
        id: Uuid::new_v4().to_string(),
        store_name: store_name.to_string(),
        budget: req.budget,
        created_at: Utc::now().timestamp(),
        updated_at: None,
        checkout_date: None,
        total_amount: None,
        paid_with: None,
        amount_tendered: None,
    };

    let conn = storage.conn()?;
    conn.execute(
        "INSERT INTO trips (id, store_name, budget, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![trip.id, trip.store_name, trip.budget, trip.created_at],
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"status": "success", "data": {"grocery": trip}})),
    ))
}

pub async fn get_trip(
    State(storage): State<Storage>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let trip = fetch_trip(&conn, &id)?;
    Ok(Json(
        serde_json::json!({"status": "success", "data": {"grocery": trip}}),
    ))
}

pub async fn update_trip(
    State(storage): State<Storage>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTripRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut trip = fetch_trip(&conn, &id)?;

    if let Some(store_name) = req.store_name {
        let store_name = store_name.trim();
        if store_name.is_empty() {
            return Err(ApiError::Validation("storeName must not be empty".to_string()));
        }
        trip.store_name = store_name.to_string();
    }
    if let Some(budget) = req.budget {
        if let Some(limit) = budget {
            if limit < 0.0 {
                return Err(ApiError::Validation(
                    "budget must be a non-negative number".to_string(),
                ));
            }
        }
        trip.budget = budget;
    }
    if let Some(method) = req.paid_with {
        trip.paid_with = Some(method);
    }
    if let Some(tendered) = req.amount_tendered {
        if tendered < 0.0 {
            return Err(ApiError::Validation(
                "amountTendered must be a non-negative number".to_string(),
            ));
        }
        trip.amount_tendered = Some(tendered);
    }

    if let Some(checkout_date) = req.checkout_date {
        // Checkout: the grand total is derived from the stored items,
        // never taken from the client. A supplied totalAmount must
        // agree with the recomputation.
        let items = load_trip_items(&conn, &trip.id)?;
        let total = cart::grand_total(&items);
        if let Some(claimed) = req.total_amount {
            if !cart::approx_eq(claimed, total) {
                return Err(ApiError::Validation(
                    "totalAmount does not match the cart total".to_string(),
                ));
            }
        }

        let method = trip
            .paid_with
            .ok_or_else(|| ApiError::Validation("paidWith is required at checkout".to_string()))?;
        let tendered = trip.amount_tendered.unwrap_or(total);
        if method == PaymentMethod::Cash {
            if !cart::cash_covers(tendered, total) {
                return Err(ApiError::Validation(
                    "amountTendered does not cover the total".to_string(),
                ));
            }
            tracing::debug!(
                "Cash checkout for trip {}: change due {:.2}",
                trip.id,
                cart::change_due(tendered, total)
            );
        }
        if let Some(limit) = trip.budget {
            if cart::over_budget(trip.budget, total) {
                tracing::warn!(
                    "Trip {} closed {:.2} over its budget",
                    trip.id,
                    -cart::budget_deficit(limit, total)
                );
            }
        }

        trip.checkout_date = Some(checkout_date);
        trip.total_amount = Some(total);
        trip.amount_tendered = Some(tendered);
    } else if req.total_amount.is_some() {
        return Err(ApiError::Validation(
            "totalAmount is only recorded at checkout".to_string(),
        ));
    }

    trip.updated_at = Some(Utc::now().timestamp());
    conn.execute(
        "UPDATE trips SET store_name = ?1, budget = ?2, updated_at = ?3,
                checkout_date = ?4, total_amount = ?5, paid_with = ?6,
                amount_tendered = ?7
         WHERE id = ?8",
        rusqlite::params![
            trip.store_name,
            trip.budget,
            trip.updated_at,
            trip.checkout_date,
            trip.total_amount,
            trip.paid_with,
            trip.amount_tendered,
            trip.id,
        ],
    )?;

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"grocery": trip}}),
    ))
}

/// Idempotent: deleting an already-deleted trip also succeeds. Items
/// cascade with the trip.
pub async fn delete_trip(
    State(storage): State<Storage>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let conn = storage.conn()?;
    conn.execute("DELETE FROM trips WHERE id = ?1", [&id])?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn previous_carts(
    State(storage): State<Storage>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = storage.conn()?;
    let mut stmt = conn.prepare(
        "SELECT t.id, t.store_name, t.budget, COALESCE(SUM(i.total), 0)
         FROM trips t
         LEFT JOIN items i ON i.grocery_id = t.id
         GROUP BY t.id
         ORDER BY t.created_at DESC",
    )?;
    let carts = stmt
        .query_map([], |row| {
            Ok(CartSummary {
                id: row.get(0)?,
                store_name: row.get(1)?,
                budget: row.get(2)?,
                total_amount: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if carts.is_empty() {
        return Err(ApiError::NotFound("No previous carts found".to_string()));
    }

    Ok(Json(
        serde_json::json!({"status": "success", "data": {"previousCarts": carts}}),
    ))
}

pub(crate) fn fetch_trip(conn: &Connection, id: &str) -> Result<Trip, ApiError> {
    conn.query_row(
        "SELECT id, store_name, budget, created_at, updated_at, checkout_date,
                total_amount, paid_with, amount_tendered
         FROM trips WHERE id = ?1",
        [id],
        Trip::from_row,
    )
    .optional()?
    .ok_or_else(|| ApiError::NotFound("Grocery not found".to_string()))
}

fn load_trip_items(
    conn: &Connection,
    grocery_id: &str,
) -> Result<Vec<crate::storage::models::GroceryItem>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, barcode, description, price, quantity, unit, total, grocery_id
         FROM items WHERE grocery_id = ?1 ORDER BY rowid",
    )?;
    let items = stmt
        .query_map([grocery_id], crate::storage::models::GroceryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::items::{self, CreateItemRequest};
    use crate::storage::models::Unit;

    async fn seed_trip(storage: &Storage, store_name: &str, budget: Option<f64>) -> String {
        let (status, Json(body)) = create_trip(
            State(storage.clone()),
            Json(CreateTripRequest {
                store_name: store_name.to_string(),
                budget,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["grocery"]["id"].as_str().unwrap().to_string()
    }

    async fn seed_item(storage: &Storage, grocery_id: &str, price: f64, quantity: i64) {
        items::create_item(
            State(storage.clone()),
            Json(CreateItemRequest {
                barcode: "4800016641503".to_string(),
                description: "Instant noodles".to_string(),
                price,
                quantity,
                unit: Unit::Pc,
                total: None,
                grocery_id: grocery_id.to_string(),
            }),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_and_fetch_trip() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", Some(120.0)).await;

        let Json(body) = get_trip(State(storage.clone()), Path(id.clone())).await.unwrap();
        let grocery = &body["data"]["grocery"];
        assert_eq!(grocery["storeName"], "Aldi");
        assert_eq!(grocery["budget"], 120.0);
        assert!(grocery["checkoutDate"].is_null());
    }

    #[tokio::test]
    async fn test_create_trip_without_budget_means_no_limit() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Costco", None).await;

        let Json(body) = get_trip(State(storage.clone()), Path(id)).await.unwrap();
        assert!(body["data"]["grocery"]["budget"].is_null());
    }

    #[tokio::test]
    async fn test_create_trip_requires_store_name() {
        let storage = Storage::in_memory().unwrap();
        let err = create_trip(
            State(storage),
            Json(CreateTripRequest {
                store_name: "  ".to_string(),
                budget: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_missing_trip_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let err = get_trip(State(storage), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_trip_edits_and_clears_budget() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", Some(50.0)).await;

        let Json(body) = update_trip(
            State(storage.clone()),
            Path(id.clone()),
            Json(UpdateTripRequest {
                store_name: Some("Target".to_string()),
                budget: Some(None),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let grocery = &body["data"]["grocery"];
        assert_eq!(grocery["storeName"], "Target");
        assert!(grocery["budget"].is_null());
        assert!(grocery["updatedAt"].is_i64());
    }

    #[test]
    fn test_update_request_distinguishes_absent_from_null_budget() {
        let absent: UpdateTripRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.budget, None);

        let cleared: UpdateTripRequest = serde_json::from_str(r#"{"budget": null}"#).unwrap();
        assert_eq!(cleared.budget, Some(None));

        let set: UpdateTripRequest = serde_json::from_str(r#"{"budget": 25.5}"#).unwrap();
        assert_eq!(set.budget, Some(Some(25.5)));
    }

    #[tokio::test]
    async fn test_update_missing_trip_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let err = update_trip(
            State(storage),
            Path("nope".to_string()),
            Json(UpdateTripRequest::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_checkout_derives_total_from_items() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", Some(30.0)).await;
        seed_item(&storage, &id, 10.0, 2).await;
        seed_item(&storage, &id, 5.0, 3).await;

        let Json(body) = update_trip(
            State(storage.clone()),
            Path(id.clone()),
            Json(UpdateTripRequest {
                checkout_date: Some(1_700_000_000),
                total_amount: Some(35.0),
                paid_with: Some(PaymentMethod::Cash),
                amount_tendered: Some(50.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        let grocery = &body["data"]["grocery"];
        assert_eq!(grocery["totalAmount"], 35.0);
        assert_eq!(grocery["checkoutDate"], 1_700_000_000);
        assert_eq!(grocery["paidWith"], "cash");
        assert_eq!(cart::change_due(50.0, 35.0), 15.0);
    }

    #[tokio::test]
    async fn test_checkout_rejects_mismatched_total() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", None).await;
        seed_item(&storage, &id, 10.0, 2).await;

        let err = update_trip(
            State(storage),
            Path(id),
            Json(UpdateTripRequest {
                checkout_date: Some(1_700_000_000),
                total_amount: Some(99.0),
                paid_with: Some(PaymentMethod::Gcash),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cash_checkout_rejects_short_tender() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", None).await;
        seed_item(&storage, &id, 100.0, 1).await;

        let err = update_trip(
            State(storage),
            Path(id),
            Json(UpdateTripRequest {
                checkout_date: Some(1_700_000_000),
                paid_with: Some(PaymentMethod::Cash),
                amount_tendered: Some(80.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_total_amount_outside_checkout_is_rejected() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", None).await;

        let err = update_trip(
            State(storage),
            Path(id),
            Json(UpdateTripRequest {
                total_amount: Some(10.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_trip_is_idempotent_and_cascades() {
        let storage = Storage::in_memory().unwrap();
        let id = seed_trip(&storage, "Aldi", None).await;
        seed_item(&storage, &id, 2.5, 4).await;

        let status = delete_trip(State(storage.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Second delete of the same id still succeeds.
        let status = delete_trip(State(storage.clone()), Path(id.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let conn = storage.conn().unwrap();
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_previous_carts_includes_empty_trips() {
        let storage = Storage::in_memory().unwrap();
        let with_items = seed_trip(&storage, "Aldi", Some(100.0)).await;
        seed_trip(&storage, "Costco", None).await;
        seed_item(&storage, &with_items, 10.0, 2).await;
        seed_item(&storage, &with_items, 5.0, 3).await;

        let Json(body) = previous_carts(State(storage)).await.unwrap();
        let carts = body["data"]["previousCarts"].as_array().unwrap();
        assert_eq!(carts.len(), 2);

        let total_for = |name: &str| {
            carts
                .iter()
                .find(|c| c["storeName"] == name)
                .unwrap()["totalAmount"]
                .as_f64()
                .unwrap()
        };
        assert_eq!(total_for("Aldi"), 35.0);
        assert_eq!(total_for("Costco"), 0.0);
    }

    #[tokio::test]
    async fn test_previous_carts_empty_is_not_found() {
        let storage = Storage::in_memory().unwrap();
        let err = previous_carts(State(storage)).await.unwrap_err();
        match err {
            ApiError::NotFound(message) => assert_eq!(message, "No previous carts found"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
