//! Axum router setup.

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers::{auth, items, shopping_list, trips};
use crate::storage::Storage;
use axum::middleware;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(storage: Storage, config: &AppConfig) -> Router {
    // Authenticated routes
    let authenticated = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(
            storage.clone(),
            auth_middleware,
        ));

    // Unauthenticated routes. The grocery and shopping-list surface is
    // single-tenant and open, matching the original application.
    let public = Router::new()
        .route("/api/grocery/new-grocery", post(trips::create_trip))
        .route("/api/grocery/previous-carts", get(trips::previous_carts))
        .route(
            "/api/grocery/last-grocery-items",
            get(items::last_grocery_items),
        )
        .route("/api/grocery/autofill/{query}", get(items::autofill))
        .route("/api/grocery/new-item", post(items::create_item))
        .route(
            "/api/grocery/item/{item_id}",
            patch(items::update_item).delete(items::delete_item),
        )
        .route("/api/grocery/{id}/items", get(items::list_items))
        .route(
            "/api/grocery/{id}",
            get(trips::get_trip)
                .patch(trips::update_trip)
                .delete(trips::delete_trip),
        )
        .route("/api/shopping-list", get(shopping_list::list_entries))
        .route("/api/shopping-list/add", post(shopping_list::add_entry))
        .route(
            "/api/shopping-list/update-item/{id}",
            patch(shopping_list::update_entry),
        )
        .route(
            "/api/shopping-list/remove/{id}",
            delete(shopping_list::remove_entry),
        )
        .route("/api/shopping-list/clear", post(shopping_list::clear))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/healthcheck", get(healthcheck));

    Router::new()
        .merge(authenticated)
        .merge(public)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(config.max_payload_size))
        .with_state(storage)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "success", "message": "API is running"}))
}
