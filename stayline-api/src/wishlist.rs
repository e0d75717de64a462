use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use stayline_core::repository::WishlistEntry;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct AddWishlistRequest {
    pub hotel_code: String,
    #[serde(default)]
    pub hotel_name: Option<String>,
    #[serde(default)]
    pub city_code: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/wishlist", post(add_to_wishlist))
        .route("/v1/wishlist", get(get_wishlist))
        .route("/v1/wishlist/{hotel_code}", delete(remove_from_wishlist))
}

fn internal(err: stayline_core::BoxError) -> AppError {
    AppError::InternalServerError(err.to_string())
}

async fn add_to_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<AddWishlistRequest>,
) -> Result<Json<Value>, AppError> {
    if req.hotel_code.trim().is_empty() {
        return Err(AppError::ValidationError("hotel_code is required".to_string()));
    }

    let entry = WishlistEntry {
        customer_id: claims.sub.clone(),
        hotel_code: req.hotel_code,
        hotel_name: req.hotel_name,
        city_code: req.city_code,
        added_at: Utc::now(),
    };

    // Adding the same hotel twice is a no-op.
    state.wishlist.add(&entry).await.map_err(internal)?;

    Ok(Json(json!({ "success": true })))
}

async fn get_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Value>, AppError> {
    let entries = state.wishlist.list(&claims.sub).await.map_err(internal)?;

    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "data": entries,
    })))
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(hotel_code): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let removed = state
        .wishlist
        .remove(&claims.sub, &hotel_code)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": e.to_string() })),
            )
        })?;

    if removed {
        Ok(Json(json!({ "success": true })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Hotel not found in wishlist" })),
        ))
    }
}
