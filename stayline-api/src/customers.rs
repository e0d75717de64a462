use axum::{
    extract::{Path, State},
    routing::put,
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/customers/{id}", put(update_profile))
}

async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(customer_id): Path<String>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    if customer_id != claims.sub {
        return Err(AppError::AuthorizationError(
            "Cannot update another customer's profile".to_string(),
        ));
    }

    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "First and last name are required".to_string(),
        ));
    }

    state
        .customers
        .update_profile(
            &customer_id,
            &req.first_name,
            &req.last_name,
            req.phone.as_deref(),
        )
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}
