use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use stayline_booking::reference::customer_id_from_reference;
use stayline_core::repository::BookingRecord;
use tracing::info;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings))
        .route("/v1/bookings/{reference}", get(get_booking))
        .route("/v1/bookings/{reference}/cancel", post(cancel_booking))
}

fn internal(err: stayline_core::BoxError) -> AppError {
    AppError::InternalServerError(err.to_string())
}

async fn owned_record(
    state: &AppState,
    reference: &str,
    claims: &CustomerClaims,
) -> Result<Option<BookingRecord>, AppError> {
    let record = state
        .bookings
        .get_by_reference(reference)
        .await
        .map_err(internal)?;

    let owner = record
        .as_ref()
        .map(|r| r.customer_id.clone())
        .or_else(|| customer_id_from_reference(reference).map(str::to_string));

    match owner {
        Some(owner) if owner == claims.sub => Ok(record),
        Some(_) => Err(AppError::AuthorizationError(
            "Booking does not belong to you".to_string(),
        )),
        None => Err(AppError::NotFoundError("Booking not found".to_string())),
    }
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    let records = state
        .bookings
        .list_for_customer(&claims.sub)
        .await
        .map_err(internal)?;

    Ok(Json(records))
}

/// Booking lookup: the operator mirror plus the supplier's live view.
async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, AppError> {
    let record = owned_record(&state, &reference, &claims).await?;

    let supplier_detail = state
        .supplier
        .booking_detail(&reference)
        .await
        .unwrap_or_else(|e| {
            // The mirror still answers when the supplier is down.
            json!({ "error": e.to_string() })
        });

    if record.is_none() && supplier_detail.get("error").is_some() {
        return Err(AppError::NotFoundError("Booking not found".to_string()));
    }

    Ok(Json(json!({
        "booking": record,
        "supplier_detail": supplier_detail,
    })))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
) -> Result<Json<Value>, AppError> {
    let record = owned_record(&state, &reference, &claims)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    if record.status == "Cancelled" {
        return Ok(Json(json!({ "status": "Cancelled", "booking_reference_id": reference })));
    }

    let response = state
        .supplier
        .cancel(&record.confirmation_number)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    let code = response
        .pointer("/Status/Code")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if code != "200" && code != "201" {
        let description = response
            .pointer("/Status/Description")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error");
        return Err(AppError::UpstreamError(format!(
            "Cancel failed: {}",
            description
        )));
    }

    state
        .bookings
        .update_status(&reference, "Cancelled")
        .await
        .map_err(internal)?;
    let _ = state
        .bookings
        .add_event(
            &reference,
            "BOOKING_CANCELLED",
            Some(json!({ "by": "CUSTOMER" })),
        )
        .await;

    info!("Booking cancelled: {}", reference);

    Ok(Json(json!({
        "status": "Cancelled",
        "booking_reference_id": reference,
        "supplier_response": response,
    })))
}
