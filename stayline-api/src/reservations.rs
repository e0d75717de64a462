use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stayline_booking::flow::{fields, FlowStage};
use stayline_booking::{reference, stay, ContactForm, GuestSnapshot, RoomGuests};
use stayline_core::vendor::{PrebookEnvelope, PrebookOutcome, RoomSet};
use stayline_shared::models::events::{GuestDetailsCapturedEvent, ReservationCreatedEvent};
use tracing::info;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub booking_code: String,
    /// Hotel snapshot from the details page, carried along for history.
    #[serde(default)]
    pub hotel: Option<Value>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Serialize)]
struct CreateReservationResponse {
    booking_reference_id: String,
    expires_in: u64,
    prebook: PrebookEnvelope,
}

#[derive(Debug, Serialize)]
struct ReservationStateResponse {
    booking_reference_id: String,
    stage: Option<String>,
    booking_code: Option<String>,
    has_guest_details: bool,
    check_in: Option<String>,
    check_out: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GuestDetailsRequest {
    pub contact: ContactForm,
    pub rooms: Vec<RoomGuests>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{reference}", get(get_reservation))
        .route("/v1/reservations/{reference}/guests", put(put_guest_details))
}

fn internal(err: stayline_core::BoxError) -> AppError {
    AppError::InternalServerError(err.to_string())
}

/// Flow ownership check shared by every per-reservation route.
pub(crate) async fn require_owner(
    state: &AppState,
    reference: &str,
    claims: &CustomerClaims,
) -> Result<(), AppError> {
    let owner = state
        .flows
        .get_field(reference, fields::OWNER)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::NotFoundError("Reservation expired or not found".to_string())
        })?;

    if owner != claims.sub {
        return Err(AppError::AuthorizationError(
            "Reservation does not belong to you".to_string(),
        ));
    }

    Ok(())
}

async fn create_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<Json<CreateReservationResponse>, AppError> {
    stay::validate_stay(
        req.check_in,
        req.check_out,
        state.business_rules.max_stay_nights,
    )
    .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let envelope = match state
        .supplier
        .prebook(&req.booking_code)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?
    {
        PrebookOutcome::Locked(envelope) => envelope,
        PrebookOutcome::Rejected(status) => {
            return Err(AppError::UpstreamError(format!(
                "Prebook failed: {}",
                status.message()
            )));
        }
    };

    // The booking code must stay identical from search through prebook to the
    // final booking call; prefer the supplier's echo, fall back to the input.
    let room = envelope
        .hotel_result
        .as_ref()
        .and_then(|h| h.rooms.as_ref())
        .and_then(RoomSet::primary)
        .cloned();
    let booking_code = room
        .as_ref()
        .and_then(|r| r.booking_code.clone())
        .unwrap_or_else(|| req.booking_code.clone());

    let booking_reference_id = reference::mint_booking_reference(&claims.sub, Utc::now());

    let flows = &state.flows;
    flows
        .set_field(&booking_reference_id, fields::OWNER, &claims.sub)
        .await
        .map_err(internal)?;
    flows
        .set_field(
            &booking_reference_id,
            fields::STAGE,
            FlowStage::Reserved.as_str(),
        )
        .await
        .map_err(internal)?;
    flows
        .set_field(&booking_reference_id, fields::BOOKING_CODE, &booking_code)
        .await
        .map_err(internal)?;
    flows
        .set_field(
            &booking_reference_id,
            fields::CHECK_IN,
            &req.check_in.format("%Y-%m-%d").to_string(),
        )
        .await
        .map_err(internal)?;
    flows
        .set_field(
            &booking_reference_id,
            fields::CHECK_OUT,
            &req.check_out.format("%Y-%m-%d").to_string(),
        )
        .await
        .map_err(internal)?;

    if let Some(room) = &room {
        let json = serde_json::to_string(room)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        flows
            .set_field(&booking_reference_id, fields::ROOM, &json)
            .await
            .map_err(internal)?;
    }

    // Hotel snapshot: caller-provided detail wins over the prebook echo.
    let hotel_snapshot = req.hotel.or_else(|| {
        envelope
            .hotel_result
            .as_ref()
            .and_then(|h| serde_json::to_value(h).ok())
    });
    if let Some(hotel) = &hotel_snapshot {
        flows
            .set_field(&booking_reference_id, fields::HOTEL, &hotel.to_string())
            .await
            .map_err(internal)?;
    }

    let ttl = state.business_rules.reservation_hold_seconds;
    flows
        .expire(&booking_reference_id, ttl)
        .await
        .map_err(internal)?;

    state.metrics.reservations_created.inc();
    let created = ReservationCreatedEvent {
        booking_reference_id: booking_reference_id.clone(),
        customer_id: claims.sub.clone(),
        hotel_code: envelope
            .hotel_result
            .as_ref()
            .map(|h| h.hotel_code.clone())
            .unwrap_or_default(),
        booking_code: booking_code.clone(),
        timestamp: Utc::now().timestamp(),
    };
    let _ = state
        .bookings
        .add_event(
            &booking_reference_id,
            "RESERVATION_CREATED",
            serde_json::to_value(&created).ok(),
        )
        .await;

    info!("Reservation created: {}", booking_reference_id);

    Ok(Json(CreateReservationResponse {
        booking_reference_id,
        expires_in: ttl,
        prebook: envelope,
    }))
}

async fn get_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
) -> Result<Json<ReservationStateResponse>, AppError> {
    require_owner(&state, &reference, &claims).await?;

    // A snapshot keyed to a different reference is cleared here, forcing the
    // caller back to the guest-details step.
    let snapshot = state
        .reconciler
        .load_snapshot(&reference)
        .await
        .map_err(crate::error::reconcile_error)?;

    let stage = state
        .flows
        .get_field(&reference, fields::STAGE)
        .await
        .map_err(internal)?;
    let booking_code = state
        .flows
        .get_field(&reference, fields::BOOKING_CODE)
        .await
        .map_err(internal)?;
    let check_in = state
        .flows
        .get_field(&reference, fields::CHECK_IN)
        .await
        .map_err(internal)?;
    let check_out = state
        .flows
        .get_field(&reference, fields::CHECK_OUT)
        .await
        .map_err(internal)?;

    Ok(Json(ReservationStateResponse {
        booking_reference_id: reference,
        stage,
        booking_code,
        has_guest_details: snapshot.is_some(),
        check_in,
        check_out,
    }))
}

async fn put_guest_details(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
    Json(req): Json<GuestDetailsRequest>,
) -> Result<Json<Value>, AppError> {
    require_owner(&state, &reference, &claims).await?;

    let snapshot = GuestSnapshot {
        booking_reference_id: reference.clone(),
        contact: req.contact,
        rooms: req.rooms,
        captured_at: Utc::now(),
    };

    state
        .reconciler
        .store_guests(&reference, &snapshot)
        .await
        .map_err(crate::error::reconcile_error)?;

    let captured = GuestDetailsCapturedEvent {
        booking_reference_id: reference.clone(),
        customer_id: claims.sub.clone(),
        rooms: snapshot.rooms.len(),
        guests: snapshot.total_guests(),
        timestamp: Utc::now().timestamp(),
    };
    let _ = state
        .bookings
        .add_event(
            &reference,
            "GUEST_DETAILS_CAPTURED",
            serde_json::to_value(&captured).ok(),
        )
        .await;

    Ok(Json(serde_json::json!({
        "booking_reference_id": reference,
        "stage": FlowStage::GuestsCaptured.as_str(),
        "guests": snapshot.total_guests(),
    })))
}
