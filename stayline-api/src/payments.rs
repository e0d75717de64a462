use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stayline_booking::assemble::round_fare;
use stayline_booking::flow::{fields, FlowStage};
use stayline_booking::{Confirmation, ReconcileError};
use stayline_core::payment::{CheckoutCustomer, CheckoutRequest, ReturnUrls};
use stayline_core::vendor::Room;
use tracing::info;

use crate::error::{reconcile_error, AppError};
use crate::middleware::auth::CustomerClaims;
use crate::reservations::require_owner;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    booking_reference_id: String,
    order_ref: String,
    checkout_url: String,
    amount: String,
    currency: String,
}

#[derive(Debug, Serialize)]
struct PayLaterResponse {
    pay_later: bool,
    return_url: String,
    confirmation: Confirmation,
}

#[derive(Debug, Deserialize)]
pub struct ReturnParams {
    #[serde(default)]
    pub pay_later: Option<String>,
    #[serde(default)]
    pub booking_ref: Option<String>,
    #[serde(default)]
    pub order_ref: Option<String>,
    #[serde(default, rename = "ref")]
    pub gateway_ref: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations/{reference}/pay", post(initiate_payment))
        .route("/v1/reservations/{reference}/pay-later", post(pay_later))
}

/// Routes the gateway redirects the customer's browser back to; no JWT here.
pub fn return_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments/return", get(payment_return))
        .route("/v1/payments/failure", get(payment_failure))
        .route("/v1/payments/cancelled", get(payment_cancelled))
}

fn internal(err: stayline_core::BoxError) -> AppError {
    AppError::InternalServerError(err.to_string())
}

/// "Pay now": build a gateway order for the flow and hand back the hosted
/// checkout URL. The booking itself is only confirmed after the gateway
/// reports the order authorised.
async fn initiate_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
) -> Result<Json<CheckoutResponse>, AppError> {
    require_owner(&state, &reference, &claims).await?;

    // A missing or stale snapshot sends the caller back to guest details.
    let snapshot = state
        .reconciler
        .load_snapshot(&reference)
        .await
        .map_err(reconcile_error)?
        .ok_or_else(|| {
            AppError::ConflictError("Guest details required for this reservation".to_string())
        })?;

    state
        .flows
        .get_field(&reference, fields::BOOKING_CODE)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            AppError::ConflictError(
                "BookingCode not available. The prebook may have expired. Please reserve again"
                    .to_string(),
            )
        })?;

    let room: Option<Room> = state
        .flows
        .get_field(&reference, fields::ROOM)
        .await
        .map_err(internal)?
        .and_then(|raw| serde_json::from_str(&raw).ok());
    let fare = room
        .as_ref()
        .and_then(Room::fare)
        .filter(|fare| *fare > 0.0)
        .ok_or_else(|| {
            AppError::ValidationError("Invalid room price. Cannot proceed to payment".to_string())
        })?;

    let hotel_name = state
        .flows
        .get_field(&reference, fields::HOTEL)
        .await
        .map_err(internal)?
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .and_then(|hotel| {
            hotel
                .get("HotelName")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Hotel".to_string());

    // The gateway account settles in one currency; the room's display
    // currency is deliberately ignored here.
    let currency = state.business_rules.settlement_currency.clone();
    let amount = format!("{:.2}", round_fare(fare));

    let base = state.public_base_url.trim_end_matches('/');
    let checkout = CheckoutRequest {
        cart_id: reference.clone(),
        amount: amount.clone(),
        currency: currency.clone(),
        description: format!("Hotel Booking - {}", hotel_name),
        customer: CheckoutCustomer {
            reference: claims.sub.clone(),
            email: snapshot.contact.email.clone(),
            forenames: snapshot.contact.first_name.clone(),
            surname: snapshot.contact.last_name.clone(),
            address_line1: snapshot.contact.address.clone(),
            city: snapshot.contact.city.clone(),
            country: snapshot
                .contact
                .country
                .clone()
                .unwrap_or_else(|| state.business_rules.guest_nationality.clone()),
            phone: snapshot.contact.phone.clone(),
        },
        return_urls: ReturnUrls {
            authorised: format!("{}/v1/payments/return", base),
            declined: format!("{}/v1/payments/failure", base),
            cancelled: format!("{}/v1/payments/cancelled", base),
        },
    };

    let order = state
        .payments
        .create_checkout(&checkout)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    state
        .flows
        .set_field(&reference, fields::ORDER_REF, &order.order_ref)
        .await
        .map_err(internal)?;
    state
        .flows
        .bind_order_ref(
            &order.order_ref,
            &reference,
            state.business_rules.reservation_hold_seconds,
        )
        .await
        .map_err(internal)?;
    state
        .reconciler
        .advance_stage(&reference, FlowStage::PaymentPending)
        .await
        .map_err(reconcile_error)?;

    info!(
        "Checkout created for {} (order {}, {} {})",
        reference, order.order_ref, amount, currency
    );

    Ok(Json(CheckoutResponse {
        booking_reference_id: reference,
        order_ref: order.order_ref,
        checkout_url: order.checkout_url,
        amount,
        currency,
    }))
}

/// "Pay later": confirm the booking directly with payment pending; the
/// response carries the return URL with the pay_later flag so the landing
/// endpoint treats this as already settled.
async fn pay_later(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
    Path(reference): Path<String>,
) -> Result<Json<PayLaterResponse>, AppError> {
    require_owner(&state, &reference, &claims).await?;

    let confirmation = state
        .reconciler
        .confirm_pay_later(&reference)
        .await
        .map_err(reconcile_error)?;

    state.metrics.bookings_confirmed.inc();

    // References carry a '#', which would start a URL fragment if left raw.
    let encoded_reference = reference.replace('#', "%23");
    Ok(Json(PayLaterResponse {
        pay_later: true,
        return_url: format!(
            "/v1/payments/return?pay_later=true&booking_ref={}",
            encoded_reference
        ),
        confirmation,
    }))
}

/// Landing endpoint for the gateway's return redirect, and for pay-later
/// arrivals that are already confirmed.
async fn payment_return(
    State(state): State<AppState>,
    Query(params): Query<ReturnParams>,
) -> Result<Json<Value>, AppError> {
    let pay_later = matches!(params.pay_later.as_deref(), Some("true") | Some("1"));

    if pay_later {
        // Already confirmed synchronously; the gateway is never consulted.
        if let Some(reference) = &params.booking_ref {
            if let Some(record) = state
                .bookings
                .get_by_reference(reference)
                .await
                .map_err(internal)?
            {
                return Ok(Json(json!({
                    "status": "confirmed",
                    "pay_later": true,
                    "already_confirmed": true,
                    "booking": record,
                })));
            }
        }
        return Ok(Json(json!({
            "status": "confirmed",
            "pay_later": true,
            "booking_reference_id": params.booking_ref.unwrap_or_else(|| "N/A".to_string()),
            "confirmation_number": "N/A",
            "payment_status": "Pending",
        })));
    }

    let order_ref = params
        .order_ref
        .or(params.gateway_ref)
        .ok_or_else(|| AppError::ValidationError("No order reference found in URL".to_string()))?;

    // Replay of a completed return: the flow is gone but the mirror record
    // exists, so acknowledge instead of booking again.
    if let Some(reference) = state
        .flows
        .lookup_order_ref(&order_ref)
        .await
        .map_err(internal)?
    {
        if let Some(record) = state
            .bookings
            .get_by_reference(&reference)
            .await
            .map_err(internal)?
        {
            return Ok(Json(json!({
                "status": "confirmed",
                "already_confirmed": true,
                "booking": record,
            })));
        }
    }

    match state.reconciler.confirm_after_payment(&order_ref).await {
        Ok(confirmation) => {
            state.metrics.bookings_confirmed.inc();
            Ok(Json(json!({
                "status": "confirmed",
                "confirmation": confirmation,
            })))
        }
        Err(err) => {
            if matches!(err, ReconcileError::NotAuthorised { .. }) {
                state.metrics.payments_declined.inc();
            }
            Err(reconcile_error(err))
        }
    }
}

async fn payment_failure(Query(params): Query<ReturnParams>) -> Json<Value> {
    Json(json!({
        "status": "declined",
        "order_ref": params.order_ref.or(params.gateway_ref),
        "message": "Payment was declined. No booking was made. Please try again or contact support",
    }))
}

async fn payment_cancelled(Query(params): Query<ReturnParams>) -> Json<Value> {
    Json(json!({
        "status": "cancelled",
        "order_ref": params.order_ref.or(params.gateway_ref),
        "message": "Payment was cancelled. Your reservation is still held until it expires",
    }))
}
