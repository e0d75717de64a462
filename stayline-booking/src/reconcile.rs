//! Reconciliation of payment results with stored booking-flow state, and the
//! single place the final supplier booking call is made from.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::assemble::{build_booking_request, AssembleError};
use crate::flow::{self, fields, FlowError, FlowStage};
use crate::guest::{GuestSnapshot, GuestValidationError};
use crate::orchestrator::PaymentOrchestrator;
use crate::reference::customer_id_from_reference;
use stayline_core::payment::PaymentStatus;
use stayline_core::repository::{BookingRecord, BookingRepository, FlowStore};
use stayline_shared::models::events::{BookingConfirmedEvent, PaymentDeclinedEvent};
use stayline_core::supplier::HotelSupplier;
use stayline_core::vendor::{BookOutcome, Room};
use stayline_core::BoxError;

/// Business knobs the pipeline needs; sourced from configuration.
#[derive(Debug, Clone)]
pub struct FlowRules {
    /// The gateway account settles in exactly one currency; display currency
    /// is ignored for payment.
    pub settlement_currency: String,
    pub guest_nationality: String,
    pub phone_country_code: String,
    pub confirm_lock_seconds: u64,
}

impl Default for FlowRules {
    fn default() -> Self {
        Self {
            settlement_currency: "AED".to_string(),
            guest_nationality: "AE".to_string(),
            phone_country_code: "91".to_string(),
            confirm_lock_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMeta {
    pub order_ref: String,
    pub transaction_ref: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
}

/// Result of a successful booking confirmation, mirrored to the operator
/// store and returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confirmation {
    pub confirmation_number: String,
    pub booking_id: Option<String>,
    pub client_reference_id: String,
    pub booking_reference_id: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub payment_status: PaymentStatus,
    pub payment: Option<PaymentMeta>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("Guest details not found. Cannot confirm booking")]
    MissingGuestDetails,

    #[error("No booking code available. The prebook may have expired")]
    MissingBookingCode,

    #[error("Invalid room price. Cannot proceed")]
    InvalidFare,

    #[error("Guest details belong to a different reservation")]
    StaleSnapshot,

    #[error("Payment not authorised. Status: {text} ({code})")]
    NotAuthorised { code: i32, text: String },

    #[error("No booking flow found for this payment order")]
    UnknownOrderRef,

    #[error("A confirmation for this reservation is already in progress")]
    ConfirmationInProgress,

    #[error("Booking confirmation failed: {0}")]
    VendorRejected(String),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    InvalidTransition(#[from] FlowError),

    #[error(transparent)]
    Validation(#[from] GuestValidationError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("Flow storage error: {0}")]
    Storage(String),
}

impl ReconcileError {
    fn storage(err: BoxError) -> Self {
        ReconcileError::Storage(err.to_string())
    }
}

/// Drives a booking attempt from captured guest details to a supplier-side
/// confirmation, for both the gateway and the pay-later paths.
pub struct Reconciler {
    flows: Arc<dyn FlowStore>,
    supplier: Arc<dyn HotelSupplier>,
    payments: Arc<PaymentOrchestrator>,
    bookings: Arc<dyn BookingRepository>,
    rules: FlowRules,
}

impl Reconciler {
    pub fn new(
        flows: Arc<dyn FlowStore>,
        supplier: Arc<dyn HotelSupplier>,
        payments: Arc<PaymentOrchestrator>,
        bookings: Arc<dyn BookingRepository>,
        rules: FlowRules,
    ) -> Self {
        Self {
            flows,
            supplier,
            payments,
            bookings,
            rules,
        }
    }

    pub fn rules(&self) -> &FlowRules {
        &self.rules
    }

    pub async fn stage(&self, reference: &str) -> Result<Option<FlowStage>, ReconcileError> {
        let raw = self
            .flows
            .get_field(reference, fields::STAGE)
            .await
            .map_err(ReconcileError::storage)?;
        Ok(raw.as_deref().and_then(FlowStage::parse))
    }

    pub async fn advance_stage(
        &self,
        reference: &str,
        to: FlowStage,
    ) -> Result<(), ReconcileError> {
        let current = self
            .stage(reference)
            .await?
            .ok_or(ReconcileError::MissingGuestDetails)?;
        let next = flow::advance(current, to)?;
        self.flows
            .set_field(reference, fields::STAGE, next.as_str())
            .await
            .map_err(ReconcileError::storage)
    }

    /// Validate a transition without persisting it. The confirm paths use
    /// this so a failed supplier call leaves the flow where it was and the
    /// customer can retry.
    async fn check_stage(&self, reference: &str, to: FlowStage) -> Result<(), ReconcileError> {
        let current = self
            .stage(reference)
            .await?
            .ok_or(ReconcileError::MissingGuestDetails)?;
        flow::advance(current, to)?;
        Ok(())
    }

    /// Load the guest snapshot for a flow. Malformed JSON and snapshots whose
    /// embedded reference disagrees with the flow are discarded on the spot so
    /// the caller re-prompts for guest details instead of reusing stale data.
    pub async fn load_snapshot(
        &self,
        reference: &str,
    ) -> Result<Option<GuestSnapshot>, ReconcileError> {
        let raw = match self
            .flows
            .get_field(reference, fields::GUEST_DETAILS)
            .await
            .map_err(ReconcileError::storage)?
        {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let snapshot: GuestSnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Discarding malformed guest snapshot for {}: {}", reference, e);
                self.flows
                    .remove_field(reference, fields::GUEST_DETAILS)
                    .await
                    .map_err(ReconcileError::storage)?;
                return Ok(None);
            }
        };

        if !snapshot.matches_reference(reference) {
            warn!(
                "Booking reference mismatch (saved {}, active {}), clearing guest details",
                snapshot.booking_reference_id, reference
            );
            self.flows
                .remove_field(reference, fields::GUEST_DETAILS)
                .await
                .map_err(ReconcileError::storage)?;
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    /// Persist a validated guest snapshot and advance the flow.
    pub async fn store_guests(
        &self,
        reference: &str,
        snapshot: &GuestSnapshot,
    ) -> Result<(), ReconcileError> {
        snapshot.validate()?;
        if !snapshot.matches_reference(reference) {
            return Err(ReconcileError::StaleSnapshot);
        }

        let json = serde_json::to_string(snapshot)
            .map_err(|e| ReconcileError::Storage(e.to_string()))?;
        self.flows
            .set_field(reference, fields::GUEST_DETAILS, &json)
            .await
            .map_err(ReconcileError::storage)?;
        self.advance_stage(reference, FlowStage::GuestsCaptured)
            .await?;

        info!(
            "Guest details captured for {} ({} rooms, {} guests)",
            reference,
            snapshot.rooms.len(),
            snapshot.total_guests()
        );
        Ok(())
    }

    /// "Pay now" return leg: verify the gateway order and, only when it is
    /// authorised, confirm the booking with the supplier.
    pub async fn confirm_after_payment(
        &self,
        order_ref: &str,
    ) -> Result<Confirmation, ReconcileError> {
        let reference = self
            .flows
            .lookup_order_ref(order_ref)
            .await
            .map_err(ReconcileError::storage)?
            .ok_or(ReconcileError::UnknownOrderRef)?;

        let state = self
            .payments
            .verify_order(order_ref)
            .await
            .map_err(|e| ReconcileError::Gateway(e.to_string()))?;

        if !state.status.is_authorised() {
            let declined = PaymentDeclinedEvent {
                booking_reference_id: reference.clone(),
                order_ref: order_ref.to_string(),
                status_code: state.status.code(),
                timestamp: Utc::now().timestamp(),
            };
            let _ = self
                .bookings
                .add_event(
                    &reference,
                    "PAYMENT_DECLINED",
                    serde_json::to_value(&declined).ok(),
                )
                .await;
            return Err(ReconcileError::NotAuthorised {
                code: state.status.code(),
                text: state.status_text,
            });
        }

        let (snapshot, booking_code, fare) = self.require_inputs(&reference).await?;

        self.check_stage(&reference, FlowStage::Confirmed).await?;

        let meta = PaymentMeta {
            order_ref: order_ref.to_string(),
            transaction_ref: state.transaction_ref,
            amount: state.amount,
            currency: state.currency,
        };

        self.confirm(
            &reference,
            snapshot,
            &booking_code,
            fare,
            PaymentStatus::Paid,
            Some(meta),
        )
        .await
    }

    /// "Pay later": confirm the booking directly, without the gateway, with
    /// payment recorded as pending.
    pub async fn confirm_pay_later(
        &self,
        reference: &str,
    ) -> Result<Confirmation, ReconcileError> {
        let (snapshot, booking_code, fare) = self.require_inputs(reference).await?;

        self.check_stage(reference, FlowStage::ConfirmedPendingPayment)
            .await?;

        self.confirm(
            reference,
            snapshot,
            &booking_code,
            fare,
            PaymentStatus::Pending,
            None,
        )
        .await
    }

    async fn require_inputs(
        &self,
        reference: &str,
    ) -> Result<(GuestSnapshot, String, f64), ReconcileError> {
        let snapshot = self
            .load_snapshot(reference)
            .await?
            .ok_or(ReconcileError::MissingGuestDetails)?;

        let booking_code = self
            .flows
            .get_field(reference, fields::BOOKING_CODE)
            .await
            .map_err(ReconcileError::storage)?
            .ok_or(ReconcileError::MissingBookingCode)?;

        let room: Option<Room> = self
            .flows
            .get_field(reference, fields::ROOM)
            .await
            .map_err(ReconcileError::storage)?
            .and_then(|raw| serde_json::from_str(&raw).ok());

        let fare = room
            .as_ref()
            .and_then(Room::fare)
            .filter(|fare| *fare > 0.0)
            .ok_or(ReconcileError::InvalidFare)?;

        Ok((snapshot, booking_code, fare))
    }

    /// The single-shot booking call. The confirm lock guarantees a
    /// BookingRequest is never submitted twice for the same reference even if
    /// the return leg is replayed concurrently.
    async fn confirm(
        &self,
        reference: &str,
        snapshot: GuestSnapshot,
        booking_code: &str,
        fare: f64,
        payment_status: PaymentStatus,
        payment: Option<PaymentMeta>,
    ) -> Result<Confirmation, ReconcileError> {
        let locked = self
            .flows
            .acquire_confirm_lock(reference, self.rules.confirm_lock_seconds)
            .await
            .map_err(ReconcileError::storage)?;
        if !locked {
            return Err(ReconcileError::ConfirmationInProgress);
        }

        let request = build_booking_request(
            booking_code,
            &snapshot,
            fare,
            &self.rules.guest_nationality,
            &self.rules.phone_country_code,
        )?;

        let outcome = self
            .supplier
            .book(&request)
            .await
            .map_err(|e| ReconcileError::VendorRejected(e.to_string()))?;

        let (confirmation_number, booking_id) = match outcome {
            BookOutcome::Confirmed {
                confirmation_number,
                booking_id,
            } => (confirmation_number, booking_id),
            // No compensating void of the payment here; the order stays with
            // the gateway and support resolves it manually.
            BookOutcome::Failed { message } => {
                let _ = self
                    .bookings
                    .add_event(
                        reference,
                        "BOOKING_FAILED",
                        Some(serde_json::json!({ "message": message })),
                    )
                    .await;
                return Err(ReconcileError::VendorRejected(message));
            }
        };

        let confirmation = Confirmation {
            confirmation_number: confirmation_number.clone(),
            booking_id,
            client_reference_id: request.client_reference_id.clone(),
            booking_reference_id: reference.to_string(),
            timestamp: Utc::now(),
            payment_status: payment_status.clone(),
            payment,
        };

        // Mirror into the operator store. The supplier already holds the
        // booking, so a failure here is logged and the confirmation still
        // stands.
        let record = self.build_record(reference, &snapshot, &confirmation, fare).await;
        if let Err(e) = self.bookings.insert_booking(&record).await {
            error!(
                "Failed to mirror booking {} into operator store: {}",
                reference, e
            );
        }

        let confirmed = BookingConfirmedEvent {
            booking_reference_id: reference.to_string(),
            confirmation_number: confirmation_number.clone(),
            customer_id: record.customer_id.clone(),
            total_fare: record.total_fare,
            payment_status: payment_status.as_str().to_string(),
            timestamp: confirmation.timestamp.timestamp(),
        };
        let _ = self
            .bookings
            .add_event(
                reference,
                "BOOKING_CONFIRMED",
                serde_json::to_value(&confirmed).ok(),
            )
            .await;

        // The flow is finished; drop all transient state.
        self.flows
            .delete(reference)
            .await
            .map_err(ReconcileError::storage)?;

        info!(
            "Booking confirmed for {} ({}, payment {})",
            reference,
            confirmation.confirmation_number,
            payment_status.as_str()
        );

        Ok(confirmation)
    }

    async fn parse_date_field(&self, reference: &str, field: &str) -> Option<NaiveDate> {
        self.flows
            .get_field(reference, field)
            .await
            .ok()
            .flatten()
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok())
    }

    async fn build_record(
        &self,
        reference: &str,
        snapshot: &GuestSnapshot,
        confirmation: &Confirmation,
        fare: f64,
    ) -> BookingRecord {
        let hotel: Option<serde_json::Value> = self
            .flows
            .get_field(reference, fields::HOTEL)
            .await
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str(&raw).ok());

        let today = Utc::now().date_naive();
        let check_in = self
            .parse_date_field(reference, fields::CHECK_IN)
            .await
            .unwrap_or(today);
        let check_out = self
            .parse_date_field(reference, fields::CHECK_OUT)
            .await
            .unwrap_or(today);

        let hotel_code = hotel
            .as_ref()
            .and_then(|h| h.get("HotelCode"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let hotel_name = hotel
            .as_ref()
            .and_then(|h| h.get("HotelName"))
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let currency = hotel
            .as_ref()
            .and_then(|h| h.get("Currency"))
            .and_then(|v| v.as_str())
            .unwrap_or("USD")
            .to_string();

        BookingRecord {
            booking_reference_id: reference.to_string(),
            confirmation_number: confirmation.confirmation_number.clone(),
            client_reference_id: confirmation.client_reference_id.clone(),
            customer_id: customer_id_from_reference(reference)
                .unwrap_or_default()
                .to_string(),
            hotel_code,
            hotel_name,
            check_in,
            check_out,
            booking_date: confirmation.timestamp,
            status: "Confirmed".to_string(),
            payment_status: confirmation.payment_status.as_str().to_string(),
            total_fare: crate::assemble::round_fare(fare),
            currency,
            no_of_rooms: snapshot.rooms.len() as i32,
            invoice_number: format!("INV{}", confirmation.timestamp.timestamp_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guest::test_support::snapshot;
    use crate::orchestrator::MockGateway;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use stayline_core::vendor::{
        BookRequest, PrebookOutcome, SearchEnvelope, SearchRequest,
    };

    #[derive(Default)]
    struct MemFlowStore {
        hashes: Mutex<HashMap<String, HashMap<String, String>>>,
        locks: Mutex<HashSet<String>>,
        order_refs: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl FlowStore for MemFlowStore {
        async fn set_field(
            &self,
            reference: &str,
            field: &str,
            value: &str,
        ) -> Result<(), BoxError> {
            self.hashes
                .lock()
                .unwrap()
                .entry(reference.to_string())
                .or_default()
                .insert(field.to_string(), value.to_string());
            Ok(())
        }

        async fn get_field(
            &self,
            reference: &str,
            field: &str,
        ) -> Result<Option<String>, BoxError> {
            Ok(self
                .hashes
                .lock()
                .unwrap()
                .get(reference)
                .and_then(|h| h.get(field))
                .cloned())
        }

        async fn remove_field(&self, reference: &str, field: &str) -> Result<(), BoxError> {
            if let Some(hash) = self.hashes.lock().unwrap().get_mut(reference) {
                hash.remove(field);
            }
            Ok(())
        }

        async fn delete(&self, reference: &str) -> Result<(), BoxError> {
            self.hashes.lock().unwrap().remove(reference);
            Ok(())
        }

        async fn expire(&self, _reference: &str, _ttl_seconds: u64) -> Result<(), BoxError> {
            Ok(())
        }

        async fn acquire_confirm_lock(
            &self,
            reference: &str,
            _ttl_seconds: u64,
        ) -> Result<bool, BoxError> {
            Ok(self.locks.lock().unwrap().insert(reference.to_string()))
        }

        async fn bind_order_ref(
            &self,
            order_ref: &str,
            reference: &str,
            _ttl_seconds: u64,
        ) -> Result<(), BoxError> {
            self.order_refs
                .lock()
                .unwrap()
                .insert(order_ref.to_string(), reference.to_string());
            Ok(())
        }

        async fn lookup_order_ref(&self, order_ref: &str) -> Result<Option<String>, BoxError> {
            Ok(self.order_refs.lock().unwrap().get(order_ref).cloned())
        }
    }

    #[derive(Default)]
    struct RecordingSupplier {
        book_calls: Mutex<Vec<BookRequest>>,
        fail_booking: bool,
    }

    #[async_trait]
    impl HotelSupplier for RecordingSupplier {
        async fn search(&self, _req: &SearchRequest) -> Result<SearchEnvelope, BoxError> {
            unimplemented!("not used in reconcile tests")
        }

        async fn hotel_details(
            &self,
            _body: &serde_json::Value,
        ) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }

        async fn hotel_rooms(
            &self,
            _body: &serde_json::Value,
        ) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }

        async fn prebook(&self, _booking_code: &str) -> Result<PrebookOutcome, BoxError> {
            unimplemented!()
        }

        async fn book(&self, req: &BookRequest) -> Result<BookOutcome, BoxError> {
            self.book_calls.lock().unwrap().push(req.clone());
            if self.fail_booking {
                Ok(BookOutcome::Failed {
                    message: "Rate no longer available".to_string(),
                })
            } else {
                Ok(BookOutcome::Confirmed {
                    confirmation_number: "CN-777".to_string(),
                    booking_id: Some("991".to_string()),
                })
            }
        }

        async fn cancel(&self, _confirmation_number: &str) -> Result<serde_json::Value, BoxError> {
            Ok(serde_json::json!({"Status": {"Code": "200"}}))
        }

        async fn booking_detail(
            &self,
            _booking_reference_id: &str,
        ) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }

        async fn country_list(&self) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }

        async fn city_list(&self, _country_code: &str) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }

        async fn hotel_code_list(&self, _city_code: &str) -> Result<serde_json::Value, BoxError> {
            unimplemented!()
        }
    }

    #[derive(Default)]
    struct MemBookingRepo {
        records: Mutex<Vec<BookingRecord>>,
        events: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl BookingRepository for MemBookingRepo {
        async fn insert_booking(&self, record: &BookingRecord) -> Result<(), BoxError> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn get_by_reference(
            &self,
            booking_reference_id: &str,
        ) -> Result<Option<BookingRecord>, BoxError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.booking_reference_id == booking_reference_id)
                .cloned())
        }

        async fn list_for_customer(
            &self,
            customer_id: &str,
        ) -> Result<Vec<BookingRecord>, BoxError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.customer_id == customer_id)
                .cloned()
                .collect())
        }

        async fn update_status(
            &self,
            booking_reference_id: &str,
            status: &str,
        ) -> Result<(), BoxError> {
            for record in self.records.lock().unwrap().iter_mut() {
                if record.booking_reference_id == booking_reference_id {
                    record.status = status.to_string();
                }
            }
            Ok(())
        }

        async fn find_stale_pending(
            &self,
            _cutoff: chrono::DateTime<Utc>,
        ) -> Result<Vec<BookingRecord>, BoxError> {
            Ok(vec![])
        }

        async fn add_event(
            &self,
            booking_reference_id: &str,
            event_type: &str,
            _detail: Option<serde_json::Value>,
        ) -> Result<(), BoxError> {
            self.events
                .lock()
                .unwrap()
                .push((booking_reference_id.to_string(), event_type.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        flows: Arc<MemFlowStore>,
        supplier: Arc<RecordingSupplier>,
        bookings: Arc<MemBookingRepo>,
        reconciler: Reconciler,
    }

    fn fixture_with(fail_booking: bool) -> Fixture {
        let flows = Arc::new(MemFlowStore::default());
        let supplier = Arc::new(RecordingSupplier {
            fail_booking,
            ..Default::default()
        });
        let bookings = Arc::new(MemBookingRepo::default());
        let reconciler = Reconciler::new(
            flows.clone(),
            supplier.clone(),
            Arc::new(PaymentOrchestrator::new(Arc::new(MockGateway))),
            bookings.clone(),
            FlowRules::default(),
        );
        Fixture {
            flows,
            supplier,
            bookings,
            reconciler,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(false)
    }

    async fn seed_flow(fx: &Fixture, reference: &str, stage: FlowStage) {
        fx.flows
            .set_field(reference, fields::OWNER, "cust-1")
            .await
            .unwrap();
        fx.flows
            .set_field(reference, fields::STAGE, stage.as_str())
            .await
            .unwrap();
        fx.flows
            .set_field(reference, fields::BOOKING_CODE, "414792!AX1.1!8c8a")
            .await
            .unwrap();
        fx.flows
            .set_field(
                reference,
                fields::ROOM,
                r#"{"Name":"R1","BookingCode":"414792!AX1.1!8c8a","TotalFare":"121.476","Currency":"USD"}"#,
            )
            .await
            .unwrap();
        fx.flows
            .set_field(
                reference,
                fields::HOTEL,
                r#"{"HotelCode":"414792","HotelName":"ARMADA AVENUE HOTEL","Currency":"USD"}"#,
            )
            .await
            .unwrap();
        fx.flows
            .set_field(reference, fields::CHECK_IN, "2026-09-01")
            .await
            .unwrap();
        fx.flows
            .set_field(reference, fields::CHECK_OUT, "2026-09-04")
            .await
            .unwrap();
        let snap = snapshot(reference);
        fx.flows
            .set_field(
                reference,
                fields::GUEST_DETAILS,
                &serde_json::to_string(&snap).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_authorised_payment_confirms_exactly_once() {
        let fx = fixture();
        let reference = "cust-1#1700000000000";
        seed_flow(&fx, reference, FlowStage::PaymentPending).await;
        fx.flows
            .bind_order_ref("ord-1", reference, 900)
            .await
            .unwrap();

        let confirmation = fx.reconciler.confirm_after_payment("ord-1").await.unwrap();

        let calls = fx.supplier.book_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        // Fare rounded to two decimals, phone digits-only with country code.
        assert_eq!(calls[0].total_fare, 121.48);
        assert_eq!(calls[0].phone_number, 910501234567);
        assert_eq!(calls[0].booking_reference_id, reference);
        drop(calls);

        assert_eq!(confirmation.payment_status, PaymentStatus::Paid);
        assert_eq!(confirmation.confirmation_number, "CN-777");
        assert!(confirmation.payment.is_some());

        // Flow state is gone; the mirror record exists.
        assert!(fx
            .flows
            .get_field(reference, fields::GUEST_DETAILS)
            .await
            .unwrap()
            .is_none());
        let records = fx.bookings.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].payment_status, "Paid");
        assert_eq!(records[0].hotel_code, "414792");
        assert_eq!(records[0].customer_id, "cust-1");
    }

    #[tokio::test]
    async fn test_declined_payment_never_books() {
        let fx = fixture();
        let reference = "cust-1#1700000000001";
        seed_flow(&fx, reference, FlowStage::PaymentPending).await;
        fx.flows
            .bind_order_ref("mock_ord_declined_1", reference, 900)
            .await
            .unwrap();

        let result = fx
            .reconciler
            .confirm_after_payment("mock_ord_declined_1")
            .await;
        assert!(matches!(
            result,
            Err(ReconcileError::NotAuthorised { code: 2, .. })
        ));
        assert!(fx.supplier.book_calls.lock().unwrap().is_empty());

        // The decline left an audit trail but no booking.
        let events = fx.bookings.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|(r, e)| r == reference && e == "PAYMENT_DECLINED"));
        assert!(fx.bookings.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_snapshot_discarded_and_cleared() {
        let fx = fixture();
        let reference = "XYZ";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;
        // Overwrite the snapshot with one captured under a different reference.
        let stale = snapshot("ABC");
        fx.flows
            .set_field(
                reference,
                fields::GUEST_DETAILS,
                &serde_json::to_string(&stale).unwrap(),
            )
            .await
            .unwrap();

        let loaded = fx.reconciler.load_snapshot(reference).await.unwrap();
        assert!(loaded.is_none());
        assert!(fx
            .flows
            .get_field(reference, fields::GUEST_DETAILS)
            .await
            .unwrap()
            .is_none());

        // Confirming now demands fresh guest details rather than proceeding.
        let result = fx.reconciler.confirm_pay_later(reference).await;
        assert!(matches!(result, Err(ReconcileError::MissingGuestDetails)));
        assert!(fx.supplier.book_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_snapshot_discarded() {
        let fx = fixture();
        let reference = "cust-1#1700000000002";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;
        fx.flows
            .set_field(reference, fields::GUEST_DETAILS, "{not json")
            .await
            .unwrap();

        assert!(fx
            .reconciler
            .load_snapshot(reference)
            .await
            .unwrap()
            .is_none());
        assert!(fx
            .flows
            .get_field(reference, fields::GUEST_DETAILS)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_pay_later_confirms_with_pending_status() {
        let fx = fixture();
        let reference = "cust-1#1700000000003";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;

        let confirmation = fx.reconciler.confirm_pay_later(reference).await.unwrap();
        assert_eq!(confirmation.payment_status, PaymentStatus::Pending);
        assert!(confirmation.payment.is_none());

        let records = fx.bookings.records.lock().unwrap();
        assert_eq!(records[0].payment_status, "Pending");
    }

    #[tokio::test]
    async fn test_replay_after_confirmation_takes_no_data_branch() {
        let fx = fixture();
        let reference = "cust-1#1700000000004";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;

        fx.reconciler.confirm_pay_later(reference).await.unwrap();
        assert_eq!(fx.supplier.book_calls.lock().unwrap().len(), 1);

        // Replaying the success path finds no flow data: no second booking.
        let replay = fx.reconciler.confirm_pay_later(reference).await;
        assert!(matches!(replay, Err(ReconcileError::MissingGuestDetails)));
        assert_eq!(fx.supplier.book_calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_lock_blocks_duplicate_submission() {
        let fx = fixture();
        let reference = "cust-1#1700000000005";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;
        // Simulate a concurrent confirmation holding the lock.
        fx.flows.locks.lock().unwrap().insert(reference.to_string());

        let result = fx.reconciler.confirm_pay_later(reference).await;
        assert!(matches!(result, Err(ReconcileError::ConfirmationInProgress)));
        assert!(fx.supplier.book_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_booking_code_is_fatal() {
        let fx = fixture();
        let reference = "cust-1#1700000000006";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;
        fx.flows
            .remove_field(reference, fields::BOOKING_CODE)
            .await
            .unwrap();

        let result = fx.reconciler.confirm_pay_later(reference).await;
        assert!(matches!(result, Err(ReconcileError::MissingBookingCode)));
    }

    #[tokio::test]
    async fn test_vendor_failure_surfaces_without_retry() {
        let fx = fixture_with(true);
        let reference = "cust-1#1700000000007";
        seed_flow(&fx, reference, FlowStage::GuestsCaptured).await;

        let result = fx.reconciler.confirm_pay_later(reference).await;
        assert!(matches!(result, Err(ReconcileError::VendorRejected(_))));
        assert_eq!(fx.supplier.book_calls.lock().unwrap().len(), 1);
        assert!(fx.bookings.records.lock().unwrap().is_empty());

        let events = fx.bookings.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|(r, e)| r == reference && e == "BOOKING_FAILED"));
    }

    #[tokio::test]
    async fn test_store_guests_rejects_invalid_ages() {
        let fx = fixture();
        let reference = "cust-1#1700000000008";
        seed_flow(&fx, reference, FlowStage::Reserved).await;
        fx.flows
            .remove_field(reference, fields::GUEST_DETAILS)
            .await
            .unwrap();

        let mut snap = snapshot(reference);
        snap.rooms[0].guests[1].age = Some(19);
        let result = fx.reconciler.store_guests(reference, &snap).await;
        assert!(matches!(result, Err(ReconcileError::Validation(_))));
    }
}
