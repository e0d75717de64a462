use crate::BoxError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stayline_shared::pii::Masked;

/// A confirmed booking mirrored into the operator's own store. The supplier
/// remains the system of record; this mirror backs booking history, the
/// unpaid-booking sweep and support lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub booking_reference_id: String,
    pub confirmation_number: String,
    pub client_reference_id: String,
    pub customer_id: String,
    pub hotel_code: String,
    pub hotel_name: Option<String>,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub booking_date: DateTime<Utc>,
    pub status: String,
    pub payment_status: String,
    pub total_fare: f64,
    pub currency: String,
    pub no_of_rooms: i32,
    pub invoice_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub email: Masked<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<Masked<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub customer_id: String,
    pub hotel_code: String,
    pub hotel_name: Option<String>,
    pub city_code: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, record: &BookingRecord) -> Result<(), BoxError>;

    async fn get_by_reference(
        &self,
        booking_reference_id: &str,
    ) -> Result<Option<BookingRecord>, BoxError>;

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<BookingRecord>, BoxError>;

    async fn update_status(
        &self,
        booking_reference_id: &str,
        status: &str,
    ) -> Result<(), BoxError>;

    /// Pending-payment bookings older than the cutoff, for the expiry sweep.
    async fn find_stale_pending(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>, BoxError>;

    /// Append-only audit trail of flow transitions and outcomes.
    async fn add_event(
        &self,
        booking_reference_id: &str,
        event_type: &str,
        detail: Option<serde_json::Value>,
    ) -> Result<(), BoxError>;
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<CustomerRecord, BoxError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, BoxError>;

    async fn find_by_id(&self, customer_id: &str) -> Result<Option<CustomerRecord>, BoxError>;

    async fn update_profile(
        &self,
        customer_id: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<(), BoxError>;
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Duplicate adds are idempotent.
    async fn add(&self, entry: &WishlistEntry) -> Result<(), BoxError>;

    async fn list(&self, customer_id: &str) -> Result<Vec<WishlistEntry>, BoxError>;

    /// Returns false when the entry did not exist.
    async fn remove(&self, customer_id: &str, hotel_code: &str) -> Result<bool, BoxError>;
}

/// Server-side replacement for the legacy client-held flow blobs: one hash per
/// in-progress booking reference, plus the confirmation lock that makes the
/// final booking call single-shot.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn set_field(&self, reference: &str, field: &str, value: &str) -> Result<(), BoxError>;

    async fn get_field(&self, reference: &str, field: &str)
        -> Result<Option<String>, BoxError>;

    async fn remove_field(&self, reference: &str, field: &str) -> Result<(), BoxError>;

    async fn delete(&self, reference: &str) -> Result<(), BoxError>;

    async fn expire(&self, reference: &str, ttl_seconds: u64) -> Result<(), BoxError>;

    /// SET-NX style lock. Returns true when this caller holds the lock; a
    /// second acquisition for the same reference must return false until the
    /// TTL lapses.
    async fn acquire_confirm_lock(
        &self,
        reference: &str,
        ttl_seconds: u64,
    ) -> Result<bool, BoxError>;

    /// Map a gateway order reference back to the booking reference so the
    /// return redirect can find its flow.
    async fn bind_order_ref(
        &self,
        order_ref: &str,
        reference: &str,
        ttl_seconds: u64,
    ) -> Result<(), BoxError>;

    async fn lookup_order_ref(&self, order_ref: &str) -> Result<Option<String>, BoxError>;
}
