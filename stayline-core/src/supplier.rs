use crate::vendor::{BookOutcome, BookRequest, PrebookOutcome, SearchEnvelope, SearchRequest};
use crate::BoxError;
use async_trait::async_trait;
use serde_json::Value;

/// Client for the upstream hotel supplier. Implementations inject the
/// supplier's Basic-Auth credentials and talk to a fixed base URL; callers
/// only ever see decoded envelopes.
#[async_trait]
pub trait HotelSupplier: Send + Sync {
    /// Availability search. A `null` body from the supplier is mapped to the
    /// fixed fallback payload, so this always yields a decodable envelope.
    async fn search(&self, req: &SearchRequest) -> Result<SearchEnvelope, BoxError>;

    /// Static hotel content, passed through verbatim.
    async fn hotel_details(&self, body: &Value) -> Result<Value, BoxError>;

    /// Room/rate refresh for a hotel, passed through verbatim.
    async fn hotel_rooms(&self, body: &Value) -> Result<Value, BoxError>;

    /// Lock/validate a rate shortly before final booking.
    async fn prebook(&self, booking_code: &str) -> Result<PrebookOutcome, BoxError>;

    /// Final booking confirmation. Must be called at most once per
    /// booking-reference id; callers are responsible for the idempotency lock.
    async fn book(&self, req: &BookRequest) -> Result<BookOutcome, BoxError>;

    /// Cancel a confirmed booking.
    async fn cancel(&self, confirmation_number: &str) -> Result<Value, BoxError>;

    /// Booking lookup by the supplier's confirmation/reference.
    async fn booking_detail(&self, booking_reference_id: &str) -> Result<Value, BoxError>;

    async fn country_list(&self) -> Result<Value, BoxError>;

    async fn city_list(&self, country_code: &str) -> Result<Value, BoxError>;

    async fn hotel_code_list(&self, city_code: &str) -> Result<Value, BoxError>;
}
