#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCreatedEvent {
    pub booking_reference_id: String,
    pub customer_id: String,
    pub hotel_code: String,
    pub booking_code: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct GuestDetailsCapturedEvent {
    pub booking_reference_id: String,
    pub customer_id: String,
    pub rooms: usize,
    pub guests: usize,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_reference_id: String,
    pub confirmation_number: String,
    pub customer_id: String,
    pub total_fare: f64,
    pub payment_status: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentDeclinedEvent {
    pub booking_reference_id: String,
    pub order_ref: String,
    pub status_code: i32,
    pub timestamp: i64,
}
