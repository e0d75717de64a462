use axum::{extract::State, http::StatusCode};
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

use crate::state::AppState;

pub struct Metrics {
    pub registry: Registry,
    pub reservations_created: IntCounter,
    pub bookings_confirmed: IntCounter,
    pub payments_declined: IntCounter,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let reservations_created = IntCounter::new(
            "stayline_reservations_created_total",
            "Reservations created via prebook",
        )
        .expect("metric definition");
        let bookings_confirmed = IntCounter::new(
            "stayline_bookings_confirmed_total",
            "Bookings confirmed with the supplier",
        )
        .expect("metric definition");
        let payments_declined = IntCounter::new(
            "stayline_payments_declined_total",
            "Gateway orders that came back not authorised",
        )
        .expect("metric definition");

        registry
            .register(Box::new(reservations_created.clone()))
            .expect("register metric");
        registry
            .register(Box::new(bookings_confirmed.clone()))
            .expect("register metric");
        registry
            .register(Box::new(payments_declined.clone()))
            .expect("register metric");

        Self {
            registry,
            reservations_created,
            bookings_confirmed,
            payments_declined,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&families, &mut buffer)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    String::from_utf8(buffer).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
