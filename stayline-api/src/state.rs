use std::sync::Arc;

use async_trait::async_trait;
use stayline_booking::{PaymentOrchestrator, Reconciler};
use stayline_core::repository::{
    BookingRepository, CustomerRepository, FlowStore, WishlistRepository,
};
use stayline_core::supplier::HotelSupplier;
use stayline_core::BoxError;
use stayline_store::app_config::BusinessRules;
use stayline_store::RedisClient;

use crate::metrics::Metrics;
use crate::middleware::resiliency::ResiliencyState;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// Fixed-window request limiter; Redis-backed in production, permissive
/// in-memory in tests.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn check(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, BoxError>;
}

#[async_trait]
impl RateLimiter for RedisClient {
    async fn check(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, BoxError> {
        Ok(self.check_rate_limit(key, limit, window_seconds).await?)
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flows: Arc<dyn FlowStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub bookings: Arc<dyn BookingRepository>,
    pub customers: Arc<dyn CustomerRepository>,
    pub wishlist: Arc<dyn WishlistRepository>,
    pub supplier: Arc<dyn HotelSupplier>,
    pub payments: Arc<PaymentOrchestrator>,
    pub reconciler: Arc<Reconciler>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub public_base_url: String,
    pub resiliency: Arc<ResiliencyState>,
    pub metrics: Arc<Metrics>,
}
