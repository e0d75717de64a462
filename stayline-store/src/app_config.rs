use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub supplier: SupplierConfig,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL of this service, used to build gateway return URLs.
    pub public_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupplierConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub store_id: String,
    pub auth_key: String,
    #[serde(default = "default_true")]
    pub test_mode: bool,
    /// Local development runs without gateway credentials.
    #[serde(default)]
    pub use_mock: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// TTL of an in-progress reservation flow.
    pub reservation_hold_seconds: u64,
    /// TTL of the single-shot confirmation lock.
    pub confirm_lock_seconds: u64,
    #[serde(default = "default_max_stay")]
    pub max_stay_nights: i64,
    /// The gateway account settles in one currency only.
    #[serde(default = "default_currency")]
    pub settlement_currency: String,
    #[serde(default = "default_nationality")]
    pub guest_nationality: String,
    #[serde(default = "default_phone_code")]
    pub phone_country_code: String,
    /// Pending-payment bookings older than this are swept and cancelled.
    pub unpaid_cancel_after_hours: i64,
    pub expiry_sweep_seconds: u64,
}

fn default_max_stay() -> i64 {
    30
}

fn default_currency() -> String {
    "AED".to_string()
}

fn default_nationality() -> String {
    "AE".to_string()
}

fn default_phone_code() -> String {
    "91".to_string()
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment variables, e.g. STAYLINE__GATEWAY__AUTH_KEY=...
            .add_source(config::Environment::with_prefix("STAYLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
