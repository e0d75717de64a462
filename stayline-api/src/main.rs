use std::net::SocketAddr;
use std::sync::Arc;

use stayline_api::middleware::resiliency::ResiliencyState;
use stayline_api::{app, metrics::Metrics, state::{AppState, AuthConfig}, worker};
use stayline_booking::reconcile::FlowRules;
use stayline_booking::{orchestrator::MockGateway, PaymentOrchestrator, Reconciler};
use stayline_core::payment::PaymentGateway;
use stayline_payment::HostedCheckoutClient;
use stayline_supplier::SupplierClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayline_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stayline_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Stayline API on port {}", config.server.port);

    // Postgres
    let db = stayline_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis (flow sessions, locks, rate limits)
    let redis_client = stayline_store::RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    let redis_arc = Arc::new(redis_client);

    // Supplier + gateway clients
    let supplier = Arc::new(SupplierClient::new(
        &config.supplier.base_url,
        &config.supplier.username,
        &config.supplier.password,
    ));

    let gateway: Arc<dyn PaymentGateway> = if config.gateway.use_mock {
        tracing::warn!("Payment gateway running in MOCK mode");
        Arc::new(MockGateway)
    } else {
        Arc::new(HostedCheckoutClient::new(
            &config.gateway.endpoint,
            &config.gateway.store_id,
            &config.gateway.auth_key,
            config.gateway.test_mode,
        ))
    };
    let payments = Arc::new(PaymentOrchestrator::new(gateway));

    // Repositories
    let bookings = Arc::new(stayline_store::StoreBookingRepository::new(db.pool.clone()));
    let customers = Arc::new(stayline_store::StoreCustomerRepository::new(db.pool.clone()));
    let wishlist = Arc::new(stayline_store::StoreWishlistRepository::new(db.pool.clone()));

    let reconciler = Arc::new(Reconciler::new(
        redis_arc.clone(),
        supplier.clone(),
        payments.clone(),
        bookings.clone(),
        FlowRules {
            settlement_currency: config.business_rules.settlement_currency.clone(),
            guest_nationality: config.business_rules.guest_nationality.clone(),
            phone_country_code: config.business_rules.phone_country_code.clone(),
            confirm_lock_seconds: config.business_rules.confirm_lock_seconds,
        },
    ));

    let app_state = AppState {
        flows: redis_arc.clone(),
        limiter: redis_arc.clone(),
        bookings: bookings.clone(),
        customers,
        wishlist,
        supplier: supplier.clone(),
        payments,
        reconciler,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        business_rules: config.business_rules.clone(),
        public_base_url: config.server.public_base_url.clone(),
        resiliency: Arc::new(ResiliencyState::new()),
        metrics: Arc::new(Metrics::new()),
    };

    // Sweep for confirmed bookings whose payment never arrived.
    tokio::spawn(worker::start_expiry_worker(
        bookings,
        supplier,
        config.business_rules.unpaid_cancel_after_hours,
        config.business_rules.expiry_sweep_seconds,
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
