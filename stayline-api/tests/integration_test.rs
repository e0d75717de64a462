use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use stayline_api::metrics::Metrics;
use stayline_api::middleware::resiliency::ResiliencyState;
use stayline_api::state::{AppState, AuthConfig, RateLimiter};
use stayline_api::app;
use stayline_booking::reconcile::FlowRules;
use stayline_booking::{PaymentOrchestrator, Reconciler};
use stayline_booking::orchestrator::MockGateway;
use stayline_core::payment::{CheckoutOrder, CheckoutRequest, GatewayOrderState, PaymentGateway};
use stayline_core::repository::{
    BookingRecord, BookingRepository, CustomerRecord, CustomerRepository, FlowStore,
    WishlistEntry, WishlistRepository,
};
use stayline_core::supplier::HotelSupplier;
use stayline_core::vendor::{
    BookOutcome, BookRequest, PrebookEnvelope, PrebookOutcome, SearchEnvelope, SearchRequest,
};
use stayline_core::BoxError;
use stayline_shared::pii::Masked;
use stayline_store::app_config::BusinessRules;

// ---------------------------------------------------------------------------
// In-memory doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemFlowStore {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    locks: Mutex<HashSet<String>>,
    order_refs: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl FlowStore for MemFlowStore {
    async fn set_field(&self, reference: &str, field: &str, value: &str) -> Result<(), BoxError> {
        self.hashes
            .lock()
            .unwrap()
            .entry(reference.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_field(&self, reference: &str, field: &str) -> Result<Option<String>, BoxError> {
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

struct AllowAllLimiter;

#[async_trait]
impl RateLimiter for AllowAllLimiter {
    async fn check(&self, _key: &str, _limit: i64, _window: i64) -> Result<bool, BoxError> {
        Ok(true)
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
        let mut records = self.records.lock().unwrap();
        if !records
            .iter()
            .any(|r| r.booking_reference_id == record.booking_reference_id)
        {
            records.push(record.clone());
        }
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

    async fn list_for_customer(&self, customer_id: &str) -> Result<Vec<BookingRecord>, BoxError> {
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
        _cutoff: DateTime<Utc>,
    ) -> Result<Vec<BookingRecord>, BoxError> {
        Ok(vec![])
    }

    async fn add_event(
        &self,
        booking_reference_id: &str,
        event_type: &str,
        _detail: Option<Value>,
    ) -> Result<(), BoxError> {
        self.events
            .lock()
            .unwrap()
            .push((booking_reference_id.to_string(), event_type.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct MemCustomerRepo {
    customers: Mutex<Vec<CustomerRecord>>,
}

#[async_trait]
impl CustomerRepository for MemCustomerRepo {
    async fn create(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<CustomerRecord, BoxError> {
        let record = CustomerRecord {
            customer_id: format!("cust-{}", self.customers.lock().unwrap().len() + 1),
            email: Masked(email.to_string()),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.map(|p| Masked(p.to_string())),
            created_at: Utc::now(),
        };
        self.customers.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CustomerRecord>, BoxError> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email.0 == email)
            .cloned())
    }

    async fn find_by_id(&self, customer_id: &str) -> Result<Option<CustomerRecord>, BoxError> {
        Ok(self
            .customers
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.customer_id == customer_id)
            .cloned())
    }

    async fn update_profile(
        &self,
        customer_id: &str,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
    ) -> Result<(), BoxError> {
        for customer in self.customers.lock().unwrap().iter_mut() {
            if customer.customer_id == customer_id {
                customer.first_name = first_name.to_string();
                customer.last_name = last_name.to_string();
                customer.phone = phone.map(|p| Masked(p.to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemWishlistRepo {
    entries: Mutex<Vec<WishlistEntry>>,
}

#[async_trait]
impl WishlistRepository for MemWishlistRepo {
    async fn add(&self, entry: &WishlistEntry) -> Result<(), BoxError> {
        let mut entries = self.entries.lock().unwrap();
        if !entries
            .iter()
            .any(|e| e.customer_id == entry.customer_id && e.hotel_code == entry.hotel_code)
        {
            entries.push(entry.clone());
        }
        Ok(())
    }

    async fn list(&self, customer_id: &str) -> Result<Vec<WishlistEntry>, BoxError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn remove(&self, customer_id: &str, hotel_code: &str) -> Result<bool, BoxError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| !(e.customer_id == customer_id && e.hotel_code == hotel_code));
        Ok(entries.len() < before)
    }
}

/// Supplier double: prebook locks a fixed room, book confirms and counts.
#[derive(Default)]
struct ScriptedSupplier {
    book_calls: Mutex<Vec<BookRequest>>,
}

#[async_trait]
impl HotelSupplier for ScriptedSupplier {
    async fn search(&self, _req: &SearchRequest) -> Result<SearchEnvelope, BoxError> {
        Ok(stayline_supplier::fallback::fallback_search_envelope())
    }

    async fn hotel_details(&self, _body: &Value) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200" }, "HotelDetails": [] }))
    }

    async fn hotel_rooms(&self, _body: &Value) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200" } }))
    }

    async fn prebook(&self, booking_code: &str) -> Result<PrebookOutcome, BoxError> {
        let envelope: PrebookEnvelope = serde_json::from_value(json!({
            "Status": { "Code": "200", "Description": "Successful" },
            "HotelResult": {
                "HotelCode": "414792",
                "HotelName": "ARMADA AVENUE HOTEL",
                "Currency": "USD",
                "Rooms": {
                    "Name": "R1 - Double Standard",
                    "BookingCode": booking_code,
                    "TotalFare": "121.476",
                    "Currency": "USD"
                }
            }
        }))?;
        Ok(PrebookOutcome::Locked(envelope))
    }

    async fn book(&self, req: &BookRequest) -> Result<BookOutcome, BoxError> {
        self.book_calls.lock().unwrap().push(req.clone());
        Ok(BookOutcome::Confirmed {
            confirmation_number: "CN-1001".to_string(),
            booking_id: Some("42".to_string()),
        })
    }

    async fn cancel(&self, _confirmation_number: &str) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200", "Description": "Cancelled" } }))
    }

    async fn booking_detail(&self, booking_reference_id: &str) -> Result<Value, BoxError> {
        Ok(json!({
            "Status": { "Code": "200" },
            "BookingDetail": { "BookingReferenceId": booking_reference_id }
        }))
    }

    async fn country_list(&self) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200" }, "CountryList": [] }))
    }

    async fn city_list(&self, _country_code: &str) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200" }, "CityList": [] }))
    }

    async fn hotel_code_list(&self, _city_code: &str) -> Result<Value, BoxError> {
        Ok(json!({ "Status": { "Code": "200" }, "HotelCodes": [] }))
    }
}

/// Gateway double that counts status checks so tests can prove the pay-later
/// path never consults the gateway.
struct CountingGateway {
    inner: MockGateway,
    check_calls: AtomicUsize,
}

impl CountingGateway {
    fn new() -> Self {
        Self {
            inner: MockGateway,
            check_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentGateway for CountingGateway {
    async fn create_order(&self, req: &CheckoutRequest) -> Result<CheckoutOrder, BoxError> {
        self.inner.create_order(req).await
    }

    async fn check_order(&self, order_ref: &str) -> Result<GatewayOrderState, BoxError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.check_order(order_ref).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct TestHarness {
    app: Router,
    flows: Arc<MemFlowStore>,
    supplier: Arc<ScriptedSupplier>,
    gateway: Arc<CountingGateway>,
    bookings: Arc<MemBookingRepo>,
}

fn harness() -> TestHarness {
    let flows = Arc::new(MemFlowStore::default());
    let supplier = Arc::new(ScriptedSupplier::default());
    let gateway = Arc::new(CountingGateway::new());
    let bookings = Arc::new(MemBookingRepo::default());
    let customers = Arc::new(MemCustomerRepo::default());
    let wishlist = Arc::new(MemWishlistRepo::default());
    let payments = Arc::new(PaymentOrchestrator::new(gateway.clone()));

    let reconciler = Arc::new(Reconciler::new(
        flows.clone(),
        supplier.clone(),
        payments.clone(),
        bookings.clone(),
        FlowRules::default(),
    ));

    let state = AppState {
        flows: flows.clone(),
        limiter: Arc::new(AllowAllLimiter),
        bookings: bookings.clone(),
        customers,
        wishlist,
        supplier: supplier.clone(),
        payments,
        reconciler,
        auth: AuthConfig {
            secret: "test-secret".to_string(),
            expiration: 3600,
        },
        business_rules: BusinessRules {
            reservation_hold_seconds: 1800,
            confirm_lock_seconds: 120,
            max_stay_nights: 30,
            settlement_currency: "AED".to_string(),
            guest_nationality: "AE".to_string(),
            phone_country_code: "91".to_string(),
            unpaid_cancel_after_hours: 24,
            expiry_sweep_seconds: 300,
        },
        public_base_url: "http://localhost:8080".to_string(),
        resiliency: Arc::new(ResiliencyState::new()),
        metrics: Arc::new(Metrics::new()),
    };

    TestHarness {
        app: app(state),
        flows,
        supplier,
        gateway,
        bookings,
    }
}

async fn send(
    harness: &TestHarness,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = harness.app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Booking references carry '#', which must be percent-encoded in URIs.
fn enc(reference: &str) -> String {
    reference.replace('#', "%23")
}

async fn signup(harness: &TestHarness, email: &str) -> String {
    let (status, body) = send(
        harness,
        "POST",
        "/v1/auth/signup",
        None,
        Some(json!({
            "email": email,
            "first_name": "Imran",
            "last_name": "Shaikh",
            "phone": "0501234567"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn reserve(harness: &TestHarness, token: &str) -> String {
    let (status, body) = send(
        harness,
        "POST",
        "/v1/reservations",
        Some(token),
        Some(json!({
            "booking_code": "414792!AX1.1!8c8a",
            "check_in": "2026-09-01",
            "check_out": "2026-09-04",
            "hotel": { "HotelCode": "414792", "HotelName": "ARMADA AVENUE HOTEL", "Currency": "USD" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "reserve failed: {}", body);
    body["booking_reference_id"].as_str().unwrap().to_string()
}

fn guest_details_body() -> Value {
    json!({
        "contact": {
            "title": "Mr",
            "first_name": "Imran",
            "last_name": "Shaikh",
            "email": "imran@example.com",
            "phone": "0501234567",
            "address": "12 Marina Walk",
            "city": "Dubai",
            "country": "AE"
        },
        "rooms": [
            {
                "room_number": 1,
                "guests": [
                    { "first_name": "Imran", "last_name": "Shaikh", "kind": "Adult" },
                    { "first_name": "Zara", "last_name": "Shaikh", "kind": "Child", "age": 6 }
                ]
            }
        ]
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_protected_routes_require_token() {
    let h = harness();
    let (status, _) = send(&h, "GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_rejects_long_stays() {
    let h = harness();
    let (status, body) = send(
        &h,
        "POST",
        "/v1/hotels/search",
        None,
        Some(json!({
            "check_in": "2026-09-01",
            "check_out": "2026-10-02",
            "city_code": "115936",
            "pax_rooms": [{ "adults": 2 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Maximum allowed"));
}

#[tokio::test]
async fn test_search_returns_supplier_envelope() {
    let h = harness();
    let (status, body) = send(
        &h,
        "POST",
        "/v1/hotels/search",
        None,
        Some(json!({
            "check_in": "2026-09-01",
            "check_out": "2026-09-04",
            "city_code": "115936",
            "pax_rooms": [{ "adults": 2, "children": 1, "children_ages": [6] }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Status"]["Code"], "200");
    assert!(body["HotelResult"].as_array().unwrap().len() > 0);
}

#[tokio::test]
async fn test_guest_details_reject_invalid_child_age() {
    let h = harness();
    let token = signup(&h, "age@example.com").await;
    let reference = reserve(&h, &token).await;

    let mut body = guest_details_body();
    body["rooms"][0]["guests"][1]["age"] = json!(18);

    let (status, response) = send(
        &h,
        "PUT",
        &format!("/v1/reservations/{}/guests", enc(&reference)),
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("0-17"));
}

#[tokio::test]
async fn test_pay_later_flow_confirms_pending_and_skips_gateway() {
    let h = harness();
    let token = signup(&h, "paylater@example.com").await;
    let reference = reserve(&h, &token).await;

    let (status, _) = send(
        &h,
        "PUT",
        &format!("/v1/reservations/{}/guests", enc(&reference)),
        Some(&token),
        Some(guest_details_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &h,
        "POST",
        &format!("/v1/reservations/{}/pay-later", enc(&reference)),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "pay-later failed: {}", body);
    assert_eq!(body["pay_later"], true);
    assert_eq!(body["confirmation"]["payment_status"], "Pending");
    assert!(body["return_url"]
        .as_str()
        .unwrap()
        .contains("pay_later=true"));

    // Booking call went out exactly once, with normalized fields.
    let calls = h.supplier.book_calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].total_fare, 121.48);
    assert_eq!(calls[0].phone_number, 910501234567);
    drop(calls);

    // The landing endpoint treats this as settled without touching the
    // gateway.
    let (status, body) = send(
        &h,
        "GET",
        &format!(
            "/v1/payments/return?pay_later=true&booking_ref={}",
            enc(&reference)
        ),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_confirmed"], true);
    assert_eq!(body["booking"]["payment_status"], "Pending");
    assert_eq!(h.gateway.check_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pay_now_flow_confirms_after_authorised_return() {
    let h = harness();
    let token = signup(&h, "paynow@example.com").await;
    let reference = reserve(&h, &token).await;

    send(
        &h,
        "PUT",
        &format!("/v1/reservations/{}/guests", enc(&reference)),
        Some(&token),
        Some(guest_details_body()),
    )
    .await;

    let (status, body) = send(
        &h,
        "POST",
        &format!("/v1/reservations/{}/pay", enc(&reference)),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "pay failed: {}", body);
    assert_eq!(body["currency"], "AED");
    assert_eq!(body["amount"], "121.48");
    let order_ref = body["order_ref"].as_str().unwrap().to_string();
    assert!(body["checkout_url"].as_str().unwrap().starts_with("https://"));

    // Gateway redirects the browser back with the order reference.
    let (status, body) = send(
        &h,
        "GET",
        &format!("/v1/payments/return?order_ref={}", order_ref),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "return failed: {}", body);
    assert_eq!(body["status"], "confirmed");
    assert_eq!(body["confirmation"]["payment_status"], "Paid");

    assert_eq!(h.supplier.book_calls.lock().unwrap().len(), 1);
    assert_eq!(h.gateway.check_calls.load(Ordering::SeqCst), 1);

    // Replaying the redirect takes the no-data branch: acknowledged, not
    // double-booked.
    let (status, body) = send(
        &h,
        "GET",
        &format!("/v1/payments/return?order_ref={}", order_ref),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["already_confirmed"], true);
    assert_eq!(h.supplier.book_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_reference_mismatch_clears_snapshot_and_blocks_payment() {
    let h = harness();
    let token = signup(&h, "mismatch@example.com").await;
    let reference = reserve(&h, &token).await;

    send(
        &h,
        "PUT",
        &format!("/v1/reservations/{}/guests", enc(&reference)),
        Some(&token),
        Some(guest_details_body()),
    )
    .await;

    // Simulate a snapshot captured under an older reservation.
    let raw = h
        .flows
        .get_field(&reference, "guest_details")
        .await
        .unwrap()
        .unwrap();
    let mut snapshot: Value = serde_json::from_str(&raw).unwrap();
    snapshot["booking_reference_id"] = json!("ABC");
    h.flows
        .set_field(&reference, "guest_details", &snapshot.to_string())
        .await
        .unwrap();

    let (status, body) = send(
        &h,
        "POST",
        &format!("/v1/reservations/{}/pay", enc(&reference)),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Guest details required"));

    // The stale snapshot was discarded, never reused.
    assert!(h
        .flows
        .get_field(&reference, "guest_details")
        .await
        .unwrap()
        .is_none());
    assert!(h.supplier.book_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wishlist_round_trip() {
    let h = harness();
    let token = signup(&h, "wish@example.com").await;

    let (status, _) = send(
        &h,
        "POST",
        "/v1/wishlist",
        Some(&token),
        Some(json!({ "hotel_code": "414792", "hotel_name": "ARMADA AVENUE HOTEL" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate add is idempotent.
    send(
        &h,
        "POST",
        "/v1/wishlist",
        Some(&token),
        Some(json!({ "hotel_code": "414792" })),
    )
    .await;

    let (status, body) = send(&h, "GET", "/v1/wishlist", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = send(&h, "DELETE", "/v1/wishlist/414792", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&h, "DELETE", "/v1/wishlist/414792", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_booking_history_and_cancel() {
    let h = harness();
    let token = signup(&h, "history@example.com").await;
    let reference = reserve(&h, &token).await;

    send(
        &h,
        "PUT",
        &format!("/v1/reservations/{}/guests", enc(&reference)),
        Some(&token),
        Some(guest_details_body()),
    )
    .await;
    send(
        &h,
        "POST",
        &format!("/v1/reservations/{}/pay-later", enc(&reference)),
        Some(&token),
        None,
    )
    .await;

    let (status, body) = send(&h, "GET", "/v1/bookings", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["booking_reference_id"], reference.as_str());

    let (status, body) = send(
        &h,
        "POST",
        &format!("/v1/bookings/{}/cancel", enc(&reference)),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "cancel failed: {}", body);
    assert_eq!(body["status"], "Cancelled");

    let record = h.bookings.get_by_reference(&reference).await.unwrap().unwrap();
    assert_eq!(record.status, "Cancelled");
}
