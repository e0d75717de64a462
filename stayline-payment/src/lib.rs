use async_trait::async_trait;
use serde_json::{json, Value};
use stayline_core::payment::{
    CheckoutOrder, CheckoutRequest, GatewayOrderState, GatewayStatus, PaymentGateway,
};
use stayline_core::BoxError;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned HTTP {0}")]
    UpstreamStatus(u16),

    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("gateway response missing field: {0}")]
    MalformedResponse(&'static str),
}

/// Client for the hosted-checkout payment gateway. One JSON endpoint serves
/// both order creation (`method: create`) and status checks (`method: check`);
/// store credentials are injected from configuration with a test/live switch.
pub struct HostedCheckoutClient {
    http: reqwest::Client,
    endpoint: String,
    store_id: String,
    auth_key: String,
    test_mode: bool,
}

impl HostedCheckoutClient {
    pub fn new(endpoint: &str, store_id: &str, auth_key: &str, test_mode: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            store_id: store_id.to_string(),
            auth_key: auth_key.to_string(),
            test_mode,
        }
    }

    async fn call(&self, payload: &Value) -> Result<Value, GatewayError> {
        let response = self.http.post(&self.endpoint).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::UpstreamStatus(status.as_u16()));
        }

        let body: Value = response.json().await?;

        // The gateway signals request-level errors inside a 200 body.
        if let Some(error) = body.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unspecified gateway error");
            let note = error.get("note").and_then(Value::as_str).unwrap_or("");
            return Err(GatewayError::Rejected(format!("{} {}", message, note)));
        }

        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutClient {
    async fn create_order(&self, req: &CheckoutRequest) -> Result<CheckoutOrder, BoxError> {
        let payload = json!({
            "method": "create",
            "store": self.store_id,
            "authkey": self.auth_key,
            "framed": 0,
            "language": "en",
            "order": {
                "cartid": req.cart_id,
                "test": if self.test_mode { "1" } else { "0" },
                "amount": req.amount,
                "currency": req.currency,
                "description": req.description,
                "trantype": "sale"
            },
            "customer": {
                "ref": req.customer.reference,
                "email": req.customer.email,
                "name": {
                    "forenames": req.customer.forenames,
                    "surname": req.customer.surname
                },
                "address": {
                    "line1": req.customer.address_line1,
                    "city": req.customer.city,
                    "country": req.customer.country
                },
                "phone": req.customer.phone
            },
            "return": {
                "authorised": req.return_urls.authorised,
                "declined": req.return_urls.declined,
                "cancelled": req.return_urls.cancelled
            }
        });

        let body = self.call(&payload).await?;

        let order = body
            .get("order")
            .ok_or(GatewayError::MalformedResponse("order"))?;
        let order_ref = order
            .get("ref")
            .and_then(Value::as_str)
            .ok_or(GatewayError::MalformedResponse("order.ref"))?;
        let checkout_url = order
            .get("url")
            .and_then(Value::as_str)
            .ok_or(GatewayError::MalformedResponse("order.url"))?;

        info!("Gateway order created: {}", order_ref);

        Ok(CheckoutOrder {
            order_ref: order_ref.to_string(),
            checkout_url: checkout_url.to_string(),
        })
    }

    async fn check_order(&self, order_ref: &str) -> Result<GatewayOrderState, BoxError> {
        let payload = json!({
            "method": "check",
            "store": self.store_id,
            "authkey": self.auth_key,
            "order": { "ref": order_ref }
        });

        let body = self.call(&payload).await?;

        let order = body
            .get("order")
            .ok_or(GatewayError::MalformedResponse("order"))?;
        let code = order
            .pointer("/status/code")
            .and_then(Value::as_i64)
            .ok_or(GatewayError::MalformedResponse("order.status.code"))?;
        let status = GatewayStatus::from_code(code as i32);
        let status_text = order
            .pointer("/status/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.to_string());

        if !status.is_authorised() {
            warn!(
                "Gateway order {} is not authorised: {} ({})",
                order_ref, status_text, code
            );
        }

        Ok(GatewayOrderState {
            order_ref: order_ref.to_string(),
            cart_id: order
                .get("cartid")
                .and_then(Value::as_str)
                .map(str::to_string),
            status,
            status_text,
            amount: order
                .get("amount")
                .and_then(Value::as_str)
                .map(str::to_string),
            currency: order
                .get("currency")
                .and_then(Value::as_str)
                .map(str::to_string),
            transaction_ref: order
                .pointer("/transaction/ref")
                .and_then(Value::as_str)
                .map(str::to_string),
            card: order.get("card").cloned(),
        })
    }
}
