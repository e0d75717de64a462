use std::sync::Arc;

use async_trait::async_trait;
use stayline_core::payment::{
    CheckoutOrder, CheckoutRequest, GatewayOrderState, GatewayStatus, PaymentGateway,
};
use stayline_core::BoxError;

/// Thin coordination layer over the configured gateway adapter. Lives here so
/// adapter selection (test vs live store, future multi-gateway routing) stays
/// out of the HTTP handlers.
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentOrchestrator {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Create a hosted-checkout order for a booking flow.
    pub async fn create_checkout(&self, req: &CheckoutRequest) -> Result<CheckoutOrder, BoxError> {
        self.gateway.create_order(req).await
    }

    /// Verify an order after the customer returns from the hosted page.
    pub async fn verify_order(&self, order_ref: &str) -> Result<GatewayOrderState, BoxError> {
        self.gateway.check_order(order_ref).await
    }
}

/// In-process gateway used by tests and local development. Cart ids steer the
/// outcome: "declined" anywhere in the cart id yields a declined order,
/// "fail-circuit" simulates a gateway outage.
pub struct MockGateway;

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_order(&self, req: &CheckoutRequest) -> Result<CheckoutOrder, BoxError> {
        if req.cart_id.contains("fail-circuit") {
            return Err("Simulated payment gateway failure".into());
        }

        Ok(CheckoutOrder {
            order_ref: format!("mock_ord_{}", req.cart_id.replace('#', "-")),
            checkout_url: format!(
                "https://checkout.invalid/hosted/{}",
                req.cart_id.replace('#', "-")
            ),
        })
    }

    async fn check_order(&self, order_ref: &str) -> Result<GatewayOrderState, BoxError> {
        if order_ref.contains("fail-circuit") {
            return Err("Simulated payment gateway failure".into());
        }

        let status = if order_ref.contains("declined") {
            GatewayStatus::Declined
        } else {
            GatewayStatus::Authorised
        };

        Ok(GatewayOrderState {
            order_ref: order_ref.to_string(),
            cart_id: None,
            status,
            status_text: status.to_string(),
            amount: Some("121.48".to_string()),
            currency: Some("AED".to_string()),
            transaction_ref: Some(format!("txn_{}", order_ref)),
            card: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stayline_core::payment::{CheckoutCustomer, ReturnUrls};

    fn checkout_request(cart_id: &str) -> CheckoutRequest {
        CheckoutRequest {
            cart_id: cart_id.to_string(),
            amount: "121.48".to_string(),
            currency: "AED".to_string(),
            description: "Hotel Booking - Test".to_string(),
            customer: CheckoutCustomer {
                reference: "cust-1".to_string(),
                email: "guest@example.com".to_string(),
                forenames: "Guest".to_string(),
                surname: "User".to_string(),
                address_line1: "12 Marina Walk".to_string(),
                city: "Dubai".to_string(),
                country: "AE".to_string(),
                phone: "0501234567".to_string(),
            },
            return_urls: ReturnUrls {
                authorised: "https://app.invalid/payments/return".to_string(),
                declined: "https://app.invalid/payments/failure".to_string(),
                cancelled: "https://app.invalid/payments/cancelled".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_mock_gateway_authorises_by_default() {
        let orchestrator = PaymentOrchestrator::new(Arc::new(MockGateway));
        let order = orchestrator
            .create_checkout(&checkout_request("cust-1#1700"))
            .await
            .unwrap();
        assert!(order.checkout_url.starts_with("https://"));

        let state = orchestrator.verify_order(&order.order_ref).await.unwrap();
        assert!(state.status.is_authorised());
    }

    #[tokio::test]
    async fn test_mock_gateway_declines_on_marker() {
        let orchestrator = PaymentOrchestrator::new(Arc::new(MockGateway));
        let state = orchestrator
            .verify_order("mock_ord_declined_cart")
            .await
            .unwrap();
        assert_eq!(state.status, GatewayStatus::Declined);
        assert!(!state.status.is_authorised());
    }

    #[tokio::test]
    async fn test_mock_gateway_outage_marker() {
        let orchestrator = PaymentOrchestrator::new(Arc::new(MockGateway));
        assert!(orchestrator.verify_order("fail-circuit").await.is_err());
    }
}
