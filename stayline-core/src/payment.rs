use crate::BoxError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Numeric order states reported by the hosted-checkout gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Blocked,
    Cancelled,
    NotPaid,
    Pending,
    Declined,
    Authorised,
    Void,
    Credited,
    Settled,
    Refunded,
    Unknown(i32),
}

impl GatewayStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            -2 => GatewayStatus::Blocked,
            -1 => GatewayStatus::Cancelled,
            0 => GatewayStatus::NotPaid,
            1 => GatewayStatus::Pending,
            2 => GatewayStatus::Declined,
            3 => GatewayStatus::Authorised,
            4 => GatewayStatus::Void,
            5 => GatewayStatus::Credited,
            6 => GatewayStatus::Settled,
            7 => GatewayStatus::Refunded,
            other => GatewayStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            GatewayStatus::Blocked => -2,
            GatewayStatus::Cancelled => -1,
            GatewayStatus::NotPaid => 0,
            GatewayStatus::Pending => 1,
            GatewayStatus::Declined => 2,
            GatewayStatus::Authorised => 3,
            GatewayStatus::Void => 4,
            GatewayStatus::Credited => 5,
            GatewayStatus::Settled => 6,
            GatewayStatus::Refunded => 7,
            GatewayStatus::Unknown(code) => *code,
        }
    }

    /// Only a fully authorised order (code 3) releases the booking
    /// confirmation; every other state is treated as not paid.
    pub fn is_authorised(&self) -> bool {
        matches!(self, GatewayStatus::Authorised)
    }
}

impl std::fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            GatewayStatus::Blocked => "Blocked",
            GatewayStatus::Cancelled => "Cancelled",
            GatewayStatus::NotPaid => "Not Paid",
            GatewayStatus::Pending => "Pending",
            GatewayStatus::Declined => "Declined",
            GatewayStatus::Authorised => "Authorised",
            GatewayStatus::Void => "Void",
            GatewayStatus::Credited => "Credited",
            GatewayStatus::Settled => "Settled",
            GatewayStatus::Refunded => "Refunded",
            GatewayStatus::Unknown(_) => "Unknown",
        };
        write!(f, "{}", text)
    }
}

/// Payment state recorded against a confirmed booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Pending => "Pending",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutCustomer {
    pub reference: String,
    pub email: String,
    pub forenames: String,
    pub surname: String,
    pub address_line1: String,
    pub city: String,
    pub country: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnUrls {
    pub authorised: String,
    pub declined: String,
    pub cancelled: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cart_id: String,
    /// Already formatted to two decimals; the gateway wants a string.
    pub amount: String,
    pub currency: String,
    pub description: String,
    pub customer: CheckoutCustomer,
    pub return_urls: ReturnUrls,
}

/// A created gateway order: the reference to reconcile on return, and the
/// hosted payment page the customer is redirected to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutOrder {
    pub order_ref: String,
    pub checkout_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayOrderState {
    pub order_ref: String,
    pub cart_id: Option<String>,
    pub status: GatewayStatus,
    pub status_text: String,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub transaction_ref: Option<String>,
    pub card: Option<serde_json::Value>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted-checkout order and return the payment page URL.
    async fn create_order(&self, req: &CheckoutRequest) -> Result<CheckoutOrder, BoxError>;

    /// Retrieve the current state of an order after the customer returns.
    async fn check_order(&self, order_ref: &str) -> Result<GatewayOrderState, BoxError>;
}
