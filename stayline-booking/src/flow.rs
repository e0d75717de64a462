use serde::{Deserialize, Serialize};

/// Field names inside the per-reference flow hash.
pub mod fields {
    pub const STAGE: &str = "stage";
    pub const OWNER: &str = "owner";
    pub const BOOKING_CODE: &str = "booking_code";
    pub const HOTEL: &str = "hotel";
    pub const ROOM: &str = "room";
    pub const CHECK_IN: &str = "check_in";
    pub const CHECK_OUT: &str = "check_out";
    pub const GUEST_DETAILS: &str = "guest_details";
    pub const ORDER_REF: &str = "order_ref";
}

/// Stage of one booking attempt. Confirmed stages are terminal; the flow hash
/// is deleted once either is reached, so a stored stage is always pre-terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowStage {
    Reserved,
    GuestsCaptured,
    PaymentPending,
    Confirmed,
    ConfirmedPendingPayment,
}

impl FlowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStage::Reserved => "RESERVED",
            FlowStage::GuestsCaptured => "GUESTS_CAPTURED",
            FlowStage::PaymentPending => "PAYMENT_PENDING",
            FlowStage::Confirmed => "CONFIRMED",
            FlowStage::ConfirmedPendingPayment => "CONFIRMED_PENDING_PAYMENT",
        }
    }

    pub fn parse(value: &str) -> Option<FlowStage> {
        match value {
            "RESERVED" => Some(FlowStage::Reserved),
            "GUESTS_CAPTURED" => Some(FlowStage::GuestsCaptured),
            "PAYMENT_PENDING" => Some(FlowStage::PaymentPending),
            "CONFIRMED" => Some(FlowStage::Confirmed),
            "CONFIRMED_PENDING_PAYMENT" => Some(FlowStage::ConfirmedPendingPayment),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid flow transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Validate a stage transition. Re-entering the same non-terminal stage is
/// allowed (guests may be resubmitted, payment re-initiated); everything else
/// must follow the linear flow.
pub fn advance(from: FlowStage, to: FlowStage) -> Result<FlowStage, FlowError> {
    use FlowStage::*;

    let allowed = match (from, to) {
        (Reserved, GuestsCaptured) => true,
        (GuestsCaptured, GuestsCaptured) => true,
        (GuestsCaptured, PaymentPending) => true,
        (GuestsCaptured, ConfirmedPendingPayment) => true,
        (PaymentPending, PaymentPending) => true,
        (PaymentPending, GuestsCaptured) => true,
        (PaymentPending, Confirmed) => true,
        // Customers can abandon a checkout and settle without the gateway.
        (PaymentPending, ConfirmedPendingPayment) => true,
        _ => false,
    };

    if allowed {
        Ok(to)
    } else {
        Err(FlowError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_pay_now() {
        let mut stage = FlowStage::Reserved;
        stage = advance(stage, FlowStage::GuestsCaptured).unwrap();
        stage = advance(stage, FlowStage::PaymentPending).unwrap();
        stage = advance(stage, FlowStage::Confirmed).unwrap();
        assert_eq!(stage, FlowStage::Confirmed);
    }

    #[test]
    fn test_happy_path_pay_later() {
        let mut stage = FlowStage::Reserved;
        stage = advance(stage, FlowStage::GuestsCaptured).unwrap();
        stage = advance(stage, FlowStage::ConfirmedPendingPayment).unwrap();
        assert_eq!(stage, FlowStage::ConfirmedPendingPayment);
    }

    #[test]
    fn test_cannot_confirm_without_guests() {
        // Reserved -> Confirmed skips guest capture and payment
        let result = advance(FlowStage::Reserved, FlowStage::Confirmed);
        assert!(result.is_err());

        let result = advance(FlowStage::Reserved, FlowStage::PaymentPending);
        assert!(result.is_err());
    }

    #[test]
    fn test_confirmed_is_terminal() {
        assert!(advance(FlowStage::Confirmed, FlowStage::PaymentPending).is_err());
        assert!(advance(
            FlowStage::ConfirmedPendingPayment,
            FlowStage::GuestsCaptured
        )
        .is_err());
    }

    #[test]
    fn test_guest_resubmission_allowed() {
        assert!(advance(FlowStage::GuestsCaptured, FlowStage::GuestsCaptured).is_ok());
        assert!(advance(FlowStage::PaymentPending, FlowStage::GuestsCaptured).is_ok());
    }

    #[test]
    fn test_stage_round_trips_through_storage() {
        for stage in [
            FlowStage::Reserved,
            FlowStage::GuestsCaptured,
            FlowStage::PaymentPending,
            FlowStage::Confirmed,
            FlowStage::ConfirmedPendingPayment,
        ] {
            assert_eq!(FlowStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(FlowStage::parse("NOT_A_STAGE"), None);
    }
}
