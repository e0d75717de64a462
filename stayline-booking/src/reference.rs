use chrono::{DateTime, Utc};
use rand::Rng;

/// Mint the operator's booking-reference id for a customer's reservation.
/// Format: `{customer_id}#{unix_millis}` — the customer id stays recoverable
/// from the reference alone.
pub fn mint_booking_reference(customer_id: &str, now: DateTime<Utc>) -> String {
    format!("{}#{}", customer_id, now.timestamp_millis())
}

pub fn customer_id_from_reference(reference: &str) -> Option<&str> {
    let (customer_id, _) = reference.split_once('#')?;
    if customer_id.is_empty() {
        None
    } else {
        Some(customer_id)
    }
}

/// Client-reference id sent to the supplier on the final booking call:
/// a compact timestamp plus a zero-padded random suffix, regenerated for
/// every booking request.
pub fn generate_client_reference_id() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format_client_reference(Utc::now(), suffix)
}

fn format_client_reference(now: DateTime<Utc>, suffix: u32) -> String {
    format!("{}#{:03}", now.format("%Y%m%d%H%M%S"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_booking_reference_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let reference = mint_booking_reference("cust-42", now);
        assert!(reference.starts_with("cust-42#"));
        assert_eq!(customer_id_from_reference(&reference), Some("cust-42"));
    }

    #[test]
    fn test_customer_id_extraction_handles_garbage() {
        assert_eq!(customer_id_from_reference("no-separator"), None);
        assert_eq!(customer_id_from_reference("#123"), None);
        assert_eq!(
            customer_id_from_reference("a-b-c#17000#extra"),
            Some("a-b-c")
        );
    }

    #[test]
    fn test_client_reference_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(format_client_reference(now, 7), "20260314092653#007");
        assert_eq!(format_client_reference(now, 999), "20260314092653#999");
    }

    #[test]
    fn test_generated_reference_parses() {
        let reference = generate_client_reference_id();
        let (ts, suffix) = reference.split_once('#').unwrap();
        assert_eq!(ts.len(), 14);
        assert_eq!(suffix.len(), 3);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
