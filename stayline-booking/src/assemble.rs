//! Assembly of the final supplier booking request from a guest snapshot.

use crate::guest::{GuestSnapshot, RoomGuests};
use crate::reference::generate_client_reference_id;
use stayline_core::vendor::{BookRequest, CustomerDetails, CustomerName, GuestKind};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Phone number contains no digits")]
    EmptyPhone,

    #[error("Phone number is not usable: {0}")]
    InvalidPhone(String),

    #[error("Total fare must be greater than zero")]
    InvalidFare,
}

/// Fares are settled to two decimal places before they reach the supplier or
/// the gateway.
pub fn round_fare(fare: f64) -> f64 {
    (fare * 100.0).round() / 100.0
}

/// Normalize a free-form phone entry to the supplier's numeric format:
/// digits only, leading zero stripped, country code prefixed for local-length
/// numbers, short numbers zero-padded before prefixing.
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<u64, AssembleError> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(AssembleError::EmptyPhone);
    }

    if digits.starts_with('0') {
        digits.remove(0);
    }

    let formatted = if digits.len() == 10 {
        format!("{}{}", country_code, digits)
    } else if digits.len() < 10 {
        format!("{}{:0>10}", country_code, digits)
    } else {
        // Already carries a country code.
        digits
    };

    formatted
        .parse::<u64>()
        .map_err(|_| AssembleError::InvalidPhone(formatted))
}

/// Guests grouped per room, with titles defaulted by guest type and child
/// ages carried through (the supplier requires Age for every child).
pub fn build_customer_details(rooms: &[RoomGuests]) -> Vec<CustomerDetails> {
    rooms
        .iter()
        .map(|room| CustomerDetails {
            customer_names: room
                .guests
                .iter()
                .map(|guest| {
                    let default_title = match guest.kind {
                        GuestKind::Child => "Master",
                        GuestKind::Adult => "Mr",
                    };
                    CustomerName {
                        title: guest
                            .title
                            .clone()
                            .filter(|t| !t.trim().is_empty())
                            .unwrap_or_else(|| default_title.to_string()),
                        first_name: guest.first_name.clone(),
                        last_name: guest.last_name.clone(),
                        kind: guest.kind.clone(),
                        age: match guest.kind {
                            GuestKind::Child => guest.age,
                            GuestKind::Adult => None,
                        },
                    }
                })
                .collect(),
        })
        .collect()
}

pub fn build_booking_request(
    booking_code: &str,
    snapshot: &GuestSnapshot,
    total_fare: f64,
    guest_nationality: &str,
    phone_country_code: &str,
) -> Result<BookRequest, AssembleError> {
    if total_fare <= 0.0 {
        return Err(AssembleError::InvalidFare);
    }

    Ok(BookRequest {
        booking_code: booking_code.to_string(),
        customer_details: build_customer_details(&snapshot.rooms),
        booking_type: "Voucher".to_string(),
        client_reference_id: generate_client_reference_id(),
        booking_reference_id: snapshot.booking_reference_id.clone(),
        payment_mode: "Limit".to_string(),
        guest_nationality: guest_nationality.to_string(),
        total_fare: round_fare(total_fare),
        email_id: snapshot.contact.email.clone(),
        phone_number: normalize_phone(&snapshot.contact.phone, phone_country_code)?,
    })
}
