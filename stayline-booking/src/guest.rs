use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stayline_core::vendor::GuestKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guest {
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub kind: GuestKind,
    /// Required for children, absent for adults.
    #[serde(default)]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomGuests {
    pub room_number: u32,
    pub guests: Vec<Guest>,
}

/// Lead-guest contact block collected once per booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub title: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    #[serde(default)]
    pub country: Option<String>,
}

/// The whole guest-detail bundle, persisted as a single versioned snapshot.
/// The embedded booking-reference id is compared against the active flow on
/// every read; a mismatch invalidates the entire snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSnapshot {
    pub booking_reference_id: String,
    pub contact: ContactForm,
    pub rooms: Vec<RoomGuests>,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GuestValidationError {
    #[error("Please fill in all required contact fields ({0})")]
    MissingContactField(&'static str),

    #[error("No rooms in guest details")]
    NoRooms,

    #[error("Room {room} has no guests")]
    EmptyRoom { room: u32 },

    #[error("Please fill in all details for Room {room}, Guest {guest} (First Name, Last Name)")]
    MissingGuestName { room: u32, guest: usize },

    #[error("Please provide a valid age (0-17) for Room {room}, Guest {guest} (Child)")]
    InvalidChildAge { room: u32, guest: usize },
}

impl GuestSnapshot {
    pub fn matches_reference(&self, active_reference: &str) -> bool {
        self.booking_reference_id == active_reference
    }

    pub fn total_guests(&self) -> usize {
        self.rooms.iter().map(|r| r.guests.len()).sum()
    }

    pub fn validate(&self) -> Result<(), GuestValidationError> {
        let contact = &self.contact;
        if contact.first_name.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("first name"));
        }
        if contact.last_name.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("last name"));
        }
        if contact.email.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("email"));
        }
        if contact.phone.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("phone"));
        }
        if contact.address.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("address"));
        }
        if contact.city.trim().is_empty() {
            return Err(GuestValidationError::MissingContactField("city"));
        }

        if self.rooms.is_empty() {
            return Err(GuestValidationError::NoRooms);
        }

        for room in &self.rooms {
            if room.guests.is_empty() {
                return Err(GuestValidationError::EmptyRoom {
                    room: room.room_number,
                });
            }
            for (idx, guest) in room.guests.iter().enumerate() {
                if guest.first_name.trim().is_empty() || guest.last_name.trim().is_empty() {
                    return Err(GuestValidationError::MissingGuestName {
                        room: room.room_number,
                        guest: idx + 1,
                    });
                }
                if guest.kind == GuestKind::Child {
                    match guest.age {
                        Some(age) if age <= 17 => {}
                        _ => {
                            return Err(GuestValidationError::InvalidChildAge {
                                room: room.room_number,
                                guest: idx + 1,
                            })
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
