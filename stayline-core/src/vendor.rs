//! Wire types for the upstream hotel supplier API.
//!
//! The supplier returns loosely shaped JSON: amounts arrive as strings or
//! numbers depending on endpoint, `Rooms` is an array on search and a single
//! object on prebook, and a whole response body can be `null`. Everything is
//! modelled as tagged shapes here so callers never optional-chain through an
//! untyped object graph.

use serde::{Deserialize, Serialize};

/// The supplier's application-level status block. The HTTP layer can return
/// 200 while this carries a failure code, so it must always be checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorStatus {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl VendorStatus {
    pub fn is_success(&self) -> bool {
        self.code == "200" || self.code == "201"
    }

    pub fn message(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("supplier status {}", self.code))
    }
}

/// An amount the supplier serializes inconsistently ("121.476" or 121.476).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlexAmount {
    Num(f64),
    Str(String),
}

impl FlexAmount {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlexAmount::Num(n) => Some(*n),
            FlexAmount::Str(s) => s.parse().ok(),
        }
    }
}

/// `Rooms` is an array in search responses and a bare object in prebook
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomSet {
    Many(Vec<Room>),
    One(Box<Room>),
}

impl RoomSet {
    pub fn primary(&self) -> Option<&Room> {
        match self {
            RoomSet::Many(rooms) => rooms.first(),
            RoomSet::One(room) => Some(room),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = &Room> + '_> {
        match self {
            RoomSet::Many(rooms) => Box::new(rooms.iter()),
            RoomSet::One(room) => Box::new(std::iter::once(room.as_ref())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "BookingCode", default)]
    pub booking_code: Option<String>,
    #[serde(rename = "Price", default)]
    pub price: Option<FlexAmount>,
    #[serde(rename = "Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "TotalFare", default)]
    pub total_fare: Option<FlexAmount>,
    #[serde(rename = "TotalTax", default)]
    pub total_tax: Option<FlexAmount>,
    #[serde(rename = "MealType", default)]
    pub meal_type: Option<String>,
    #[serde(rename = "IsRefundable", default)]
    pub is_refundable: Option<serde_json::Value>,
    #[serde(rename = "Inclusion", default)]
    pub inclusion: Option<String>,
    #[serde(rename = "WithTransfers", default)]
    pub with_transfers: Option<serde_json::Value>,
    #[serde(rename = "Amenities", default)]
    pub amenities: Option<Vec<String>>,
    #[serde(rename = "CancelPolicies", default)]
    pub cancel_policies: Option<serde_json::Value>,
}

impl Room {
    /// The fare used for payment and the final booking call. `TotalFare` wins,
    /// `Price` is the fallback.
    pub fn fare(&self) -> Option<f64> {
        self.total_fare
            .as_ref()
            .and_then(FlexAmount::as_f64)
            .or_else(|| self.price.as_ref().and_then(FlexAmount::as_f64))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelResult {
    #[serde(rename = "HotelCode")]
    pub hotel_code: String,
    #[serde(rename = "HotelName", default)]
    pub hotel_name: Option<String>,
    #[serde(rename = "Address", default)]
    pub address: Option<String>,
    #[serde(rename = "StarRating", default)]
    pub star_rating: Option<serde_json::Value>,
    #[serde(rename = "FrontImage", default)]
    pub front_image: Option<String>,
    #[serde(rename = "Currency", default)]
    pub currency: Option<String>,
    #[serde(rename = "Rooms", default)]
    pub rooms: Option<RoomSet>,
    #[serde(rename = "CancelPolicies", default)]
    pub cancel_policies: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaxRoom {
    #[serde(rename = "Adults")]
    pub adults: u32,
    #[serde(rename = "Children")]
    pub children: u32,
    #[serde(rename = "ChildrenAges", default)]
    pub children_ages: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(rename = "CheckIn")]
    pub check_in: String,
    #[serde(rename = "CheckOut")]
    pub check_out: String,
    #[serde(rename = "HotelCodes", default)]
    pub hotel_codes: Option<String>,
    #[serde(rename = "CityCode", default)]
    pub city_code: Option<String>,
    #[serde(rename = "GuestNationality")]
    pub guest_nationality: String,
    #[serde(rename = "PaxRooms")]
    pub pax_rooms: Vec<PaxRoom>,
    #[serde(rename = "IsDetailedResponse", default)]
    pub is_detailed_response: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEnvelope {
    #[serde(rename = "Status")]
    pub status: VendorStatus,
    #[serde(rename = "HotelResult", default)]
    pub hotel_result: Vec<HotelResult>,
}

// ---------------------------------------------------------------------------
// Prebook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrebookEnvelope {
    #[serde(rename = "Status")]
    pub status: VendorStatus,
    #[serde(rename = "HotelResult", default)]
    pub hotel_result: Option<HotelResult>,
}

/// Prebook collapsed into the two shapes callers act on.
#[derive(Debug, Clone)]
pub enum PrebookOutcome {
    /// Rate locked; the supplier echoes the hotel/room with final pricing and
    /// cancellation policies.
    Locked(PrebookEnvelope),
    Rejected(VendorStatus),
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum GuestKind {
    Adult,
    Child,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerName {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Type")]
    pub kind: GuestKind,
    #[serde(rename = "Age", skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// One entry per room; the supplier requires guests grouped by room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(rename = "CustomerNames")]
    pub customer_names: Vec<CustomerName>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRequest {
    #[serde(rename = "BookingCode")]
    pub booking_code: String,
    #[serde(rename = "CustomerDetails")]
    pub customer_details: Vec<CustomerDetails>,
    #[serde(rename = "BookingType")]
    pub booking_type: String,
    #[serde(rename = "ClientReferenceId")]
    pub client_reference_id: String,
    #[serde(rename = "BookingReferenceId")]
    pub booking_reference_id: String,
    #[serde(rename = "PaymentMode")]
    pub payment_mode: String,
    #[serde(rename = "GuestNationality")]
    pub guest_nationality: String,
    #[serde(rename = "TotalFare")]
    pub total_fare: f64,
    #[serde(rename = "EmailId")]
    pub email_id: String,
    // The supplier expects a bare number here, not a string.
    #[serde(rename = "PhoneNumber")]
    pub phone_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEnvelope {
    #[serde(rename = "Status")]
    pub status: VendorStatus,
    #[serde(rename = "BookingStatus", default)]
    pub booking_status: Option<String>,
    #[serde(rename = "ConfirmationNumber", default)]
    pub confirmation_number: Option<String>,
    #[serde(rename = "BookingId", default)]
    pub booking_id: Option<serde_json::Value>,
    #[serde(rename = "ClientReferenceId", default)]
    pub client_reference_id: Option<String>,
}

#[derive(Debug, Clone)]
pub enum BookOutcome {
    Confirmed {
        confirmation_number: String,
        booking_id: Option<String>,
    },
    /// Either a failing status code or a 200 envelope whose BookingStatus says
    /// "Failed".
    Failed { message: String },
}

impl BookEnvelope {
    pub fn into_outcome(self) -> BookOutcome {
        if !self.status.is_success() {
            return BookOutcome::Failed {
                message: self.status.message(),
            };
        }
        if self.booking_status.as_deref() == Some("Failed") {
            return BookOutcome::Failed {
                message: format!(
                    "Booking failed: {}",
                    self.status
                        .description
                        .unwrap_or_else(|| "Unknown error".to_string())
                ),
            };
        }
        BookOutcome::Confirmed {
            confirmation_number: self
                .confirmation_number
                .unwrap_or_else(|| "N/A".to_string()),
            booking_id: self.booking_id.map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        }
    }
}
