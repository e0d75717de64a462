use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use stayline_booking::stay;
use stayline_core::vendor::{PaxRoom, SearchEnvelope, SearchRequest};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PaxRoomInput {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub children_ages: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HotelSearchInput {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub city_code: Option<String>,
    #[serde(default)]
    pub hotel_codes: Option<String>,
    #[serde(default)]
    pub guest_nationality: Option<String>,
    pub pax_rooms: Vec<PaxRoomInput>,
}

#[derive(Debug, Deserialize)]
pub struct CityListInput {
    pub country_code: String,
}

#[derive(Debug, Deserialize)]
pub struct HotelCodeListInput {
    pub city_code: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/hotels/search", post(search_hotels))
        .route("/v1/hotels/details", post(hotel_details))
        .route("/v1/hotels/rooms", post(hotel_rooms))
        .route("/v1/hotels/countries", get(country_list))
        .route("/v1/hotels/cities", post(city_list))
        .route("/v1/hotels/codes", post(hotel_code_list))
}

async fn search_hotels(
    State(state): State<AppState>,
    Json(input): Json<HotelSearchInput>,
) -> Result<Json<SearchEnvelope>, AppError> {
    stay::validate_stay(
        input.check_in,
        input.check_out,
        state.business_rules.max_stay_nights,
    )
    .map_err(|e| AppError::ValidationError(e.to_string()))?;

    if input.pax_rooms.is_empty() {
        return Err(AppError::ValidationError(
            "At least one room is required".to_string(),
        ));
    }
    for room in &input.pax_rooms {
        if room.adults == 0 {
            return Err(AppError::ValidationError(
                "Each room needs at least one adult".to_string(),
            ));
        }
        if room.children_ages.len() != room.children as usize {
            return Err(AppError::ValidationError(
                "An age is required for every child".to_string(),
            ));
        }
        if room.children_ages.iter().any(|age| *age > 17) {
            return Err(AppError::ValidationError(
                "Child ages must be between 0 and 17".to_string(),
            ));
        }
    }

    let request = SearchRequest {
        check_in: input.check_in.format("%Y-%m-%d").to_string(),
        check_out: input.check_out.format("%Y-%m-%d").to_string(),
        hotel_codes: input.hotel_codes,
        city_code: input.city_code,
        guest_nationality: input
            .guest_nationality
            .unwrap_or_else(|| state.business_rules.guest_nationality.clone()),
        pax_rooms: input
            .pax_rooms
            .into_iter()
            .map(|room| PaxRoom {
                adults: room.adults,
                children: room.children,
                children_ages: room.children_ages,
            })
            .collect(),
        is_detailed_response: false,
    };

    let envelope = state
        .supplier
        .search(&request)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(envelope))
}

async fn hotel_details(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    if body.get("HotelCode").is_none() {
        return Err(AppError::ValidationError("HotelCode is required".to_string()));
    }

    let details = state
        .supplier
        .hotel_details(&body)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(details))
}

async fn hotel_rooms(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let rooms = state
        .supplier
        .hotel_rooms(&body)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(rooms))
}

async fn country_list(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let countries = state
        .supplier
        .country_list()
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(countries))
}

async fn city_list(
    State(state): State<AppState>,
    Json(input): Json<CityListInput>,
) -> Result<Json<Value>, AppError> {
    let cities = state
        .supplier
        .city_list(&input.country_code)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(cities))
}

async fn hotel_code_list(
    State(state): State<AppState>,
    Json(input): Json<HotelCodeListInput>,
) -> Result<Json<Value>, AppError> {
    let codes = state
        .supplier
        .hotel_code_list(&input.city_code)
        .await
        .map_err(|e| AppError::UpstreamError(e.to_string()))?;

    Ok(Json(codes))
}
