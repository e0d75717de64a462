use async_trait::async_trait;
use serde_json::{json, Value};
use stayline_core::supplier::HotelSupplier;
use stayline_core::vendor::{
    BookEnvelope, BookOutcome, BookRequest, PrebookEnvelope, PrebookOutcome, SearchEnvelope,
    SearchRequest, VendorStatus,
};
use stayline_core::BoxError;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    #[error("supplier transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("supplier returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("supplier response could not be decoded: {0}")]
    Decode(String),
}

/// HTTP client for the hotel supplier's REST API. Every call injects the
/// operator's Basic-Auth credentials and posts the JSON body to a fixed base
/// URL, mirroring the credential-injecting gateway role.
pub struct SupplierClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl SupplierClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, SupplierError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Supplier {} returned HTTP {}", path, status);
            return Err(SupplierError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }

    async fn get_json(&self, path: &str) -> Result<Value, SupplierError> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SupplierError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SupplierError> {
    serde_json::from_value(value).map_err(|e| SupplierError::Decode(e.to_string()))
}

#[async_trait]
impl HotelSupplier for SupplierClient {
    async fn search(&self, req: &SearchRequest) -> Result<SearchEnvelope, BoxError> {
        let body = serde_json::to_value(req).map_err(|e| SupplierError::Decode(e.to_string()))?;
        let raw = self.post_json("Search", &body).await?;

        // The supplier answers `null` when nothing matches; serve the fixed
        // fallback payload in that case so callers always get an envelope.
        if raw.is_null() {
            info!("Supplier search returned null, serving fallback payload");
            return Ok(crate::fallback::fallback_search_envelope());
        }

        Ok(decode::<SearchEnvelope>(raw)?)
    }

    async fn hotel_details(&self, body: &Value) -> Result<Value, BoxError> {
        Ok(self.post_json("Hoteldetails", body).await?)
    }

    async fn hotel_rooms(&self, body: &Value) -> Result<Value, BoxError> {
        Ok(self.post_json("HotelRoom", body).await?)
    }

    async fn prebook(&self, booking_code: &str) -> Result<PrebookOutcome, BoxError> {
        let body = json!({ "BookingCode": booking_code, "PaymentMode": "Limit" });
        let raw = self.post_json("Prebook", &body).await?;

        // A null prebook body means the rate is gone.
        if raw.is_null() {
            return Ok(PrebookOutcome::Rejected(VendorStatus {
                code: "400".to_string(),
                description: Some("No prebook response received".to_string()),
            }));
        }

        let envelope = decode::<PrebookEnvelope>(raw)?;
        if envelope.status.is_success() {
            Ok(PrebookOutcome::Locked(envelope))
        } else {
            Ok(PrebookOutcome::Rejected(envelope.status))
        }
    }

    async fn book(&self, req: &BookRequest) -> Result<BookOutcome, BoxError> {
        let body = serde_json::to_value(req).map_err(|e| SupplierError::Decode(e.to_string()))?;
        let raw = self.post_json("HotelBook", &body).await?;
        let envelope = decode::<BookEnvelope>(raw)?;
        Ok(envelope.into_outcome())
    }

    async fn cancel(&self, confirmation_number: &str) -> Result<Value, BoxError> {
        let body = json!({ "ConfirmationNumber": confirmation_number });
        Ok(self.post_json("Cancel", &body).await?)
    }

    async fn booking_detail(&self, booking_reference_id: &str) -> Result<Value, BoxError> {
        let body = json!({ "BookingReferenceId": booking_reference_id });
        Ok(self.post_json("BookingDetail", &body).await?)
    }

    async fn country_list(&self) -> Result<Value, BoxError> {
        Ok(self.get_json("CountryList").await?)
    }

    async fn city_list(&self, country_code: &str) -> Result<Value, BoxError> {
        let body = json!({ "CountryCode": country_code });
        Ok(self.post_json("CityList", &body).await?)
    }

    async fn hotel_code_list(&self, city_code: &str) -> Result<Value, BoxError> {
        let body = json!({ "CityCode": city_code, "IsDetailedResponse": "false" });
        Ok(self.post_json("HotelCodeList", &body).await?)
    }
}
