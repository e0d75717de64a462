use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use stayline_core::repository::CustomerRecord;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    customer: CustomerRecord,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/signup", post(signup))
        .route("/v1/auth/login", post(login))
}

fn issue_token(state: &AppState, customer: &CustomerRecord) -> Result<String, AppError> {
    let claims = CustomerClaims {
        sub: customer.customer_id.clone(),
        email: customer.email.0.clone(),
        role: "CUSTOMER".to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.email.trim().is_empty() || req.first_name.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Email and first name are required".to_string(),
        ));
    }

    if let Some(existing) = state
        .customers
        .find_by_email(&req.email)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
    {
        // Same behaviour as login for a known address, minus profile changes.
        let token = issue_token(&state, &existing)?;
        return Ok(Json(AuthResponse {
            token,
            customer: existing,
        }));
    }

    let customer = state
        .customers
        .create(
            &req.email,
            &req.first_name,
            &req.last_name,
            req.phone.as_deref(),
        )
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    tracing::info!("Customer created: {}", customer.customer_id);

    let token = issue_token(&state, &customer)?;
    Ok(Json(AuthResponse { token, customer }))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let customer = state
        .customers
        .find_by_email(&req.email)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| {
            AppError::AuthenticationError(
                "Email not found. Please check your email or sign up first".to_string(),
            )
        })?;

    let token = issue_token(&state, &customer)?;
    Ok(Json(AuthResponse { token, customer }))
}
