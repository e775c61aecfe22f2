//! Pure REST client for the storefront backend.
//!
//! Covers the four endpoints the mobile session core consumes:
//!
//! - `POST /send-otp` - dispatch a one-time code by SMS
//! - `POST /verify-otp` - exchange a code for a bearer token (or learn the user is new)
//! - `POST /register-user` - submit the registration form
//! - `GET /user` - "who am I" for a bearer token
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use storefront_api::StorefrontClient;
//!
//! let client = StorefrontClient::new("https://safe-online.rwcs.in/api", Duration::from_secs(15))?;
//! client.send_otp("+919999999999").await?;
//! ```

pub mod error;
pub mod types;

use std::time::Duration;

use reqwest::{Response, StatusCode};
use tracing::{debug, instrument, warn};

pub use error::{ApiError, Result};
pub use types::{
    ApiId, ApiUser, CurrentUserResponse, LooseNumber, RegisterUserRequest, RegisterUserResponse,
    SendOtpRequest, SendOtpResponse, UserDetail, VerifyOtpRequest, VerifyOutcome,
};
use types::{MessageBody, VerifyOtpResponse};

pub const DEFAULT_BASE_URL: &str = "https://safe-online.rwcs.in/api";

#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: reqwest::Client,
    base_url: String,
}

impl StorefrontClient {
    /// Build a client whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Ask the backend to text a code to `phone`.
    #[instrument(skip(self, phone))]
    pub async fn send_otp(&self, phone: &str) -> Result<SendOtpResponse> {
        let body = SendOtpRequest {
            phone: phone.to_string(),
        };
        let resp = self.client.post(self.url("send-otp")).json(&body).send().await?;
        let resp = ensure_success(resp).await?;

        let parsed: SendOtpResponse = resp.json().await?;
        debug!(message = ?parsed.message, "send-otp accepted");
        Ok(parsed)
    }

    /// Exchange `otp` for a session.
    ///
    /// 200 carries a token for an existing user, 206 means the code was right
    /// but the number has no account yet.
    #[instrument(skip(self, phone, otp))]
    pub async fn verify_otp(&self, phone: &str, otp: &str) -> Result<VerifyOutcome> {
        let body = VerifyOtpRequest {
            phone: phone.to_string(),
            otp: otp.to_string(),
        };
        let resp = self
            .client
            .post(self.url("verify-otp"))
            .json(&body)
            .send()
            .await?;

        if resp.status() == StatusCode::PARTIAL_CONTENT {
            debug!("verify-otp: new user");
            return Ok(VerifyOutcome::NewUser);
        }

        let resp = ensure_success(resp).await?;
        let parsed: VerifyOtpResponse = resp.json().await?;
        match parsed.token {
            Some(token) if !token.is_empty() => Ok(VerifyOutcome::Existing {
                token,
                user: parsed.user,
                user_detail: parsed.user_detail,
            }),
            _ => Err(ApiError::Parse(
                "verify-otp succeeded without a token".to_string(),
            )),
        }
    }

    /// Submit a completed registration form.
    #[instrument(skip(self, request))]
    pub async fn register_user(&self, request: &RegisterUserRequest) -> Result<RegisterUserResponse> {
        let resp = self
            .client
            .post(self.url("register-user"))
            .json(request)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;

        let parsed: RegisterUserResponse = resp.json().await?;
        if parsed.token.as_deref().map_or(true, str::is_empty) {
            return Err(ApiError::Api {
                status: 200,
                message: parsed
                    .message
                    .unwrap_or_else(|| "Registration failed".to_string()),
            });
        }
        Ok(parsed)
    }

    /// Resolve the user behind a bearer token.
    #[instrument(skip(self, token))]
    pub async fn current_user(&self, token: &str) -> Result<CurrentUserResponse> {
        let resp = self
            .client
            .get(self.url("user"))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Map non-2xx statuses to [`ApiError`], preferring the body's `message`.
async fn ensure_success(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);
    warn!(status = status.as_u16(), %message, "Storefront API error");

    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}
