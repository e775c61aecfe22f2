//! Twilio Verify client.
//!
//! Sends a one-time code to a phone number (or email) and checks a code the
//! user typed back. Twilio keeps the pending verification server-side; a code
//! that was approved once cannot be approved again.

pub mod error;
pub mod models;

use std::collections::HashMap;

use reqwest::{Client, Response};
use tracing::{debug, error, info};

pub use error::{Result, TwilioError};
use models::{OTPResponse, OTPVerifyResponse, TwilioErrorBody};

const VERIFY_BASE_URL: &str = "https://verify.twilio.com/v2";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
    base_url: String,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self::with_base_url(options, VERIFY_BASE_URL)
    }

    /// Point the client at a different Verify host (used by tests).
    pub fn with_base_url(options: TwilioOptions, base_url: impl Into<String>) -> Self {
        Self {
            options,
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Start a verification: Twilio delivers a code to `recipient`.
    pub async fn send_otp(&self, recipient: &str) -> Result<OTPResponse> {
        let url = format!(
            "{}/Services/{}/Verifications",
            self.base_url, self.options.service_id
        );

        // Channel follows the recipient format (email vs phone)
        let channel = if recipient.contains('@') { "email" } else { "sms" };

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Channel", channel);

        debug!(channel, "Requesting Twilio verification");
        let response = self.post_form(&url, &form_body).await?;
        let response = check_status(response).await?;

        let data = response
            .json::<OTPResponse>()
            .await
            .map_err(|e| TwilioError::Parse(e.to_string()))?;

        info!(status = %data.status, channel = %data.channel, "Twilio verification started");
        Ok(data)
    }

    /// Check `code` against the pending verification for `recipient`.
    pub async fn verify_otp(&self, recipient: &str, code: &str) -> Result<()> {
        let url = format!(
            "{}/Services/{}/VerificationCheck",
            self.base_url, self.options.service_id
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Code", code);

        let response = self.post_form(&url, &form_body).await?;
        let response = check_status(response).await?;

        let result = response
            .json::<OTPVerifyResponse>()
            .await
            .map_err(|e| TwilioError::Parse(e.to_string()))?;

        if result.status == "approved" {
            info!("Twilio verification approved");
            Ok(())
        } else {
            debug!(status = %result.status, "Twilio verification not approved");
            Err(TwilioError::NotApproved {
                status: result.status,
            })
        }
    }

    async fn post_form(&self, url: &str, form: &HashMap<&str, &str>) -> Result<Response> {
        self.client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Request to Twilio failed");
                TwilioError::Network(e)
            })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<TwilioErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body);
    error!(status = status.as_u16(), %message, "Twilio returned an error");

    Err(TwilioError::Api {
        status: status.as_u16(),
        message,
    })
}
