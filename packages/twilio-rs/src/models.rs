use serde::Deserialize;

/// Response from `POST /Services/{sid}/Verifications`
#[derive(Debug, Clone, Deserialize)]
pub struct OTPResponse {
    pub sid: Option<String>,
    pub to: String,
    pub channel: String,
    pub status: String,
}

/// Response from `POST /Services/{sid}/VerificationCheck`
#[derive(Debug, Clone, Deserialize)]
pub struct OTPVerifyResponse {
    pub to: Option<String>,
    pub status: String,
    #[serde(default)]
    pub valid: bool,
}

/// Error body Twilio returns alongside non-2xx statuses
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TwilioErrorBody {
    pub message: Option<String>,
}
