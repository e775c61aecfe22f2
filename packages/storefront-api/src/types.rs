use std::fmt;

use serde::{Deserialize, Serialize};

/// Body of `POST /send-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

/// Response of `POST /send-otp`.
///
/// Some backend builds echo the code back in an `otp` field. It is not
/// modelled here so it is dropped during deserialisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendOtpResponse {
    pub message: Option<String>,
}

/// Body of `POST /verify-otp`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VerifyOtpResponse {
    pub token: Option<String>,
    #[serde(rename = "userDetail")]
    pub user_detail: Option<UserDetail>,
    pub user: Option<ApiUser>,
}

/// What the backend decided about a verified phone number.
#[derive(Debug, Clone)]
pub enum VerifyOutcome {
    /// HTTP 200: the number belongs to a registered user.
    Existing {
        token: String,
        user: Option<ApiUser>,
        user_detail: Option<UserDetail>,
    },
    /// HTTP 206: code accepted but no account exists yet.
    NewUser,
}

/// Body of `POST /register-user`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterUserRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub phone: String,
    pub gender: String,
    pub age: u32,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub district: String,
    pub state: String,
    pub country: String,
    pub pin: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Response of `POST /register-user`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserResponse {
    pub token: Option<String>,
    pub message: Option<String>,
    pub user: Option<ApiUser>,
    #[serde(rename = "userDetail")]
    pub user_detail: Option<UserDetail>,
}

/// Response of `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUserResponse {
    pub id: ApiId,
    pub safe_user_detail: Option<UserDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: ApiId,
}

/// User identifiers arrive as integers from some endpoints and strings from others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ApiId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiId::Number(n) => write!(f, "{}", n),
            ApiId::Text(s) => f.write_str(s),
        }
    }
}

/// Profile attributes as the backend stores them.
///
/// Older builds send a flat `address` and `postal_code`; both are accepted
/// here so callers only ever see the `address_line1` / `pin` names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDetail {
    pub user_id: Option<ApiId>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gender: Option<String>,
    pub age: Option<LooseNumber>,
    #[serde(alias = "address")]
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(alias = "postal_code")]
    pub pin: Option<String>,
    pub latitude: Option<LooseNumber>,
    pub longitude: Option<LooseNumber>,
    #[serde(alias = "phone_verified")]
    pub is_phone_verified: Option<bool>,
    #[serde(alias = "email_verified")]
    pub is_email_verified: Option<bool>,
    pub created_at: Option<String>,
}

/// Numeric field that may be serialised as a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) if n.is_finite() => Some(*n),
            LooseNumber::Number(_) => None,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Non-negative whole numbers only; `"27"` and `27.0` both yield 27.
    pub fn as_u32(&self) -> Option<u32> {
        let value = match self {
            LooseNumber::Text(s) => return s.trim().parse::<u32>().ok(),
            LooseNumber::Number(n) => *n,
        };
        if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
            Some(value as u32)
        } else {
            None
        }
    }
}

/// Generic `{ "message": ... }` error body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageBody {
    pub message: Option<String>,
}
