use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dotenvy::dotenv;

/// Which identity provider verifies one-time codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProviderKind {
    /// Storefront REST backend (`/send-otp`, `/verify-otp`)
    Backend,
    /// Twilio Verify, with the backend as profile directory
    Twilio,
    /// Offline provider with a fixed code and locally signed tokens
    Local,
}

impl FromStr for AuthProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "twilio" => Ok(Self::Twilio),
            "local" | "mock" => Ok(Self::Local),
            other => bail!("unknown auth provider '{}' (expected backend, twilio or local)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub verify_service_sid: String,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub default_country_code: String,
    pub request_timeout: Duration,
    pub session_db_url: String,
    /// Registered users of the local provider, kept apart from the session
    pub local_users_db_url: String,
    pub auth_provider: AuthProviderKind,
    pub twilio: Option<TwilioConfig>,
    pub local_jwt_secret: Option<String>,
    /// Flat delivery fee in minor currency units
    pub delivery_fee: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: storefront_api::DEFAULT_BASE_URL.to_string(),
            default_country_code: "+91".to_string(),
            request_timeout: Duration::from_secs(15),
            session_db_url: "sqlite://storefront-session.db?mode=rwc".to_string(),
            local_users_db_url: "sqlite://storefront-local-users.db?mode=rwc".to_string(),
            auth_provider: AuthProviderKind::Backend,
            twilio: None,
            local_jwt_secret: None,
            delivery_fee: 40,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        let defaults = Self::default();

        let auth_provider = match env::var("STOREFRONT_AUTH_PROVIDER") {
            Ok(value) => value.parse().context("STOREFRONT_AUTH_PROVIDER is invalid")?,
            Err(_) => defaults.auth_provider,
        };

        let twilio = if auth_provider == AuthProviderKind::Twilio {
            Some(TwilioConfig {
                account_sid: env::var("TWILIO_ACCOUNT_SID")
                    .context("TWILIO_ACCOUNT_SID must be set")?,
                auth_token: env::var("TWILIO_AUTH_TOKEN")
                    .context("TWILIO_AUTH_TOKEN must be set")?,
                verify_service_sid: env::var("TWILIO_VERIFY_SERVICE_SID")
                    .context("TWILIO_VERIFY_SERVICE_SID must be set")?,
            })
        } else {
            None
        };

        let local_jwt_secret = if auth_provider == AuthProviderKind::Local {
            Some(
                env::var("STOREFRONT_LOCAL_JWT_SECRET")
                    .context("STOREFRONT_LOCAL_JWT_SECRET must be set")?,
            )
        } else {
            None
        };

        let default_country_code = env::var("STOREFRONT_DEFAULT_COUNTRY_CODE")
            .unwrap_or(defaults.default_country_code);
        if !default_country_code.starts_with('+') || default_country_code.len() < 2 {
            bail!("STOREFRONT_DEFAULT_COUNTRY_CODE must look like +91");
        }

        Ok(Self {
            api_base_url: env::var("STOREFRONT_API_URL").unwrap_or(defaults.api_base_url),
            default_country_code,
            request_timeout: match env::var("STOREFRONT_REQUEST_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse()
                        .context("STOREFRONT_REQUEST_TIMEOUT_SECS must be a valid number")?,
                ),
                Err(_) => defaults.request_timeout,
            },
            session_db_url: env::var("STOREFRONT_SESSION_DB").unwrap_or(defaults.session_db_url),
            local_users_db_url: env::var("STOREFRONT_LOCAL_USERS_DB")
                .unwrap_or(defaults.local_users_db_url),
            auth_provider,
            twilio,
            local_jwt_secret,
            delivery_fee: match env::var("STOREFRONT_DELIVERY_FEE") {
                Ok(fee) => fee
                    .parse()
                    .context("STOREFRONT_DELIVERY_FEE must be a valid number")?,
                Err(_) => defaults.delivery_fee,
            },
        })
    }
}
