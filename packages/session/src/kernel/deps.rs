//! Session dependencies (using traits for testability)
//!
//! Central container wiring the configured provider, directory and
//! key-value backend into a `SessionService`. This is the only place that
//! knows which implementation sits behind each seam.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use storefront_api::StorefrontClient;
use tracing::info;
use twilio::{TwilioOptions, TwilioService};

use crate::config::{AuthProviderKind, Config};
use crate::domains::auth::providers::{BackendProvider, LocalProvider, TwilioProvider};
use crate::domains::auth::OtpAuthenticator;
use crate::domains::session::{SessionService, SessionStore};
use crate::kernel::{BaseKeyValueStore, BaseOtpProvider, BaseProfileDirectory};
use crate::stores::SqliteKeyValueStore;

#[derive(Clone)]
pub struct SessionDeps {
    pub otp_provider: Arc<dyn BaseOtpProvider>,
    pub directory: Arc<dyn BaseProfileDirectory>,
    pub kv: Arc<dyn BaseKeyValueStore>,
    pub default_country_code: String,
    /// Upper bound on a single profile fetch
    pub request_timeout: Duration,
}

impl SessionDeps {
    pub fn new(
        otp_provider: Arc<dyn BaseOtpProvider>,
        directory: Arc<dyn BaseProfileDirectory>,
        kv: Arc<dyn BaseKeyValueStore>,
        default_country_code: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            otp_provider,
            directory,
            kv,
            default_country_code: default_country_code.into(),
            request_timeout,
        }
    }

    /// Build the configured provider stack on top of the SQLite session store.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let kv: Arc<dyn BaseKeyValueStore> = Arc::new(
            SqliteKeyValueStore::new(&config.session_db_url)
                .await
                .with_context(|| {
                    format!("Failed to open session store {}", config.session_db_url)
                })?,
        );

        let (otp_provider, directory): (Arc<dyn BaseOtpProvider>, Arc<dyn BaseProfileDirectory>) =
            match config.auth_provider {
                AuthProviderKind::Backend => {
                    let backend = Arc::new(BackendProvider::new(Self::backend_client(config)?));
                    (backend.clone(), backend)
                }
                AuthProviderKind::Twilio => {
                    let twilio = config
                        .twilio
                        .as_ref()
                        .context("Twilio provider selected but not configured")?;
                    let service = TwilioService::new(TwilioOptions {
                        account_sid: twilio.account_sid.clone(),
                        auth_token: twilio.auth_token.clone(),
                        service_id: twilio.verify_service_sid.clone(),
                    });
                    (
                        Arc::new(TwilioProvider::new(service)),
                        Arc::new(BackendProvider::new(Self::backend_client(config)?)),
                    )
                }
                AuthProviderKind::Local => {
                    let secret = config
                        .local_jwt_secret
                        .as_deref()
                        .context("Local provider selected but no JWT secret configured")?;
                    let users: Arc<dyn BaseKeyValueStore> = Arc::new(
                        SqliteKeyValueStore::new(&config.local_users_db_url)
                            .await
                            .with_context(|| {
                                format!(
                                    "Failed to open local user store {}",
                                    config.local_users_db_url
                                )
                            })?,
                    );
                    let local = Arc::new(LocalProvider::new(secret).with_store(users));
                    (local.clone(), local)
                }
            };

        info!(provider = ?config.auth_provider, "Session dependencies ready");
        Ok(Self::new(
            otp_provider,
            directory,
            kv,
            config.default_country_code.clone(),
            config.request_timeout,
        ))
    }

    fn backend_client(config: &Config) -> Result<StorefrontClient> {
        StorefrontClient::new(config.api_base_url.clone(), config.request_timeout)
            .context("Failed to build storefront API client")
    }

    pub fn into_service(self) -> SessionService {
        let store = SessionStore::new(self.kv);
        let authenticator = OtpAuthenticator::new(self.otp_provider, self.default_country_code);
        SessionService::new(store, authenticator, self.directory)
            .with_resolve_timeout(self.request_timeout)
    }
}
