//! Provider configuration and the handle passed to every operation.

use std::sync::Arc;
use std::time::Duration;

use redisent_client::{Configuration, DatabasesApi, HttpClient};
use tracing::info;

use crate::convergence::{Poller, TokioClock};

/// Settings needed to talk to one cluster.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base url of the cluster management API.
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub accept_invalid_certs: bool,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            accept_invalid_certs: false,
            poll_interval: Poller::DEFAULT_INTERVAL,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Authenticated client plus poller. Shared read-only by all operations.
#[derive(Clone)]
pub struct ProviderMeta {
    api: Arc<dyn DatabasesApi>,
    poller: Poller,
}

impl ProviderMeta {
    pub fn new(api: Arc<dyn DatabasesApi>, poller: Poller) -> Self {
        Self { api, poller }
    }

    /// Build an HTTP-backed provider from `config`.
    pub fn configure(config: &ProviderConfig) -> redisent_client::Result<Self> {
        info!("Configuring provider for {}", config.base_url);
        let client = HttpClient::new(Configuration {
            base_path: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
            request_timeout: config.request_timeout,
            ..Default::default()
        })?;

        Ok(Self::new(
            Arc::new(client),
            Poller::new(Arc::new(TokioClock::new()), config.poll_interval),
        ))
    }

    pub fn api(&self) -> &dyn DatabasesApi {
        self.api.as_ref()
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }
}
