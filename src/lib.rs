pub mod api;
pub mod config;
pub mod error;
pub mod normalize;
pub mod remote;
pub mod schedule;
pub mod search;
pub mod store;
pub mod types;

use crate::config::Config;
use crate::error::GatewayError;
use crate::remote::RemoteStore;
use crate::store::StateStore;

/// Shared application state handed to every handler and the scheduler.
#[derive(Debug)]
pub struct AppState {
    pub config: Config,
    pub http_client: reqwest::Client,
    pub store: StateStore,
    pub remote: Option<RemoteStore>,
}

// Re-export the domain types for easy access
pub use types::*;

impl AppState {
    pub fn new(
        config: Config,
        http_client: reqwest::Client,
        store: StateStore,
    ) -> Result<Self, GatewayError> {
        let remote = match &config.remote {
            Some(remote_config) => Some(RemoteStore::new(remote_config, http_client.clone())?),
            None => None,
        };

        Ok(Self {
            config,
            http_client,
            store,
            remote,
        })
    }
}
