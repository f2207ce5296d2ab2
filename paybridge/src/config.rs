use anyhow::Context;

use crate::state::AppState;

/// Service configuration, read from the environment once at startup.
/// Credentials live here and in `AppState` only; nothing looks at the
/// environment after construction.
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Bearer key for client-facing adapters (create intent, verify, failure report).
    pub client_api_key: String,
    /// Bearer key for service-to-service calls (return completion, status reads).
    pub service_key: String,
    /// Echoed in the intent payload so the caller can initialize the provider SDK.
    pub shop_handle: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

        let client_api_key =
            std::env::var("CLIENT_API_KEY").context("CLIENT_API_KEY must be set")?;

        let service_key = std::env::var("SERVICE_KEY").context("SERVICE_KEY must be set")?;

        let shop_handle = std::env::var("PROVIDER_SHOP_HANDLE").ok();

        Ok(Self {
            database_url,
            bind_addr,
            client_api_key,
            service_key,
            shop_handle,
        })
    }

    pub async fn create_app_state(&self) -> anyhow::Result<AppState> {
        AppState::new(self)
            .await
            .context("Failed to initialize AppState")
    }
}
