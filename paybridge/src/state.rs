use std::sync::Arc;

use anyhow::Result;
use common::{Database, Ledger};

use crate::config::AppConfig;
use crate::reconciler::Reconciler;

pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub reconciler: Reconciler,
    pub client_api_key: String,
    pub service_key: String,
    pub shop_handle: Option<String>,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let ledger: Arc<dyn Ledger> = Arc::new(Database::new(&config.database_url).await?);
        log::info!("Database initialized successfully!");

        Ok(Self::with_ledger(
            ledger,
            &config.client_api_key,
            &config.service_key,
            config.shop_handle.clone(),
        ))
    }

    /// Builds state on top of any ledger implementation. Tests use this with
    /// the in-memory ledger.
    pub fn with_ledger(
        ledger: Arc<dyn Ledger>,
        client_api_key: &str,
        service_key: &str,
        shop_handle: Option<String>,
    ) -> Self {
        let reconciler = Reconciler::new(ledger.clone());
        AppState {
            ledger,
            reconciler,
            client_api_key: client_api_key.to_string(),
            service_key: service_key.to_string(),
            shop_handle,
        }
    }
}
