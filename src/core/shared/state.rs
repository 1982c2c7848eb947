use crate::channels::TelephonyGateway;
use crate::core::config::AppConfig;
use crate::core::store::TenantStore;
use std::sync::Arc;

/// Process-wide handles shared by every request. Built once at start-up.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn TenantStore>,
    pub telephony: Arc<dyn TelephonyGateway>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn TenantStore>,
        telephony: Arc<dyn TelephonyGateway>,
    ) -> Self {
        Self {
            config,
            store,
            telephony,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
