use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use cgate_provider_core::{Arbiter, Provider, ProviderConfig, ProviderRegistry};
use cgate_storage::Store;
use tower_http::catch_panic::CatchPanicLayer;

use crate::auth::AuthProvider;
use crate::handler::{chat_handler, health_handler};

pub struct CoreState {
    pub store: Arc<Store>,
    pub arbiter: Arc<Arbiter<Store>>,
    pub registry: Arc<ProviderRegistry>,
    pub provider_configs: Arc<HashMap<Provider, ProviderConfig>>,
    pub auth: Arc<dyn AuthProvider>,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(
        store: Arc<Store>,
        arbiter: Arc<Arbiter<Store>>,
        registry: Arc<ProviderRegistry>,
        provider_configs: HashMap<Provider, ProviderConfig>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            state: Arc::new(CoreState {
                store,
                arbiter,
                registry,
                provider_configs: Arc::new(provider_configs),
                auth,
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_handler))
            .route("/health", get(health_handler))
            .layer(CatchPanicLayer::new())
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
