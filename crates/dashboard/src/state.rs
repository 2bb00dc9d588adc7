//! Shared dashboard state: the query client, the auxiliary store, local
//! storage and the soft user id, built once from configuration.

use std::sync::Arc;

use crate::aux_store::AuxStore;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::gateway::CommerceGateway;
use crate::identity::UserId;
use crate::query::{QueryClient, QueryConfig};
use crate::settings::DashboardSettings;
use crate::storage::{FileStorage, StoragePort};

/// Everything a dashboard view needs.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    query: QueryClient,
    aux: AuxStore,
    storage: Arc<dyn StoragePort>,
    user_id: UserId,
}

impl AppState {
    /// Assemble state from explicit parts.
    #[must_use]
    pub fn new(query: QueryClient, aux: AuxStore, storage: Arc<dyn StoragePort>) -> Self {
        let user_id = UserId::load_or_create(storage.as_ref());
        Self {
            inner: Arc::new(AppStateInner {
                query,
                aux,
                storage,
                user_id,
            }),
        }
    }

    /// Build the gateway, query client, auxiliary store and file storage
    /// described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the commerce client cannot be built.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let gateway = CommerceGateway::new(&config.commerce)?;
        let query = QueryClient::new(
            gateway,
            QueryConfig {
                retries: config.query_retries,
                ..QueryConfig::default()
            },
        );
        let aux = AuxStore::from_config(config.aux_store());
        let storage: Arc<dyn StoragePort> = Arc::new(FileStorage::new(&config.storage_path));

        Ok(Self::new(query, aux, storage))
    }

    #[must_use]
    pub fn query(&self) -> &QueryClient {
        &self.inner.query
    }

    #[must_use]
    pub fn aux(&self) -> &AuxStore {
        &self.inner.aux
    }

    #[must_use]
    pub fn storage(&self) -> &dyn StoragePort {
        self.inner.storage.as_ref()
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.inner.user_id
    }

    /// Current local settings.
    #[must_use]
    pub fn settings(&self) -> DashboardSettings {
        DashboardSettings::load(self.storage())
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("query", &self.inner.query)
            .field("aux", &self.inner.aux)
            .field("user_id", &self.inner.user_id)
            .finish_non_exhaustive()
    }
}
