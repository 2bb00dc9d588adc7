//! Resource operations for the commerce API.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use streetgasm_core::pagination::EnvelopeBody;
use streetgasm_core::{
    CustomerId, DashboardStats, ListParams, OrderId, Paginated, ProductId, RawOrder, RawProduct,
    RawSubscription, SubscriptionId, SyncEntity, SyncResult, SyncStatus,
};

use super::{CommerceGateway, GatewayError, single_from_body};

impl CommerceGateway {
    /// Fetch one page of a list resource and normalize the envelope.
    async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &ListParams,
    ) -> Result<Paginated<T>, GatewayError> {
        let body: EnvelopeBody<T> = self.get(resource, &params.query_pairs()).await?;
        Ok(body.normalize(params.page))
    }

    /// Fetch one record via `?id=`.
    async fn single<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: i64,
    ) -> Result<Option<T>, GatewayError> {
        let body: Value = self.get(resource, &[("id", id.to_string())]).await?;
        single_from_body(body)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// List subscriptions, filtered by status and search text.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the envelope does not decode.
    #[instrument(skip(self))]
    pub async fn list_subscriptions(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<RawSubscription>, GatewayError> {
        self.list("subscriptions", params).await
    }

    /// Get a single subscription. `Ok(None)` when the backend has no match.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the record does not decode.
    #[instrument(skip(self), fields(subscription_id = %id))]
    pub async fn get_subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<RawSubscription>, GatewayError> {
        self.single("subscriptions", id.as_i64()).await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// List orders. The orders endpoint does not take a search term, so any
    /// `search` in `params` is not sent.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the envelope does not decode.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<RawOrder>, GatewayError> {
        let params = params.clone().without_search();
        self.list("orders", &params).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the record does not decode.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get_order(&self, id: OrderId) -> Result<Option<RawOrder>, GatewayError> {
        self.single("orders", id.as_i64()).await
    }

    // =========================================================================
    // Products (events)
    // =========================================================================

    /// List event products. Products have no status filter.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the envelope does not decode.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<RawProduct>, GatewayError> {
        let params = params.clone().without_status();
        self.list("products", &params).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the record does not decode.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<RawProduct>, GatewayError> {
        self.single("products", id.as_i64()).await
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// List customers as raw JSON. Customers have no status filter.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the envelope does not decode.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<Value>, GatewayError> {
        let params = params.clone().without_status();
        self.list("customers", &params).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Value>, GatewayError> {
        self.single("customers", id.as_i64()).await
    }

    // =========================================================================
    // Aggregates and sync
    // =========================================================================

    /// Get dashboard totals.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body does not decode.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, GatewayError> {
        self.get("stats", &[]).await
    }

    /// Get recent sync runs.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body does not decode.
    #[instrument(skip(self))]
    pub async fn sync_status(&self) -> Result<SyncStatus, GatewayError> {
        self.get("sync-status", &[]).await
    }

    /// Ask the backend to resync one entity type (or all of them).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body does not decode.
    #[instrument(skip(self))]
    pub async fn trigger_sync(&self, entity: SyncEntity) -> Result<SyncResult, GatewayError> {
        self.post_sync(&json!({ "entity": entity })).await
    }
}
