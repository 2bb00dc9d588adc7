//! Query layer over the commerce gateway.
//!
//! Adds bounded retries and a short-lived result cache to
//! [`CommerceGateway`]. A failing fetch is attempted `1 + retries` times with
//! a fixed delay in between; successful results are cached per query key
//! until their stale time passes. Call [`QueryClient::invalidate_all`] after
//! anything that changes backend data.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use streetgasm_core::{
    DashboardStats, ListParams, Member, Paginated, RawOrder, RawProduct, RawSubscription,
    SubscriptionId, SubscriptionStatus, SyncEntity, SyncResult,
};

use crate::gateway::{CommerceGateway, GatewayError};

/// Retry and cache tuning.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Extra attempts after the first failure.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Stale time for stats and subscription queries.
    pub stale_time: Duration,
    /// Stale time for order queries.
    pub orders_stale_time: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(250),
            stale_time: Duration::from_secs(30),
            orders_stale_time: Duration::from_secs(60),
        }
    }
}

/// Cache key for a query.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Stats,
    Subscriptions(ListParams),
    Subscription(SubscriptionId),
    Orders(ListParams),
    Products(ListParams),
}

/// Cached query results.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Stats(Box<DashboardStats>),
    Subscriptions(Paginated<RawSubscription>),
    Subscription(Option<Box<RawSubscription>>),
    Orders(Paginated<RawOrder>),
    Products(Paginated<RawProduct>),
}

macro_rules! cache_value {
    ($variant:ident, $ty:ty, $wrap:expr, $unwrap:expr) => {
        impl From<$ty> for CacheValue {
            fn from(value: $ty) -> Self {
                Self::$variant($wrap(value))
            }
        }

        impl TryFrom<CacheValue> for $ty {
            type Error = CacheValue;

            fn try_from(value: CacheValue) -> Result<Self, Self::Error> {
                match value {
                    CacheValue::$variant(inner) => Ok($unwrap(inner)),
                    other => Err(other),
                }
            }
        }
    };
}

cache_value!(Stats, DashboardStats, Box::new, |b: Box<DashboardStats>| *b);
cache_value!(
    Subscriptions,
    Paginated<RawSubscription>,
    std::convert::identity,
    std::convert::identity
);
cache_value!(
    Subscription,
    Option<RawSubscription>,
    |v: Option<RawSubscription>| v.map(Box::new),
    |v: Option<Box<RawSubscription>>| v.map(|b| *b)
);
cache_value!(Orders, Paginated<RawOrder>, std::convert::identity, std::convert::identity);
cache_value!(Products, Paginated<RawProduct>, std::convert::identity, std::convert::identity);

/// Per-key stale times.
struct StaleTimes {
    default: Duration,
    orders: Duration,
}

impl Expiry<QueryKey, CacheValue> for StaleTimes {
    fn expire_after_create(
        &self,
        key: &QueryKey,
        _value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(match key {
            QueryKey::Orders(_) => self.orders,
            _ => self.default,
        })
    }
}

/// One independently loaded part of a composite view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region<T> {
    pub data: T,
    pub is_error: bool,
}

impl<T: Default> Region<T> {
    /// Keep the data, or fall back to empty data flagged as failed.
    fn from_result(region: &str, result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(data) => Self {
                data,
                is_error: false,
            },
            Err(e) => {
                warn!(region, error = %e, "Dashboard region failed to load");
                Self {
                    data: T::default(),
                    is_error: true,
                }
            }
        }
    }
}

/// Everything the overview screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub stats: Region<DashboardStats>,
    pub active_subscriptions: Region<Paginated<RawSubscription>>,
    pub recent_orders: Region<Paginated<RawOrder>>,
}

impl DashboardSnapshot {
    /// Whether any region failed.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.stats.is_error || self.active_subscriptions.is_error || self.recent_orders.is_error
    }
}

/// Statuses counted by [`QueryClient::subscription_status_counts`].
pub const COUNTED_STATUSES: [SubscriptionStatus; 4] = [
    SubscriptionStatus::Active,
    SubscriptionStatus::OnHold,
    SubscriptionStatus::Cancelled,
    SubscriptionStatus::Pending,
];

/// Retrying, caching front for [`CommerceGateway`].
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryClientInner>,
}

struct QueryClientInner {
    gateway: CommerceGateway,
    config: QueryConfig,
    cache: Cache<QueryKey, CacheValue>,
}

impl QueryClient {
    #[must_use]
    pub fn new(gateway: CommerceGateway, config: QueryConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .expire_after(StaleTimes {
                default: config.stale_time,
                orders: config.orders_stale_time,
            })
            .build();

        Self {
            inner: Arc::new(QueryClientInner {
                gateway,
                config,
                cache,
            }),
        }
    }

    /// The underlying gateway, for uncached calls.
    #[must_use]
    pub fn gateway(&self) -> &CommerceGateway {
        &self.inner.gateway
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DashboardStats, GatewayError> {
        let gateway = &self.inner.gateway;
        self.cached(QueryKey::Stats, || gateway.stats()).await
    }

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self))]
    pub async fn subscriptions(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<RawSubscription>, GatewayError> {
        let gateway = &self.inner.gateway;
        self.cached(QueryKey::Subscriptions(params.clone()), || {
            gateway.list_subscriptions(params)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self))]
    pub async fn subscription(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<RawSubscription>, GatewayError> {
        let gateway = &self.inner.gateway;
        self.cached(QueryKey::Subscription(id), || gateway.get_subscription(id))
            .await
    }

    /// Subscriptions projected into members; pagination counters are kept.
    ///
    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    pub async fn members(&self, params: &ListParams) -> Result<Paginated<Member>, GatewayError> {
        let page = self.subscriptions(params).await?;
        Ok(page.map(|sub| Member::from_subscription(&sub)))
    }

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    pub async fn member(&self, id: SubscriptionId) -> Result<Option<Member>, GatewayError> {
        let sub = self.subscription(id).await?;
        Ok(sub.as_ref().map(Member::from_subscription))
    }

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self))]
    pub async fn orders(&self, params: &ListParams) -> Result<Paginated<RawOrder>, GatewayError> {
        let gateway = &self.inner.gateway;
        self.cached(QueryKey::Orders(params.clone()), || gateway.list_orders(params))
            .await
    }

    /// # Errors
    ///
    /// Returns the last error once all attempts have failed.
    #[instrument(skip(self))]
    pub async fn products(
        &self,
        params: &ListParams,
    ) -> Result<Paginated<RawProduct>, GatewayError> {
        let gateway = &self.inner.gateway;
        self.cached(QueryKey::Products(params.clone()), || {
            gateway.list_products(params)
        })
        .await
    }

    /// Total number of subscriptions per status, read from the `total` of a
    /// one-record page for each status.
    ///
    /// # Errors
    ///
    /// Returns the first status query that fails after retries.
    pub async fn subscription_status_counts(
        &self,
    ) -> Result<Vec<(SubscriptionStatus, u64)>, GatewayError> {
        let mut counts = Vec::with_capacity(COUNTED_STATUSES.len());
        for status in COUNTED_STATUSES {
            let params = ListParams::new()
                .status(status.as_str())
                .page(1)
                .per_page(1);
            let page = self.subscriptions(&params).await?;
            counts.push((status, page.total));
        }
        Ok(counts)
    }

    /// Load the overview: stats, the first ten active subscriptions and the
    /// five latest orders, concurrently. A failing region does not affect
    /// the others.
    pub async fn dashboard_snapshot(&self) -> DashboardSnapshot {
        let subscription_params = ListParams::new().page(1).per_page(10).status("active");
        let order_params = ListParams::new().page(1).per_page(5);

        let (stats, subscriptions, orders) = tokio::join!(
            self.stats(),
            self.subscriptions(&subscription_params),
            self.orders(&order_params),
        );

        DashboardSnapshot {
            stats: Region::from_result("stats", stats),
            active_subscriptions: Region::from_result("subscriptions", subscriptions),
            recent_orders: Region::from_result("orders", orders),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Trigger a backend sync, then drop every cached result.
    ///
    /// Not retried: a sync run is not idempotent.
    ///
    /// # Errors
    ///
    /// Returns error if the sync request fails.
    #[instrument(skip(self))]
    pub async fn trigger_sync(&self, entity: SyncEntity) -> Result<SyncResult, GatewayError> {
        let result = self.inner.gateway.trigger_sync(entity).await?;
        self.invalidate_all().await;
        Ok(result)
    }

    /// Drop every cached result.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn cached<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, GatewayError>
    where
        T: Clone + Into<CacheValue> + TryFrom<CacheValue>,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        if let Some(hit) = self
            .inner
            .cache
            .get(&key)
            .await
            .and_then(|value| T::try_from(value).ok())
        {
            debug!(?key, "Cache hit");
            return Ok(hit);
        }

        let value = self.with_retry(fetch).await?;
        self.inner.cache.insert(key, value.clone().into()).await;
        Ok(value)
    }

    async fn with_retry<T, F, Fut>(&self, fetch: F) -> Result<T, GatewayError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let attempts = self.inner.config.retries.saturating_add(1);
        let mut attempt = 1;
        loop {
            match fetch().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    debug!(attempt, error = %e, "Query failed, retrying");
                    tokio::time::sleep(self.inner.config.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("gateway", &self.inner.gateway)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use streetgasm_core::SubscriptionTotals;

    use super::*;
    use crate::config::CommerceConfig;

    /// Client whose gateway points at a closed local port.
    fn offline_client(retries: u32) -> QueryClient {
        let config = CommerceConfig::new("http://127.0.0.1:9")
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        QueryClient::new(
            CommerceGateway::new(&config).unwrap(),
            QueryConfig {
                retries,
                retry_delay: Duration::from_millis(1),
                ..QueryConfig::default()
            },
        )
    }

    fn flaky(failures: u32, calls: &AtomicU32) -> impl Future<Output = Result<u32, GatewayError>> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < failures {
                Err(GatewayError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            } else {
                Ok(n)
            }
        }
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let client = offline_client(2);
        let calls = AtomicU32::new(0);
        let result = client.with_retry(|| flaky(2, &calls)).await.unwrap();
        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_last_attempt() {
        let client = offline_client(2);
        let calls = AtomicU32::new(0);
        let result = client.with_retry(|| flaky(3, &calls)).await;
        assert_eq!(result.unwrap_err().status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let client = offline_client(0);
        let calls = AtomicU32::new(0);
        assert!(client.with_retry(|| flaky(1, &calls)).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_gateway() {
        let client = offline_client(0);
        let stats = DashboardStats {
            subscriptions: Some(SubscriptionTotals {
                total: 42,
                ..SubscriptionTotals::default()
            }),
            ..DashboardStats::default()
        };
        client
            .inner
            .cache
            .insert(QueryKey::Stats, stats.clone().into())
            .await;

        assert_eq!(client.stats().await.unwrap(), stats);

        client.invalidate_all().await;
        assert!(matches!(
            client.stats().await,
            Err(GatewayError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_flags_failed_regions() {
        let client = offline_client(0);
        client
            .inner
            .cache
            .insert(QueryKey::Stats, DashboardStats::default().into())
            .await;

        let snapshot = client.dashboard_snapshot().await;
        assert!(!snapshot.stats.is_error);
        assert!(snapshot.active_subscriptions.is_error);
        assert!(snapshot.active_subscriptions.data.data.is_empty());
        assert!(snapshot.recent_orders.is_error);
        assert!(snapshot.has_errors());
    }

    #[test]
    fn test_cache_value_conversions() {
        let value: CacheValue = Some(RawSubscription::default()).into();
        assert!(Option::<RawSubscription>::try_from(value.clone()).is_ok());
        assert!(DashboardStats::try_from(value).is_err());
    }

    #[test]
    fn test_orders_have_longer_stale_time() {
        let times = StaleTimes {
            default: Duration::from_secs(30),
            orders: Duration::from_secs(60),
        };
        let value = CacheValue::Orders(Paginated::empty());
        let now = Instant::now();
        assert_eq!(
            times.expire_after_create(&QueryKey::Orders(ListParams::new()), &value, now),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            times.expire_after_create(&QueryKey::Stats, &value, now),
            Some(Duration::from_secs(30))
        );
    }
}
