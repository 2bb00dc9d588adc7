//! Auxiliary store client (`PostgREST`).
//!
//! Holds the data the commerce backend does not: per-user preferences,
//! favorite members, the activity log and membership approvals.
//!
//! # API Reference
//!
//! - Base URL: `{aux_url}/rest/v1/{table}`
//! - Authentication: `apikey: <anon key>` and `Authorization: Bearer <anon key>`
//! - Filters: `column=eq.value`, ordering via `order=column.asc|desc`
//!
//! Every public operation is infallible. Reads fall back to defaults or
//! empty lists and writes report `false`; the cause is logged at `warn`.
//! Without configuration the store is disabled and behaves the same way
//! without making any request.

mod types;

pub use types::*;

use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{instrument, warn};

use streetgasm_core::{ActivityKind, ApprovalStatus, CustomerId, SubscriptionId};

use crate::config::AuxStoreConfig;
use crate::identity::UserId;

/// Default number of activity entries returned.
pub const DEFAULT_ACTIVITY_LIMIT: u32 = 20;

const PREFERENCES_TABLE: &str = "user_preferences";
const FAVORITES_TABLE: &str = "favorites";
const ACTIVITY_TABLE: &str = "activity_log";
const APPROVALS_TABLE: &str = "member_approvals";

/// Errors from the auxiliary store. Logged, never returned by public
/// operations.
#[derive(Debug, Error)]
pub enum AuxStoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Store returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Auxiliary store client.
#[derive(Clone)]
pub struct AuxStore {
    inner: Option<Arc<AuxStoreInner>>,
}

struct AuxStoreInner {
    client: reqwest::Client,
    rest_url: String,
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl AuxStore {
    /// Create a client for a configured store.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &AuxStoreConfig) -> Result<Self, AuxStoreError> {
        let key = config.anon_key.expose_secret();
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            AuxStoreError::Parse(format!("Invalid anon key format: {e}"))
        };

        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(invalid)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            inner: Some(Arc::new(AuxStoreInner {
                client,
                rest_url: format!("{}/rest/v1", config.url.as_str().trim_end_matches('/')),
            })),
        })
    }

    /// A store that is not configured.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { inner: None }
    }

    /// Client for an optional configuration. A client that fails to build
    /// is logged and treated as not configured.
    #[must_use]
    pub fn from_config(config: Option<&AuxStoreConfig>) -> Self {
        match config.map(Self::new) {
            Some(Ok(store)) => store,
            Some(Err(e)) => {
                warn!(error = %e, "Auxiliary store disabled");
                Self::disabled()
            }
            None => Self::disabled(),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    /// Preferences for `user`, with defaults for anything not stored.
    #[instrument(skip(self))]
    pub async fn preferences(&self, user: &UserId) -> UserPreferences {
        let Some(inner) = &self.inner else {
            return UserPreferences::default();
        };

        let filters = vec![
            ("select", "*".to_string()),
            ("user_id", eq(user)),
            ("limit", "1".to_string()),
        ];
        match inner.select::<PreferencesRow>(PREFERENCES_TABLE, &filters).await {
            Ok(rows) => rows
                .into_iter()
                .next()
                .map(PreferencesRow::into_preferences)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load preferences");
                UserPreferences::default()
            }
        }
    }

    /// Merge `patch` into the stored preferences for `user`.
    #[instrument(skip(self))]
    pub async fn save_preferences(&self, user: &UserId, patch: &PreferencesPatch) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };

        let body = PreferencesUpsert {
            user_id: user,
            patch,
            updated_at: Utc::now(),
        };
        inner
            .upsert(PREFERENCES_TABLE, "user_id", &body)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to save preferences"))
            .is_ok()
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Member ids `user` has marked as favorite.
    #[instrument(skip(self))]
    pub async fn favorites(&self, user: &UserId) -> Vec<SubscriptionId> {
        let Some(inner) = &self.inner else {
            return Vec::new();
        };

        let filters = vec![("select", "member_id".to_string()), ("user_id", eq(user))];
        match inner.select::<FavoriteRow>(FAVORITES_TABLE, &filters).await {
            Ok(rows) => rows.into_iter().filter_map(|r| r.member_id).collect(),
            Err(e) => {
                warn!(error = %e, "Failed to load favorites");
                Vec::new()
            }
        }
    }

    /// Add `member_id` to the favorites of `user`, or remove it if present.
    #[instrument(skip(self))]
    pub async fn toggle_favorite(&self, user: &UserId, member_id: SubscriptionId) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };

        inner
            .toggle_favorite(user, member_id)
            .await
            .inspect_err(|e| warn!(error = %e, "Failed to toggle favorite"))
            .is_ok()
    }

    // =========================================================================
    // Activity log
    // =========================================================================

    /// Record an activity. Failures are logged and otherwise ignored.
    #[instrument(skip(self, metadata))]
    pub async fn log_activity(
        &self,
        user: &UserId,
        kind: ActivityKind,
        description: &str,
        metadata: Option<&Value>,
    ) {
        let Some(inner) = &self.inner else {
            return;
        };

        let body = NewActivity {
            user_id: user,
            kind,
            description,
            metadata,
        };
        if let Err(e) = inner.insert(ACTIVITY_TABLE, &body).await {
            warn!(error = %e, "Failed to log activity");
        }
    }

    /// The latest `limit` activity entries of `user`, newest first.
    #[instrument(skip(self))]
    pub async fn activity_log(&self, user: &UserId, limit: u32) -> Vec<ActivityLogEntry> {
        let Some(inner) = &self.inner else {
            return Vec::new();
        };

        let filters = vec![
            ("select", "*".to_string()),
            ("user_id", eq(user)),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ];
        inner
            .select(ACTIVITY_TABLE, &filters)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load activity log");
                Vec::new()
            })
    }

    // =========================================================================
    // Approvals
    // =========================================================================

    /// Applications with status `pending`, oldest first.
    #[instrument(skip(self))]
    pub async fn pending_approvals(&self) -> Vec<MemberApproval> {
        let Some(inner) = &self.inner else {
            return Vec::new();
        };

        let filters = vec![
            ("select", "*".to_string()),
            ("status", eq(ApprovalStatus::Pending)),
            ("order", "submitted_at.asc".to_string()),
        ];
        inner
            .select(APPROVALS_TABLE, &filters)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load pending approvals");
                Vec::new()
            })
    }

    /// Decide an application and, on success, record the decision in the
    /// activity log of `user`.
    #[instrument(skip(self))]
    pub async fn process_approval(
        &self,
        user: &UserId,
        approval_id: &RowId,
        status: ApprovalStatus,
        notes: Option<&str>,
    ) -> bool {
        self.update_approval(
            user,
            ("id", eq(approval_id)),
            approval_id.to_string(),
            status,
            notes,
        )
        .await
    }

    /// Set the approval status of a customer's application, including
    /// `waitlist`, and record it in the activity log of `user`.
    #[instrument(skip(self))]
    pub async fn set_member_approval_status(
        &self,
        user: &UserId,
        customer_id: CustomerId,
        status: ApprovalStatus,
        notes: Option<&str>,
    ) -> bool {
        self.update_approval(
            user,
            ("woocommerce_customer_id", eq(customer_id)),
            customer_id.to_string(),
            status,
            notes,
        )
        .await
    }

    async fn update_approval(
        &self,
        user: &UserId,
        filter: (&'static str, String),
        subject: String,
        status: ApprovalStatus,
        notes: Option<&str>,
    ) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };

        let body = ApprovalUpdate {
            status,
            processed_at: Utc::now(),
            notes,
        };
        if let Err(e) = inner.update(APPROVALS_TABLE, &[filter], &body).await {
            warn!(error = %e, "Failed to update approval");
            return false;
        }

        let kind = match status {
            ApprovalStatus::Approved => ActivityKind::Approval,
            ApprovalStatus::Rejected => ActivityKind::Rejection,
            ApprovalStatus::Pending | ApprovalStatus::Waitlist => ActivityKind::Edit,
        };
        self.log_activity(user, kind, &format!("Member {status}: {subject}"), None)
            .await;
        true
    }
}

impl AuxStoreInner {
    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, AuxStoreError> {
        let response = self
            .client
            .get(self.table_url(table))
            .query(filters)
            .send()
            .await?;
        let response = check(response).await?;
        response
            .json()
            .await
            .map_err(|e| AuxStoreError::Parse(format!("Failed to parse rows: {e}")))
    }

    async fn insert<B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<(), AuxStoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    async fn upsert<B: Serialize + Sync>(
        &self,
        table: &str,
        conflict_column: &str,
        body: &B,
    ) -> Result<(), AuxStoreError> {
        let response = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", conflict_column)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    async fn update<B: Serialize + Sync>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<(), AuxStoreError> {
        let response = self
            .client
            .patch(self.table_url(table))
            .query(filters)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<(), AuxStoreError> {
        let response = self
            .client
            .delete(self.table_url(table))
            .query(filters)
            .send()
            .await?;
        check(response).await.map(drop)
    }

    async fn toggle_favorite(
        &self,
        user: &UserId,
        member_id: SubscriptionId,
    ) -> Result<(), AuxStoreError> {
        let filters = vec![
            ("select", "id".to_string()),
            ("user_id", eq(user)),
            ("member_id", eq(member_id)),
            ("limit", "1".to_string()),
        ];
        let existing = self
            .select::<FavoriteRow>(FAVORITES_TABLE, &filters)
            .await?
            .into_iter()
            .find_map(|row| row.id)
            .filter(|id| !id.as_str().is_empty());

        match existing {
            Some(id) => self.delete(FAVORITES_TABLE, &[("id", eq(id))]).await,
            None => {
                let body = NewFavorite {
                    user_id: user,
                    member_id,
                };
                self.insert(FAVORITES_TABLE, &body).await
            }
        }
    }
}

/// Pass through success responses, turn the rest into `AuxStoreError::Api`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, AuxStoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(AuxStoreError::Api {
        status: status.as_u16(),
        message,
    })
}

impl std::fmt::Debug for AuxStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuxStore")
            .field("rest_url", &self.inner.as_ref().map(|i| i.rest_url.as_str()))
            .finish_non_exhaustive()
    }
}
