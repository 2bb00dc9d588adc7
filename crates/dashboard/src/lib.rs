//! StreetGasm Dashboard - data layer for the club admin dashboard.
//!
//! # Modules
//!
//! - [`gateway`] - Commerce API client (subscriptions, orders, events, customers)
//! - [`query`] - Retrying, caching query layer and the dashboard snapshot
//! - [`aux_store`] - Preferences, favorites, activity log and approvals
//! - [`storage`] - Local key-value storage port
//! - [`identity`] - Soft per-installation user id
//! - [`settings`] - Local dashboard settings
//! - [`state`] - Everything above, built from [`config::DashboardConfig`]
//!
//! # Architecture
//!
//! The gateway issues exactly one request per call and reports every
//! failure. Retrying and caching happen one level up in [`query`]. The
//! auxiliary store is best-effort: its operations never fail and degrade to
//! defaults when the store is missing or unreachable.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod aux_store;
pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod query;
pub mod settings;
pub mod state;
pub mod storage;

pub use aux_store::AuxStore;
pub use config::DashboardConfig;
pub use error::DashboardError;
pub use gateway::{CommerceGateway, GatewayError, single_from_body};
pub use identity::UserId;
pub use query::{DashboardSnapshot, QueryClient, QueryConfig};
pub use settings::DashboardSettings;
pub use state::AppState;
pub use storage::{FileStorage, MemoryStorage, StoragePort};
