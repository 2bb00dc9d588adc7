//! StreetGasm Core - Shared types library.
//!
//! This crate provides the types used across all StreetGasm dashboard components:
//! - `dashboard` - Commerce gateway, auxiliary store and query layer
//! - `cli` - Command-line access to the dashboard data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and status enums
//! - [`records`] - Raw commerce records as the backend returns them
//! - [`member`] - The `Member` view model and the subscription adapter
//! - [`pagination`] - The paginated envelope and the list-state machine
//! - [`analytics`] - Aggregations over an already-fetched page of records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod member;
pub mod pagination;
pub mod records;
pub mod types;

pub use member::{Car, Location, Member, MemberSubscription, subscription_to_member};
pub use pagination::{ListParams, ListState, Paginated};
pub use records::*;
pub use types::*;
