//! Core types for the StreetGasm dashboard.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod status;

pub use id::*;
pub use money::{format_eur, parse_amount};
pub use status::*;
