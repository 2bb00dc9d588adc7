//! Subcommand implementations. Each prints its result as pretty JSON.

pub mod club;
pub mod lists;
pub mod overview;
pub mod settings;

use serde::Serialize;
use streetgasm_dashboard::DashboardError;

/// Print `value` as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), DashboardError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
