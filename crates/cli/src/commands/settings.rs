//! Local settings and identity.

use serde_json::json;

use streetgasm_core::Theme;
use streetgasm_dashboard::{AppState, DashboardConfig, DashboardError};

use super::print_json;

/// A single settings change.
pub enum Update {
    Theme(Theme),
    Accent(String),
    Title(String),
    Company(String),
    ToggleSidebar,
}

/// Apply `update` (if any), persist, and print the resulting settings.
pub fn settings(state: &AppState, update: Option<Update>) -> Result<(), DashboardError> {
    let mut settings = state.settings();

    if let Some(update) = update {
        match update {
            Update::Theme(theme) => settings.set_theme(theme),
            Update::Accent(color) => settings.set_accent_color(color),
            Update::Title(title) => settings.set_dashboard_title(title),
            Update::Company(name) => settings.set_company_name(name),
            Update::ToggleSidebar => settings.toggle_sidebar(),
        }
        settings.save(state.storage())?;
    }

    print_json(&settings)
}

pub fn whoami(state: &AppState, config: &DashboardConfig) -> Result<(), DashboardError> {
    print_json(&json!({
        "userId": state.user_id(),
        "auxStoreEnabled": state.aux().is_enabled(),
        "storagePath": config.storage_path.display().to_string(),
        "commerceApi": state.query().gateway().base_url(),
    }))
}
