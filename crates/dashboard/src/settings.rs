//! Local dashboard settings (theme, branding, sidebar state).
//!
//! Stored as one JSON value under [`SETTINGS_KEY`] through a [`StoragePort`].
//! These are separate from the per-user preferences kept in the auxiliary
//! store: settings never leave the machine.

use serde::{Deserialize, Serialize};

use streetgasm_core::Theme;

use crate::storage::{StorageError, StoragePort};

/// Storage key holding the serialized settings.
pub const SETTINGS_KEY: &str = "streetgasm-preferences";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub theme: Theme,
    pub accent_color: String,
    pub dashboard_title: String,
    pub company_name: String,
    pub sidebar_collapsed: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            accent_color: "#fbbf24".to_string(),
            dashboard_title: "StreetGasm Dashboard".to_string(),
            company_name: "StreetGasm".to_string(),
            sidebar_collapsed: false,
        }
    }
}

impl DashboardSettings {
    /// Load settings, falling back to defaults when absent or corrupt.
    pub fn load(storage: &dyn StoragePort) -> Self {
        let Some(raw) = storage.get(SETTINGS_KEY) else {
            return Self::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Stored dashboard settings are corrupt, using defaults");
            Self::default()
        })
    }

    /// # Errors
    ///
    /// Returns error if the settings cannot be serialized or stored.
    pub fn save(&self, storage: &dyn StoragePort) -> Result<(), StorageError> {
        storage.set(SETTINGS_KEY, &serde_json::to_string(self)?)
    }

    pub const fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn set_accent_color(&mut self, color: impl Into<String>) {
        self.accent_color = color.into();
    }

    pub fn set_dashboard_title(&mut self, title: impl Into<String>) {
        self.dashboard_title = title.into();
    }

    pub fn set_company_name(&mut self, name: impl Into<String>) {
        self.company_name = name.into();
    }

    pub const fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }
}
