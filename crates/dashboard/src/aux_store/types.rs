//! Row types for the auxiliary store tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use streetgasm_core::{
    ActivityKind, ApprovalStatus, CustomerId, EmailDigest, SubscriptionId, Theme,
};

use crate::identity::UserId;

/// Primary key of an auxiliary store row.
///
/// Opaque: tables key rows by UUID or bigint, and the value is only ever
/// echoed back in an `id=eq.` filter. Numbers are kept in their decimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for RowId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Self(s),
            Value::Number(n) => Self(n.to_string()),
            _ => Self::default(),
        })
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RowId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for RowId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Per-user dashboard preferences (`user_preferences`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: Theme,
    pub accent_color: String,
    pub company_name: String,
    pub notifications_enabled: bool,
    pub email_digest: EmailDigest,
    pub language: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            accent_color: "#fbbf24".to_string(),
            company_name: "Streetgasm".to_string(),
            notifications_enabled: true,
            email_digest: EmailDigest::Weekly,
            language: "en".to_string(),
        }
    }
}

/// A `user_preferences` row as stored. Any column may be null.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PreferencesRow {
    theme: Option<String>,
    accent_color: Option<String>,
    company_name: Option<String>,
    notifications_enabled: Option<bool>,
    email_digest: Option<String>,
    language: Option<String>,
}

impl PreferencesRow {
    /// Fill every null, empty or unrecognized column from the defaults.
    pub(crate) fn into_preferences(self) -> UserPreferences {
        let defaults = UserPreferences::default();
        let text = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        UserPreferences {
            theme: text(self.theme)
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.theme),
            accent_color: text(self.accent_color).unwrap_or(defaults.accent_color),
            company_name: text(self.company_name).unwrap_or(defaults.company_name),
            notifications_enabled: self
                .notifications_enabled
                .unwrap_or(defaults.notifications_enabled),
            email_digest: text(self.email_digest)
                .and_then(|d| d.parse().ok())
                .unwrap_or(defaults.email_digest),
            language: text(self.language).unwrap_or(defaults.language),
        }
    }
}

/// Partial preferences update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_digest: Option<EmailDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl PreferencesPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.accent_color.is_none()
            && self.company_name.is_none()
            && self.notifications_enabled.is_none()
            && self.email_digest.is_none()
            && self.language.is_none()
    }
}

/// Upsert body for `user_preferences`.
#[derive(Debug, Serialize)]
pub(crate) struct PreferencesUpsert<'a> {
    pub user_id: &'a UserId,
    #[serde(flatten)]
    pub patch: &'a PreferencesPatch,
    pub updated_at: DateTime<Utc>,
}

/// A `favorites` row.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FavoriteRow {
    #[serde(default)]
    pub id: Option<RowId>,
    #[serde(default)]
    pub member_id: Option<SubscriptionId>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewFavorite<'a> {
    pub user_id: &'a UserId,
    pub member_id: SubscriptionId,
}

/// An `activity_log` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    #[serde(default)]
    pub id: RowId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewActivity<'a> {
    pub user_id: &'a UserId,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<&'a Value>,
}

/// A membership application awaiting review (`member_approvals`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberApproval {
    #[serde(default)]
    pub id: RowId,
    #[serde(default)]
    pub member_id: Option<SubscriptionId>,
    #[serde(default)]
    pub woocommerce_customer_id: Option<CustomerId>,
    #[serde(default)]
    pub member_name: String,
    #[serde(default)]
    pub email: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// PATCH body for `member_approvals`.
#[derive(Debug, Serialize)]
pub(crate) struct ApprovalUpdate<'a> {
    pub status: ApprovalStatus,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_preferences_row_fills_missing_columns() {
        let row: PreferencesRow = serde_json::from_value(json!({
            "user_id": "user_abc",
            "theme": "light",
            "accent_color": "",
            "company_name": null,
            "notifications_enabled": false,
            "email_digest": "sometimes"
        }))
        .unwrap();

        let prefs = row.into_preferences();
        assert_eq!(prefs.theme, Theme::Light);
        assert_eq!(prefs.accent_color, "#fbbf24");
        assert_eq!(prefs.company_name, "Streetgasm");
        assert!(!prefs.notifications_enabled);
        assert_eq!(prefs.email_digest, EmailDigest::Weekly);
        assert_eq!(prefs.language, "en");
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = PreferencesPatch {
            theme: Some(Theme::Light),
            language: Some("nl".to_string()),
            ..PreferencesPatch::default()
        };
        assert!(!patch.is_empty());
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"theme": "light", "language": "nl"})
        );
        assert!(PreferencesPatch::default().is_empty());
    }

    #[test]
    fn test_upsert_flattens_patch() {
        let user = UserId::from("user_abc123xyz");
        let patch = PreferencesPatch {
            accent_color: Some("#ff0000".to_string()),
            ..PreferencesPatch::default()
        };
        let body = serde_json::to_value(PreferencesUpsert {
            user_id: &user,
            patch: &patch,
            updated_at: Utc::now(),
        })
        .unwrap();

        assert_eq!(body["user_id"], "user_abc123xyz");
        assert_eq!(body["accent_color"], "#ff0000");
        assert!(body.get("theme").is_none());
        assert!(body["updated_at"].is_string());
    }

    #[test]
    fn test_activity_entry_uses_type_key() {
        let entry: ActivityLogEntry = serde_json::from_value(json!({
            "id": "0b5cfa3e-3f0c-4d43-9a43-4c1f5a0e6b11",
            "user_id": "user_abc",
            "type": "approval",
            "description": "Member approved: 12",
            "metadata": null,
            "created_at": "2024-09-01T10:00:00.123456+00:00"
        }))
        .unwrap();
        assert_eq!(entry.kind, ActivityKind::Approval);
        assert!(entry.metadata.is_none());
    }

    #[test]
    fn test_row_ids_are_opaque() {
        let rows: Vec<FavoriteRow> =
            serde_json::from_value(json!([{"id": 5}, {"id": "0b5cfa3e"}, {"id": null}, {}]))
                .unwrap();
        let ids: Vec<Option<RowId>> = rows.into_iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![Some(RowId::from(5)), Some(RowId::from("0b5cfa3e")), None, None]
        );
        assert_eq!(RowId::from(17).to_string(), "17");
        assert_eq!(serde_json::to_value(RowId::from(17)).unwrap(), json!("17"));
    }

    #[test]
    fn test_activity_page_with_mixed_ids() {
        let entries: Vec<ActivityLogEntry> = serde_json::from_value(json!([
            {
                "id": "0b5cfa3e-3f0c-4d43-9a43-4c1f5a0e6b11",
                "type": "view",
                "description": "Viewed member 4211",
                "created_at": "2024-09-01T10:00:00+00:00"
            },
            {
                "id": 17,
                "type": "login",
                "description": "Logged in",
                "created_at": "2024-09-01T09:00:00+00:00"
            }
        ]))
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id.as_str(), "17");
    }

    #[test]
    fn test_member_approval_tolerates_sparse_rows() {
        let approval: MemberApproval = serde_json::from_value(json!({
            "id": "7d1f6e4c-8a7b-4a44-bb0e-2f2f1b9c0a01",
            "status": "pending",
            "member_id": 4211
        }))
        .unwrap();
        assert_eq!(approval.member_id, Some(SubscriptionId::new(4211)));
        assert_eq!(approval.status, ApprovalStatus::Pending);
        assert!(approval.member_name.is_empty());
    }
}
