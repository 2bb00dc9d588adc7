//! The `Member` view model and the subscription adapter.
//!
//! A member is not stored anywhere: it is a subscription viewed for display.
//! [`Member::from_subscription`] is total. Missing or partial input degrades
//! to empty strings, `None`, or a fixed default, never to an error.

use serde::{Deserialize, Serialize};

use crate::records::RawSubscription;
use crate::types::{MemberStatus, SubscriptionId};

/// Display name used when billing has no usable name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Car brand used when the vehicle record has no brand.
pub const UNKNOWN_BRAND: &str = "Unknown";

/// Member type used when the subscription has no named line item.
pub const DEFAULT_MEMBER_TYPE: &str = "Member";

/// A club member as shown in lists and detail screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Same as the subscription ID.
    pub id: SubscriptionId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: MemberStatus,
    pub member_type: String,
    pub join_date: String,
    pub last_active: String,
    pub car: Option<Car>,
    pub location: Location,
    pub subscription: MemberSubscription,
}

/// The member's registered car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    pub brand: String,
    pub model: String,
    pub year: String,
    pub image: Option<String>,
    pub power: String,
}

impl Car {
    /// Horsepower parsed from the leading digits of `power` (`"510 pk"` → 510).
    #[must_use]
    pub fn power_hp(&self) -> Option<u32> {
        let digits: String = self
            .power
            .trim()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

/// Subscription summary embedded in a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSubscription {
    pub id: SubscriptionId,
    /// Raw backend status, unlike [`Member::status`].
    pub status: String,
    pub next_payment: Option<String>,
    pub total: String,
}

impl Member {
    /// Project a raw subscription into a member.
    #[must_use]
    pub fn from_subscription(sub: &RawSubscription) -> Self {
        let billing = &sub.billing;

        let full_name = format!(
            "{} {}",
            billing.first_name.as_deref().unwrap_or_default(),
            billing.last_name.as_deref().unwrap_or_default()
        );
        let name = match full_name.trim() {
            "" => UNKNOWN_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };

        let status = if sub.status == "active" {
            MemberStatus::Active
        } else {
            MemberStatus::Inactive
        };

        let join_date = first_present(&[&sub.start_date, &sub.date_created])
            .unwrap_or_default()
            .to_string();
        let last_active = first_present(&[&sub.date_modified])
            .map_or_else(|| join_date.clone(), str::to_string);

        let member_type = sub
            .line_items
            .first()
            .map(|item| item.name.trim())
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_MEMBER_TYPE)
            .to_string();

        let car = sub.auto.as_ref().map(|auto| Car {
            brand: auto
                .merk
                .clone()
                .unwrap_or_else(|| UNKNOWN_BRAND.to_string()),
            model: auto.model.clone().unwrap_or_default(),
            year: auto.bouwjaar.clone().unwrap_or_default(),
            image: auto.foto.clone(),
            power: auto.vermogen.clone().unwrap_or_default(),
        });

        Self {
            id: sub.id,
            name,
            email: billing.email.clone().unwrap_or_default(),
            phone: billing.phone.clone().unwrap_or_default(),
            status,
            member_type,
            join_date,
            last_active,
            car,
            location: Location {
                city: billing.city.clone().unwrap_or_default(),
                country: billing.country.clone().unwrap_or_default(),
            },
            subscription: MemberSubscription {
                id: sub.id,
                status: sub.status.clone(),
                next_payment: sub.next_payment_date.clone(),
                total: sub.total.clone().unwrap_or_else(|| "0".to_string()),
            },
        }
    }

    /// Car brand, if the member has a car.
    #[must_use]
    pub fn car_brand(&self) -> Option<&str> {
        self.car.as_ref().map(|car| car.brand.as_str())
    }

    /// Uppercased initials of the first two name parts (`"Jan Bakker"` → `"JB"`).
    #[must_use]
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

impl From<&RawSubscription> for Member {
    fn from(sub: &RawSubscription) -> Self {
        Self::from_subscription(sub)
    }
}

/// Free-function form of [`Member::from_subscription`], handy for `map`.
#[must_use]
pub fn subscription_to_member(sub: &RawSubscription) -> Member {
    Member::from_subscription(sub)
}

/// First value that is present and non-blank.
fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| Option::as_deref(*c))
        .find(|s| !s.trim().is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::records::{BillingInfo, LineItem, VehicleInfo};

    fn subscription(value: serde_json::Value) -> RawSubscription {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_name_joins_billing_names() {
        let member = Member::from_subscription(&subscription(json!({
            "id": 1,
            "status": "active",
            "billing": {"first_name": "Jan", "last_name": "Bakker"}
        })));
        assert_eq!(member.name, "Jan Bakker");
        assert_eq!(member.status, MemberStatus::Active);
    }

    #[test]
    fn test_empty_billing_is_unknown_and_inactive() {
        let member = Member::from_subscription(&subscription(json!({
            "id": 2,
            "status": "pending",
            "billing": {}
        })));
        assert_eq!(member.name, "Unknown");
        assert_eq!(member.status, MemberStatus::Inactive);
    }

    #[test]
    fn test_single_name_part_is_trimmed() {
        let sub = RawSubscription {
            billing: BillingInfo {
                first_name: Some("  ".to_string()),
                last_name: Some("Visser".to_string()),
                ..BillingInfo::default()
            },
            ..RawSubscription::default()
        };
        assert_eq!(Member::from_subscription(&sub).name, "Visser");
    }

    #[test]
    fn test_every_non_active_status_collapses_to_inactive() {
        for status in ["on-hold", "cancelled", "expired", "pending-cancel", "Active", ""] {
            let sub = RawSubscription {
                status: status.to_string(),
                ..RawSubscription::default()
            };
            assert_eq!(
                Member::from_subscription(&sub).status,
                MemberStatus::Inactive,
                "status {status:?}"
            );
        }
    }

    #[test]
    fn test_missing_auto_means_no_car() {
        let member = Member::from_subscription(&subscription(json!({"id": 3})));
        assert!(member.car.is_none());
        assert!(member.car_brand().is_none());
    }

    #[test]
    fn test_car_fields_default_individually() {
        let sub = RawSubscription {
            auto: Some(VehicleInfo {
                model: Some("M3".to_string()),
                ..VehicleInfo::default()
            }),
            ..RawSubscription::default()
        };
        let car = Member::from_subscription(&sub).car.unwrap();
        assert_eq!(
            car,
            Car {
                brand: "Unknown".to_string(),
                model: "M3".to_string(),
                year: String::new(),
                image: None,
                power: String::new(),
            }
        );
        assert_eq!(car.power_hp(), None);
    }

    #[test]
    fn test_car_power_parses_leading_digits() {
        let member = Member::from_subscription(&subscription(json!({
            "auto": {
                "merk": "Nissan",
                "vermogen": "600 pk",
                "foto": "https://cdn.example.nl/gtr.jpg"
            }
        })));
        let car = member.car.unwrap();
        assert_eq!(car.power_hp(), Some(600));
        assert_eq!(car.image.as_deref(), Some("https://cdn.example.nl/gtr.jpg"));
    }

    #[test]
    fn test_join_date_falls_back_to_date_created() {
        let member = Member::from_subscription(&subscription(json!({
            "start_date": "",
            "date_created": "2023-05-01T12:00:00"
        })));
        assert_eq!(member.join_date, "2023-05-01T12:00:00");
        assert_eq!(member.last_active, "2023-05-01T12:00:00");
    }

    #[test]
    fn test_last_active_prefers_date_modified() {
        let member = Member::from_subscription(&subscription(json!({
            "start_date": "2023-05-01T12:00:00",
            "date_modified": "2024-01-09T08:00:00"
        })));
        assert_eq!(member.join_date, "2023-05-01T12:00:00");
        assert_eq!(member.last_active, "2024-01-09T08:00:00");
    }

    #[test]
    fn test_member_type_from_first_line_item() {
        let mut sub = RawSubscription::default();
        assert_eq!(Member::from_subscription(&sub).member_type, "Member");

        sub.line_items.push(LineItem {
            name: "Gold Membership".to_string(),
            ..LineItem::default()
        });
        assert_eq!(Member::from_subscription(&sub).member_type, "Gold Membership");
    }

    #[test]
    fn test_subscription_summary_and_identity() {
        let member = Member::from_subscription(&subscription(json!({
            "id": 4211,
            "status": "on-hold",
            "next_payment_date": "2025-03-01T10:00:00"
        })));
        assert_eq!(member.id, SubscriptionId::new(4211));
        assert_eq!(member.subscription.id, member.id);
        assert_eq!(member.subscription.status, "on-hold");
        assert_eq!(
            member.subscription.next_payment.as_deref(),
            Some("2025-03-01T10:00:00")
        );
        assert_eq!(member.subscription.total, "0");
    }

    #[test]
    fn test_default_subscription_never_leaves_fields_missing() {
        let member = Member::from_subscription(&RawSubscription::default());
        let value = serde_json::to_value(&member).unwrap();

        for key in [
            "id",
            "name",
            "email",
            "phone",
            "status",
            "memberType",
            "joinDate",
            "lastActive",
            "car",
            "location",
            "subscription",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["email"], "");
        assert_eq!(value["location"], json!({"city": "", "country": ""}));
        assert!(value["car"].is_null());
    }

    #[test]
    fn test_initials() {
        let member = Member::from_subscription(&subscription(json!({
            "billing": {"first_name": "jan", "last_name": "de Vries"}
        })));
        assert_eq!(member.initials(), "JD");
    }
}
