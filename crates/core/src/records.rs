//! Raw commerce records as returned by the `WooCommerce` edge API.
//!
//! These types are read-only projections. Deserialization is deliberately
//! lenient: every field has a default, `null` is accepted anywhere, numeric
//! fields that `WooCommerce` sometimes sends as strings (and vice versa) are
//! normalized to `String`, ids and counters accept numeric strings (anything
//! unreadable is `0`), and PHP's empty array (`[]`) in place of an empty
//! meta object is read as "absent".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{
    ApprovalStatus, CustomerId, LineItemId, OrderId, ProductId, StockStatus, SubscriptionId,
};

// =============================================================================
// Subscriptions
// =============================================================================

/// A subscription record (the source of truth for a member).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSubscription {
    #[serde(deserialize_with = "lenient::id")]
    pub id: SubscriptionId,
    #[serde(deserialize_with = "lenient::id")]
    pub customer_id: CustomerId,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub start_date: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub next_payment_date: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub date_created: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub date_modified: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub total: Option<String>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub billing: BillingInfo,
    #[serde(deserialize_with = "lenient::null_default")]
    pub line_items: Vec<LineItem>,
    /// Vehicle registered with the membership.
    #[serde(deserialize_with = "lenient::opt_object")]
    pub auto: Option<VehicleInfo>,
    /// Membership approval metadata.
    #[serde(deserialize_with = "lenient::opt_object")]
    pub goedkeuring: Option<ApprovalInfo>,
}

/// Billing contact embedded in subscriptions and orders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingInfo {
    #[serde(deserialize_with = "lenient::opt_string")]
    pub first_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub last_name: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub address_1: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub postcode: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub country: Option<String>,
}

/// Vehicle details (`auto` meta). Field names follow the Dutch meta keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleInfo {
    /// Brand.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub merk: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub model: Option<String>,
    /// Build year.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub bouwjaar: Option<String>,
    /// Color.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub kleur: Option<String>,
    /// Power in HP; sent as either a string or a number.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub vermogen: Option<String>,
    /// Photo URL.
    #[serde(deserialize_with = "lenient::opt_string")]
    pub foto: Option<String>,
}

/// Membership approval metadata (`goedkeuring` meta).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalInfo {
    pub status: ApprovalStatus,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub time: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
}

/// Order or subscription line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    #[serde(deserialize_with = "lenient::id")]
    pub id: LineItemId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::int")]
    pub quantity: i64,
    #[serde(deserialize_with = "lenient::string")]
    pub price: String,
    #[serde(deserialize_with = "lenient::string")]
    pub total: String,
}

// =============================================================================
// Orders
// =============================================================================

/// An order record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    #[serde(deserialize_with = "lenient::id")]
    pub id: OrderId,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub date_created: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub total: Option<String>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub billing: BillingInfo,
    #[serde(deserialize_with = "lenient::null_default")]
    pub line_items: Vec<LineItem>,
}

// =============================================================================
// Products (club events)
// =============================================================================

/// A product record. Club events are sold as products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProduct {
    #[serde(deserialize_with = "lenient::id")]
    pub id: ProductId,
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub price: Option<String>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub stock_status: StockStatus,
    #[serde(deserialize_with = "lenient::opt_int")]
    pub stock_quantity: Option<i64>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub images: Vec<ProductImage>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub categories: Vec<ProductCategory>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub short_description: Option<String>,
    #[serde(deserialize_with = "lenient::opt_string")]
    pub date_created: Option<String>,
    #[serde(deserialize_with = "lenient::opt_int")]
    pub total_sales: Option<i64>,
    #[serde(deserialize_with = "lenient::null_default")]
    pub attributes: Vec<ProductAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductImage {
    #[serde(deserialize_with = "lenient::string")]
    pub src: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductCategory {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAttribute {
    #[serde(deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(deserialize_with = "lenient::null_default")]
    pub options: Vec<String>,
}

// =============================================================================
// Stats and sync
// =============================================================================

/// Aggregate counts for the dashboard header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardStats {
    #[serde(deserialize_with = "lenient::opt_object")]
    pub subscriptions: Option<SubscriptionTotals>,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub customers: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub orders: Option<u64>,
    #[serde(deserialize_with = "lenient::opt_count")]
    pub products: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionTotals {
    #[serde(deserialize_with = "lenient::count")]
    pub total: u64,
    #[serde(rename = "byStatus", deserialize_with = "lenient::null_default")]
    pub by_status: BTreeMap<String, u64>,
}

/// Recent sync runs between `WooCommerce` and the edge database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncStatus {
    #[serde(deserialize_with = "lenient::null_default")]
    pub logs: Vec<SyncLog>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncLog {
    #[serde(deserialize_with = "lenient::string")]
    pub entity_type: String,
    #[serde(deserialize_with = "lenient::count")]
    pub records_synced: u64,
    #[serde(deserialize_with = "lenient::string")]
    pub status: String,
    #[serde(deserialize_with = "lenient::string")]
    pub started_at: String,
}

/// Result of a triggered sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncResult {
    pub success: bool,
    pub synced: BTreeMap<String, u64>,
}

// =============================================================================
// Lenient field deserializers
// =============================================================================

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// String, number or bool as a string; anything else becomes `""`.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(scalar_to_string(value).unwrap_or_default())
    }

    /// Integer from a number or a numeric string. Fractions are truncated.
    #[allow(clippy::cast_possible_truncation)]
    fn scalar_to_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
            }
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Record id from a number or numeric string; anything else is id `0`.
    pub fn id<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: From<i64>,
    {
        Ok(T::from(int(d)?))
    }

    /// Integer from a number or numeric string; anything else is `0`.
    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(scalar_to_i64(&value).unwrap_or_default())
    }

    /// Like [`int`] but unreadable values become `None`.
    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(scalar_to_i64(&value))
    }

    /// Non-negative counter; negative or unreadable values are `0`.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(opt_count(d)?.unwrap_or_default())
    }

    /// Like [`count`] but unreadable values become `None`.
    pub fn opt_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(scalar_to_i64(&value).map(|n| u64::try_from(n).unwrap_or_default()))
    }

    /// Like [`string`] but `null` (and non-scalars) become `None`.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(scalar_to_string(value))
    }

    /// `null` becomes `T::default()`.
    pub fn null_default<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
    }

    /// Only a JSON object decodes to `Some`; `null`, `[]`, `""` and malformed
    /// objects become `None`.
    pub fn opt_object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        match value {
            Value::Object(_) => Ok(serde_json::from_value(value).ok()),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_subscription_deserializes_full_record() {
        let raw = json!({
            "id": 4211,
            "customer_id": 87,
            "status": "active",
            "start_date": "2024-03-01T10:00:00",
            "next_payment_date": "2025-03-01T10:00:00",
            "date_created": "2024-02-28T09:00:00",
            "date_modified": "2024-09-12T08:30:00",
            "total": "149.00",
            "billing": {
                "first_name": "Jan",
                "last_name": "Bakker",
                "email": "jan@example.nl",
                "city": "Utrecht",
                "country": "NL"
            },
            "line_items": [
                {"id": 1, "name": "Gold Membership", "quantity": 1, "price": 149, "total": "149.00"}
            ],
            "auto": {"merk": "Porsche", "model": "911 GT3", "bouwjaar": 2021, "vermogen": 510},
            "goedkeuring": {"status": "approved"}
        });

        let sub: RawSubscription = serde_json::from_value(raw).unwrap();
        assert_eq!(sub.id, SubscriptionId::new(4211));
        assert_eq!(sub.billing.first_name.as_deref(), Some("Jan"));
        assert_eq!(sub.line_items.first().unwrap().price, "149");

        let auto = sub.auto.unwrap();
        assert_eq!(auto.bouwjaar.as_deref(), Some("2021"));
        assert_eq!(auto.vermogen.as_deref(), Some("510"));
        assert_eq!(sub.goedkeuring.unwrap().status, ApprovalStatus::Approved);
    }

    #[test]
    fn test_subscription_tolerates_nulls_and_php_empty_arrays() {
        let raw = json!({
            "id": 7,
            "status": null,
            "billing": null,
            "line_items": null,
            "auto": [],
            "goedkeuring": ""
        });

        let sub: RawSubscription = serde_json::from_value(raw).unwrap();
        assert_eq!(sub.status, "");
        assert_eq!(sub.billing, BillingInfo::default());
        assert!(sub.line_items.is_empty());
        assert!(sub.auto.is_none());
        assert!(sub.goedkeuring.is_none());
    }

    #[test]
    fn test_ids_accept_strings_and_null() {
        let raw = json!({
            "id": "4211",
            "customer_id": null,
            "line_items": [
                {"id": null, "name": "Gold Membership", "quantity": "2"},
                {"id": " 18 ", "quantity": 1.0}
            ]
        });

        let sub: RawSubscription = serde_json::from_value(raw).unwrap();
        assert_eq!(sub.id, SubscriptionId::new(4211));
        assert_eq!(sub.customer_id, CustomerId::new(0));
        assert_eq!(sub.line_items[0].id, LineItemId::new(0));
        assert_eq!(sub.line_items[0].quantity, 2);
        assert_eq!(sub.line_items[1].id, LineItemId::new(18));
        assert_eq!(sub.line_items[1].quantity, 1);
    }

    #[test]
    fn test_unreadable_ids_fall_back_to_zero() {
        let order: RawOrder = serde_json::from_value(json!({"id": "n/a"})).unwrap();
        assert_eq!(order.id, OrderId::new(0));

        let product: RawProduct = serde_json::from_value(json!({
            "id": "310",
            "stock_quantity": "12",
            "total_sales": null
        }))
        .unwrap();
        assert_eq!(product.id, ProductId::new(310));
        assert_eq!(product.stock_quantity, Some(12));
        assert_eq!(product.total_sales, None);
    }

    #[test]
    fn test_counters_accept_strings() {
        let status: SyncStatus = serde_json::from_value(json!({
            "logs": [
                {"entity_type": "orders", "records_synced": "42", "status": "success"},
                {"entity_type": "products", "records_synced": null},
                {"entity_type": "customers", "records_synced": -3}
            ]
        }))
        .unwrap();
        let synced: Vec<u64> = status.logs.iter().map(|l| l.records_synced).collect();
        assert_eq!(synced, vec![42, 0, 0]);

        let stats: DashboardStats =
            serde_json::from_value(json!({"orders": "512", "customers": null})).unwrap();
        assert_eq!(stats.orders, Some(512));
        assert_eq!(stats.customers, None);
    }

    #[test]
    fn test_empty_object_is_a_default_subscription() {
        let sub: RawSubscription = serde_json::from_value(json!({})).unwrap();
        assert_eq!(sub, RawSubscription::default());
    }

    #[test]
    fn test_product_deserializes_event() {
        let raw = json!({
            "id": 310,
            "name": "Summer Meet 2024",
            "price": "25.00",
            "stock_status": "instock",
            "stock_quantity": 40,
            "images": [{"src": "https://cdn.example.nl/meet.jpg"}],
            "categories": [{"name": "Events"}],
            "attributes": [{"name": "Datum", "options": ["2024-07-14"]}]
        });

        let product: RawProduct = serde_json::from_value(raw).unwrap();
        assert_eq!(product.stock_status, StockStatus::InStock);
        assert_eq!(product.images.len(), 1);
        assert_eq!(product.attributes.first().unwrap().options, vec!["2024-07-14"]);
    }

    #[test]
    fn test_dashboard_stats_by_status_key() {
        let raw = json!({
            "subscriptions": {"total": 120, "byStatus": {"active": 100, "on-hold": 20}},
            "orders": 512
        });

        let stats: DashboardStats = serde_json::from_value(raw).unwrap();
        let subs = stats.subscriptions.unwrap();
        assert_eq!(subs.total, 120);
        assert_eq!(subs.by_status.get("on-hold"), Some(&20));
        assert_eq!(stats.orders, Some(512));
        assert_eq!(stats.customers, None);
    }
}
