//! Aggregations over an already-fetched page of records.
//!
//! Everything here is a pure function of its input. Callers fetch a page
//! (typically 100 records) and summarize it; nothing is recomputed from a
//! complete local copy of the backend.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::member::Member;
use crate::records::{RawOrder, RawProduct, RawSubscription};
use crate::types::{SubscriptionStatus, parse_amount};

/// Window used for "this month" figures.
pub const RECENT_WINDOW_DAYS: i64 = 30;

/// Number of entries in the top-country and top-city lists.
pub const TOP_LOCATIONS: usize = 10;

/// Label used when a member has no city or country.
pub const UNKNOWN_LOCATION: &str = "Unknown";

// =============================================================================
// Club analytics
// =============================================================================

/// Headline figures for the analytics view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubAnalytics {
    pub total_members: usize,
    pub active_members: usize,
    pub new_members_this_month: usize,
    pub order_count: usize,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub average_order_value: Decimal,
    pub status_breakdown: Vec<StatusShare>,
}

/// Share of subscriptions in one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusShare {
    pub status: SubscriptionStatus,
    pub count: usize,
    pub percentage: f64,
}

/// Statuses shown in the breakdown, in display order.
const BREAKDOWN_STATUSES: [SubscriptionStatus; 4] = [
    SubscriptionStatus::Active,
    SubscriptionStatus::OnHold,
    SubscriptionStatus::Cancelled,
    SubscriptionStatus::Pending,
];

/// Summarize a page of subscriptions and a page of orders.
///
/// Order totals that do not parse are skipped. Dates that do not parse never
/// count as recent.
#[must_use]
pub fn club_analytics(
    subscriptions: &[RawSubscription],
    orders: &[RawOrder],
    now: DateTime<Utc>,
) -> ClubAnalytics {
    let since = now - Duration::days(RECENT_WINDOW_DAYS);
    let is_recent = |date: Option<&str>| {
        date.and_then(parse_timestamp)
            .is_some_and(|ts| ts > since)
    };

    let statuses: Vec<SubscriptionStatus> = subscriptions
        .iter()
        .map(|s| SubscriptionStatus::from(s.status.as_str()))
        .collect();

    let active_members = statuses
        .iter()
        .filter(|s| **s == SubscriptionStatus::Active)
        .count();

    let new_members_this_month = subscriptions
        .iter()
        .filter(|s| is_recent(s.start_date.as_deref()))
        .count();

    let order_total = |o: &RawOrder| o.total.as_deref().and_then(parse_amount);
    let total_revenue: Decimal = orders.iter().filter_map(order_total).sum();
    let monthly_revenue: Decimal = orders
        .iter()
        .filter(|o| is_recent(o.date_created.as_deref()))
        .filter_map(order_total)
        .sum();

    let average_order_value = if orders.is_empty() {
        Decimal::ZERO
    } else {
        (total_revenue / Decimal::from(orders.len())).round_dp(2)
    };

    let status_breakdown = BREAKDOWN_STATUSES
        .iter()
        .map(|status| {
            let count = statuses.iter().filter(|s| *s == status).count();
            StatusShare {
                status: status.clone(),
                count,
                percentage: percentage(count, subscriptions.len()),
            }
        })
        .collect();

    ClubAnalytics {
        total_members: subscriptions.len(),
        active_members,
        new_members_this_month,
        order_count: orders.len(),
        total_revenue,
        monthly_revenue,
        average_order_value,
        status_breakdown,
    }
}

#[allow(clippy::cast_precision_loss)] // Page sizes are far below f64 precision
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00Z`), `WooCommerce` local timestamps
/// without offset (`2024-03-01T10:00:00`, read as UTC), and plain dates.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Network (member distribution)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationCount {
    pub label: String,
    pub count: usize,
}

/// Where members live and what they drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub total_members: usize,
    pub country_count: usize,
    pub city_count: usize,
    pub top_countries: Vec<LocationCount>,
    pub top_cities: Vec<LocationCount>,
    pub brands: Vec<String>,
}

#[must_use]
pub fn network_summary(members: &[Member]) -> NetworkSummary {
    let countries = count_by(members, |m| &m.location.country);
    let cities = count_by(members, |m| &m.location.city);

    NetworkSummary {
        total_members: members.len(),
        country_count: countries.len(),
        city_count: cities.len(),
        top_countries: top_locations(countries),
        top_cities: top_locations(cities),
        brands: unique_brands(members),
    }
}

fn count_by<'a, F>(members: &'a [Member], key: F) -> BTreeMap<&'a str, usize>
where
    F: Fn(&'a Member) -> &'a String,
{
    let mut counts = BTreeMap::new();
    for member in members {
        let label = key(member).trim();
        let label = if label.is_empty() {
            UNKNOWN_LOCATION
        } else {
            label
        };
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Highest counts first; ties keep alphabetical order.
fn top_locations(counts: BTreeMap<&str, usize>) -> Vec<LocationCount> {
    let mut entries: Vec<LocationCount> = counts
        .into_iter()
        .map(|(label, count)| LocationCount {
            label: label.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_LOCATIONS);
    entries
}

/// Distinct car brands, sorted.
#[must_use]
pub fn unique_brands(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .filter_map(Member::car_brand)
        .filter(|b| !b.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Members whose name or city contains `search` (case-insensitive), and whose
/// car brand equals `brand` when one is given.
#[must_use]
pub fn filter_network<'a>(
    members: &'a [Member],
    search: &str,
    brand: Option<&str>,
) -> Vec<&'a Member> {
    let needle = search.to_lowercase();
    members
        .iter()
        .filter(|m| {
            contains_ci(&m.name, &needle) || contains_ci(&m.location.city, &needle)
        })
        .filter(|m| matches_brand(m, brand))
        .collect()
}

// =============================================================================
// Garage (vehicles)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarageSummary {
    pub vehicle_count: usize,
    pub brands: Vec<String>,
    pub average_power: u32,
}

#[must_use]
pub fn garage_summary(members: &[Member]) -> GarageSummary {
    let cars: Vec<_> = members.iter().filter_map(|m| m.car.as_ref()).collect();
    let total_power: u64 = cars
        .iter()
        .filter_map(|car| car.power_hp())
        .map(u64::from)
        .sum();

    let average_power = if cars.is_empty() {
        0
    } else {
        let count = cars.len() as u64;
        u32::try_from((total_power + count / 2) / count).unwrap_or(u32::MAX)
    };

    GarageSummary {
        vehicle_count: cars.len(),
        brands: unique_brands(members),
        average_power,
    }
}

/// Members with a car whose name, brand or model contains `search`
/// (case-insensitive), and whose brand equals `brand` when one is given.
#[must_use]
pub fn filter_garage<'a>(
    members: &'a [Member],
    search: &str,
    brand: Option<&str>,
) -> Vec<&'a Member> {
    let needle = search.to_lowercase();
    members
        .iter()
        .filter(|m| {
            m.car.as_ref().is_some_and(|car| {
                contains_ci(&m.name, &needle)
                    || contains_ci(&car.brand, &needle)
                    || contains_ci(&car.model, &needle)
            })
        })
        .filter(|m| matches_brand(m, brand))
        .collect()
}

// =============================================================================
// Events
// =============================================================================

/// Events whose name contains `search` (case-insensitive).
#[must_use]
pub fn filter_events<'a>(products: &'a [RawProduct], search: &str) -> Vec<&'a RawProduct> {
    let needle = search.to_lowercase();
    products
        .iter()
        .filter(|p| contains_ci(&p.name, &needle))
        .collect()
}

fn contains_ci(haystack: &str, lowercase_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowercase_needle)
}

fn matches_brand(member: &Member, brand: Option<&str>) -> bool {
    match brand.filter(|b| !b.is_empty()) {
        Some(brand) => member.car_brand() == Some(brand),
        None => true,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 1, 12, 0, 0).unwrap()
    }

    fn sub(value: serde_json::Value) -> RawSubscription {
        serde_json::from_value(value).unwrap()
    }

    fn order(value: serde_json::Value) -> RawOrder {
        serde_json::from_value(value).unwrap()
    }

    fn member(value: serde_json::Value) -> Member {
        Member::from_subscription(&sub(value))
    }

    #[test]
    fn test_club_analytics_counts_and_revenue() {
        let subs = vec![
            sub(json!({"id": 1, "status": "active", "start_date": "2024-09-20T10:00:00"})),
            sub(json!({"id": 2, "status": "active", "start_date": "2023-01-01T10:00:00"})),
            sub(json!({"id": 3, "status": "on-hold", "start_date": "2024-09-29"})),
            sub(json!({"id": 4, "status": "cancelled"})),
        ];
        let orders = vec![
            order(json!({"id": 10, "total": "100.00", "date_created": "2024-09-15T09:00:00"})),
            order(json!({"id": 11, "total": "50.50", "date_created": "2024-01-15T09:00:00"})),
            order(json!({
                "id": 12,
                "total": "not-a-number",
                "date_created": "2024-09-30T09:00:00"
            })),
        ];

        let analytics = club_analytics(&subs, &orders, now());
        assert_eq!(analytics.total_members, 4);
        assert_eq!(analytics.active_members, 2);
        assert_eq!(analytics.new_members_this_month, 2);
        assert_eq!(analytics.order_count, 3);
        assert_eq!(analytics.total_revenue, Decimal::new(15050, 2));
        assert_eq!(analytics.monthly_revenue, Decimal::new(10000, 2));
        assert_eq!(analytics.average_order_value, Decimal::new(5017, 2));

        let active = analytics.status_breakdown.first().unwrap();
        assert_eq!(active.status, SubscriptionStatus::Active);
        assert_eq!(active.count, 2);
        assert!((active.percentage - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_club_analytics_empty_input() {
        let analytics = club_analytics(&[], &[], now());
        assert_eq!(analytics.average_order_value, Decimal::ZERO);
        assert!(
            analytics
                .status_breakdown
                .iter()
                .all(|s| s.count == 0 && s.percentage.abs() < f64::EPSILON)
        );
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00+02:00").is_some());
        assert!(parse_timestamp("2024-03-01T10:00:00").is_some());
        assert!(parse_timestamp("2024-03-01 10:00:00").is_some());
        assert!(parse_timestamp("2024-03-01").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    fn located(city: &str, country: &str, brand: &str) -> Member {
        member(json!({
            "billing": {"city": city, "country": country},
            "auto": {"merk": brand}
        }))
    }

    #[test]
    fn test_network_summary_groups_locations() {
        let members = vec![
            located("Utrecht", "NL", "Porsche"),
            located("Utrecht", "NL", "BMW"),
            located("Antwerpen", "BE", "Porsche"),
            member(json!({"billing": {}})),
        ];

        let summary = network_summary(&members);
        assert_eq!(summary.total_members, 4);
        assert_eq!(summary.country_count, 3);
        assert_eq!(summary.city_count, 3);
        assert_eq!(
            summary.top_countries.first().unwrap(),
            &LocationCount {
                label: "NL".to_string(),
                count: 2
            }
        );
        assert!(summary.top_cities.iter().any(|c| c.label == "Unknown"));
        assert_eq!(summary.brands, vec!["BMW", "Porsche"]);
    }

    #[test]
    fn test_top_locations_truncates_to_ten() {
        let members: Vec<Member> = (0..15)
            .map(|i| member(json!({"billing": {"city": format!("City {i:02}")}})))
            .collect();
        let summary = network_summary(&members);
        assert_eq!(summary.city_count, 15);
        assert_eq!(summary.top_cities.len(), TOP_LOCATIONS);
        assert_eq!(summary.top_cities.first().unwrap().label, "City 00");
    }

    #[test]
    fn test_filter_network_by_search_and_brand() {
        let members = vec![
            member(json!({
                "billing": {"first_name": "Jan", "city": "Utrecht"},
                "auto": {"merk": "Porsche"}
            })),
            member(json!({
                "billing": {"first_name": "Eva", "city": "Amsterdam"},
                "auto": {"merk": "BMW"}
            })),
            member(json!({"billing": {"first_name": "Piet", "city": "Utrecht"}})),
        ];

        assert_eq!(filter_network(&members, "", None).len(), 3);
        assert_eq!(filter_network(&members, "UTRECHT", None).len(), 2);
        assert_eq!(filter_network(&members, "utrecht", Some("Porsche")).len(), 1);
        assert_eq!(filter_network(&members, "eva", Some("")).len(), 1);
    }

    #[test]
    fn test_garage_summary_and_filter() {
        let members = vec![
            member(json!({
                "billing": {"first_name": "Jan"},
                "auto": {"merk": "Porsche", "model": "911", "vermogen": 510}
            })),
            member(json!({
                "billing": {"first_name": "Eva"},
                "auto": {"merk": "BMW", "model": "M3", "vermogen": "473 pk"}
            })),
            member(json!({"billing": {"first_name": "Kees"}, "auto": {"merk": "Lotus"}})),
            member(json!({"billing": {"first_name": "Piet"}})),
        ];

        let summary = garage_summary(&members);
        assert_eq!(summary.vehicle_count, 3);
        assert_eq!(summary.brands, vec!["BMW", "Lotus", "Porsche"]);
        assert_eq!(summary.average_power, 328);

        assert_eq!(filter_garage(&members, "", None).len(), 3);
        assert_eq!(filter_garage(&members, "m3", None).len(), 1);
        assert_eq!(filter_garage(&members, "piet", None).len(), 0);
        assert_eq!(filter_garage(&members, "", Some("Porsche")).len(), 1);
    }

    #[test]
    fn test_garage_summary_without_cars() {
        let summary = garage_summary(&[member(json!({}))]);
        assert_eq!(summary.vehicle_count, 0);
        assert_eq!(summary.average_power, 0);
    }

    #[test]
    fn test_filter_events() {
        let products: Vec<RawProduct> = vec![
            serde_json::from_value(json!({"id": 1, "name": "Summer Meet 2024"})).unwrap(),
            serde_json::from_value(json!({"id": 2, "name": "Track Day Zandvoort"})).unwrap(),
        ];
        assert_eq!(filter_events(&products, "meet").len(), 1);
        assert_eq!(filter_events(&products, "").len(), 2);
    }
}
