//! Aggregate views: stats, overview, analytics, network, garage and sync.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use streetgasm_core::analytics::{
    ClubAnalytics, GarageSummary, NetworkSummary, club_analytics, filter_garage, filter_network,
    garage_summary, network_summary,
};
use streetgasm_core::{ListParams, Member, SubscriptionStatus, SyncEntity, format_eur};
use streetgasm_dashboard::{AppState, DashboardError};

use super::print_json;

/// Records fetched for analytics-style views.
const ANALYTICS_PAGE_SIZE: u32 = 100;

pub async fn stats(state: &AppState) -> Result<(), DashboardError> {
    let query = state.query();
    let stats = query.stats().await?;
    let by_status: serde_json::Map<String, serde_json::Value> = query
        .subscription_status_counts()
        .await?
        .into_iter()
        .map(|(status, count)| (status.to_string(), json!(count)))
        .collect();

    print_json(&json!({ "stats": stats, "subscriptionsByStatus": by_status }))
}

pub async fn dashboard(state: &AppState) -> Result<(), DashboardError> {
    let snapshot = state.query().dashboard_snapshot().await;
    if snapshot.has_errors() {
        tracing::warn!("Some dashboard regions failed to load");
    }
    print_json(&snapshot)
}

pub async fn analytics(state: &AppState) -> Result<(), DashboardError> {
    let query = state.query();
    let params = ListParams::new().page(1).per_page(ANALYTICS_PAGE_SIZE);
    let (subscriptions, orders) =
        tokio::join!(query.subscriptions(&params), query.orders(&params));

    let analytics = club_analytics(&subscriptions?.data, &orders?.data, Utc::now());
    print_json(&AnalyticsView::from(analytics))
}

/// Analytics plus the revenue figures formatted for display.
#[derive(Serialize)]
struct AnalyticsView {
    #[serde(flatten)]
    analytics: ClubAnalytics,
    formatted: RevenueLabels,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct RevenueLabels {
    total_revenue: String,
    monthly_revenue: String,
    average_order_value: String,
}

impl From<ClubAnalytics> for AnalyticsView {
    fn from(analytics: ClubAnalytics) -> Self {
        let formatted = RevenueLabels {
            total_revenue: format_eur(analytics.total_revenue),
            monthly_revenue: format_eur(analytics.monthly_revenue),
            average_order_value: format_eur(analytics.average_order_value),
        };
        Self {
            analytics,
            formatted,
        }
    }
}

#[derive(Serialize)]
struct MemberView<'a, S> {
    summary: S,
    members: Vec<MemberCard<'a>>,
}

#[derive(Serialize)]
struct MemberCard<'a> {
    #[serde(flatten)]
    member: &'a Member,
    initials: String,
}

fn member_cards(members: Vec<&Member>) -> Vec<MemberCard<'_>> {
    members
        .into_iter()
        .map(|member| MemberCard {
            initials: member.initials(),
            member,
        })
        .collect()
}

async fn active_members(state: &AppState) -> Result<Vec<Member>, DashboardError> {
    let params = ListParams::new()
        .status(SubscriptionStatus::Active.as_str())
        .page(1)
        .per_page(ANALYTICS_PAGE_SIZE);
    Ok(state.query().members(&params).await?.data)
}

pub async fn network(
    state: &AppState,
    search: &str,
    brand: Option<&str>,
) -> Result<(), DashboardError> {
    let members = active_members(state).await?;
    let view: MemberView<'_, NetworkSummary> = MemberView {
        summary: network_summary(&members),
        members: member_cards(filter_network(&members, search, brand)),
    };
    print_json(&view)
}

pub async fn garage(
    state: &AppState,
    search: &str,
    brand: Option<&str>,
) -> Result<(), DashboardError> {
    let members = active_members(state).await?;
    let view: MemberView<'_, GarageSummary> = MemberView {
        summary: garage_summary(&members),
        members: member_cards(filter_garage(&members, search, brand)),
    };
    print_json(&view)
}

pub async fn sync(state: &AppState, entity: SyncEntity) -> Result<(), DashboardError> {
    tracing::info!(%entity, "Triggering sync");
    let result = state.query().trigger_sync(entity).await?;
    if !result.success {
        tracing::warn!(%entity, "Backend reported an unsuccessful sync");
    }
    print_json(&result)
}

pub async fn sync_status(state: &AppState) -> Result<(), DashboardError> {
    print_json(&state.query().gateway().sync_status().await?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use streetgasm_core::{RawSubscription, parse_amount};

    use super::*;

    #[test]
    fn test_analytics_view_formats_revenue() {
        let mut analytics = club_analytics(&[], &[], Utc::now());
        analytics.total_revenue = parse_amount("1234.56").unwrap();
        analytics.average_order_value = parse_amount("149").unwrap();

        let value = serde_json::to_value(AnalyticsView::from(analytics)).unwrap();
        assert_eq!(value["formatted"]["totalRevenue"], "€ 1.234,56");
        assert_eq!(value["formatted"]["monthlyRevenue"], "€ 0,00");
        assert_eq!(value["formatted"]["averageOrderValue"], "€ 149,00");
        assert!(value.get("total_revenue").is_some());
    }

    #[test]
    fn test_member_cards_carry_initials() {
        let sub: RawSubscription = serde_json::from_value(json!({
            "id": 1,
            "status": "active",
            "billing": {"first_name": "jan", "last_name": "van Bakker"}
        }))
        .unwrap();
        let member = Member::from_subscription(&sub);

        let cards = member_cards(vec![&member]);
        let value = serde_json::to_value(&cards).unwrap();
        assert_eq!(value[0]["initials"], "JV");
        assert_eq!(value[0]["name"], "jan van Bakker");
    }
}
