//! Paginated list commands.

use streetgasm_core::analytics::filter_events;
use streetgasm_core::{ActivityKind, ListParams, Paginated, RawProduct, SubscriptionId};
use streetgasm_dashboard::{AppState, DashboardError};

use super::print_json;

pub async fn members(state: &AppState, params: &ListParams) -> Result<(), DashboardError> {
    print_json(&state.query().members(params).await?)
}

/// Show one member and record the view in the activity log.
pub async fn member(state: &AppState, id: i64) -> Result<(), DashboardError> {
    let id = SubscriptionId::new(id);
    let member = state
        .query()
        .member(id)
        .await?
        .ok_or_else(|| DashboardError::NotFound(format!("member {id}")))?;

    state
        .aux()
        .log_activity(
            state.user_id(),
            ActivityKind::View,
            &format!("Viewed member: {}", member.name),
            Some(&serde_json::json!({ "member_id": id })),
        )
        .await;

    print_json(&member)
}

pub async fn subscriptions(state: &AppState, params: &ListParams) -> Result<(), DashboardError> {
    print_json(&state.query().subscriptions(params).await?)
}

pub async fn orders(state: &AppState, params: &ListParams) -> Result<(), DashboardError> {
    print_json(&state.query().orders(params).await?)
}

pub async fn events(state: &AppState, params: &ListParams) -> Result<(), DashboardError> {
    let page = state.query().products(params).await?;
    print_json(&narrow_events(page, params.search.as_deref()))
}

/// Keep the events whose name matches `search`. Not every backend applies
/// `search` to products; the counters are left as the backend sent them.
fn narrow_events(mut page: Paginated<RawProduct>, search: Option<&str>) -> Paginated<RawProduct> {
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        page.data = filter_events(&page.data, search.trim())
            .into_iter()
            .cloned()
            .collect();
    }
    page
}

pub async fn customers(state: &AppState, params: &ListParams) -> Result<(), DashboardError> {
    print_json(&state.query().gateway().list_customers(params).await?)
}
