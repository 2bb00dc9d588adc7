//! Auxiliary store commands: approvals, favorites, activity and preferences.
//!
//! The store never fails; writes report `{"ok": false}` when they did not
//! go through.

use serde_json::json;

use streetgasm_core::{ActivityKind, ApprovalStatus, CustomerId, SubscriptionId};
use streetgasm_dashboard::aux_store::{PreferencesPatch, RowId};
use streetgasm_dashboard::{AppState, DashboardError};

use super::print_json;

fn warn_if_disabled(state: &AppState) {
    if !state.aux().is_enabled() {
        tracing::warn!("Auxiliary store is not configured (SG_AUX_URL, SG_AUX_ANON_KEY)");
    }
}

pub async fn pending_approvals(state: &AppState) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    print_json(&state.aux().pending_approvals().await)
}

pub async fn process_approval(
    state: &AppState,
    id: &RowId,
    status: ApprovalStatus,
    notes: Option<&str>,
) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    let ok = state
        .aux()
        .process_approval(state.user_id(), id, status, notes)
        .await;
    print_json(&json!({ "id": id, "status": status, "ok": ok }))
}

pub async fn set_approval_status(
    state: &AppState,
    customer_id: i64,
    status: ApprovalStatus,
    notes: Option<&str>,
) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    let customer_id = CustomerId::new(customer_id);
    let ok = state
        .aux()
        .set_member_approval_status(state.user_id(), customer_id, status, notes)
        .await;
    print_json(&json!({ "customerId": customer_id, "status": status, "ok": ok }))
}

pub async fn favorites(state: &AppState) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    print_json(&state.aux().favorites(state.user_id()).await)
}

pub async fn toggle_favorite(state: &AppState, member_id: i64) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    let member_id = SubscriptionId::new(member_id);
    let ok = state.aux().toggle_favorite(state.user_id(), member_id).await;
    print_json(&json!({ "memberId": member_id, "ok": ok }))
}

pub async fn activity(state: &AppState, limit: u32) -> Result<(), DashboardError> {
    warn_if_disabled(state);
    print_json(&state.aux().activity_log(state.user_id(), limit).await)
}

pub async fn preferences(state: &AppState) -> Result<(), DashboardError> {
    print_json(&state.aux().preferences(state.user_id()).await)
}

pub async fn save_preferences(
    state: &AppState,
    patch: &PreferencesPatch,
) -> Result<(), DashboardError> {
    if patch.is_empty() {
        return Err(DashboardError::BadRequest(
            "nothing to update, pass at least one preference".to_string(),
        ));
    }
    warn_if_disabled(state);

    let aux = state.aux();
    let ok = aux.save_preferences(state.user_id(), patch).await;
    if ok {
        aux.log_activity(state.user_id(), ActivityKind::Edit, "Updated preferences", None)
            .await;
    }
    print_json(&json!({ "ok": ok, "preferences": aux.preferences(state.user_id()).await }))
}
