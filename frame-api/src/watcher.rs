use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use frame_core::notify;
use serde::Serialize;
use tracing::info;

use crate::state::SharedState;

/// Periodic token price check. When the 24h move crosses the configured
/// threshold, every subscriber gets a price alert.
pub async fn run(state: SharedState) {
    let mut interval = tokio::time::interval(Duration::from_secs(state.config.alerts.poll_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let sent = run_price_check(&state).await;
        if sent > 0 {
            info!("price watcher delivered {sent} notifications");
        }
    }
}

pub async fn run_price_check(state: &SharedState) -> usize {
    let token = state.price.fetch_token_data().await;

    if !notify::should_alert(
        &token.price_change24h,
        state.config.alerts.change_threshold_pct,
    ) {
        return 0;
    }

    let subscribers = state.subscribers.all();
    if subscribers.is_empty() {
        return 0;
    }

    let note = notify::price_alert(
        &token,
        &state.config.alerts.frame_base_url,
        Utc::now().timestamp_millis(),
    );
    state.notifier.fan_out(&subscribers, &note).await
}

#[derive(Debug, Serialize)]
pub struct PriceCheckResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "notificationsSent")]
    pub notifications_sent: usize,
}

/// Manual trigger for the scheduled check.
pub async fn price_check(State(state): State<SharedState>) -> Json<PriceCheckResponse> {
    let sent = run_price_check(&state).await;
    Json(PriceCheckResponse {
        success: true,
        message: "Price check completed".to_string(),
        notifications_sent: sent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    #[tokio::test]
    async fn test_price_check_below_threshold_sends_nothing() {
        // The unroutable price endpoint forces the fallback record, whose
        // 5.2% move sits below the 10% threshold.
        let state = test_state();
        assert_eq!(run_price_check(&state).await, 0);
    }

    #[tokio::test]
    async fn test_price_check_without_subscribers_sends_nothing() {
        let state = test_state();
        assert!(state.subscribers.is_empty());
        assert_eq!(run_price_check(&state).await, 0);
    }
}
