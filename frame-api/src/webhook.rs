use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use frame_core::models::NotificationDetails;
use frame_core::notify::RelayKind;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload {
    event: Option<String>,
    trusted_data: Option<TrustedData>,
    notification_details: Option<NotificationDetails>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TrustedData {
    fid: Option<i64>,
}

/// Farcaster frame webhook: mutates the in-memory subscriber registry and
/// relays each event to the configured external platforms. Unknown events are
/// a 400, an unparseable body is a 500.
pub async fn handle_webhook(State(state): State<SharedState>, body: String) -> Response {
    let payload: WebhookPayload = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            error!("error processing webhook: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response();
        }
    };

    let event = payload.event.clone();
    match event.as_deref() {
        Some("frame_added") => {
            subscribe(
                &state,
                payload,
                RelayKind::FrameAdded,
                "🎉 New user added the INEVITABLE Frame!",
            )
            .await
        }
        Some("notifications_enabled") => {
            subscribe(
                &state,
                payload,
                RelayKind::NotificationsEnabled,
                "User enabled notifications.",
            )
            .await
        }
        Some("frame_removed") => {
            unsubscribe(
                &state,
                payload,
                RelayKind::FrameRemoved,
                "User removed the INEVITABLE Frame.",
            )
            .await
        }
        Some("notifications_disabled") => {
            unsubscribe(
                &state,
                payload,
                RelayKind::NotificationsDisabled,
                "User disabled notifications.",
            )
            .await
        }
        Some("custom_notification") => {
            let message = payload
                .message
                .unwrap_or_else(|| "Custom notification received".to_string());
            state
                .notifier
                .relay(RelayKind::CustomNotification, &message, &[])
                .await;
            success()
        }
        other => {
            info!("unknown webhook event type: {:?}", other);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Unknown event type" })),
            )
                .into_response()
        }
    }
}

/// Payloads without a fid or notification details are acknowledged without
/// mutating the registry.
async fn subscribe(
    state: &SharedState,
    payload: WebhookPayload,
    kind: RelayKind,
    message: &str,
) -> Response {
    let fid = payload.trusted_data.as_ref().and_then(|data| data.fid);

    if let (Some(fid), Some(details)) = (fid, payload.notification_details) {
        state.subscribers.upsert(fid, details);
        info!(fid, count = state.subscribers.len(), "subscriber added");

        state
            .notifier
            .relay(kind, &format!("{message} FID: {fid}"), &[("fid", fid.to_string())])
            .await;
    }

    success()
}

async fn unsubscribe(
    state: &SharedState,
    payload: WebhookPayload,
    kind: RelayKind,
    message: &str,
) -> Response {
    if let Some(fid) = payload.trusted_data.as_ref().and_then(|data| data.fid) {
        state.subscribers.remove(fid);
        info!(fid, count = state.subscribers.len(), "subscriber removed");

        state
            .notifier
            .relay(kind, &format!("{message} FID: {fid}"), &[("fid", fid.to_string())])
            .await;
    }

    success()
}

fn success() -> Response {
    Json(json!({ "success": true })).into_response()
}
