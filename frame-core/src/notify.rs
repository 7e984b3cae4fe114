use chrono::Utc;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::models::{BookMetadata, NotificationDetails, Subscriber, TokenData};

/// A push notification delivered to a frame user's notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNotification {
    pub notification_id: String,
    pub title: String,
    pub body: String,
    pub target_url: String,
}

/// Event kinds relayed to external platforms, with the Discord embed colors
/// the original deployment used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    FrameAdded,
    FrameRemoved,
    NotificationsEnabled,
    NotificationsDisabled,
    CustomNotification,
}

impl RelayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayKind::FrameAdded => "frame_added",
            RelayKind::FrameRemoved => "frame_removed",
            RelayKind::NotificationsEnabled => "notifications_enabled",
            RelayKind::NotificationsDisabled => "notifications_disabled",
            RelayKind::CustomNotification => "custom_notification",
        }
    }

    pub fn discord_color(&self) -> u32 {
        match self {
            RelayKind::FrameAdded => 3_066_993,            // green
            RelayKind::FrameRemoved => 15_158_332,         // red
            RelayKind::NotificationsEnabled => 3_447_003,  // blue
            RelayKind::NotificationsDisabled => 10_181_046, // purple
            RelayKind::CustomNotification => 15_844_367,   // yellow
        }
    }
}

/// Whether a 24h price move is big enough to alert subscribers.
pub fn should_alert(price_change24h: &str, threshold_pct: f64) -> bool {
    match price_change24h.parse::<f64>() {
        Ok(change) => change.abs() >= threshold_pct,
        Err(_) => false,
    }
}

pub fn price_alert(token: &TokenData, frame_base_url: &str, now_ms: i64) -> FrameNotification {
    let change = token.price_change24h.parse::<f64>().unwrap_or(0.0);

    let (alert_type, title, body) = if change >= 0.0 {
        (
            "price-up",
            "🚀 NSI Price Rising!".to_string(),
            format!("Price up {:.2}% in 24h", change.abs()),
        )
    } else {
        (
            "price-down",
            "📉 NSI Price Falling".to_string(),
            format!("Price down {:.2}% in 24h", change.abs()),
        )
    };

    FrameNotification {
        notification_id: format!("token-price-{alert_type}-{now_ms}"),
        title,
        body,
        target_url: format!("{frame_base_url}/frame?state=token-price"),
    }
}

pub fn book_update(book: &BookMetadata, frame_base_url: &str, now_ms: i64) -> FrameNotification {
    FrameNotification {
        notification_id: format!("book-update-{now_ms}"),
        title: "INEVITABLE Book Update".to_string(),
        body: format!("New content available: {}", book.title),
        target_url: format!("{frame_base_url}/frame?state=book-details"),
    }
}

/// Sends frame notifications and best-effort relays to Discord/Telegram.
/// Relays are active only when their credentials are configured; their
/// failures are logged and never propagated.
pub struct Notifier {
    http: reqwest::Client,
    relay: RelayConfig,
}

impl Notifier {
    pub fn new(http: reqwest::Client, relay: RelayConfig) -> Self {
        Self { http, relay }
    }

    pub async fn send_frame_notification(
        &self,
        details: &NotificationDetails,
        note: &FrameNotification,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "notificationId": note.notification_id,
            "title": note.title,
            "body": note.body,
            "targetUrl": note.target_url,
            "tokens": [details.token],
        });

        self.http
            .post(&details.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Parallel await-all fan-out over every subscriber. Returns the number of
    /// successful deliveries; failures are logged per subscriber.
    pub async fn fan_out(&self, subscribers: &[Subscriber], note: &FrameNotification) -> usize {
        let sends = subscribers
            .iter()
            .map(|s| self.send_frame_notification(&s.notification_details, note));
        let results = futures::future::join_all(sends).await;

        let mut sent = 0;
        for (subscriber, result) in subscribers.iter().zip(results) {
            match result {
                Ok(()) => sent += 1,
                Err(err) => {
                    error!(fid = subscriber.fid, "failed to send frame notification: {err}");
                }
            }
        }

        info!("sent {sent}/{} frame notifications", subscribers.len());
        sent
    }

    /// Relay an event to the configured external platforms. Both sends run
    /// together; either may fail without affecting the caller.
    pub async fn relay(&self, kind: RelayKind, message: &str, fields: &[(&str, String)]) {
        let discord = async {
            if let Some(url) = &self.relay.discord_webhook_url {
                if let Err(err) = self.send_discord(url, kind, message, fields).await {
                    error!("failed to relay to Discord: {err}");
                }
            }
        };

        let telegram = async {
            if let (Some(bot_token), Some(chat_id)) =
                (&self.relay.telegram_bot_token, &self.relay.telegram_chat_id)
            {
                if let Err(err) = self
                    .send_telegram(bot_token, chat_id, kind, message, fields)
                    .await
                {
                    error!("failed to relay to Telegram: {err}");
                }
            }
        };

        tokio::join!(discord, telegram);
    }

    async fn send_discord(
        &self,
        webhook_url: &str,
        kind: RelayKind,
        message: &str,
        fields: &[(&str, String)],
    ) -> Result<()> {
        let embed_fields: Vec<serde_json::Value> = fields
            .iter()
            .map(|(name, value)| {
                serde_json::json!({ "name": name, "value": value, "inline": true })
            })
            .collect();

        let payload = serde_json::json!({
            "embeds": [{
                "title": format!("INEVITABLE Frame: {}", kind.as_str()),
                "description": message,
                "color": kind.discord_color(),
                "timestamp": Utc::now().to_rfc3339(),
                "footer": { "text": "INEVITABLE Frame" },
                "fields": embed_fields,
            }]
        });

        self.http
            .post(webhook_url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }

    async fn send_telegram(
        &self,
        bot_token: &str,
        chat_id: &str,
        kind: RelayKind,
        message: &str,
        fields: &[(&str, String)],
    ) -> Result<()> {
        let mut text = format!("*INEVITABLE Frame: {}*\n\n{message}\n\n", kind.as_str());
        for (name, value) in fields {
            text.push_str(&format!("*{name}*: {value}\n"));
        }
        text.push_str(&format!("\n_{}_", Utc::now().to_rfc3339()));

        let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
        let payload = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });

        self.http
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::fallback_token_data;

    #[test]
    fn test_should_alert_threshold() {
        assert!(should_alert("12.5", 10.0));
        assert!(should_alert("-10.0", 10.0));
        assert!(!should_alert("9.99", 10.0));
        assert!(!should_alert("-4.2", 10.0));
        assert!(!should_alert("garbage", 10.0));
    }

    #[test]
    fn test_price_alert_direction() {
        let mut token = fallback_token_data("0xdead");
        token.price_change24h = "12.34".to_string();
        let up = price_alert(&token, "https://frame.example", 1_700_000_000_000);
        assert_eq!(up.title, "🚀 NSI Price Rising!");
        assert_eq!(up.body, "Price up 12.34% in 24h");
        assert_eq!(
            up.notification_id,
            "token-price-price-up-1700000000000"
        );
        assert_eq!(up.target_url, "https://frame.example/frame?state=token-price");

        token.price_change24h = "-11.00".to_string();
        let down = price_alert(&token, "https://frame.example", 1_700_000_000_000);
        assert_eq!(down.title, "📉 NSI Price Falling");
        assert_eq!(down.body, "Price down 11.00% in 24h");
        assert!(down.notification_id.starts_with("token-price-price-down-"));
    }

    #[test]
    fn test_book_update_notification() {
        let metadata = crate::metadata::fallback_metadata();
        let note = book_update(&metadata, "https://frame.example", 1);

        assert_eq!(note.notification_id, "book-update-1");
        assert_eq!(note.title, "INEVITABLE Book Update");
        assert!(note.body.starts_with("New content available: INEVITABLE"));
        assert_eq!(note.target_url, "https://frame.example/frame?state=book-details");
    }

    #[test]
    fn test_relay_kind_colors_match_event_names() {
        assert_eq!(RelayKind::FrameAdded.discord_color(), 3_066_993);
        assert_eq!(RelayKind::FrameRemoved.discord_color(), 15_158_332);
        assert_eq!(RelayKind::NotificationsEnabled.as_str(), "notifications_enabled");
        assert_eq!(RelayKind::CustomNotification.discord_color(), 15_844_367);
    }
}
