use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Live market data for the $NSI memecoin. Ephemeral, cached for a few
/// minutes, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub symbol: String,
    pub name: String,
    pub price: String,
    pub price_change24h: String,
    pub liquidity: String,
    pub volume24h: String,
    pub market_cap: String,
    pub pair_address: String,
    pub dex_id: String,
}

/// Metadata for a single token of the NFT book. Ephemeral, 1-hour cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookMetadata {
    pub title: String,
    pub description: String,
    pub author: String,
    #[serde(rename = "imageURI")]
    pub image_uri: String,
    #[serde(rename = "contentURI")]
    pub content_uri: String,
    #[serde(rename = "additionalData")]
    pub additional_data: serde_json::Value,
}

/// Collection-level info for the NFT book contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionInfo {
    pub name: String,
    pub description: String,
    pub creator: String,
    pub image: String,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    pub chain: String,
}

/// Where and how to reach a frame user with push notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDetails {
    pub url: String,
    pub token: String,
}

/// A frame user who opted into notifications. Lives in process memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub fid: i64,
    #[serde(rename = "notificationDetails")]
    pub notification_details: NotificationDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub wallet_address: String,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// Bearer credential substitute derived from a wallet signature. One active
/// row per wallet.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VerificationToken {
    pub wallet_address: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Unknown or missing role strings read as `member`.
    pub fn from_db(value: Option<&str>) -> Role {
        match value {
            Some("admin") => Role::Admin,
            Some("moderator") => Role::Moderator,
            _ => Role::Member,
        }
    }
}

/// Server-verified NFT/token ownership flags, refreshed from chain state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssetStatus {
    pub user_id: Uuid,
    pub has_nft_access: bool,
    pub has_token_access: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub title: Option<String>,
    pub content: String,
    pub user_id: Uuid,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post row joined with its author and comment count, as listed in the forum.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PostWithAuthor {
    pub id: i64,
    pub title: Option<String>,
    pub content: String,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_wallet: String,
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub post_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_wallet: String,
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
}
