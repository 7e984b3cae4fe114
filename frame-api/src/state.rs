use std::sync::Arc;

use frame_core::assets::ChainClient;
use frame_core::config::FrameConfig;
use frame_core::metadata::BookClient;
use frame_core::notify::Notifier;
use frame_core::price::PriceClient;
use frame_core::subscribers::SubscriberRegistry;
use sqlx::PgPool;

/// Everything the handlers need, constructed once at startup and shared by
/// reference. The subscriber registry and fetcher caches are process-local.
pub struct AppState {
    pub pool: PgPool,
    pub config: FrameConfig,
    pub price: PriceClient,
    pub book: BookClient,
    pub chain: ChainClient,
    pub notifier: Notifier,
    pub subscribers: SubscriberRegistry,
}

pub type SharedState = Arc<AppState>;
