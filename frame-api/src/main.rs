mod auth;
mod error;
mod forum;
mod frame;
mod state;
mod watcher;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use frame_core::assets::ChainClient;
use frame_core::config::FrameConfig;
use frame_core::db::{create_pool, run_migrations};
use frame_core::metadata::{BookClient, DEFAULT_TOKEN_ID};
use frame_core::models::{BookMetadata, CollectionInfo, TokenData};
use frame_core::notify::Notifier;
use frame_core::price::PriceClient;
use frame_core::subscribers::SubscriberRegistry;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::state::{AppState, SharedState};

async fn health() -> &'static str {
    "ok"
}

async fn api_token(State(state): State<SharedState>) -> Json<TokenData> {
    Json(state.price.fetch_token_data().await)
}

async fn api_book(State(state): State<SharedState>) -> Json<BookMetadata> {
    Json(state.book.fetch_book_metadata(DEFAULT_TOKEN_ID).await)
}

async fn api_collection(State(state): State<SharedState>) -> Json<CollectionInfo> {
    Json(state.book.fetch_collection_info().await)
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/frame", get(frame::frame_get).post(frame::frame_post))
        .route("/webhook", post(webhook::handle_webhook))
        .route("/cron/price-check", post(watcher::price_check))
        .route("/api/token", get(api_token))
        .route("/api/book", get(api_book))
        .route("/api/collection", get(api_collection))
        .route("/auth/message", post(auth::sign_message))
        .route("/auth/verify", post(auth::verify))
        .route("/auth/me", get(auth::me))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/signout", post(auth::signout))
        .route("/auth/access", post(auth::refresh_access))
        .route("/posts", get(forum::list_posts).post(forum::create_post))
        .route(
            "/posts/:id",
            get(forum::get_post)
                .patch(forum::update_post)
                .delete(forum::delete_post),
        )
        .route("/posts/:id/comments", post(forum::create_comment))
        .route("/comments/:id", delete(forum::delete_comment))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FrameConfig::from_env()?;

    let pool = create_pool(&config.db.url, config.db.max_connections).await?;
    run_migrations(&pool).await?;

    let http = reqwest::Client::new();
    let chain = ChainClient::new(http.clone(), &config.chain)?;

    let state: SharedState = Arc::new(AppState {
        price: PriceClient::new(http.clone(), config.token.clone()),
        book: BookClient::new(http.clone(), config.book.clone()),
        notifier: Notifier::new(http, config.relay.clone()),
        subscribers: SubscriberRegistry::new(),
        chain,
        pool,
        config,
    });

    // Background price watcher shares the in-process subscriber registry.
    if state.config.alerts.enabled {
        tokio::spawn(watcher::run(state.clone()));
    }

    let addr: SocketAddr = state.config.api.bind_addr.parse()?;
    tracing::info!("Starting frame server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
