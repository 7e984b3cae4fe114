use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use frame_core::error::ServiceError;
use frame_core::models::{AssetStatus, User};
use frame_core::{assets, auth};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

// Header names the web app already sends.
pub const WALLET_HEADER: &str = "x-wallet-address";
pub const VERIFICATION_HEADER: &str = "x-wallet-verification";

pub fn wallet_headers(headers: &HeaderMap) -> (Option<&str>, Option<&str>) {
    let wallet = headers.get(WALLET_HEADER).and_then(|v| v.to_str().ok());
    let token = headers
        .get(VERIFICATION_HEADER)
        .and_then(|v| v.to_str().ok());
    (wallet, token)
}

/// Resolves the caller from the wallet headers, re-validating the token
/// against the store. Missing or stale credentials are a 401.
pub async fn require_user(state: &SharedState, headers: &HeaderMap) -> Result<User, ApiError> {
    let (wallet, token) = wallet_headers(headers);
    auth::current_user(&state.pool, wallet, token)
        .await?
        .ok_or_else(|| ApiError(ServiceError::Unauthenticated))
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub async fn sign_message(Json(request): Json<MessageRequest>) -> Json<MessageResponse> {
    let message = auth::generate_sign_message(&request.address, Utc::now().timestamp_millis());
    Json(MessageResponse { message })
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub address: String,
    pub signature: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub user: User,
    pub token: Option<String>,
    pub has_nft_access: bool,
    pub has_token_access: bool,
}

pub async fn verify(
    State(state): State<SharedState>,
    Json(request): Json<VerifyRequest>,
) -> ApiResult<Json<VerifyResponse>> {
    let (user, token) = auth::authenticate(
        &state.pool,
        &request.address,
        request.signature.as_deref(),
        request.message.as_deref(),
    )
    .await?;

    // Sign-in still succeeds when the chain RPC is down; access flags then
    // stay closed until the next re-check.
    let (has_nft_access, has_token_access) = match assets::refresh_entitlement(
        &state.pool,
        &state.chain,
        user.id,
        &user.wallet_address,
    )
    .await
    {
        Ok(status) => (status.has_nft_access, status.has_token_access),
        Err(err) => {
            warn!("entitlement refresh failed during sign-in: {err}");
            (false, false)
        }
    };

    Ok(Json(VerifyResponse {
        user,
        token,
        has_nft_access,
        has_token_access,
    }))
}

pub async fn me(State(state): State<SharedState>, headers: HeaderMap) -> ApiResult<Json<User>> {
    Ok(Json(require_user(&state, &headers).await?))
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
}

pub async fn signout(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<SignOutResponse>> {
    let (wallet, token) = wallet_headers(&headers);
    let (Some(wallet), Some(token)) = (wallet, token) else {
        return Err(ServiceError::Unauthenticated.into());
    };

    auth::sign_out(&state.pool, wallet, token).await?;
    Ok(Json(SignOutResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub valid: bool,
}

/// Re-checks the stored verification token and bumps `last_login` when it
/// still matches.
pub async fn refresh(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let (wallet, token) = wallet_headers(&headers);
    let (Some(wallet), Some(token)) = (wallet, token) else {
        return Ok(Json(RefreshResponse { valid: false }));
    };

    let valid = auth::refresh_authentication(&state.pool, wallet, token).await?;
    Ok(Json(RefreshResponse { valid }))
}

pub async fn refresh_access(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> ApiResult<Json<AssetStatus>> {
    let user = require_user(&state, &headers).await?;
    let status =
        assets::refresh_entitlement(&state.pool, &state.chain, user.id, &user.wallet_address)
            .await?;
    Ok(Json(status))
}
