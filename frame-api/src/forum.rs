use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use frame_core::forum::{self, PostUpdate};
use frame_core::models::{Comment, CommentWithAuthor, Post, PostWithAuthor};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::require_user;
use crate::error::ApiResult;
use crate::state::SharedState;

pub async fn list_posts(State(state): State<SharedState>) -> ApiResult<Json<Vec<PostWithAuthor>>> {
    Ok(Json(forum::get_posts(&state.pool).await?))
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: PostWithAuthor,
    pub comments: Vec<CommentWithAuthor>,
}

pub async fn get_post(
    State(state): State<SharedState>,
    Path(post_id): Path<i64>,
) -> ApiResult<Json<PostDetail>> {
    let (post, comments) = forum::get_post_with_comments(&state.pool, post_id).await?;
    Ok(Json(PostDetail { post, comments }))
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
    pub content: String,
}

pub async fn create_post(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<Json<Post>> {
    let user = require_user(&state, &headers).await?;
    let post = forum::create_post(
        &state.pool,
        &state.chain,
        state.config.chain.entitlement_ttl_secs,
        &user,
        request.title,
        request.content,
    )
    .await?;
    Ok(Json(post))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
}

pub async fn update_post(
    State(state): State<SharedState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<Json<Post>> {
    let user = require_user(&state, &headers).await?;
    let update = PostUpdate {
        title: request.title,
        content: request.content,
        is_pinned: request.is_pinned,
    };
    let post = forum::update_post(&state.pool, &user, post_id, update).await?;
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<SharedState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = require_user(&state, &headers).await?;
    forum::delete_post(&state.pool, &user, post_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

pub async fn create_comment(
    State(state): State<SharedState>,
    Path(post_id): Path<i64>,
    headers: HeaderMap,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Json<Comment>> {
    let user = require_user(&state, &headers).await?;
    let comment = forum::create_comment(
        &state.pool,
        &state.chain,
        state.config.chain.entitlement_ttl_secs,
        &user,
        post_id,
        request.content,
    )
    .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<SharedState>,
    Path(comment_id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user = require_user(&state, &headers).await?;
    forum::delete_comment(&state.pool, &user, comment_id).await?;
    Ok(Json(json!({ "success": true })))
}
