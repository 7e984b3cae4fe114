use sqlx::PgPool;
use uuid::Uuid;

use crate::assets::{self, ChainClient};
use crate::db;
use crate::error::{Result, ServiceError};
use crate::models::{
    AssetStatus, Comment, CommentWithAuthor, Post, PostWithAuthor, Role, User,
};

/// Fields a post update may touch. `None` leaves the column unchanged.
#[derive(Debug, Default, Clone)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_pinned: Option<bool>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.is_pinned.is_none()
    }
}

/// Posting requires owning the book NFT or enough $NSI tokens. Checked before
/// any write happens.
pub fn require_access(status: &AssetStatus) -> Result<()> {
    if status.has_nft_access || status.has_token_access {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "You must own the INEVITABLE book NFT or $NSI tokens to post".to_string(),
        ))
    }
}

/// Deletes are allowed for the author or an admin.
pub fn authorize_delete(author_id: Uuid, actor_id: Uuid, role: Role) -> Result<()> {
    if actor_id == author_id || role == Role::Admin {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Not authorized to delete this".to_string(),
        ))
    }
}

/// Pin state may only be changed by admins and moderators; other edits are
/// allowed for the author, admins, and moderators.
pub fn authorize_update(
    author_id: Uuid,
    actor_id: Uuid,
    role: Role,
    touches_pin: bool,
) -> Result<()> {
    let is_staff = matches!(role, Role::Admin | Role::Moderator);

    if touches_pin && !is_staff {
        return Err(ServiceError::Forbidden(
            "Only admins and moderators can pin or unpin posts".to_string(),
        ));
    }

    if actor_id != author_id && !is_staff {
        return Err(ServiceError::Forbidden(
            "Not authorized to update this post".to_string(),
        ));
    }

    Ok(())
}

pub async fn get_posts(pool: &PgPool) -> Result<Vec<PostWithAuthor>> {
    db::list_posts(pool).await
}

pub async fn get_post_with_comments(
    pool: &PgPool,
    post_id: i64,
) -> Result<(PostWithAuthor, Vec<CommentWithAuthor>)> {
    let post = db::get_post(pool, post_id)
        .await?
        .ok_or(ServiceError::NotFound("post"))?;
    let comments = db::list_comments(pool, post_id).await?;
    Ok((post, comments))
}

pub async fn create_post(
    pool: &PgPool,
    chain: &ChainClient,
    entitlement_ttl_secs: u64,
    user: &User,
    title: Option<String>,
    content: String,
) -> Result<Post> {
    if content.trim().is_empty() {
        return Err(ServiceError::BadRequest("post content is empty".to_string()));
    }

    let status = assets::ensure_entitlement(
        pool,
        chain,
        user.id,
        &user.wallet_address,
        entitlement_ttl_secs,
    )
    .await?;
    require_access(&status)?;

    db::insert_post(pool, user.id, title.as_deref(), &content).await
}

pub async fn create_comment(
    pool: &PgPool,
    chain: &ChainClient,
    entitlement_ttl_secs: u64,
    user: &User,
    post_id: i64,
    content: String,
) -> Result<Comment> {
    if content.trim().is_empty() {
        return Err(ServiceError::BadRequest(
            "comment content is empty".to_string(),
        ));
    }

    db::get_post_author(pool, post_id)
        .await?
        .ok_or(ServiceError::NotFound("post"))?;

    let status = assets::ensure_entitlement(
        pool,
        chain,
        user.id,
        &user.wallet_address,
        entitlement_ttl_secs,
    )
    .await?;
    require_access(&status)?;

    let comment = db::insert_comment(pool, post_id, user.id, &content).await?;
    db::touch_post(pool, post_id).await?;

    Ok(comment)
}

pub async fn delete_post(pool: &PgPool, user: &User, post_id: i64) -> Result<()> {
    let author_id = db::get_post_author(pool, post_id)
        .await?
        .ok_or(ServiceError::NotFound("post"))?;
    let role = db::get_role(pool, user.id).await?;
    authorize_delete(author_id, user.id, role)?;

    db::delete_post(pool, post_id).await
}

pub async fn delete_comment(pool: &PgPool, user: &User, comment_id: i64) -> Result<()> {
    let author_id = db::get_comment_author(pool, comment_id)
        .await?
        .ok_or(ServiceError::NotFound("comment"))?;
    let role = db::get_role(pool, user.id).await?;
    authorize_delete(author_id, user.id, role)?;

    db::delete_comment(pool, comment_id).await
}

pub async fn update_post(
    pool: &PgPool,
    user: &User,
    post_id: i64,
    update: PostUpdate,
) -> Result<Post> {
    if update.is_empty() {
        return Err(ServiceError::BadRequest("nothing to update".to_string()));
    }

    let author_id = db::get_post_author(pool, post_id)
        .await?
        .ok_or(ServiceError::NotFound("post"))?;
    let role = db::get_role(pool, user.id).await?;
    authorize_update(author_id, user.id, role, update.is_pinned.is_some())?;

    db::update_post(
        pool,
        post_id,
        update.title.as_deref(),
        update.content.as_deref(),
        update.is_pinned,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn status(has_nft: bool, has_token: bool) -> AssetStatus {
        AssetStatus {
            user_id: Uuid::new_v4(),
            has_nft_access: has_nft,
            has_token_access: has_token,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_access_requires_nft_or_token() {
        assert!(require_access(&status(true, false)).is_ok());
        assert!(require_access(&status(false, true)).is_ok());
        assert!(require_access(&status(true, true)).is_ok());

        let err = require_access(&status(false, false)).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_author_may_delete_own_post() {
        let author = Uuid::new_v4();
        assert!(authorize_delete(author, author, Role::Member).is_ok());
    }

    #[test]
    fn test_admin_may_delete_any_post() {
        let author = Uuid::new_v4();
        let admin = Uuid::new_v4();
        assert!(authorize_delete(author, admin, Role::Admin).is_ok());
    }

    #[test]
    fn test_moderator_may_not_delete_others_posts() {
        let author = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        let err = authorize_delete(author, moderator, Role::Moderator).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_pin_change_by_member_non_author_fails() {
        let author = Uuid::new_v4();
        let member = Uuid::new_v4();
        let err = authorize_update(author, member, Role::Member, true).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_pin_change_by_author_without_staff_role_fails() {
        // Even the author may not pin their own post as a plain member.
        let author = Uuid::new_v4();
        let err = authorize_update(author, author, Role::Member, true).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_pin_change_by_admin_succeeds() {
        let author = Uuid::new_v4();
        let admin = Uuid::new_v4();
        assert!(authorize_update(author, admin, Role::Admin, true).is_ok());
    }

    #[test]
    fn test_pin_change_by_moderator_succeeds() {
        let author = Uuid::new_v4();
        let moderator = Uuid::new_v4();
        assert!(authorize_update(author, moderator, Role::Moderator, true).is_ok());
    }

    #[test]
    fn test_content_edit_by_author_succeeds() {
        let author = Uuid::new_v4();
        assert!(authorize_update(author, author, Role::Member, false).is_ok());
    }

    #[test]
    fn test_content_edit_by_other_member_fails() {
        let author = Uuid::new_v4();
        let member = Uuid::new_v4();
        let err = authorize_update(author, member, Role::Member, false).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_empty_update_is_detected() {
        assert!(PostUpdate::default().is_empty());
        assert!(!PostUpdate {
            is_pinned: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}
