use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AssetStatus, Comment, CommentWithAuthor, Post, PostWithAuthor, Role, User, VerificationToken,
};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    // Embed migrations from the workspace-level `migrations` directory.
    sqlx::migrate!("../migrations")
        .run(pool)
        .await
        .map_err(sqlx::Error::from)?;
    Ok(())
}

const USER_COLUMNS: &str =
    "id, wallet_address, username, avatar_url, created_at, last_login";

/// One transaction for the whole sign-in write set: upsert the user, make sure
/// a default role row exists, and (when a signature was verified) replace the
/// wallet's verification token. A failure in any step rolls back the rest.
pub async fn persist_authentication(
    pool: &PgPool,
    wallet: &str,
    token: Option<&str>,
) -> Result<User> {
    let mut tx = pool.begin().await?;

    let user: User = sqlx::query_as(&format!(
        r#"
        INSERT INTO users (wallet_address)
        VALUES ($1)
        ON CONFLICT (wallet_address) DO UPDATE SET last_login = now()
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(wallet)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role)
        VALUES ($1, 'member')
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

    if let Some(token) = token {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (wallet_address, token)
            VALUES ($1, $2)
            ON CONFLICT (wallet_address) DO UPDATE
            SET token = EXCLUDED.token, created_at = now()
            "#,
        )
        .bind(wallet)
        .bind(token)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(user)
}

pub async fn get_user_by_wallet(pool: &PgPool, wallet: &str) -> Result<Option<User>> {
    let user = sqlx::query_as(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE wallet_address = $1
        "#
    ))
    .bind(wallet)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn touch_last_login(pool: &PgPool, wallet: &str) -> Result<()> {
    sqlx::query("UPDATE users SET last_login = now() WHERE wallet_address = $1")
        .bind(wallet)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_verification_token(
    pool: &PgPool,
    wallet: &str,
) -> Result<Option<VerificationToken>> {
    let row = sqlx::query_as(
        r#"
        SELECT wallet_address, token, created_at
        FROM verification_tokens
        WHERE wallet_address = $1
        "#,
    )
    .bind(wallet)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub async fn delete_verification_token(pool: &PgPool, wallet: &str, token: &str) -> Result<()> {
    sqlx::query(
        r#"
        DELETE FROM verification_tokens
        WHERE wallet_address = $1 AND token = $2
        "#,
    )
    .bind(wallet)
    .bind(token)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_role(pool: &PgPool, user_id: Uuid) -> Result<Role> {
    let role: Option<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(Role::from_db(role.as_deref()))
}

pub async fn upsert_asset_status(
    pool: &PgPool,
    user_id: Uuid,
    has_nft_access: bool,
    has_token_access: bool,
) -> Result<AssetStatus> {
    let status = sqlx::query_as(
        r#"
        INSERT INTO user_asset_status (user_id, has_nft_access, has_token_access)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE
        SET has_nft_access = EXCLUDED.has_nft_access,
            has_token_access = EXCLUDED.has_token_access,
            updated_at = now()
        RETURNING user_id, has_nft_access, has_token_access, updated_at
        "#,
    )
    .bind(user_id)
    .bind(has_nft_access)
    .bind(has_token_access)
    .fetch_one(pool)
    .await?;

    Ok(status)
}

pub async fn get_asset_status(pool: &PgPool, user_id: Uuid) -> Result<Option<AssetStatus>> {
    let status = sqlx::query_as(
        r#"
        SELECT user_id, has_nft_access, has_token_access, updated_at
        FROM user_asset_status
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(status)
}

const POST_WITH_AUTHOR_COLUMNS: &str = r#"
    p.id, p.title, p.content, p.is_pinned, p.created_at, p.updated_at,
    u.id AS author_id, u.wallet_address AS author_wallet,
    u.username AS author_username, u.avatar_url AS author_avatar_url,
    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
"#;

pub async fn list_posts(pool: &PgPool) -> Result<Vec<PostWithAuthor>> {
    let posts = sqlx::query_as(&format!(
        r#"
        SELECT {POST_WITH_AUTHOR_COLUMNS}
        FROM posts p
        JOIN users u ON u.id = p.user_id
        ORDER BY p.is_pinned DESC, p.updated_at DESC
        "#
    ))
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

pub async fn get_post(pool: &PgPool, post_id: i64) -> Result<Option<PostWithAuthor>> {
    let post = sqlx::query_as(&format!(
        r#"
        SELECT {POST_WITH_AUTHOR_COLUMNS}
        FROM posts p
        JOIN users u ON u.id = p.user_id
        WHERE p.id = $1
        "#
    ))
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

pub async fn get_post_author(pool: &PgPool, post_id: i64) -> Result<Option<Uuid>> {
    let author = sqlx::query_scalar("SELECT user_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;

    Ok(author)
}

const POST_COLUMNS: &str = "id, title, content, user_id, is_pinned, created_at, updated_at";

pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    title: Option<&str>,
    content: &str,
) -> Result<Post> {
    let post = sqlx::query_as(&format!(
        r#"
        INSERT INTO posts (title, content, user_id)
        VALUES ($1, $2, $3)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(title)
    .bind(content)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(post)
}

pub async fn update_post(
    pool: &PgPool,
    post_id: i64,
    title: Option<&str>,
    content: Option<&str>,
    is_pinned: Option<bool>,
) -> Result<Post> {
    let post = sqlx::query_as(&format!(
        r#"
        UPDATE posts
        SET title = COALESCE($2, title),
            content = COALESCE($3, content),
            is_pinned = COALESCE($4, is_pinned),
            updated_at = now()
        WHERE id = $1
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(post_id)
    .bind(title)
    .bind(content)
    .bind(is_pinned)
    .fetch_one(pool)
    .await?;

    Ok(post)
}

pub async fn delete_post(pool: &PgPool, post_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bump a post's `updated_at` so new comments float it in the listing.
pub async fn touch_post(pool: &PgPool, post_id: i64) -> Result<()> {
    sqlx::query("UPDATE posts SET updated_at = now() WHERE id = $1")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_comments(pool: &PgPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let comments = sqlx::query_as(
        r#"
        SELECT c.id, c.content, c.created_at,
               u.id AS author_id, u.wallet_address AS author_wallet,
               u.username AS author_username, u.avatar_url AS author_avatar_url
        FROM comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.post_id = $1
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

pub async fn insert_comment(
    pool: &PgPool,
    post_id: i64,
    user_id: Uuid,
    content: &str,
) -> Result<Comment> {
    let comment = sqlx::query_as(
        r#"
        INSERT INTO comments (content, post_id, user_id)
        VALUES ($1, $2, $3)
        RETURNING id, content, post_id, user_id, created_at
        "#,
    )
    .bind(content)
    .bind(post_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

pub async fn get_comment_author(pool: &PgPool, comment_id: i64) -> Result<Option<Uuid>> {
    let author = sqlx::query_scalar("SELECT user_id FROM comments WHERE id = $1")
        .bind(comment_id)
        .fetch_optional(pool)
        .await?;

    Ok(author)
}

pub async fn delete_comment(pool: &PgPool, comment_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(pool)
        .await?;
    Ok(())
}
