use thiserror::Error;

/// Typed error kinds for everything the services can fail with. Database
/// failures are classified by `sqlx`'s error kind instead of matching on the
/// store's wire error codes.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned unusable data: {0}")]
    UpstreamData(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return ServiceError::NotFound("row");
        }

        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return ServiceError::Conflict("row already exists".to_string());
            }
            if db.is_foreign_key_violation() {
                return ServiceError::BadRequest("referenced row does not exist".to_string());
            }
        }

        ServiceError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
