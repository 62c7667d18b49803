use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Sentiment references unknown article {0}")]
    UnknownArticle(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;
