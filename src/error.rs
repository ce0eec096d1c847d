use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: a signed-in user is required")]
    Unauthorized,

    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),

    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Google Books API error: {0}")]
    BooksApi(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
