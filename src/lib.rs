pub mod app;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod reviews;
pub mod votes;

pub use app::App;
pub use config::Config;
pub use error::{AppError, Result};
