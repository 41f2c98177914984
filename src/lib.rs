pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod web_pages;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use pipeline::UploadPipeline;
