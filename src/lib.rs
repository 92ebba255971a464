pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod rating;

pub use api::create_api_router;
pub use config::Config;
pub use error::ApiError;
