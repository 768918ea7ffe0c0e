//! HTTP API handlers for study-store

pub mod counts;
pub mod error;
pub mod health;
pub mod responses;
pub mod sessions;

pub use counts::condition_counts;
pub use error::{ApiError, ApiResult};
pub use health::health_routes;
pub use responses::{create_response, list_responses};
pub use sessions::{get_session, upsert_session};
