//! Database models and queries
//!
//! SQLite schema plus the repository functions for sessions, responses,
//! condition counts and the client-local settings store.

pub mod counts;
pub mod init;
pub mod models;
pub mod responses;
pub mod sessions;
pub mod settings;

pub use counts::condition_counts;
pub use init::{init_database, init_memory_database};
pub use models::{QuestionnaireResponse, SessionRecord, SessionUpdate};
pub use responses::{insert_response, list_responses};
pub use sessions::{get_session, upsert_session};
