//! # Study Common Library
//!
//! Shared code for the study workspace:
//! - Domain model (conditions, stages, session and behavioral records)
//! - Database schema and repositories (SQLite via sqlx)
//! - Event types (StudyEvent enum) and the EventBus
//! - Configuration loading
//! - Timestamp helpers

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod model;
pub mod time;

pub use catalog::{Condition, ConditionCatalog};
pub use error::{Error, Result};
pub use model::{BehavioralRecord, ConditionCount, InteractionState, ParticipantId, Stage};
