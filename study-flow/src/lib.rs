//! # Study Flow Library (study-flow)
//!
//! Participant-side core of the study: start -> treatment video -> questionnaire.
//!
//! **Components (leaf to root):**
//! - [`identity`]: stable participant identifier
//! - [`assignment`]: least-completed condition balancer with uniform tie-break
//! - [`playback`]: media lifecycle state machine, sound unlock, like/cart toggles
//! - [`session`]: best-effort session row bookkeeping
//! - [`questionnaire`]: required-answer check and response persistence
//! - [`flow`]: the orchestrator that sequences all of the above
//!
//! Every external interface is a trait with a SQLite implementation (same
//! process as the database) and an HTTP implementation in [`remote`].

pub mod assignment;
pub mod error;
pub mod flow;
pub mod identity;
pub mod playback;
pub mod questionnaire;
pub mod remote;
pub mod session;

pub use assignment::{Assignment, ConditionAssignmentBalancer, CountsSource};
pub use error::{Error, Result};
pub use flow::{ExperimentFlowController, FlowError, FlowState};
pub use identity::IdentityProvider;
pub use playback::{MediaResource, PlaybackController, PlaybackSettings};
pub use session::{SessionRecorder, SessionStore};
