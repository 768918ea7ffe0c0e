//! Domain model shared by the flow core and the store service

use serde::{Deserialize, Serialize};

/// Opaque, stable participant identifier
///
/// Created once per device and never regenerated while the stored value is
/// valid. Consumers must not interpret its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Forward-only session lifecycle marker
///
/// Stored as an ordinal so the store can keep the furthest stage with `MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Condition assigned, video not yet finished
    Assigned,
    /// Video watched to the end at least once
    VideoComplete,
    /// Questionnaire answers persisted
    QuestionnaireComplete,
}

impl Stage {
    pub fn ordinal(self) -> i64 {
        match self {
            Stage::Assigned => 0,
            Stage::VideoComplete => 1,
            Stage::QuestionnaireComplete => 2,
        }
    }

    pub fn from_ordinal(value: i64) -> Option<Self> {
        match value {
            0 => Some(Stage::Assigned),
            1 => Some(Stage::VideoComplete),
            2 => Some(Stage::QuestionnaireComplete),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Assigned => write!(f, "assigned"),
            Stage::VideoComplete => write!(f, "video-complete"),
            Stage::QuestionnaireComplete => write!(f, "questionnaire-complete"),
        }
    }
}

/// Like/cart flags carried across video and questionnaire stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionState {
    pub like_clicked: bool,
    pub cart_clicked: bool,
}

impl InteractionState {
    /// Both flags cleared (state at the start of a run)
    pub fn cleared() -> Self {
        Self::default()
    }
}

/// One-shot engagement capture for a single completed viewing
///
/// Flags serialize as `0`/`1` and the watch duration as seconds with two
/// decimals, the shape the questionnaire stage stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralRecord {
    /// Condition the participant watched
    #[serde(rename = "video_id")]
    pub condition_id: String,
    #[serde(with = "flag")]
    pub like: bool,
    #[serde(with = "flag")]
    pub cart: bool,
    /// Seconds watched, within `[0, resource duration]`
    pub watch_duration: f64,
    #[serde(with = "flag")]
    pub completed: bool,
}

impl BehavioralRecord {
    /// Build the record emitted when playback reaches its natural end
    ///
    /// `position` is the resource position at the end signal. It is rounded to
    /// hundredths and clamped to `[0, resource_duration]`; a non-finite
    /// duration (unknown length) only clamps the lower bound.
    pub fn completed_viewing(
        condition_id: impl Into<String>,
        interaction: InteractionState,
        position: f64,
        resource_duration: f64,
    ) -> Self {
        Self {
            condition_id: condition_id.into(),
            like: interaction.like_clicked,
            cart: interaction.cart_clicked,
            watch_duration: clamp_watch_duration(position, resource_duration),
            completed: true,
        }
    }

    /// Interaction flags as recorded, for restoring on back-navigation
    pub fn interaction(&self) -> InteractionState {
        InteractionState {
            like_clicked: self.like,
            cart_clicked: self.cart,
        }
    }

    /// Watch duration in whole milliseconds
    pub fn watch_time_ms(&self) -> i64 {
        (self.watch_duration * 1000.0).round() as i64
    }
}

fn clamp_watch_duration(position: f64, resource_duration: f64) -> f64 {
    let position = if position.is_finite() { position } else { 0.0 };
    let rounded = (position * 100.0).round() / 100.0;
    let upper = if resource_duration.is_finite() && resource_duration >= 0.0 {
        resource_duration
    } else {
        f64::MAX
    };
    rounded.clamp(0.0, upper)
}

/// Completed-participant tally for one condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCount {
    pub condition_id: String,
    pub count: i64,
}

/// Booleans as `0`/`1` on the wire
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}
