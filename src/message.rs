//! Application message and effect types.
//!
//! All UI events, timer ticks and remote-call completions are represented as
//! messages in the Elm architecture style. The labeler answers each message
//! with effects for the host to carry out.

use serde::{Deserialize, Serialize};

use crate::gateway::RemoteCall;
use crate::model::{DamageKind, ImageId, ImageRecord, SessionId, Severity, VehicleType};

/// Messages that can be sent to update labeler state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    // Annotation
    /// Vehicle type chosen
    SelectVehicle(VehicleType),
    /// Body section opened
    SelectSection(String),
    /// Part expanded or collapsed
    TogglePart(String),
    /// Damage selected or deselected on a part
    ToggleDamage {
        part: String,
        damage: DamageKind,
        severity: Option<Severity>,
    },
    /// No-damage flag flipped
    ToggleNoDamage,

    // Navigation
    /// Submit the current annotation and move on
    Submit,
    /// Release the current image and move on
    Skip,
    /// Go back one image
    Previous,
    /// Go forward one already-claimed image
    Next,
    /// Ask the backend for images again after a failure or an empty pool
    Refresh,

    // Input and timers
    /// Pointer, touch or key input that carries no other meaning
    UserActivity,
    /// Timer poll
    Tick,

    // Remote-call completions
    /// A claim made for `session_id` finished
    ImagesClaimed {
        session_id: SessionId,
        result: Result<Vec<ImageRecord>, String>,
    },
    /// A submission finished
    AnnotationSubmitted {
        image_id: ImageId,
        result: Result<(), String>,
    },
    /// A release finished
    ImageReleased {
        image_id: ImageId,
        result: Result<(), String>,
    },
    /// A heartbeat finished
    HeartbeatSent(Result<(), String>),
}

impl Message {
    /// Whether this message comes from the annotator and rearms the
    /// inactivity timer.
    pub fn is_user_input(&self) -> bool {
        !matches!(
            self,
            Message::Tick
                | Message::ImagesClaimed { .. }
                | Message::AnnotationSubmitted { .. }
                | Message::ImageReleased { .. }
                | Message::HeartbeatSent(_)
        )
    }
}

/// Work the host must carry out after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Effect {
    /// Run a remote call and send back its completion message
    Call(RemoteCall),
    /// Show a blocking alert to the annotator
    Alert(String),
    /// Write the labeler snapshot to durable storage
    Persist,
    /// Delete all durable state
    DiscardStorage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_are_not_user_input() {
        assert!(Message::Submit.is_user_input());
        assert!(Message::UserActivity.is_user_input());
        assert!(!Message::Tick.is_user_input());
        assert!(!Message::ImagesClaimed {
            session_id: SessionId::generate(),
            result: Ok(Vec::new()),
        }
        .is_user_input());
        assert!(!Message::HeartbeatSent(Err("x".into())).is_user_input());
    }

    #[test]
    fn test_message_json_shape() {
        let message: Message = serde_json::from_str(
            r#"{"type": "toggle_damage", "data": {"part": "seat", "damage": "cut", "severity": null}}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            Message::ToggleDamage {
                part: "seat".to_string(),
                damage: DamageKind::Cut,
                severity: None,
            }
        );

        let message: Message = serde_json::from_str(r#"{"type": "submit"}"#).unwrap();
        assert_eq!(message, Message::Submit);

        let message: Message =
            serde_json::from_str(r#"{"type": "select_vehicle", "data": "scooter"}"#).unwrap();
        assert_eq!(message, Message::SelectVehicle(VehicleType::Scooter));
    }
}
