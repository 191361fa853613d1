//! Remote gateway to the hosted backend.
//!
//! The labeler never calls the backend directly. It emits [`RemoteCall`]s as
//! effects; the host runs them through a [`RemoteGateway`] and feeds the
//! completion back as a [`Message`] on a later turn.

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod supabase;

pub use memory::MemoryGateway;
#[cfg(not(target_arch = "wasm32"))]
pub use supabase::SupabaseGateway;

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::model::{DamageEntry, ImageId, ImageRecord, SessionId, VehicleType};

/// Errors from a remote call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network or TLS failure
    #[cfg(not(target_arch = "wasm32"))]
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend cannot be reached or refused the call
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// An annotation ready to be stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Annotated image
    pub image_id: ImageId,
    /// Selected vehicle type
    pub vehicle_type: VehicleType,
    /// Logged damages; empty for undamaged vehicles
    pub damages: Vec<DamageEntry>,
    /// Session that claimed the image
    pub session_id: SessionId,
}

/// Operations offered by the hosted backend.
pub trait RemoteGateway {
    /// Assign up to `batch_size` unlabeled images to the session.
    fn claim_images(
        &mut self,
        session_id: SessionId,
        batch_size: usize,
    ) -> Result<Vec<ImageRecord>, GatewayError>;

    /// Liveness signal keeping the session's claims alive.
    fn heartbeat(&mut self, session_id: SessionId) -> Result<(), GatewayError>;

    /// Store a finished annotation.
    fn submit_annotation(&mut self, submission: &Submission) -> Result<(), GatewayError>;

    /// Return a claimed image to the shared pool.
    fn release_image(&mut self, image_id: &ImageId) -> Result<(), GatewayError>;
}

/// A remote call requested by the labeler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum RemoteCall {
    /// Claim a batch of images
    ClaimImages {
        session_id: SessionId,
        batch_size: usize,
    },
    /// Send a heartbeat
    Heartbeat { session_id: SessionId },
    /// Submit an annotation
    SubmitAnnotation(Submission),
    /// Release an image back to the pool
    ReleaseImage { image_id: ImageId },
}

impl RemoteCall {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCall::ClaimImages { .. } => "claim_images",
            RemoteCall::Heartbeat { .. } => "heartbeat",
            RemoteCall::SubmitAnnotation(_) => "submit_annotation",
            RemoteCall::ReleaseImage { .. } => "release_image",
        }
    }
}

/// Run a call against a gateway and turn the result into its completion message.
pub fn execute<G: RemoteGateway + ?Sized>(gateway: &mut G, call: RemoteCall) -> Message {
    log::debug!("Executing remote call {}", call.name());
    match call {
        RemoteCall::ClaimImages {
            session_id,
            batch_size,
        } => Message::ImagesClaimed {
            result: gateway
                .claim_images(session_id, batch_size)
                .map_err(|e| e.to_string()),
            session_id,
        },
        RemoteCall::Heartbeat { session_id } => {
            Message::HeartbeatSent(gateway.heartbeat(session_id).map_err(|e| e.to_string()))
        }
        RemoteCall::SubmitAnnotation(submission) => Message::AnnotationSubmitted {
            result: gateway
                .submit_annotation(&submission)
                .map_err(|e| e.to_string()),
            image_id: submission.image_id,
        },
        RemoteCall::ReleaseImage { image_id } => Message::ImageReleased {
            result: gateway.release_image(&image_id).map_err(|e| e.to_string()),
            image_id,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DamageKind, Severity};

    #[test]
    fn test_call_wire_format() {
        let session_id = SessionId::generate();
        let call = RemoteCall::ClaimImages {
            session_id,
            batch_size: 3,
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["call"], "claim_images");
        assert_eq!(json["batch_size"], 3);
        assert_eq!(json["session_id"], session_id.to_string());

        let submit = RemoteCall::SubmitAnnotation(Submission {
            image_id: ImageId::new("img"),
            vehicle_type: VehicleType::Bike,
            damages: vec![DamageEntry::new("seat", DamageKind::Torn, Severity::Major)],
            session_id,
        });
        let json = serde_json::to_value(&submit).unwrap();
        assert_eq!(json["call"], "submit_annotation");
        assert_eq!(json["vehicle_type"], "bike");
        assert_eq!(json["damages"][0]["damage"], "torn");
    }

    #[test]
    fn test_execute_maps_failures_to_messages() {
        let mut gateway = MemoryGateway::new(Vec::new());
        gateway.fail_releases(true);
        let message = execute(
            &mut gateway,
            RemoteCall::ReleaseImage {
                image_id: ImageId::new("x"),
            },
        );
        match message {
            Message::ImageReleased { image_id, result } => {
                assert_eq!(image_id.as_str(), "x");
                assert!(result.is_err());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }
}
