//! In-memory backend with a shared image pool.
//!
//! Used by tests and by the native `--offline` mode. Claims pop from the pool,
//! releases push the image back to the front, submissions are recorded.

use std::collections::{HashMap, VecDeque};

use super::{GatewayError, RemoteGateway, Submission};
use crate::model::{ImageId, ImageRecord, SessionId};

/// Backend stand-in holding everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    pool: VecDeque<ImageRecord>,
    assigned: HashMap<ImageId, (ImageRecord, SessionId)>,
    submissions: Vec<Submission>,
    heartbeats: usize,
    fail_claims: bool,
    fail_submits: bool,
    fail_releases: bool,
}

impl MemoryGateway {
    /// Create a gateway whose pool holds `images`.
    pub fn new(images: Vec<ImageRecord>) -> Self {
        Self {
            pool: images.into(),
            ..Default::default()
        }
    }

    /// Create a gateway from a JSON list of `{id, url}` records.
    pub fn from_json(json: &str) -> Result<Self, GatewayError> {
        let images: Vec<ImageRecord> = serde_json::from_str(json)?;
        Ok(Self::new(images))
    }

    /// Make claims fail until switched off.
    pub fn fail_claims(&mut self, fail: bool) {
        self.fail_claims = fail;
    }

    /// Make submissions fail until switched off.
    pub fn fail_submits(&mut self, fail: bool) {
        self.fail_submits = fail;
    }

    /// Make releases fail until switched off.
    pub fn fail_releases(&mut self, fail: bool) {
        self.fail_releases = fail;
    }

    /// Images still unclaimed.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Annotations received so far.
    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    /// Number of heartbeats received.
    pub fn heartbeats(&self) -> usize {
        self.heartbeats
    }

    /// Check if an image is currently assigned to a session.
    pub fn is_assigned(&self, image_id: &ImageId) -> bool {
        self.assigned.contains_key(image_id)
    }
}

impl RemoteGateway for MemoryGateway {
    fn claim_images(
        &mut self,
        session_id: SessionId,
        batch_size: usize,
    ) -> Result<Vec<ImageRecord>, GatewayError> {
        if self.fail_claims {
            return Err(GatewayError::Unavailable("claim rejected".to_string()));
        }
        let take = batch_size.min(self.pool.len());
        let claimed: Vec<ImageRecord> = self.pool.drain(..take).collect();
        for image in &claimed {
            self.assigned
                .insert(image.id.clone(), (image.clone(), session_id));
        }
        Ok(claimed)
    }

    fn heartbeat(&mut self, _session_id: SessionId) -> Result<(), GatewayError> {
        self.heartbeats += 1;
        Ok(())
    }

    fn submit_annotation(&mut self, submission: &Submission) -> Result<(), GatewayError> {
        if self.fail_submits {
            return Err(GatewayError::Server {
                status: 500,
                message: "insert failed".to_string(),
            });
        }
        match self.assigned.get(&submission.image_id) {
            Some((_, owner)) if *owner == submission.session_id => {}
            _ => {
                return Err(GatewayError::Server {
                    status: 403,
                    message: format!("image {} is not assigned to this session", submission.image_id),
                });
            }
        }
        self.assigned.remove(&submission.image_id);
        self.submissions.push(submission.clone());
        Ok(())
    }

    fn release_image(&mut self, image_id: &ImageId) -> Result<(), GatewayError> {
        if self.fail_releases {
            return Err(GatewayError::Unavailable("release rejected".to_string()));
        }
        if let Some((image, _)) = self.assigned.remove(image_id) {
            self.pool.push_front(image);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VehicleType;

    fn pool(n: usize) -> Vec<ImageRecord> {
        (0..n)
            .map(|i| ImageRecord::new(format!("img-{i}"), format!("https://img/{i}.jpg")))
            .collect()
    }

    #[test]
    fn test_claim_drains_pool() {
        let mut gateway = MemoryGateway::new(pool(4));
        let session = SessionId::generate();
        assert_eq!(gateway.claim_images(session, 3).unwrap().len(), 3);
        assert_eq!(gateway.claim_images(session, 3).unwrap().len(), 1);
        assert!(gateway.claim_images(session, 3).unwrap().is_empty());
    }

    #[test]
    fn test_release_returns_image() {
        let mut gateway = MemoryGateway::new(pool(2));
        let session = SessionId::generate();
        let claimed = gateway.claim_images(session, 1).unwrap();
        gateway.release_image(&claimed[0].id).unwrap();
        assert_eq!(gateway.pool_len(), 2);
        assert!(!gateway.is_assigned(&claimed[0].id));
    }

    #[test]
    fn test_submit_requires_assignment() {
        let mut gateway = MemoryGateway::new(pool(1));
        let session = SessionId::generate();
        let claimed = gateway.claim_images(session, 1).unwrap();
        let mut submission = Submission {
            image_id: claimed[0].id.clone(),
            vehicle_type: VehicleType::Scooter,
            damages: Vec::new(),
            session_id: SessionId::generate(),
        };
        assert!(gateway.submit_annotation(&submission).is_err());

        submission.session_id = session;
        gateway.submit_annotation(&submission).unwrap();
        assert_eq!(gateway.submissions().len(), 1);
        assert!(gateway.submit_annotation(&submission).is_err());
    }

    #[test]
    fn test_from_json() {
        let gateway =
            MemoryGateway::from_json(r#"[{"id": "a", "url": "https://img/a.jpg"}]"#).unwrap();
        assert_eq!(gateway.pool_len(), 1);
    }
}
