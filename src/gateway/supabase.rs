//! Supabase (PostgREST) implementation of the remote gateway.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{GatewayError, RemoteGateway, Submission};
use crate::config::BackendConfig;
use crate::model::{ImageId, ImageRecord, SessionId};

/// Row returned by the `claim_next_images` procedure.
#[derive(Debug, Deserialize)]
struct ClaimedRow {
    image_id: serde_json::Value,
    image_url: String,
}

impl From<ClaimedRow> for ImageRecord {
    fn from(row: ClaimedRow) -> Self {
        // Ids may be numeric or uuid depending on the table definition.
        let id = match row.image_id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        ImageRecord::new(id, row.image_url)
    }
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Serialize)]
struct ReleaseBody {
    assigned_to: Option<String>,
    assigned_at: Option<String>,
}

/// Blocking client for the hosted backend's RPC and table endpoints.
pub struct SupabaseGateway {
    client: reqwest::blocking::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseGateway {
    /// Create a client for the project at `config.url`.
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        }
    }

    fn rpc(
        &self,
        procedure: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::blocking::Response, GatewayError> {
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, procedure);
        log::debug!("POST {}", url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(body)
            .send()?;
        check_status(resp)
    }
}

fn check_status(
    resp: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(GatewayError::Server {
        status: status.as_u16(),
        message,
    })
}

impl RemoteGateway for SupabaseGateway {
    fn claim_images(
        &mut self,
        session_id: SessionId,
        batch_size: usize,
    ) -> Result<Vec<ImageRecord>, GatewayError> {
        let resp = self.rpc(
            "claim_next_images",
            &json!({ "user_session": session_id, "batch_size": batch_size }),
        )?;
        let text = resp.text()?;
        // An empty pool may come back as `null` rather than `[]`.
        let rows: Option<Vec<ClaimedRow>> = serde_json::from_str(&text)?;
        let records: Vec<ImageRecord> = rows
            .unwrap_or_default()
            .into_iter()
            .map(ImageRecord::from)
            .collect();
        log::info!("Claimed {} images for session {}", records.len(), session_id);
        Ok(records)
    }

    fn heartbeat(&mut self, session_id: SessionId) -> Result<(), GatewayError> {
        self.rpc("heartbeat_session", &json!({ "p_session": session_id }))?;
        Ok(())
    }

    fn submit_annotation(&mut self, submission: &Submission) -> Result<(), GatewayError> {
        self.rpc(
            "insert_annotation_secure",
            &json!({
                "p_image_id": submission.image_id,
                "p_vehicle_type": submission.vehicle_type,
                "p_damages": submission.damages,
                "p_session": submission.session_id,
            }),
        )?;
        Ok(())
    }

    fn release_image(&mut self, image_id: &ImageId) -> Result<(), GatewayError> {
        let url = format!("{}/rest/v1/images", self.base_url);
        log::debug!("PATCH {} id={}", url, image_id);
        let resp = self
            .client
            .patch(&url)
            .query(&[("id", format!("eq.{}", image_id))])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&ReleaseBody {
                assigned_to: None,
                assigned_at: None,
            })
            .send()?;
        check_status(resp)?;
        Ok(())
    }
}
