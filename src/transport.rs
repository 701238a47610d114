// src/transport.rs
//! HTTP delivery of the assembled application payload

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info, trace};

use crate::payload::ApplicationPayload;

/// Wire shape of the intake endpoint's JSON reply.
#[derive(Debug, Deserialize)]
pub struct IntakeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub application_id: Option<String>,
}

/// What a successful delivery hands back to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeReceipt {
    pub message: String,
    pub application_id: Option<String>,
}

/// The network seam. The orchestrator only ever talks to this trait; tests
/// substitute scripted implementations.
pub trait SubmissionTransport: Send + Sync {
    async fn deliver(&self, payload: &ApplicationPayload) -> Result<IntakeReceipt>;
}

/// Posts one multipart payload per attempt to the intake endpoint.
pub struct IntakeServiceClient {
    client: reqwest::Client,
    endpoint_url: String,
}

impl IntakeServiceClient {
    pub fn new(endpoint_url: String, timeout_seconds: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint_url,
        })
    }
}

impl SubmissionTransport for IntakeServiceClient {
    async fn deliver(&self, payload: &ApplicationPayload) -> Result<IntakeReceipt> {
        let form = payload.to_multipart()?;

        info!(
            endpoint = %self.endpoint_url,
            submission_id = %payload.submission_id,
            "Posting application to intake service"
        );

        let response = self
            .client
            .post(&self.endpoint_url)
            .multipart(form)
            .send()
            .await
            .context("HTTP request failed")?;

        let status = response.status();
        trace!(status = %status, "Intake service responded");

        let response_text = response
            .text()
            .await
            .context("Failed to read response text")?;

        if status.is_success() {
            let parsed: IntakeResponse = serde_json::from_str(&response_text).with_context(|| {
                format!(
                    "Failed to parse intake response. Raw response: {}",
                    response_text
                )
            })?;

            if parsed.success {
                Ok(IntakeReceipt {
                    message: parsed.message.unwrap_or_default(),
                    application_id: parsed.application_id,
                })
            } else {
                let message = parsed
                    .message
                    .unwrap_or_else(|| "Intake service rejected the application".to_string());
                anyhow::bail!("{}", message)
            }
        } else {
            // Surface the server's own message text where there is one; the
            // orchestrator classifies failures by message content.
            let message = serde_json::from_str::<IntakeResponse>(&response_text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or(response_text);

            error!(status = %status, "Intake service returned error: {}", message);
            anyhow::bail!("Intake service error {}: {}", status, message)
        }
    }
}
