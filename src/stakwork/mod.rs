//! Outbound calls to the Stakwork workflow engine and the local mock responder.
//!
//! Every call resolves to a [`DispatchOutcome`]; transport, status and decode
//! errors are folded into [`DispatchOutcome::Failure`] and never propagate.

pub mod payload;

use log::{info, warn};
use reqwest::header::AUTHORIZATION;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::config::StakworkConfig;
use crate::core::shared::enums::WorkflowStatus;
use crate::core::shared::models::Artifact;

pub use payload::{
    build_chat_payload, build_janitor_payload, select_workflow_id, ChatDispatch, JanitorDispatch,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Success { data: Value },
    Failure { error: String },
}

impl DispatchOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure { error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Project id reported by the engine, at `data.project_id` of the response body.
    pub fn project_id(&self) -> Option<i64> {
        let Self::Success { data } = self else {
            return None;
        };
        let raw = data
            .get("data")
            .and_then(|d| d.get("project_id"))
            .or_else(|| data.get("project_id"))?;
        raw.as_i64()
            .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Success { data } => json!({ "success": true, "data": data }),
            Self::Failure { error } => json!({ "success": false, "error": error }),
        }
    }
}

impl Serialize for DispatchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Maps a status string from a workflow callback onto [`WorkflowStatus`].
pub fn map_workflow_status(raw: &str) -> Option<WorkflowStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "in_progress" | "running" | "processing" => Some(WorkflowStatus::InProgress),
        "completed" | "success" | "finished" => Some(WorkflowStatus::Completed),
        "error" => Some(WorkflowStatus::Error),
        "failed" => Some(WorkflowStatus::Failed),
        "halted" | "paused" | "stopped" => Some(WorkflowStatus::Halted),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct StakworkClient<'a> {
    http: &'a reqwest::Client,
    config: &'a StakworkConfig,
}

impl<'a> StakworkClient<'a> {
    pub fn new(http: &'a reqwest::Client, config: &'a StakworkConfig) -> Self {
        Self { http, config }
    }

    /// `POST <base>/projects`.
    pub async fn create_project(&self, payload: &Value) -> DispatchOutcome {
        let (Some(base_url), Some(api_key)) = (self.config.base_url.as_deref(), self.config.api_key.as_deref()) else {
            return DispatchOutcome::failure("Stakwork is not configured");
        };

        let response = match self
            .http
            .post(format!("{base_url}/projects"))
            .header(AUTHORIZATION, format!("Token token={api_key}"))
            .json(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Stakwork request failed: {e}");
                return DispatchOutcome::failure(format!("Stakwork request failed: {e}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            warn!("Stakwork responded with {status}");
            return DispatchOutcome::failure(format!("Stakwork request failed: {} {}", status.as_u16(), reason));
        }

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Stakwork response was not JSON: {e}");
                return DispatchOutcome::failure(format!("Invalid response from Stakwork: {e}"));
            }
        };

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            let error = body
                .get("error")
                .or_else(|| body.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Stakwork reported a failure")
                .to_string();
            return DispatchOutcome::failure(error);
        }

        info!("Stakwork project created");
        DispatchOutcome::Success { data: body }
    }
}

/// Posts the message to the mock responder at `<base_url>/api/mock`.
pub async fn call_mock(
    http: &reqwest::Client,
    base_url: &str,
    message: &str,
    user_id: Uuid,
    task_id: Uuid,
    artifacts: &[Artifact],
) -> DispatchOutcome {
    let body = json!({
        "message": message,
        "userId": user_id,
        "taskId": task_id,
        "artifacts": artifacts,
    });

    let response = match http.post(format!("{base_url}/api/mock")).json(&body).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Mock dispatch failed: {e}");
            return DispatchOutcome::failure(format!("Mock request failed: {e}"));
        }
    };

    let status = response.status();
    if !status.is_success() {
        return DispatchOutcome::failure(format!(
            "Mock request failed: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        ));
    }

    match response.json::<Value>().await {
        Ok(data) => DispatchOutcome::Success { data },
        Err(e) => DispatchOutcome::failure(format!("Invalid response from mock: {e}")),
    }
}
