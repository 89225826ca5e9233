use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::models::{JanitorConfig, JanitorRecommendation, JanitorRun, Task};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJanitorConfigRequest {
    pub unit_tests_enabled: Option<bool>,
    pub integration_tests_enabled: Option<bool>,
    pub e2e_tests_enabled: Option<bool>,
    pub security_review_enabled: Option<bool>,
}

impl UpdateJanitorConfigRequest {
    pub fn apply(&self, config: &mut JanitorConfig) {
        if let Some(v) = self.unit_tests_enabled {
            config.unit_tests_enabled = v;
        }
        if let Some(v) = self.integration_tests_enabled {
            config.integration_tests_enabled = v;
        }
        if let Some(v) = self.e2e_tests_enabled {
            config.e2e_tests_enabled = v;
        }
        if let Some(v) = self.security_review_enabled {
            config.security_review_enabled = v;
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub config: JanitorConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunsQuery {
    #[serde(rename = "type")]
    pub janitor_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunsResponse {
    pub runs: Vec<JanitorRun>,
}

#[derive(Debug, Serialize)]
pub struct RunCreated {
    pub success: bool,
    pub run: JanitorRun,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationsQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<JanitorRecommendation>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRecommendationRequest {
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AcceptedRecommendation {
    pub success: bool,
    pub recommendation: JanitorRecommendation,
    pub task: Task,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DismissRecommendationRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DismissedRecommendation {
    pub success: bool,
    pub recommendation: JanitorRecommendation,
}

/// The engine sends project ids as numbers, occasionally as numeric strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectId {
    Number(i64),
    Text(String),
}

impl ProjectId {
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecommendationInput {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookResults {
    #[serde(default)]
    pub recommendations: Vec<RecommendationInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JanitorWebhookPayload {
    pub project_id: ProjectId,
    pub status: String,
    pub results: Option<WebhookResults>,
    pub error: Option<String>,
}
