//! Client for the AI provider's messages endpoint. The key never leaves the
//! server.

use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use xlforge_core::Grid;
use xlforge_plan::{build_system_prompt, parse_plan_response, response_text, MessagesRequest, Plan, PromptOptions};

use crate::config::AiConfig;
use crate::error::AppError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl AiClient {
    /// Build a client, or `None` when no key is configured
    pub fn from_config(config: &AiConfig) -> Result<Option<Self>, reqwest::Error> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .user_agent(concat!("xlforge-server/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Some(Self {
            http,
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }))
    }

    /// Send a messages request body as-is and return the provider's status
    /// and JSON body
    pub async fn forward(&self, body: &Value) -> Result<(StatusCode, Value), AppError> {
        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<Value>().await?;
        Ok((status, body))
    }

    /// Ask the provider for a plan that carries out `instruction` on `grid`
    pub async fn plan(&self, grid: &Grid, instruction: &str) -> Result<Plan, AppError> {
        let system = build_system_prompt(grid, &PromptOptions::default());
        let request = MessagesRequest::new(&self.model, self.max_tokens, system, instruction);
        let body = serde_json::to_value(&request).map_err(|e| AppError::Internal(e.to_string()))?;

        let (status, body) = self.forward(&body).await?;
        if !status.is_success() {
            return Err(AppError::UpstreamStatus { status, body });
        }

        let plan = parse_plan_response(&response_text(&body))?;
        tracing::info!(steps = plan.steps.len(), summary = %plan.summary, "Received plan");
        Ok(plan)
    }
}
