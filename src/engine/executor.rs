use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Method};
use serde_json::Value;

use crate::model::action::{Action, ActionOutcome, Plan};

/// Sends plan actions to a notebook service, one after another.
#[derive(Debug, Clone)]
pub struct PlanExecutor {
    http: Client,
}

impl PlanExecutor {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("build notebook HTTP client")?;
        Ok(Self { http })
    }

    /// Run every action in plan order. A failed action is recorded and the
    /// rest still run; later actions may rely on positions created earlier.
    pub async fn execute(&self, plan: &Plan, base_url: &str) -> Vec<ActionOutcome> {
        let mut results = Vec::with_capacity(plan.actions.len());

        for action in &plan.actions {
            let outcome = match self.dispatch(action, base_url).await {
                Ok((status_code, response_body)) => ActionOutcome::Completed {
                    endpoint: action.endpoint.clone(),
                    status_code,
                    response_body,
                },
                Err(err) => {
                    log::warn!(
                        "Action {} against {} failed: {:#}",
                        action.endpoint,
                        base_url,
                        err
                    );
                    ActionOutcome::Failed {
                        endpoint: action.endpoint.clone(),
                        error: format!("{:#}", err),
                    }
                }
            };
            results.push(outcome);
        }

        results
    }

    async fn dispatch(&self, action: &Action, base_url: &str) -> Result<(u16, Value)> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), action.endpoint);
        let method = Method::from_bytes(action.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method '{}'", action.method))?;

        let resp = self
            .http
            .request(method, &url)
            .json(&action.payload)
            .send()
            .await
            .with_context(|| format!("request to {url}"))?;

        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .with_context(|| format!("read response from {url}"))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok((status, body))
    }
}
