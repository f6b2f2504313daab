use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::config::Settings;
use crate::engine::executor::PlanExecutor;
use crate::engine::llm_client::LlmClient;
use crate::engine::plan_validator::PlanValidator;
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::registry::ServerRegistry;
use crate::model::action::ChatReply;
use crate::model::error::AgentError;

/// Turns one user message into an executed plan:
/// prompt → model → validator → executor against the primary server.
pub struct Agent {
    registry: Arc<ServerRegistry>,
    llm: LlmClient,
    validator: PlanValidator,
    executor: PlanExecutor,
}

impl Agent {
    pub fn new(
        registry: Arc<ServerRegistry>,
        llm: LlmClient,
        validator: PlanValidator,
        executor: PlanExecutor,
    ) -> Self {
        Self {
            registry,
            llm,
            validator,
            executor,
        }
    }

    pub fn from_settings(settings: &Settings, registry: Arc<ServerRegistry>) -> Result<Self> {
        Ok(Self::new(
            registry,
            LlmClient::new(settings.llm.clone())?,
            PlanValidator::new(settings.plan_defaults()),
            PlanExecutor::new(Duration::from_secs(settings.action_timeout_secs))?,
        ))
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub async fn chat(&self, message: &str) -> Result<ChatReply, AgentError> {
        // Checked before spending a model call.
        let server = self
            .registry
            .primary()
            .ok_or(AgentError::NoServerConnected)?;

        let prompt = PromptBuilder::build(self.validator.defaults(), message);
        let raw_response = self.llm.complete(&prompt).await.map_err(|err| {
            log::warn!("Model call to {} failed: {:#}", self.llm.settings().url, err);
            AgentError::Transport(format!("{:#}", err))
        })?;
        log::debug!("Model response: {}", raw_response);

        let plan = match self.validator.validate(&raw_response) {
            Ok(plan) => plan,
            Err(source) => {
                log::warn!("Rejected model output: {}", source);
                return Err(AgentError::Plan {
                    source,
                    raw_response,
                });
            }
        };

        log::info!("Executing {} action(s) against {}", plan.actions.len(), server);
        let results = self.executor.execute(&plan, &server).await;

        Ok(ChatReply { plan, results })
    }
}
