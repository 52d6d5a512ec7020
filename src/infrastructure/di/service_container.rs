//! Service container for dependency injection
//!
//! Wires up the oracle and the tree services from one `Settings` value.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{BuildPolicy, TreeBuilder, TreeResolver};
use crate::config::Settings;
use crate::infrastructure::chat::OpenAiChat;
use crate::infrastructure::evidence::SportsDataProvider;
use crate::infrastructure::oracle::{LlmOracle, OracleOptions};
use crate::infrastructure::traits::{ChatTransport, EvidenceProvider, Oracle};
use crate::infrastructure::InfraResult;

/// Container holding the oracle and the settings the services are built from.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Reasoning oracle shared by builder and resolver
    pub oracle: Arc<dyn Oracle>,
}

impl ServiceContainer {
    /// Create a container backed by the HTTP chat transport and statistics provider.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let chat_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.oracle.timeout_secs))
            .build()?;
        let evidence_http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.evidence.timeout_secs))
            .build()?;

        let chat: Arc<dyn ChatTransport> = Arc::new(OpenAiChat::new(
            chat_http,
            settings.oracle.base_url.clone(),
            settings.oracle.api_key.clone(),
        ));
        let evidence: Arc<dyn EvidenceProvider> = Arc::new(SportsDataProvider::new(
            evidence_http,
            settings.evidence.base_url.clone(),
            settings.evidence.api_key.clone(),
            settings.evidence.max_attempts,
        ));
        Ok(Self::with_transport(settings, chat, evidence))
    }

    /// Create a container with a custom transport and provider behind the LLM oracle.
    pub fn with_transport(
        settings: Settings,
        chat: Arc<dyn ChatTransport>,
        evidence: Arc<dyn EvidenceProvider>,
    ) -> Self {
        let options = OracleOptions {
            decompose_model: settings.oracle.decompose_model.clone(),
            resolve_model: settings.oracle.resolve_model.clone(),
            tool_call_budget: settings.oracle.tool_call_budget,
            max_turns: settings.oracle.max_turns,
        };
        let oracle = Arc::new(LlmOracle::new(chat, evidence, options));
        Self::with_oracle(settings, oracle)
    }

    /// Create a container with a custom oracle (for testing).
    pub fn with_oracle(settings: Settings, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            settings: Arc::new(settings),
            oracle,
        }
    }

    pub fn builder(&self, policy: BuildPolicy) -> TreeBuilder {
        TreeBuilder::new(
            Arc::clone(&self.oracle),
            policy,
            self.settings.oracle.call_policy(),
            self.settings.tree.max_depth_limit,
        )
    }

    pub fn resolver(&self, concurrency: usize) -> TreeResolver {
        TreeResolver::new(
            Arc::clone(&self.oracle),
            concurrency,
            self.settings.oracle.call_policy(),
        )
    }
}
