//! Boundary traits for the external collaborators
//!
//! These traits abstract the reasoning oracle, the statistics provider and the
//! chat-completions transport, allowing the tree services to be tested with
//! scripted implementations.

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ApplicationResult;
use crate::domain::Verdict;
use crate::infrastructure::chat::{ChatReply, ChatRequest, ToolDefinition};
use crate::infrastructure::InfraResult;

/// External reasoning service.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Split a question into exactly [`crate::domain::FAN_OUT`] atomic subquestions,
    /// in the order they should become children.
    ///
    /// A subquestion that is true (or likely) supports a "yes" to `question`.
    async fn decompose(&self, question: &str) -> ApplicationResult<Vec<String>>;

    /// Answer a question with an explanation and a score in [0, 1], consulting
    /// the evidence provider within the oracle's own tool-call budget.
    async fn resolve(&self, question: &str) -> ApplicationResult<Verdict>;
}

/// Structured statistics source reachable by named operations.
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    /// Operations offered to the oracle as callable tools.
    fn tools(&self) -> Vec<ToolDefinition>;

    /// Run one named operation. Failures are typed and never panic; callers
    /// turn them into `{"error": ...}` payloads.
    async fn invoke(&self, operation: &str, arguments: &Value) -> InfraResult<Value>;
}

/// One request/response exchange with a chat-completions model.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> InfraResult<ChatReply>;
}
