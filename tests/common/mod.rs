//! Scripted collaborators shared by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use qtree::application::retry::CallPolicy;
use qtree::application::{ApplicationError, ApplicationResult};
use qtree::config::Settings;
use qtree::domain::Verdict;
use qtree::infrastructure::chat::{ChatReply, ChatRequest, ToolCall, ToolDefinition};
use qtree::infrastructure::traits::{ChatTransport, EvidenceProvider, Oracle};
use qtree::infrastructure::{InfraError, InfraResult};

/// Child `i` (1-based) of `parent` is named `"{parent} / {i}"`.
pub fn child_text(parent: &str, i: usize) -> String {
    format!("{parent} / {i}")
}

/// Settings tuned for tests: single attempt, tiny backoff.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.oracle.max_attempts = 1;
    settings.oracle.backoff_ms = 1;
    settings.oracle.timeout_secs = 5;
    settings
}

pub fn fast_policy(max_attempts: usize) -> CallPolicy {
    CallPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

/// In-memory oracle with configurable failures that records every call.
#[derive(Default)]
pub struct ScriptedOracle {
    /// Questions whose decomposition returns only four subquestions
    pub short_decompose: HashSet<String>,
    /// Questions whose decomposition returns a blank third subquestion
    pub blank_decompose: HashSet<String>,
    /// Questions whose decomposition fails as unavailable this many times first
    pub flaky_decompose: Mutex<HashMap<String, usize>>,
    /// Questions whose resolution fails
    pub failing_resolve: HashSet<String>,
    /// Questions whose resolution sleeps before answering
    pub slow_resolve: HashSet<String>,
    /// Fixed score for every answer
    pub score: f64,
    pub decompose_calls: Mutex<Vec<String>>,
    pub resolve_calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self {
            score: 0.5,
            ..Self::default()
        }
    }

    pub fn with_score(score: f64) -> Self {
        Self {
            score,
            ..Self::default()
        }
    }

    pub fn short_decompose_for(mut self, question: &str) -> Self {
        self.short_decompose.insert(question.to_string());
        self
    }

    pub fn blank_decompose_for(mut self, question: &str) -> Self {
        self.blank_decompose.insert(question.to_string());
        self
    }

    pub fn flaky_decompose_for(self, question: &str, failures: usize) -> Self {
        self.flaky_decompose
            .lock()
            .unwrap()
            .insert(question.to_string(), failures);
        self
    }

    pub fn failing_resolve_for(mut self, question: &str) -> Self {
        self.failing_resolve.insert(question.to_string());
        self
    }

    pub fn slow_resolve_for(mut self, question: &str) -> Self {
        self.slow_resolve.insert(question.to_string());
        self
    }

    pub fn decompose_calls(&self) -> Vec<String> {
        self.decompose_calls.lock().unwrap().clone()
    }

    pub fn resolve_calls(&self) -> Vec<String> {
        self.resolve_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn decompose(&self, question: &str) -> ApplicationResult<Vec<String>> {
        self.decompose_calls
            .lock()
            .unwrap()
            .push(question.to_string());

        if let Some(remaining) = self.flaky_decompose.lock().unwrap().get_mut(question) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ApplicationError::unavailable("connection reset"));
            }
        }
        let count = if self.short_decompose.contains(question) {
            4
        } else {
            5
        };
        let blank = self.blank_decompose.contains(question);
        Ok((1..=count)
            .map(|i| {
                if blank && i == 3 {
                    " ".to_string()
                } else {
                    child_text(question, i)
                }
            })
            .collect())
    }

    async fn resolve(&self, question: &str) -> ApplicationResult<Verdict> {
        self.resolve_calls.lock().unwrap().push(question.to_string());

        if self.slow_resolve.contains(question) {
            tokio::time::sleep(Duration::from_secs(10)).await;
        }
        if self.failing_resolve.contains(question) {
            return Err(ApplicationError::BudgetExhausted { turns: 5 });
        }
        Ok(Verdict::new(format!("evidence for {question}"), self.score)?)
    }
}

/// Chat transport replaying canned replies and recording requests.
#[derive(Default)]
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ChatReply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> InfraResult<ChatReply> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| InfraError::Api {
                status: 503,
                message: "no scripted reply left".into(),
            })
    }
}

pub fn text_reply(content: &str) -> ChatReply {
    ChatReply {
        content: Some(content.to_string()),
        tool_calls: Vec::new(),
    }
}

pub fn verdict_reply(reasoning: &str, score: f64) -> ChatReply {
    text_reply(&json!({"reasoning": reasoning, "probability_score": score}).to_string())
}

pub fn tool_reply(calls: &[(&str, Value)]) -> ChatReply {
    ChatReply {
        content: None,
        tool_calls: calls
            .iter()
            .map(|(name, arguments)| ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: name.to_string(),
                arguments: arguments.clone(),
            })
            .collect(),
    }
}

/// Evidence provider answering every operation from memory.
#[derive(Default)]
pub struct ScriptedProvider {
    /// Operations that fail with an API error
    pub failing: HashSet<String>,
    invocations: Mutex<Vec<(String, Value)>>,
}

impl ScriptedProvider {
    pub fn failing_on(operation: &str) -> Self {
        Self {
            failing: HashSet::from([operation.to_string()]),
            ..Self::default()
        }
    }

    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvidenceProvider for ScriptedProvider {
    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "get_standings".into(),
            description: "Conference standings".into(),
            parameters: json!({"type": "object"}),
        }]
    }

    async fn invoke(&self, operation: &str, arguments: &Value) -> InfraResult<Value> {
        self.invocations
            .lock()
            .unwrap()
            .push((operation.to_string(), arguments.clone()));
        if self.failing.contains(operation) {
            return Err(InfraError::Api {
                status: 404,
                message: "no such season".into(),
            });
        }
        Ok(json!({"operation": operation, "wins": 48}))
    }
}
