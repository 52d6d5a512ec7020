//! LLM-backed oracle: subquestion generation and tool-augmented answering.
//!
//! Resolution runs a bounded tool-call loop:
//!
//! ```text
//! AwaitingModelTurn --tool calls--> AwaitingToolResult --results--> AwaitingModelTurn
//! AwaitingModelTurn --parseable answer--> Finalized
//! AwaitingModelTurn --turn cap / unparseable text--> Exhausted --forced final turn--> Finalized
//! ```
//!
//! Tools are offered only while the call budget lasts; calls beyond it are
//! answered with an error payload instead of reaching the provider.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, Verdict, FAN_OUT};
use crate::infrastructure::chat::{
    ChatMessage, ChatReply, ChatRequest, ResponseFormat, ToolCall, ToolDefinition,
};
use crate::infrastructure::traits::{ChatTransport, EvidenceProvider, Oracle};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid fence regex")
});

const SUBQUESTION_FIELDS: [&str; FAN_OUT] = [
    "question_one",
    "question_two",
    "question_three",
    "question_four",
    "question_five",
];

const BUDGET_EXHAUSTED_PAYLOAD: &str =
    "tool-call budget exhausted; answer with the evidence gathered so far";

/// Models and limits used by [`LlmOracle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleOptions {
    pub decompose_model: String,
    pub resolve_model: String,
    /// Maximum evidence lookups per resolve call
    pub tool_call_budget: usize,
    /// Maximum model turns before a final answer is forced
    pub max_turns: usize,
}

#[derive(Debug)]
enum LoopState {
    AwaitingModelTurn,
    AwaitingToolResult(Vec<ToolCall>),
    Finalized(Verdict),
    Exhausted,
}

pub struct LlmOracle {
    chat: Arc<dyn ChatTransport>,
    evidence: Arc<dyn EvidenceProvider>,
    options: OracleOptions,
}

impl LlmOracle {
    pub fn new(
        chat: Arc<dyn ChatTransport>,
        evidence: Arc<dyn EvidenceProvider>,
        options: OracleOptions,
    ) -> Self {
        Self {
            chat,
            evidence,
            options,
        }
    }

    async fn send(
        &self,
        question: &str,
        model: &str,
        messages: &[ChatMessage],
        tools: Vec<ToolDefinition>,
        response_format: ResponseFormat,
    ) -> ApplicationResult<ChatReply> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools,
            response_format,
        };
        self.chat
            .complete(request)
            .await
            .map_err(|e| e.into_oracle_error(question))
    }

    /// Evidence failures become payloads the model can reason about.
    async fn run_tool(&self, call: &ToolCall) -> Value {
        match self.evidence.invoke(&call.name, &call.arguments).await {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, %e, "evidence lookup failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    async fn force_final(
        &self,
        question: &str,
        mut conversation: Vec<ChatMessage>,
        turns: usize,
    ) -> ApplicationResult<Verdict> {
        debug!(turns, "forcing final answer");
        conversation.push(ChatMessage::user(FINAL_ANSWER_PROMPT));
        let reply = self
            .send(
                question,
                &self.options.resolve_model,
                &conversation,
                Vec::new(),
                verdict_format(),
            )
            .await?;
        reply
            .content
            .as_deref()
            .and_then(|text| parse_verdict(question, text).ok())
            .ok_or(ApplicationError::BudgetExhausted { turns: turns + 1 })
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    #[instrument(level = "debug", skip(self))]
    async fn decompose(&self, question: &str) -> ApplicationResult<Vec<String>> {
        let messages = [ChatMessage::user(decompose_prompt(question))];
        let reply = self
            .send(
                question,
                &self.options.decompose_model,
                &messages,
                Vec::new(),
                subquestion_format(),
            )
            .await?;
        let text = reply
            .content
            .ok_or_else(|| DomainError::malformed(question, "reply has no content"))?;
        Ok(parse_subquestions(question, &text)?)
    }

    #[instrument(level = "debug", skip(self))]
    async fn resolve(&self, question: &str) -> ApplicationResult<Verdict> {
        let budget = self.options.tool_call_budget;
        let mut conversation = vec![ChatMessage::user(resolve_prompt(question, budget))];
        let mut calls_used = 0;
        let mut turns = 0;
        let mut state = LoopState::AwaitingModelTurn;

        loop {
            state = match state {
                LoopState::AwaitingModelTurn if turns >= self.options.max_turns => {
                    LoopState::Exhausted
                }
                LoopState::AwaitingModelTurn => {
                    turns += 1;
                    let tools = if calls_used < budget {
                        self.evidence.tools()
                    } else {
                        Vec::new()
                    };
                    let reply = self
                        .send(
                            question,
                            &self.options.resolve_model,
                            &conversation,
                            tools,
                            verdict_format(),
                        )
                        .await?;
                    conversation.push(ChatMessage::assistant(&reply));

                    if !reply.tool_calls.is_empty() {
                        LoopState::AwaitingToolResult(reply.tool_calls)
                    } else {
                        match reply.content.as_deref().map(|t| parse_verdict(question, t)) {
                            Some(Ok(verdict)) => LoopState::Finalized(verdict),
                            Some(Err(e)) => {
                                debug!(%e, "unstructured answer");
                                LoopState::Exhausted
                            }
                            None => LoopState::Exhausted,
                        }
                    }
                }
                LoopState::AwaitingToolResult(calls) => {
                    for call in calls {
                        let payload = if calls_used < budget {
                            calls_used += 1;
                            debug!(tool = %call.name, calls_used, "evidence lookup");
                            self.run_tool(&call).await
                        } else {
                            json!({ "error": BUDGET_EXHAUSTED_PAYLOAD })
                        };
                        conversation.push(ChatMessage::tool_result(&call.id, &payload));
                    }
                    LoopState::AwaitingModelTurn
                }
                LoopState::Finalized(verdict) => return Ok(verdict),
                LoopState::Exhausted => {
                    return self.force_final(question, conversation, turns).await;
                }
            };
        }
    }
}

/// Parse contract for decomposition: a JSON object (optionally fenced) with
/// exactly the five `question_*` string fields.
pub fn parse_subquestions(question: &str, text: &str) -> Result<Vec<String>, DomainError> {
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Subquestions {
        question_one: String,
        question_two: String,
        question_three: String,
        question_four: String,
        question_five: String,
    }

    let parsed: Subquestions = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| DomainError::malformed(question, format!("subquestions: {e}")))?;
    let subquestions = vec![
        parsed.question_one,
        parsed.question_two,
        parsed.question_three,
        parsed.question_four,
        parsed.question_five,
    ];
    if let Some(pos) = subquestions.iter().position(|q| q.trim().is_empty()) {
        return Err(DomainError::malformed(
            question,
            format!("{} is empty", SUBQUESTION_FIELDS[pos]),
        ));
    }
    Ok(subquestions)
}

/// Parse contract for resolution: `{reasoning, probability_score}` or
/// `{answer, score}`. The score is clamped into [0, 1].
pub fn parse_verdict(question: &str, text: &str) -> Result<Verdict, DomainError> {
    #[derive(Deserialize)]
    struct VerdictReply {
        #[serde(alias = "answer")]
        reasoning: String,
        #[serde(alias = "score")]
        probability_score: f64,
    }

    let parsed: VerdictReply = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| DomainError::malformed(question, format!("verdict: {e}")))?;
    Verdict::new(parsed.reasoning, parsed.probability_score)
        .map_err(|e| DomainError::malformed(question, e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    CODE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str())
}

fn subquestion_format() -> ResponseFormat {
    let properties: serde_json::Map<String, Value> = SUBQUESTION_FIELDS
        .iter()
        .map(|f| (f.to_string(), json!({"type": "string"})))
        .collect();
    ResponseFormat {
        name: "subquestions".to_string(),
        schema: json!({
            "type": "object",
            "properties": properties,
            "required": SUBQUESTION_FIELDS,
            "additionalProperties": false,
        }),
    }
}

fn verdict_format() -> ResponseFormat {
    ResponseFormat {
        name: "verdict".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "reasoning": {"type": "string"},
                "probability_score": {"type": "number"},
            },
            "required": ["reasoning", "probability_score"],
            "additionalProperties": false,
        }),
    }
}

fn decompose_prompt(question: &str) -> String {
    format!(
        "Generate exactly {FAN_OUT} atomic, true or false, factual subquestions to help answer:\n\n\
         '{question}'\n\n\
         Ensure that if these subquestions are evaluated as 'True' or have a probability closer \
         to 1.0, they support a 'Yes' answer to the original question. If they are 'False' or \
         have a probability closer to 0.0, they support a 'No' answer.\n\n\
         Return JSON with the fields: {}",
        SUBQUESTION_FIELDS.join(", ")
    )
}

fn resolve_prompt(question: &str, budget: usize) -> String {
    format!(
        "My question is: {question}\n\
         I want to know how strongly the answer is a 'Yes' to the question, based on evidence.\n\n\
         Before answering, research the relevant factors with the statistics tools provided, \
         without asking for permission. You have at most {budget} tool calls, choose wisely.\n\n\
         Return JSON with:\n\
         - reasoning: your reasoning from the research\n\
         - probability_score: a number between 0.0 and 1.0 (at most two decimals) indicating how \
         strongly the evidence supports a 'Yes'"
    )
}

const FINAL_ANSWER_PROMPT: &str = "No more tool calls are available. Answer now using only the \
     evidence gathered so far, as JSON with the fields reasoning and probability_score.";
