//! Chat-completions types and the OpenAI-compatible transport.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::infrastructure::http::check_response;
use crate::infrastructure::traits::ChatTransport;
use crate::infrastructure::{InfraError, InfraResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// A function the model may call. `parameters` is a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Echo a model reply back into the conversation.
    pub fn assistant(reply: &ChatReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.content.clone(),
            tool_calls: reply.tool_calls.clone(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, payload: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: Some(payload.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    fn to_openai(&self) -> Value {
        let mut msg = json!({
            "role": self.role.as_str(),
            "content": self.content,
        });
        if !self.tool_calls.is_empty() {
            msg["tool_calls"] = json!(self
                .tool_calls
                .iter()
                .map(|tc| json!({
                    "id": tc.id,
                    "type": "function",
                    "function": {
                        "name": tc.name,
                        "arguments": tc.arguments.to_string(),
                    }
                }))
                .collect::<Vec<_>>());
        }
        if let Some(id) = &self.tool_call_id {
            msg["tool_call_id"] = json!(id);
        }
        msg
    }
}

/// Strict JSON schema the model's final text must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseFormat {
    pub name: String,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiChat {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiChat {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn build_request_body(request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request
                .messages
                .iter()
                .map(ChatMessage::to_openai)
                .collect::<Vec<_>>(),
        });
        if !request.tools.is_empty() {
            body["tools"] = json!(request
                .tools
                .iter()
                .map(|tool| json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                }))
                .collect::<Vec<_>>());
        }
        let format = &request.response_format;
        body["response_format"] = json!({
            "type": "json_schema",
            "json_schema": { "name": format.name, "schema": format.schema, "strict": true }
        });
        body
    }

    fn parse_response(response: OpenAiResponse) -> InfraResult<ChatReply> {
        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .ok_or_else(|| InfraError::Parse("response has no choices".to_string()))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                // Unparseable arguments are passed on as null; the provider reports the missing fields
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
                id: tc.id,
                name: tc.function.name,
            })
            .collect();

        Ok(ChatReply {
            content: message.content,
            tool_calls,
        })
    }
}

#[async_trait]
impl ChatTransport for OpenAiChat {
    #[instrument(level = "debug", skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: ChatRequest) -> InfraResult<ChatReply> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(InfraError::MissingApiKey("oracle"))?;
        let body = Self::build_request_body(&request);
        debug!(messages = request.messages.len(), tools = request.tools.len(), "chat request");

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let text = resp.text().await?;
        let parsed: OpenAiResponse = serde_json::from_str(&text)
            .map_err(|e| InfraError::Parse(format!("chat response: {e}")))?;
        Self::parse_response(parsed)
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: String,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    arguments: String,
}
