use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tabguard_core_types::{ClassificationRequest, Verdict};

use crate::error::OracleError;
use crate::policy::PromptPolicy;
use crate::utils::extract_json_object;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: JsonValue,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<ChatCompletionContent>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockDecision {
    should_block: bool,
}

fn block_decision_schema() -> JsonValue {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "block_decision",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "should_block": { "type": "boolean" }
                },
                "required": ["should_block"]
            }
        }
    })
}

/// Builds the chat-completions body for one classification.
pub fn build_request_body(
    model: &str,
    policy: &PromptPolicy,
    temperature: f32,
    max_tokens: u32,
    request: &ClassificationRequest,
) -> Result<JsonValue, OracleError> {
    let body = ChatCompletionRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: policy.system_prompt.clone(),
            },
            ChatMessage {
                role: "user",
                content: policy.render_user_message(&request.url, &request.content),
            },
        ],
        response_format: block_decision_schema(),
        temperature,
        max_tokens,
        stream: false,
    };
    serde_json::to_value(body)
        .map_err(|err| OracleError::Config(format!("failed to encode oracle request: {err}")))
}

/// Reads `choices[0].message.content` and parses the block decision out of it.
pub fn parse_completion(raw: &str) -> Result<Verdict, OracleError> {
    let response: ChatCompletionResponse = serde_json::from_str(raw)
        .map_err(|err| OracleError::response(format!("completion is not valid JSON: {err}")))?;
    let content = response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_ref())
        .and_then(ChatCompletionContent::as_text)
        .ok_or_else(|| OracleError::response("completion missing message content"))?;
    let object = extract_json_object(&content)
        .ok_or_else(|| OracleError::response(format!("no JSON object in reply: {content}")))?;
    let decision: BlockDecision = serde_json::from_str(&object)
        .map_err(|err| OracleError::response(format!("reply missing should_block: {err}")))?;
    Ok(Verdict {
        should_block: decision.should_block,
    })
}
