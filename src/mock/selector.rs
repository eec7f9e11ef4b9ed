//! Response selection: non-streaming completion object vs. streamed sequence.
//!
//! The selector never inspects message text; the reply is drawn uniformly at
//! random from the configured candidate pool. One completion id and one
//! timestamp are generated per request and shared by every frame of the
//! eventual response.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::MockConfig;
use crate::mock::ids;

/// Fixed usage reported on the non-streaming path, independent of the actual
/// reply length. The streaming usage frame derives its counts instead; the
/// two policies are intentionally divergent.
const PROMPT_TOKENS: usize = 10;
const COMPLETION_TOKENS: usize = 17;

/// Chat completion request (OpenAI-compatible).
///
/// Only `stream`, `model`, and `messages` matter to the emulator; every other
/// field is accepted and ignored. `messages` must be present and a sequence;
/// deserialization fails otherwise and the handler surfaces a 400.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub stream: bool,
}

/// One inbound message. Content may be any JSON shape (string, part array);
/// it is never read, only counted.
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Chat completion response (non-streaming). Field order mirrors the wire
/// format of the provider being imitated.
#[derive(Debug, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Everything the stream emitter needs to produce one response.
#[derive(Debug, Clone)]
pub struct StreamSpec {
    /// Completion id shared by all frames.
    pub id: String,
    /// Creation timestamp shared by all frames (the usage frame adds +3).
    pub created: u64,
    /// Model name echoed on every frame.
    pub model: String,
    /// Full reply text, sliced one character per content frame.
    pub reply: String,
}

/// Outcome of response selection.
#[derive(Debug)]
pub enum Reply {
    /// Single-shot JSON response.
    Completion(ChatCompletion),
    /// Hand-off to the stream emitter.
    Stream(StreamSpec),
}

/// Decide the response mode and pick the reply text.
pub fn select(request: &ChatCompletionRequest, mock: &MockConfig) -> Reply {
    let id = ids::completion_id();
    let created = ids::unix_timestamp();

    let model = request
        .model
        .clone()
        .unwrap_or_else(|| mock.default_model.clone());

    // Request-scoped random source; the pool is validated non-empty at load.
    let mut rng = rand::thread_rng();
    let reply = mock
        .replies
        .choose(&mut rng)
        .cloned()
        .unwrap_or_default();

    if request.stream {
        return Reply::Stream(StreamSpec {
            id,
            created,
            model,
            reply,
        });
    }

    Reply::Completion(ChatCompletion {
        id,
        object: "chat.completion".to_string(),
        created,
        model,
        choices: vec![ChatChoice {
            index: 0,
            message: AssistantMessage {
                role: "assistant".to_string(),
                content: reply,
            },
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens: PROMPT_TOKENS,
            completion_tokens: COMPLETION_TOKENS,
            total_tokens: PROMPT_TOKENS + COMPLETION_TOKENS,
        },
    })
}
