//! SSE frame emission for streamed completions.
//!
//! A streamed response is a fixed, typed sequence of frames driven by one
//! control loop: a role-opening chunk, one content chunk per character of the
//! reply, a finish chunk, a constant content-filter chunk, a usage chunk, and
//! the `[DONE]` sentinel. Each frame is one `data: <json>\n\n` event; a fixed
//! delay is inserted after every content chunk to imitate token pacing.
//!
//! Cancellation is by drop: when the client disconnects, axum drops the
//! stream and emission stops at the current frame boundary. Frames are
//! yielded whole, so a disconnect never produces a partial frame.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;

use crate::mock::ids;
use crate::mock::selector::{StreamSpec, Usage};

/// Prompt token count reported by the usage frame. Unlike the non-streaming
/// path, completion tokens are derived from the reply length here.
const USAGE_PROMPT_TOKENS: usize = 10;

/// Streaming chat completion chunk carrying a delta (OpenAI-compatible).
/// Field order mirrors the wire format of the provider being imitated.
#[derive(Debug, Serialize)]
pub struct DeltaChunk {
    pub choices: Vec<DeltaChoice>,
    pub created: u64,
    pub id: String,
    pub model: String,
    pub object: String,
    pub system_fingerprint: String,
}

#[derive(Debug, Serialize)]
pub struct DeltaChoice {
    pub delta: Delta,
    pub finish_reason: Option<String>,
    pub index: usize,
    pub logprobs: Option<()>,
}

#[derive(Debug, Default, Serialize)]
pub struct Delta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Azure-style content-filter chunk. All identifying fields are blank by
/// contract: this frame is a fixed constant, not tied to the request.
#[derive(Debug, Serialize)]
pub struct ContentFilterChunk {
    pub choices: Vec<ContentFilterChoice>,
    pub created: u64,
    pub id: String,
    pub model: String,
    pub object: String,
}

#[derive(Debug, Serialize)]
pub struct ContentFilterChoice {
    pub content_filter_offsets: ContentFilterOffsets,
    pub content_filter_results: ContentFilterResults,
    pub finish_reason: Option<String>,
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct ContentFilterOffsets {
    pub check_offset: u64,
    pub start_offset: u64,
    pub end_offset: u64,
}

#[derive(Debug, Serialize)]
pub struct ContentFilterResults {
    pub hate: FilterResult,
    pub self_harm: FilterResult,
    pub sexual: FilterResult,
    pub violence: FilterResult,
}

#[derive(Debug, Serialize)]
pub struct FilterResult {
    pub filtered: bool,
    pub severity: String,
}

/// Usage accounting chunk, the last data-bearing frame of a stream.
#[derive(Debug, Serialize)]
pub struct UsageChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<DeltaChoice>,
    pub usage: Usage,
}

/// One step of the emission sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Opens the assistant turn: `delta: {content: "", role: "assistant"}`.
    Role,
    /// One character of the reply text.
    Content(char),
    /// `delta: {}` with `finish_reason: "stop"`.
    Finish,
    /// Constant safe content-filter block.
    ContentFilter,
    /// Token accounting; `created` advances by +3 seconds.
    Usage,
    /// Terminal `[DONE]` sentinel.
    Done,
}

impl Frame {
    /// Content frames are the only ones followed by a pacing delay.
    pub fn is_content(&self) -> bool {
        matches!(self, Frame::Content(_))
    }

    /// Render this frame's SSE data payload.
    pub fn render(&self, spec: &StreamSpec) -> String {
        match self {
            Frame::Role => delta_payload(
                spec,
                Delta {
                    content: Some(String::new()),
                    role: Some("assistant".to_string()),
                },
                None,
            ),
            Frame::Content(c) => delta_payload(
                spec,
                Delta {
                    content: Some(c.to_string()),
                    role: None,
                },
                None,
            ),
            Frame::Finish => delta_payload(spec, Delta::default(), Some("stop".to_string())),
            Frame::ContentFilter => {
                let chunk = ContentFilterChunk {
                    choices: vec![ContentFilterChoice {
                        content_filter_offsets: ContentFilterOffsets {
                            check_offset: 40,
                            start_offset: 40,
                            end_offset: 156,
                        },
                        content_filter_results: ContentFilterResults {
                            hate: FilterResult::safe(),
                            self_harm: FilterResult::safe(),
                            sexual: FilterResult::safe(),
                            violence: FilterResult::safe(),
                        },
                        finish_reason: None,
                        index: 0,
                    }],
                    created: 0,
                    id: String::new(),
                    model: String::new(),
                    object: String::new(),
                };
                serde_json::to_string(&chunk).unwrap_or_default()
            }
            Frame::Usage => {
                let completion_tokens = completion_tokens_for(&spec.reply);
                let chunk = UsageChunk {
                    id: spec.id.clone(),
                    object: "chat.completion.chunk".to_string(),
                    created: spec.created + 3,
                    model: spec.model.clone(),
                    choices: vec![],
                    usage: Usage {
                        prompt_tokens: USAGE_PROMPT_TOKENS,
                        completion_tokens,
                        total_tokens: USAGE_PROMPT_TOKENS + completion_tokens,
                    },
                };
                serde_json::to_string(&chunk).unwrap_or_default()
            }
            Frame::Done => "[DONE]".to_string(),
        }
    }
}

impl FilterResult {
    fn safe() -> Self {
        Self {
            filtered: false,
            severity: "safe".to_string(),
        }
    }
}

fn delta_payload(spec: &StreamSpec, delta: Delta, finish_reason: Option<String>) -> String {
    let chunk = DeltaChunk {
        choices: vec![DeltaChoice {
            delta,
            finish_reason,
            index: 0,
            logprobs: None,
        }],
        created: spec.created,
        id: spec.id.clone(),
        model: spec.model.clone(),
        object: "chat.completion.chunk".to_string(),
        // Regenerated per frame, matching the provider quirk being imitated.
        system_fingerprint: ids::system_fingerprint(),
    };
    serde_json::to_string(&chunk).unwrap_or_default()
}

/// Usage-frame completion tokens: ceil(character count / 2).
fn completion_tokens_for(reply: &str) -> usize {
    (reply.chars().count() + 1) / 2
}

/// Build the full emission sequence for a reply text.
pub fn frame_plan(reply: &str) -> Vec<Frame> {
    let mut plan = Vec::with_capacity(reply.chars().count() + 5);
    plan.push(Frame::Role);
    plan.extend(reply.chars().map(Frame::Content));
    plan.push(Frame::Finish);
    plan.push(Frame::ContentFilter);
    plan.push(Frame::Usage);
    plan.push(Frame::Done);
    plan
}

/// Drive the frame plan as an SSE event stream.
///
/// Frames are written strictly in order; a `delay` sleep follows each content
/// frame. Dropping the returned stream aborts emission and its pending timer.
pub fn sse_stream(
    spec: StreamSpec,
    delay: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let plan = frame_plan(&spec.reply);

    async_stream::stream! {
        for frame in plan {
            let pace = frame.is_content();
            yield Ok(Event::default().data(frame.render(&spec)));
            if pace {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    fn spec(reply: &str) -> StreamSpec {
        StreamSpec {
            id: "chatcmpl-test".to_string(),
            created: 1_700_000_000,
            model: "gpt-4".to_string(),
            reply: reply.to_string(),
        }
    }

    fn parse(frame: &Frame, spec: &StreamSpec) -> serde_json::Value {
        serde_json::from_str(&frame.render(spec)).unwrap()
    }

    #[test]
    fn test_frame_plan_ordering() {
        let plan = frame_plan("hi");
        assert_eq!(
            plan,
            vec![
                Frame::Role,
                Frame::Content('h'),
                Frame::Content('i'),
                Frame::Finish,
                Frame::ContentFilter,
                Frame::Usage,
                Frame::Done,
            ]
        );
    }

    #[test]
    fn test_frame_plan_one_frame_per_character() {
        let reply = "你好！有什么可以帮助你的吗？";
        let plan = frame_plan(reply);
        let content: String = plan
            .iter()
            .filter_map(|f| match f {
                Frame::Content(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(content, reply);
        assert_eq!(plan.len(), reply.chars().count() + 5);
    }

    #[test]
    fn test_role_frame_shape() {
        let spec = spec("hi");
        let value = parse(&Frame::Role, &spec);

        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["id"], "chatcmpl-test");
        assert_eq!(value["model"], "gpt-4");
        assert_eq!(value["created"], 1_700_000_000u64);

        let choice = &value["choices"][0];
        assert_eq!(choice["delta"]["content"], "");
        assert_eq!(choice["delta"]["role"], "assistant");
        assert!(choice["finish_reason"].is_null());
        assert!(choice["logprobs"].is_null());
        assert_eq!(choice["index"], 0);

        let fp = value["system_fingerprint"].as_str().unwrap();
        assert!(fp.starts_with("fp_"));
    }

    #[test]
    fn test_content_frame_shape() {
        let spec = spec("hi");
        let value = parse(&Frame::Content('好'), &spec);

        let delta = &value["choices"][0]["delta"];
        assert_eq!(delta["content"], "好");
        assert!(delta.get("role").is_none());
        assert!(value["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn test_finish_frame_shape() {
        let spec = spec("hi");
        let value = parse(&Frame::Finish, &spec);

        let choice = &value["choices"][0];
        assert_eq!(choice["delta"], serde_json::json!({}));
        assert_eq!(choice["finish_reason"], "stop");
    }

    #[test]
    fn test_fingerprint_fresh_per_frame() {
        let spec = spec("hi");
        let a = parse(&Frame::Role, &spec)["system_fingerprint"].clone();
        let b = parse(&Frame::Role, &spec)["system_fingerprint"].clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_filter_frame_is_constant() {
        let spec = spec("anything at all");
        let value = parse(&Frame::ContentFilter, &spec);

        assert_eq!(value["created"], 0);
        assert_eq!(value["id"], "");
        assert_eq!(value["model"], "");
        assert_eq!(value["object"], "");
        assert!(value.get("system_fingerprint").is_none());

        let choice = &value["choices"][0];
        assert_eq!(choice["content_filter_offsets"]["check_offset"], 40);
        assert_eq!(choice["content_filter_offsets"]["start_offset"], 40);
        assert_eq!(choice["content_filter_offsets"]["end_offset"], 156);
        for category in ["hate", "self_harm", "sexual", "violence"] {
            assert_eq!(choice["content_filter_results"][category]["filtered"], false);
            assert_eq!(choice["content_filter_results"][category]["severity"], "safe");
        }
        assert!(choice["finish_reason"].is_null());
    }

    #[test]
    fn test_usage_frame_shape() {
        let spec = spec("hello");
        let value = parse(&Frame::Usage, &spec);

        assert_eq!(value["id"], "chatcmpl-test");
        assert_eq!(value["model"], "gpt-4");
        // Usage is computed "slightly after" completion: timestamp + 3.
        assert_eq!(value["created"], 1_700_000_003u64);
        assert_eq!(value["choices"], serde_json::json!([]));

        // ceil(5 / 2) == 3
        assert_eq!(value["usage"]["prompt_tokens"], 10);
        assert_eq!(value["usage"]["completion_tokens"], 3);
        assert_eq!(value["usage"]["total_tokens"], 13);
    }

    #[test]
    fn test_usage_ceil_for_every_default_candidate() {
        let mock = crate::config::MockConfig::default();
        assert_eq!(mock.replies.len(), 4);

        for reply in &mock.replies {
            let chars = reply.chars().count();
            let expected = chars / 2 + chars % 2;

            let value = parse(&Frame::Usage, &spec(reply));
            assert_eq!(value["usage"]["completion_tokens"], expected as u64);
            assert_eq!(value["usage"]["total_tokens"], (10 + expected) as u64);
        }
    }

    #[test]
    fn test_delta_concatenation_reproduces_reply() {
        let reply = "嗨！我是 AI 助手，有什么我可以帮你的吗？";
        let spec = spec(reply);

        let mut assembled = String::new();
        for frame in frame_plan(reply) {
            if let Frame::Content(_) = frame {
                let value = parse(&frame, &spec);
                assembled.push_str(value["choices"][0]["delta"]["content"].as_str().unwrap());
            }
        }
        assert_eq!(assembled, reply);
    }

    #[test]
    fn test_done_renders_bare_sentinel() {
        assert_eq!(Frame::Done.render(&spec("hi")), "[DONE]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_emits_all_frames_with_pacing() {
        let reply = "hello";
        let k = reply.chars().count();
        let start = tokio::time::Instant::now();

        let stream = sse_stream(spec(reply), Duration::from_millis(50));
        tokio::pin!(stream);

        let mut frames = 0;
        while stream.next().await.is_some() {
            frames += 1;
        }

        assert_eq!(frames, k + 5);
        // One 50ms suspension per content frame; the paused clock advances
        // exactly through the timers.
        assert!(start.elapsed() >= Duration::from_millis(50 * k as u64));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_stream_stops_emission() {
        let stream = sse_stream(spec("hello"), Duration::from_millis(50));

        // Client goes away after three frames.
        let observed: Vec<_> = stream.take(3).collect().await;
        assert_eq!(observed.len(), 3);
    }
}
