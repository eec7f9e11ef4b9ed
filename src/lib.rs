//! chat-mock: a protocol-faithful mock of the OpenAI chat completions API.
//!
//! Serves canned assistant replies over the real wire contract: a single
//! `chat.completion` JSON object, or a token-by-token SSE stream of
//! `chat.completion.chunk` frames ending in the `[DONE]` sentinel, without
//! running any model. Intended for integration-testing clients and demos
//! against a backend that behaves like a hosted provider but costs nothing.

pub mod config;
pub mod mock;
pub mod server;
