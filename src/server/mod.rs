//! HTTP server providing the mocked OpenAI-compatible API.
//!
//! - [`openai_api`]: Request routing, handlers, and the API error type

pub mod openai_api;
