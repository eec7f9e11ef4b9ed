//! The chat-completion response emulator.
//!
//! - [`selector`]: decides non-streaming object vs. streamed sequence and
//!   picks the reply text
//! - [`emitter`]: produces the ordered SSE frame sequence for a stream
//! - [`ids`]: completion-id, fingerprint, and timestamp helpers

pub mod emitter;
pub mod ids;
pub mod selector;
