//! Conversation session logic: the relay client wrapper, the delta
//! accumulator, the busy-flag guard, and post-stream side effects.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod accumulator;
mod client;
mod session;
mod voice;

pub use accumulator::DeltaLog;
pub use client::{RelayClient, RelayOutcome};
pub use session::{ChatSession, ChatSessionBuilder, SessionError};
