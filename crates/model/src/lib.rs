//! An abstraction layer for the chat relay.
//!
//! This crate establishes the protocol between the conversation session
//! and the backend relay proxy, so that the session logic can be tested
//! against a scripted provider without touching the network.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.
//!
//! Users of this crate may add some extra functionalities or wrappers,
//! depending on their own use cases. Those extra code should be placed
//! in their own crate.

#![deny(missing_docs)]

mod collaborators;
mod conversation;
mod error;
mod event;
mod message;
mod provider;

pub use collaborators::*;
pub use conversation::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use provider::*;
