//! Slack collaborator: inbound event payloads, the reply sink, the
//! prompt-to-image handler, and the bounded job limiter.
//!
//! The contract with the chat layer is deliberately narrow: text comes
//! in with a destination (channel + optional thread), zero or more reply
//! posts go out, and every failure becomes a plain-text error reply
//! instead of a fault escaping into the event-handling task.

pub mod events;
pub mod handler;
pub mod limiter;
pub mod reply;

pub use handler::Generator;
pub use limiter::{Busy, JobLimiter};
pub use reply::{SlackClient, SlackError};
