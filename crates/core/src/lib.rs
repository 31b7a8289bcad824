//! # neo core
//!
//! Domain types, traits, and error definitions for the neo chat agent.
//! This crate has no I/O of its own: it defines the model that the config,
//! provider, channel and agent crates implement against.
//!
//! - [`message`]: role-tagged turns exchanged with the model
//! - [`skill`]: skill entries and the unmatched-skill policy
//! - [`provider`]: the upstream chat-completion abstraction
//! - [`channel`]: inbound transports used by the daemon

pub mod channel;
pub mod error;
pub mod message;
pub mod provider;
pub mod skill;

// Re-export key types at crate root for ergonomics
pub use channel::{Channel, ChannelMessage, ReplyHandle};
pub use error::{ChannelError, Error, ProviderError, Result};
pub use message::{Message, Role};
pub use provider::{GenerationParams, Provider, ProviderRequest, ProviderResponse};
pub use skill::{SkillEntry, SkillPriority, UnmatchedPolicy};
