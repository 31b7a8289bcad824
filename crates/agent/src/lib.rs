//! The exchange pipeline for neo.
//!
//! Every exchange runs the same strictly sequential steps:
//!
//! 1. **Assemble** the system prompt from skills, bootstrap files and memory
//! 2. **Send** `[system] + history + [user]` to the provider
//! 3. **Record** the user/assistant pair in the session (daemon mode only)
//!
//! A failed exchange never touches the session.

pub mod context;
pub mod runner;
pub mod session;

pub use context::{
    AssembledPrompt, DropInfo, DropReason, InclusionMode, PromptAssembler, PromptSources,
    SectionKind, SectionStats, SkillMatcher,
};
pub use runner::{AgentRunner, PreparedExchange};
pub use session::{SessionBuffer, SESSION_CEILING};
