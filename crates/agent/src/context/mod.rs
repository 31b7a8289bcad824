//! System prompt construction.
//!
//! | Step | Module | Role |
//! |------|--------|------|
//! | Read | [`reader`] | Bounded, line-granular file reads |
//! | Match | [`matcher`] | Full content or index for a normal skill |
//! | Assemble | [`assembler`] | Fixed-order, capacity-bounded prompt |

pub mod assembler;
pub mod matcher;
pub mod reader;

pub use assembler::{
    AssembledPrompt, DropInfo, DropReason, InclusionMode, PromptAssembler, PromptSources,
    SectionKind, SectionStats, SKILL_FULL_CHARS, SKILL_INDEX_CHARS, SYSTEM_PROMPT_CAPACITY,
};
pub use matcher::{SkillMatcher, SKILL_KEYWORDS};
pub use reader::read_bounded;
