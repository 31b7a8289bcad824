//! System prompt assembly.
//!
//! Builds the system prompt from four content sources in a fixed order:
//!
//! 1. **Preamble** and **timestamp** line
//! 2. **High-priority skills**, always in full
//! 3. **Bootstrap files**, in full up to the per-file cap
//! 4. **Normal skills**, in full when matched, else an index or nothing
//! 5. **Memory file**, in full up to its cap
//!
//! The prompt never exceeds its capacity. A section that would overflow is
//! dropped whole; sections already appended are never rolled back.
//!
//! # Determinism
//!
//! Given the same sources, user text, and clock reading, the output is
//! byte-identical. [`PromptAssembler::assemble_at`] takes the clock reading
//! explicitly.

use crate::context::matcher::SkillMatcher;
use crate::context::reader::read_bounded;
use chrono::{DateTime, Utc};
use neo_core::skill::{SkillEntry, UnmatchedPolicy};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Hard ceiling on the assembled prompt, in characters.
pub const SYSTEM_PROMPT_CAPACITY: usize = 256 * 1024;

/// Cap on a skill injected in full.
pub const SKILL_FULL_CHARS: usize = 32_000;

/// Cap on a skill injected as an index.
pub const SKILL_INDEX_CHARS: usize = 400;

/// Opening sentence of every system prompt.
pub const PREAMBLE: &str =
    "You are a helpful assistant. Follow any skill and bootstrap instructions below.\n\n";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

// ── Types ─────────────────────────────────────────────────────────────────

/// Everything the assembler reads from, resolved from configuration.
#[derive(Debug, Clone, Default)]
pub struct PromptSources {
    /// Resolved skills, in injection order within each tier.
    pub skills: Vec<SkillEntry>,
    pub unmatched: UnmatchedPolicy,
    pub bootstrap: Vec<PathBuf>,
    pub bootstrap_max_chars: usize,
    pub memory: Option<PathBuf>,
    pub memory_max_chars: usize,
}

impl PromptSources {
    /// Take the resolved skill, bootstrap and memory settings from config.
    pub fn from_config(config: &neo_config::AppConfig) -> Self {
        Self {
            skills: config.skills.entries.clone(),
            unmatched: config.skills.unmatched,
            bootstrap: config.bootstrap.paths.clone(),
            bootstrap_max_chars: positive_or(
                config.bootstrap.max_chars_per_file,
                neo_config::DEFAULT_BOOTSTRAP_MAX_CHARS,
            ),
            memory: config.memory.path.clone().filter(|p| !p.as_os_str().is_empty()),
            memory_max_chars: positive_or(config.memory.max_chars, neo_config::DEFAULT_MEMORY_MAX_CHARS),
        }
    }
}

fn positive_or(value: i64, default: i64) -> usize {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .unwrap_or(default as usize)
}

/// What kind of content a section carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Preamble,
    Timestamp,
    HighPrioritySkill,
    Bootstrap,
    Skill,
    Memory,
}

/// How much of a source was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionMode {
    Full,
    Index,
}

/// Why a section is absent from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The source was missing, unreadable, or empty.
    Empty,
    /// Appending it would have exceeded the capacity.
    Overflow,
    /// An unmatched skill under the `skip` policy.
    Unmatched,
}

/// A section that made it into the prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SectionStats {
    pub kind: SectionKind,
    /// Source path, or empty for unlabeled sections.
    pub label: String,
    /// Rendered length including header and separators.
    pub chars: usize,
    pub mode: InclusionMode,
}

/// A section that was left out.
#[derive(Debug, Clone, Serialize)]
pub struct DropInfo {
    pub kind: SectionKind,
    pub label: String,
    pub reason: DropReason,
}

/// The assembled system prompt plus a record of what went into it.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub text: String,
    pub sections: Vec<SectionStats>,
    pub drops: Vec<DropInfo>,
}

impl AssembledPrompt {
    /// Length of the prompt in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Was the source at `path` included, and how?
    pub fn mode_of(&self, path: &Path) -> Option<InclusionMode> {
        let label = path.to_string_lossy();
        self.sections
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.mode)
    }
}

// ── Buffer ────────────────────────────────────────────────────────────────

/// Capacity-bounded accumulator. Sections are all-or-nothing.
struct PromptBuffer {
    text: String,
    chars: usize,
    capacity: usize,
    sections: Vec<SectionStats>,
    drops: Vec<DropInfo>,
}

impl PromptBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            capacity,
            sections: Vec::new(),
            drops: Vec::new(),
        }
    }

    fn drop_section(&mut self, kind: SectionKind, label: &str, reason: DropReason) {
        tracing::debug!(?kind, label, ?reason, "Prompt section dropped");
        self.drops.push(DropInfo {
            kind,
            label: label.to_string(),
            reason,
        });
    }

    /// Append already-rendered text if it fits.
    fn push_raw(&mut self, kind: SectionKind, label: &str, rendered: &str, mode: InclusionMode) -> bool {
        let len = rendered.chars().count();
        if self.chars + len > self.capacity {
            self.drop_section(kind, label, DropReason::Overflow);
            return false;
        }
        self.text.push_str(rendered);
        self.chars += len;
        self.sections.push(SectionStats {
            kind,
            label: label.to_string(),
            chars: len,
            mode,
        });
        true
    }

    /// Render `## <title>: <label>` (or `## <title>` without a label) around
    /// `content` and append it. Empty content is never appended.
    fn push_section(
        &mut self,
        kind: SectionKind,
        title: &str,
        label: &str,
        content: &str,
        mode: InclusionMode,
    ) -> bool {
        if content.is_empty() {
            self.drop_section(kind, label, DropReason::Empty);
            return false;
        }
        let rendered = if label.is_empty() {
            format!("## {title}\n\n{content}\n\n")
        } else {
            format!("## {title}: {label}\n\n{content}\n\n")
        };
        self.push_raw(kind, label, &rendered, mode)
    }

    fn finish(self) -> AssembledPrompt {
        AssembledPrompt {
            text: self.text,
            sections: self.sections,
            drops: self.drops,
        }
    }
}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The prompt assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    capacity: usize,
    matcher: SkillMatcher,
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self {
            capacity: SYSTEM_PROMPT_CAPACITY,
            matcher: SkillMatcher::default(),
        }
    }

    /// Use a different total capacity, in characters.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_matcher(mut self, matcher: SkillMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Assemble against the current wall clock.
    pub fn assemble(&self, sources: &PromptSources, user_text: &str) -> AssembledPrompt {
        self.assemble_at(sources, user_text, Some(Utc::now()))
    }

    /// Assemble with an explicit clock reading; `None` renders "(unknown)".
    pub fn assemble_at(
        &self,
        sources: &PromptSources,
        user_text: &str,
        now: Option<DateTime<Utc>>,
    ) -> AssembledPrompt {
        let mut buf = PromptBuffer::new(self.capacity);

        buf.push_raw(SectionKind::Preamble, "", PREAMBLE, InclusionMode::Full);
        let stamp = now
            .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| "(unknown)".to_string());
        buf.push_raw(
            SectionKind::Timestamp,
            "",
            &format!("Current date and time: {stamp}\n\n"),
            InclusionMode::Full,
        );

        for skill in sources.skills.iter().filter(|s| s.is_high_priority()) {
            let label = skill.path.to_string_lossy();
            let content = read_bounded(&skill.path, SKILL_FULL_CHARS);
            buf.push_section(
                SectionKind::HighPrioritySkill,
                "Skill",
                &label,
                &content,
                InclusionMode::Full,
            );
        }

        for path in &sources.bootstrap {
            let label = path.to_string_lossy();
            let content = read_bounded(path, sources.bootstrap_max_chars);
            buf.push_section(SectionKind::Bootstrap, "Bootstrap", &label, &content, InclusionMode::Full);
        }

        for skill in sources.skills.iter().filter(|s| !s.is_high_priority()) {
            let label = skill.path.to_string_lossy();
            let mode = if self.matcher.matches(&skill.path, user_text) {
                InclusionMode::Full
            } else if sources.unmatched == UnmatchedPolicy::Skip {
                buf.drop_section(SectionKind::Skill, &label, DropReason::Unmatched);
                continue;
            } else {
                InclusionMode::Index
            };
            let cap = match mode {
                InclusionMode::Full => SKILL_FULL_CHARS,
                InclusionMode::Index => SKILL_INDEX_CHARS,
            };
            let content = read_bounded(&skill.path, cap);
            buf.push_section(SectionKind::Skill, "Skill", &label, &content, mode);
        }

        if let Some(path) = &sources.memory {
            let content = read_bounded(path, sources.memory_max_chars);
            buf.push_section(SectionKind::Memory, "Memory (context)", "", &content, InclusionMode::Full);
        }

        let assembled = buf.finish();
        tracing::debug!(
            chars = assembled.char_count(),
            capacity = self.capacity,
            sections = assembled.sections.len(),
            drops = assembled.drops.len(),
            "System prompt assembled"
        );
        assembled
    }
}
