//! Skill entries: documents the assistant may consult.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Inclusion tier of a skill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillPriority {
    /// Full content only when the user's text matches; otherwise per [`UnmatchedPolicy`]
    #[default]
    Normal,
    /// Always injected in full, ahead of bootstrap files
    High,
}

/// What to do with a normal-priority skill the user's text does not match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Inject a short leading excerpt of the skill
    #[default]
    Index,
    /// Leave the skill out entirely
    Skip,
}

/// A skill document, unique by path within one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub path: PathBuf,

    #[serde(default)]
    pub priority: SkillPriority,
}

impl SkillEntry {
    pub fn new(path: impl Into<PathBuf>, priority: SkillPriority) -> Self {
        Self {
            path: path.into(),
            priority,
        }
    }

    pub fn normal(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SkillPriority::Normal)
    }

    pub fn high(path: impl Into<PathBuf>) -> Self {
        Self::new(path, SkillPriority::High)
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority == SkillPriority::High
    }

    /// The skill's name: the directory that holds its document.
    pub fn name(&self) -> Option<&str> {
        skill_name(&self.path)
    }
}

/// Derive a skill name from its document path.
///
/// `skills/nanjing/SKILL.md` → `nanjing`. A bare file name has no
/// enclosing directory and therefore no name.
pub fn skill_name(path: &Path) -> Option<&str> {
    path.parent()?
        .file_name()?
        .to_str()
        .filter(|name| !name.is_empty())
}
