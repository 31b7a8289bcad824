//! Skill matcher: decides whether a skill earns its full content.
//!
//! A skill matches when its name occurs in the user's text (ignoring case)
//! or when one of its bundled trigger keywords occurs verbatim.

use neo_core::skill::skill_name;
use std::path::Path;

/// Bundled trigger keywords per skill name. Keywords are literal substrings.
pub const SKILL_KEYWORDS: &[(&str, &[&str])] = &[
    ("nanjing", &["南京"]),
    ("summarize", &["总结"]),
    ("note", &["记住", "笔记"]),
    ("todo", &["待办", "任务"]),
    ("me", &["谁", "身份", "介绍"]),
    ("explain", &["解释", "什么意思", "怎么用"]),
    ("code", &["代码", "脚本", "命令", "怎么写"]),
    ("translate", &["翻译", "译成"]),
];

/// Name and keyword matcher over a closed keyword table.
#[derive(Debug, Clone, Copy)]
pub struct SkillMatcher {
    keywords: &'static [(&'static str, &'static [&'static str])],
}

impl Default for SkillMatcher {
    fn default() -> Self {
        Self::new(SKILL_KEYWORDS)
    }
}

impl SkillMatcher {
    pub fn new(keywords: &'static [(&'static str, &'static [&'static str])]) -> Self {
        Self { keywords }
    }

    /// Trigger keywords for a skill name; empty when the name is not in the table.
    pub fn keywords_for(&self, name: &str) -> &'static [&'static str] {
        self.keywords
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, kws)| *kws)
            .unwrap_or(&[])
    }

    /// Does the skill at `path` match `user_text`?
    ///
    /// A path without an enclosing directory has no name and never matches.
    pub fn matches(&self, path: &Path, user_text: &str) -> bool {
        let Some(name) = skill_name(path) else {
            return false;
        };

        if user_text.to_lowercase().contains(&name.to_lowercase()) {
            return true;
        }

        self.keywords_for(name)
            .iter()
            .any(|kw| !kw.is_empty() && user_text.contains(kw))
    }
}
