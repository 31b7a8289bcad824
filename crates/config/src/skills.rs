//! Skill discovery and resolution.
//!
//! A skill directory holds one subdirectory per skill, each with a
//! `SKILL.md`. Discovered skills come first (sorted by name), explicit
//! entries follow. Duplicate paths collapse into the first occurrence.

use crate::MAX_PATHS;
use neo_core::skill::{SkillEntry, SkillPriority};
use std::path::{Path, PathBuf};

/// File name a skill directory must contain.
pub const SKILL_FILE: &str = "SKILL.md";

/// Scan `dir` for `<name>/SKILL.md`. Dot entries are skipped.
///
/// An unreadable directory yields no skills and a warning; it never fails
/// the configuration.
pub fn discover(dir: &Path) -> Vec<SkillEntry> {
    let read = match std::fs::read_dir(dir) {
        Ok(read) => read,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Skill directory unreadable");
            return vec![];
        }
    };

    let mut found: Vec<(String, PathBuf)> = read
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if name.starts_with('.') {
                return None;
            }
            let skill_file = entry.path().join(SKILL_FILE);
            skill_file.is_file().then_some((name, skill_file))
        })
        .collect();
    found.sort_by(|a, b| a.0.cmp(&b.0));

    let mut entries: Vec<SkillEntry> = found
        .into_iter()
        .map(|(_, path)| SkillEntry::normal(path))
        .collect();
    cap_list(&mut entries, "skills.directory");

    tracing::debug!(dir = %dir.display(), count = entries.len(), "Skills discovered");
    entries
}

/// Concatenate discovered and explicit entries, de-duplicating by path.
///
/// The first occurrence keeps its position; a duplicate marked high
/// priority upgrades it.
pub fn merge(discovered: Vec<SkillEntry>, explicit: Vec<SkillEntry>) -> Vec<SkillEntry> {
    let mut merged: Vec<SkillEntry> = Vec::with_capacity(discovered.len() + explicit.len());
    for entry in discovered.into_iter().chain(explicit) {
        match merged.iter_mut().find(|e| e.path == entry.path) {
            Some(existing) => {
                if entry.is_high_priority() {
                    existing.priority = SkillPriority::High;
                }
            }
            None => merged.push(entry),
        }
    }
    cap_list(&mut merged, "skills");
    merged
}

/// Promote entries named by `high_priority`.
///
/// An item matches when it equals the entry's path, equals its derived
/// name, or occurs anywhere inside the path. Empty items match nothing.
pub fn apply_high_priority(entries: &mut [SkillEntry], high_priority: &[String]) {
    for entry in entries.iter_mut() {
        if matches_high_priority(entry, high_priority) {
            entry.priority = SkillPriority::High;
        }
    }
}

fn matches_high_priority(entry: &SkillEntry, high_priority: &[String]) -> bool {
    let path = entry.path.to_string_lossy();
    let name = entry.name();
    high_priority
        .iter()
        .filter(|item| !item.is_empty())
        .any(|item| path == item.as_str() || name == Some(item.as_str()) || path.contains(item.as_str()))
}

/// Truncate a list to [`MAX_PATHS`], logging what was dropped.
pub(crate) fn cap_list<T>(list: &mut Vec<T>, field: &str) {
    if list.len() > MAX_PATHS {
        tracing::warn!(
            field,
            count = list.len(),
            max = MAX_PATHS,
            "Too many entries, extra ones ignored"
        );
        list.truncate(MAX_PATHS);
    }
}
