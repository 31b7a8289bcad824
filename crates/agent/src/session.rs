//! Session history for long-running mode.
//!
//! A bounded FIFO of user/assistant turns. The daemon owns one buffer and
//! feeds its snapshot into every request.

use neo_core::message::{Message, Role};
use std::collections::VecDeque;

/// Hard ceiling on stored turns, independent of the configured window.
pub const SESSION_CEILING: usize = 64;

/// Ordered conversation turns, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SessionBuffer {
    turns: VecDeque<Message>,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end, evicting the oldest when at the ceiling.
    ///
    /// If memory for the turn cannot be reserved, the turn is dropped and
    /// the buffer is left as it was.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        if self.turns.len() < SESSION_CEILING && self.turns.try_reserve(1).is_err() {
            tracing::warn!("Session turn dropped: allocation failed");
            return;
        }
        if self.turns.len() >= SESSION_CEILING {
            self.turns.pop_front();
        }
        self.turns.push_back(Message::new(role, content));
    }

    /// Evict oldest turns until at most `2 * max_turns` remain.
    /// Returns the number evicted.
    pub fn trim_to_turns(&mut self, max_turns: usize) -> usize {
        let limit = max_turns.saturating_mul(2);
        let mut evicted = 0;
        while self.turns.len() > limit {
            self.turns.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::debug!(evicted, kept = self.turns.len(), "Session trimmed");
        }
        evicted
    }

    /// The turns to send with the next request, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_keeps_order() {
        let mut session = SessionBuffer::new();
        session.append(Role::User, "hi");
        session.append(Role::Assistant, "hello");
        let snap = session.snapshot();
        assert_eq!(snap, vec![Message::user("hi"), Message::assistant("hello")]);
    }

    #[test]
    fn ceiling_evicts_oldest() {
        let mut session = SessionBuffer::new();
        for i in 0..(SESSION_CEILING + 3) {
            session.append(Role::User, format!("turn {i}"));
        }
        assert_eq!(session.len(), SESSION_CEILING);
        let snap = session.snapshot();
        assert_eq!(snap[0].content, "turn 3");
        assert_eq!(snap[SESSION_CEILING - 1].content, format!("turn {}", SESSION_CEILING + 2));
    }

    #[test]
    fn trim_keeps_newest_pairs() {
        let mut session = SessionBuffer::new();
        for i in 0..5 {
            session.append(Role::User, format!("q{i}"));
            session.append(Role::Assistant, format!("a{i}"));
        }
        assert_eq!(session.trim_to_turns(2), 6);
        let contents: Vec<_> = session.snapshot().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn trim_within_limit_is_noop() {
        let mut session = SessionBuffer::new();
        session.append(Role::User, "q");
        session.append(Role::Assistant, "a");
        assert_eq!(session.trim_to_turns(10), 0);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn window_bounded_after_many_exchanges() {
        let mut session = SessionBuffer::new();
        let max_turns = 3;
        for i in 0..40 {
            session.append(Role::User, format!("q{i}"));
            session.append(Role::Assistant, format!("a{i}"));
            session.trim_to_turns(max_turns);
            assert!(session.len() <= 2 * max_turns);
        }
        assert_eq!(session.snapshot()[0].content, "q37");
    }

    #[test]
    fn trim_to_zero_empties() {
        let mut session = SessionBuffer::new();
        session.append(Role::User, "q");
        session.trim_to_turns(0);
        assert!(session.is_empty());
    }
}
