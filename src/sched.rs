//! Deadline-ordered queue for deferred UI actions.
//!
//! The overlay defers small bits of work - height recomputes after a chunk
//! lands, focus retries while the panel materializes. Instead of scattering
//! timer state across the event loop, actions are queued here with an
//! explicit deadline and drained against a caller-supplied clock, which keeps
//! the scheduling testable by simulating time.

use std::time::Instant;

/// A queue of `(deadline, action)` pairs drained in deadline order.
#[derive(Debug)]
pub struct DeferredQueue<A> {
    entries: Vec<(Instant, A)>,
}

impl<A> DeferredQueue<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Queue `action` to run at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, action: A) {
        self.entries.push((deadline, action));
    }

    /// Remove and return every action whose deadline has passed, ordered by
    /// deadline. Later-scheduled actions with identical deadlines keep their
    /// insertion order.
    pub fn due(&mut self, now: Instant) -> Vec<A> {
        let mut ready = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());
        for (idx, (deadline, action)) in self.entries.drain(..).enumerate() {
            if deadline <= now {
                ready.push((deadline, idx, action));
            } else {
                remaining.push((deadline, action));
            }
        }
        self.entries = remaining;
        ready.sort_by_key(|(deadline, idx, _)| (*deadline, *idx));
        ready.into_iter().map(|(_, _, action)| action).collect()
    }

    /// Earliest pending deadline, if any. Lets the event loop shorten its
    /// idle timeout when work is imminent.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(deadline, _)| *deadline).min()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Action {
        Height,
        Focus(u8),
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut queue = DeferredQueue::new();
        let now = Instant::now();
        queue.schedule(now + Duration::from_millis(10), Action::Height);
        assert!(queue.due(now).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn due_drains_in_deadline_order() {
        let mut queue = DeferredQueue::new();
        let now = Instant::now();
        queue.schedule(now + Duration::from_millis(150), Action::Focus(2));
        queue.schedule(now, Action::Focus(0));
        queue.schedule(now + Duration::from_millis(50), Action::Focus(1));
        let due = queue.due(now + Duration::from_millis(200));
        assert_eq!(due, vec![Action::Focus(0), Action::Focus(1), Action::Focus(2)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn partial_drain_keeps_future_entries() {
        let mut queue = DeferredQueue::new();
        let now = Instant::now();
        queue.schedule(now + Duration::from_millis(10), Action::Height);
        queue.schedule(now + Duration::from_millis(400), Action::Focus(3));
        let due = queue.due(now + Duration::from_millis(10));
        assert_eq!(due, vec![Action::Height]);
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.next_deadline(),
            Some(now + Duration::from_millis(400))
        );
    }

    #[test]
    fn identical_deadlines_keep_insertion_order() {
        let mut queue = DeferredQueue::new();
        let now = Instant::now();
        queue.schedule(now, Action::Focus(0));
        queue.schedule(now, Action::Focus(1));
        queue.schedule(now, Action::Focus(2));
        let due = queue.due(now);
        assert_eq!(due, vec![Action::Focus(0), Action::Focus(1), Action::Focus(2)]);
    }

    #[test]
    fn clear_discards_everything() {
        let mut queue = DeferredQueue::new();
        let now = Instant::now();
        queue.schedule(now, Action::Height);
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.due(now).is_empty());
    }

    #[test]
    fn simulated_focus_retry_schedule() {
        // Mirrors the focus-acquisition backoff: immediate, then increasing delays.
        let mut queue = DeferredQueue::new();
        let start = Instant::now();
        for (attempt, delay_ms) in [0u64, 50, 150, 400].iter().enumerate() {
            queue.schedule(
                start + Duration::from_millis(*delay_ms),
                Action::Focus(attempt as u8),
            );
        }
        assert_eq!(queue.due(start), vec![Action::Focus(0)]);
        assert_eq!(
            queue.due(start + Duration::from_millis(200)),
            vec![Action::Focus(1), Action::Focus(2)]
        );
        assert_eq!(
            queue.due(start + Duration::from_millis(500)),
            vec![Action::Focus(3)]
        );
        assert!(queue.is_empty());
    }
}
