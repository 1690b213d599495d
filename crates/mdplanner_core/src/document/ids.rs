//! Per-kind identifier allocation.
//!
//! # Invariants
//! - A reserved id is strictly greater than every id of the same kind in
//!   the document, every id handed out earlier in this process for the same
//!   path, and the persisted counter when one is attached.
//! - Allocation only happens while the document write lock is held.

use super::write_safety::LockState;
use crate::model::EntityKind;

/// Durable storage of the last reserved number per entity kind.
pub trait IdCounterStore: Send {
    fn load(&mut self, kind: EntityKind) -> Option<u64>;
    fn store(&mut self, kind: EntityKind, value: u64);
}

/// Next number for `kind` given the highest number seen in the document
/// and the persisted counter value.
pub(crate) fn peek(kind: EntityKind, document_max: u64, state: &LockState, persisted: u64) -> u64 {
    document_max.max(state.counter(kind)).max(persisted) + 1
}

/// Reserves the next id for `kind`, advancing the in-process counter and
/// the persisted counter.
pub(crate) fn reserve(
    kind: EntityKind,
    document_max: u64,
    state: &mut LockState,
    store: Option<&mut dyn IdCounterStore>,
) -> String {
    let next = match store {
        Some(store) => {
            let persisted = store.load(kind).unwrap_or(0);
            let next = peek(kind, document_max, state, persisted);
            store.store(kind, next);
            next
        }
        None => peek(kind, document_max, state, 0),
    };
    state.set_counter(kind, next);
    kind.format_id(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryCounters(HashMap<EntityKind, u64>);

    impl IdCounterStore for MemoryCounters {
        fn load(&mut self, kind: EntityKind) -> Option<u64> {
            self.0.get(&kind).copied()
        }

        fn store(&mut self, kind: EntityKind, value: u64) {
            self.0.insert(kind, value);
        }
    }

    #[test]
    fn reserved_ids_never_repeat_after_deletion() {
        let mut state = LockState::default();
        assert_eq!(reserve(EntityKind::Goal, 2, &mut state, None), "goal_3");
        // The document no longer holds goal_3, but the counter remembers it.
        assert_eq!(reserve(EntityKind::Goal, 2, &mut state, None), "goal_4");
        assert_eq!(reserve(EntityKind::Note, 0, &mut state, None), "note_1");
    }

    #[test]
    fn persisted_counter_seeds_allocation() {
        let mut state = LockState::default();
        let mut counters = MemoryCounters::default();
        counters.store(EntityKind::Task, 40);
        let id = reserve(EntityKind::Task, 5, &mut state, Some(&mut counters));
        assert_eq!(id, "41");
        assert_eq!(counters.load(EntityKind::Task), Some(41));
    }
}
