//! Observer lists for pet lifecycle events.
//!
//! Each lifecycle event gets its own statically typed list. Callbacks run in
//! registration order on the simulation thread, inside the tick that raised
//! the event.

use std::fmt;

use familiar_common::{EntityId, Timestamp};

use crate::pet::PetState;

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of callbacks for one event payload type.
pub struct HookList<E> {
    callbacks: Vec<Callback<E>>,
}

impl<E> Default for HookList<E> {
    fn default() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for HookList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl<E> HookList<E> {
    /// Appends a callback. It runs after every callback registered before it.
    pub fn register(&mut self, callback: impl FnMut(&E) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    /// Invokes every callback with `event`.
    pub fn emit(&mut self, event: &E) {
        for callback in &mut self.callbacks {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Payload of a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanged {
    /// Pet that transitioned
    pub pet: EntityId,
    /// State before the tick
    pub from: PetState,
    /// State after the tick
    pub to: PetState,
}

/// Payload of a level increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    /// Pet that leveled
    pub pet: EntityId,
    /// New level
    pub level: u32,
    /// Experience left over after the increment
    pub experience: i64,
}

/// Payload of a death.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Died {
    /// Pet that died
    pub pet: EntityId,
    /// When the corpse may be destroyed
    pub death_time_end: Timestamp,
}

/// Lifecycle hooks for a pet.
#[derive(Debug, Default)]
pub struct PetHooks {
    /// Fired when a tick ends in a different state than it started
    pub state_changed: HookList<StateChanged>,
    /// Fired once per level gained
    pub level_up: HookList<LevelUp>,
    /// Fired by the death procedure
    pub died: HookList<Died>,
    /// Fired when the pet asks the simulation to remove it
    pub destroy_requested: HookList<EntityId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_emit_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks: HookList<u32> = HookList::default();

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            hooks.register(move |value| seen.lock().push((tag, *value)));
        }
        assert_eq!(hooks.len(), 3);

        hooks.emit(&7);
        assert_eq!(
            *seen.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_empty_list_is_inert() {
        let mut hooks: HookList<EntityId> = HookList::default();
        assert!(hooks.is_empty());
        hooks.emit(&EntityId::from_raw(1));
        assert_eq!(format!("{hooks:?}"), "HookList { callbacks: 0 }");
    }

    #[test]
    fn test_callbacks_keep_state() {
        let mut hooks = PetHooks::default();
        let counter = Arc::new(Mutex::new(0));
        let c = Arc::clone(&counter);
        hooks.level_up.register(move |_| *c.lock() += 1);

        let event = LevelUp {
            pet: EntityId::from_raw(2),
            level: 3,
            experience: 0,
        };
        hooks.level_up.emit(&event);
        hooks.level_up.emit(&event);
        assert_eq!(*counter.lock(), 2);
    }
}
