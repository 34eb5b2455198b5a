//! Mutation observers for containers
//!
//! Arrays and dictionaries announce every structural change to their
//! subscribers before the mutating call returns. Delivery is synchronous
//! and in subscription order; the first observer error stops delivery and
//! is returned from the mutating call. The change itself has already been
//! applied at that point.
//!
//! Observers must not mutate the container they are being notified about.

use crate::cos::{Name, Value};
use crate::error::Result;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Position of an entry inside its container
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Index(usize),
    Key(Name),
}

#[derive(Debug, Clone)]
pub enum MutationEvent {
    /// An entry was set. `old` is `None` when the slot was previously empty.
    Replace {
        container: Value,
        slot: Slot,
        old: Option<Value>,
        new: Value,
    },
    Remove {
        container: Value,
        removed: Vec<(Slot, Value)>,
    },
}

impl MutationEvent {
    pub fn container(&self) -> &Value {
        match self {
            MutationEvent::Replace { container, .. } | MutationEvent::Remove { container, .. } => {
                container
            }
        }
    }
}

pub trait MutationObserver {
    fn on_mutation(&self, event: &MutationEvent) -> Result<()>;
}

impl<F> MutationObserver for F
where
    F: Fn(&MutationEvent) -> Result<()>,
{
    fn on_mutation(&self, event: &MutationEvent) -> Result<()> {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Subscribers = SmallVec<[Rc<dyn MutationObserver>; 2]>;

#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    observers: SmallVec<[(ObserverId, Rc<dyn MutationObserver>); 2]>,
}

impl ObserverList {
    pub(crate) fn subscribe(&mut self, observer: Rc<dyn MutationObserver>) -> ObserverId {
        self.next_id = self.next_id.saturating_add(1);
        let id = ObserverId(self.next_id);
        self.observers.push((id, observer));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    /// Copy of the current subscribers, so delivery runs without holding a
    /// borrow of the container
    pub(crate) fn snapshot(&self) -> Subscribers {
        self.observers
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect()
    }
}

impl fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.observers.len())
            .finish()
    }
}

pub(crate) fn deliver(observers: &[Rc<dyn MutationObserver>], event: &MutationEvent) -> Result<()> {
    for observer in observers {
        observer.on_mutation(event)?;
    }
    Ok(())
}
