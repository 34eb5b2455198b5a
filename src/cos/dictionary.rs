//! COS dictionaries
use super::name::Name;
use super::value::{self, ComparedPairs, Value};
use crate::error::Result;
use crate::observer::{self, MutationEvent, MutationObserver, ObserverId, ObserverList, Slot};
use crate::update::{self, UpdateInfo, UpdateState};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct DictionaryInner {
    entries: Vec<(Name, Value)>,
    update: UpdateState,
    observers: ObserverList,
}

/// Shared handle to a dictionary.
///
/// Keys are unique and keep their insertion order, which is the order they
/// are written back in.
#[derive(Clone, Default)]
pub struct CosDictionary(Rc<RefCell<DictionaryInner>>);

impl CosDictionary {
    /// An empty dictionary, not yet part of any document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dictionary without recording any change; for parsers and
    /// literal construction. A repeated key keeps its last value.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<Name>,
    {
        let mut collected: Vec<(Name, Value)> = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            match collected.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => collected.push((key, value)),
            }
        }
        Self(Rc::new(RefCell::new(DictionaryInner {
            entries: collected,
            ..DictionaryInner::default()
        })))
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.borrow().entries.len()
    }

    /// Returns true if the dictionary has no entries
    pub fn is_empty(&self) -> bool {
        self.0.borrow().entries.is_empty()
    }

    /// Whether `key` has an entry, even one holding `null`
    pub fn contains_key(&self, key: &Name) -> bool {
        self.0.borrow().entries.iter().any(|(k, _)| k == key)
    }

    /// The stored value, references left unresolved
    pub fn get(&self, key: &Name) -> Option<Value> {
        self.0
            .borrow()
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// The stored value with a reference followed to its target
    pub fn get_resolved(&self, key: &Name) -> Option<Value> {
        self.get(key).map(|value| value.dereference())
    }

    /// The resolved value of `key` if it is an integer
    pub fn get_i64(&self, key: &Name) -> Option<i64> {
        self.get_resolved(key).and_then(|v| v.as_i64())
    }

    /// The resolved value of `key` if it is a name
    pub fn get_name(&self, key: &Name) -> Option<Name> {
        self.get_resolved(key).and_then(|v| v.as_name().cloned())
    }

    /// Keys in insertion order
    pub fn keys(&self) -> Vec<Name> {
        self.0.borrow().entries.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Snapshot of every entry in insertion order, references left
    /// unresolved
    pub fn entries(&self) -> Vec<(Name, Value)> {
        self.0.borrow().entries.clone()
    }

    /// Insert or replace an entry
    pub fn set(&self, key: impl Into<Name>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let (old, subscribers) = {
            let mut inner = self.0.borrow_mut();
            let old = match inner.entries.iter().position(|(k, _)| *k == key) {
                Some(index) => Some(std::mem::replace(&mut inner.entries[index].1, value.clone())),
                None => {
                    inner.entries.push((key.clone(), value.clone()));
                    None
                }
            };
            (old, inner.observers.snapshot())
        };
        update::record_child(self, &value);
        if subscribers.is_empty() {
            return Ok(());
        }
        observer::deliver(
            &subscribers,
            &MutationEvent::Replace {
                container: Value::Dictionary(self.clone()),
                slot: Slot::Key(key),
                old,
                new: value,
            },
        )
    }

    /// Remove the entry for `key` and return its value.
    ///
    /// A missing key is not a change: nothing is marked and no observer
    /// is called.
    pub fn remove(&self, key: &Name) -> Result<Option<Value>> {
        let (removed, subscribers) = {
            let mut inner = self.0.borrow_mut();
            let position = inner.entries.iter().position(|(k, _)| k == key);
            let removed = position.map(|index| inner.entries.remove(index));
            (removed, inner.observers.snapshot())
        };
        let Some((key, value)) = removed else {
            return Ok(None);
        };
        update::record_child(self, &value);
        if !subscribers.is_empty() {
            observer::deliver(
                &subscribers,
                &MutationEvent::Remove {
                    container: Value::Dictionary(self.clone()),
                    removed: vec![(Slot::Key(key), value.clone())],
                },
            )?;
        }
        Ok(Some(value))
    }

    /// Remove every entry; observers get one `Remove` event listing them all
    pub fn clear(&self) -> Result<()> {
        let (removed, subscribers) = {
            let mut inner = self.0.borrow_mut();
            (std::mem::take(&mut inner.entries), inner.observers.snapshot())
        };
        if removed.is_empty() {
            return Ok(());
        }
        update::record(self);
        if subscribers.is_empty() {
            return Ok(());
        }
        observer::deliver(
            &subscribers,
            &MutationEvent::Remove {
                container: Value::Dictionary(self.clone()),
                removed: removed
                    .into_iter()
                    .map(|(k, v)| (Slot::Key(k), v))
                    .collect(),
            },
        )
    }

    /// Register `observer` for every later mutation of this dictionary
    pub fn subscribe(&self, observer: Rc<dyn MutationObserver>) -> ObserverId {
        self.0.borrow_mut().observers.subscribe(observer)
    }

    /// Returns whether `id` was subscribed
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.0.borrow_mut().observers.unsubscribe(id)
    }

    /// Number of subscribed observers
    pub fn observer_count(&self) -> usize {
        self.0.borrow().observers.len()
    }
}

impl UpdateInfo for CosDictionary {
    fn update_state(&self) -> Ref<'_, UpdateState> {
        Ref::map(self.0.borrow(), |inner| &inner.update)
    }

    fn update_state_mut(&self) -> RefMut<'_, UpdateState> {
        RefMut::map(self.0.borrow_mut(), |inner| &mut inner.update)
    }

    fn direct_children(&self) -> Vec<Value> {
        self.0.borrow().entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

impl CosDictionary {
    pub(crate) fn eq_with(&self, other: &Self, seen: &mut ComparedPairs) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) || !seen.insert((self.identity(), other.identity())) {
            return true;
        }
        let a = self.0.borrow();
        let b = other.0.borrow();
        a.entries.len() == b.entries.len()
            && a.entries.iter().all(|(key, mine)| {
                b.entries
                    .iter()
                    .find(|(k, _)| k == key)
                    .is_some_and(|(_, theirs)| value::structural_eq(mine, theirs, seen))
            })
    }
}

impl PartialEq for CosDictionary {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut ComparedPairs::new())
    }
}

impl fmt::Debug for CosDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        value::debug_nested(f, |f| {
            let inner = self.0.borrow();
            f.debug_map()
                .entries(inner.entries.iter().map(|(k, v)| (k.as_str(), v)))
                .finish()
        })
    }
}
