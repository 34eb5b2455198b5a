//! COS arrays
use super::value::{self, ComparedPairs, Value};
use crate::error::{Error, Result};
use crate::observer::{self, MutationEvent, MutationObserver, ObserverId, ObserverList, Slot};
use crate::update::{self, UpdateInfo, UpdateState};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct ArrayInner {
    items: Vec<Value>,
    update: UpdateState,
    observers: ObserverList,
}

/// Shared handle to an ordered sequence of values
#[derive(Clone, Default)]
pub struct CosArray(Rc<RefCell<ArrayInner>>);

impl CosArray {
    /// An empty array, not yet part of any document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an array without recording any change
    pub fn from_values(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(ArrayInner {
            items,
            ..ArrayInner::default()
        })))
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.borrow().items.len()
    }

    /// Returns true if the array has no elements
    pub fn is_empty(&self) -> bool {
        self.0.borrow().items.is_empty()
    }

    /// The element at `index`, references left unresolved
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().items.get(index).cloned()
    }

    /// The element at `index` with a reference followed to its target.
    ///
    /// This may call the parser of an unresolved cell.
    pub fn get_resolved(&self, index: usize) -> Option<Value> {
        self.get(index).map(|value| value.dereference())
    }

    /// Snapshot of the elements; later mutations are not reflected
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Append `value`.
    ///
    /// The array is marked updated and `value` joins the array's document.
    /// Observers receive a `Replace` event with no old value.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (index, subscribers) = {
            let mut inner = self.0.borrow_mut();
            inner.items.push(value.clone());
            (inner.items.len() - 1, inner.observers.snapshot())
        };
        self.replaced(index, None, value, &subscribers)
    }

    /// Insert `value` before `index`, shifting later elements.
    ///
    /// `index == len()` appends. Fails with [`Error::Index`] past the end,
    /// leaving the array untouched.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let subscribers = {
            let mut inner = self.0.borrow_mut();
            let len = inner.items.len();
            if index > len {
                return Err(Error::Index { index, len });
            }
            inner.items.insert(index, value.clone());
            inner.observers.snapshot()
        };
        self.replaced(index, None, value, &subscribers)
    }

    /// Overwrite an existing element
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (old, subscribers) = {
            let mut inner = self.0.borrow_mut();
            let len = inner.items.len();
            let Some(slot) = inner.items.get_mut(index) else {
                return Err(Error::Index { index, len });
            };
            let old = std::mem::replace(slot, value.clone());
            (old, inner.observers.snapshot())
        };
        self.replaced(index, Some(old), value, &subscribers)
    }

    /// Remove and return the element at `index`.
    ///
    /// Fails with [`Error::Index`] when out of range. An observer error is
    /// returned after the element is already gone.
    pub fn remove(&self, index: usize) -> Result<Value> {
        let (removed, subscribers) = {
            let mut inner = self.0.borrow_mut();
            let len = inner.items.len();
            if index >= len {
                return Err(Error::Index { index, len });
            }
            (inner.items.remove(index), inner.observers.snapshot())
        };
        update::record_child(self, &removed);
        if !subscribers.is_empty() {
            observer::deliver(
                &subscribers,
                &MutationEvent::Remove {
                    container: Value::Array(self.clone()),
                    removed: vec![(Slot::Index(index), removed.clone())],
                },
            )?;
        }
        Ok(removed)
    }

    /// Remove the first element equal to `value`; returns whether one was found
    pub fn remove_value(&self, value: &Value) -> Result<bool> {
        let position = self.0.borrow().items.iter().position(|item| item == value);
        match position {
            Some(index) => self.remove(index).map(|_| true),
            None => Ok(false),
        }
    }

    /// Remove every element.
    ///
    /// Clearing an empty array is not a change and notifies nobody.
    pub fn clear(&self) -> Result<()> {
        let (removed, subscribers) = {
            let mut inner = self.0.borrow_mut();
            (std::mem::take(&mut inner.items), inner.observers.snapshot())
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
                container: Value::Array(self.clone()),
                removed: removed
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (Slot::Index(i), v))
                    .collect(),
            },
        )
    }

    /// Register `observer` for every later mutation of this array.
    ///
    /// Returns the id to pass to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, observer: Rc<dyn MutationObserver>) -> ObserverId {
        self.0.borrow_mut().observers.subscribe(observer)
    }

    /// Returns whether `id` was subscribed
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.0.borrow_mut().observers.unsubscribe(id)
    }

    fn replaced(
        &self,
        index: usize,
        old: Option<Value>,
        new: Value,
        subscribers: &[Rc<dyn MutationObserver>],
    ) -> Result<()> {
        update::record_child(self, &new);
        if subscribers.is_empty() {
            return Ok(());
        }
        observer::deliver(
            subscribers,
            &MutationEvent::Replace {
                container: Value::Array(self.clone()),
                slot: Slot::Index(index),
                old,
                new,
            },
        )
    }
}

impl UpdateInfo for CosArray {
    fn update_state(&self) -> Ref<'_, UpdateState> {
        Ref::map(self.0.borrow(), |inner| &inner.update)
    }

    fn update_state_mut(&self) -> RefMut<'_, UpdateState> {
        RefMut::map(self.0.borrow_mut(), |inner| &mut inner.update)
    }

    fn direct_children(&self) -> Vec<Value> {
        self.to_vec()
    }
}

impl CosArray {
    pub(crate) fn eq_with(&self, other: &Self, seen: &mut ComparedPairs) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) || !seen.insert((self.identity(), other.identity())) {
            return true;
        }
        let a = self.0.borrow();
        let b = other.0.borrow();
        a.items.len() == b.items.len()
            && a.items
                .iter()
                .zip(&b.items)
                .all(|(x, y)| value::structural_eq(x, y, seen))
    }
}

impl PartialEq for CosArray {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut ComparedPairs::new())
    }
}

impl fmt::Debug for CosArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        value::debug_nested(f, |f| f.debug_list().entries(self.0.borrow().items.iter()).finish())
    }
}
