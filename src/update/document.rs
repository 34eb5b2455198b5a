use super::increment::{self, Increment};
use crate::cos::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct DocumentStateInner {
    accepting_updates: Cell<bool>,
    root: RefCell<Option<Value>>,
}

/// Document-wide switch deciding whether mutations count as changes.
///
/// Starts out loading: nothing is recorded until [`finish_loading`] flips
/// it, so building the object graph from a file never marks it dirty.
/// Cloning yields another handle to the same state.
///
/// [`finish_loading`]: DocumentState::finish_loading
#[derive(Clone)]
pub struct DocumentState(Rc<DocumentStateInner>);

impl DocumentState {
    pub fn new() -> Self {
        Self(Rc::new(DocumentStateInner {
            accepting_updates: Cell::new(false),
            root: RefCell::new(None),
        }))
    }

    pub(crate) fn from_inner(inner: Rc<DocumentStateInner>) -> Self {
        Self(inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<DocumentStateInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn is_same(&self, weak: &Weak<DocumentStateInner>) -> bool {
        std::ptr::eq(Rc::as_ptr(&self.0), weak.as_ptr())
    }

    pub fn ptr_eq(&self, other: &DocumentState) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_accepting_updates(&self) -> bool {
        self.0.accepting_updates.get()
    }

    /// Mark the initial load complete. Returns false if it already was.
    pub fn finish_loading(&self) -> bool {
        if self.0.accepting_updates.replace(true) {
            return false;
        }
        tracing::trace!("document finished loading, tracking updates");
        true
    }

    /// Install the value increments are collected from (the trailer).
    ///
    /// The root and everything already reachable from it is bound to this
    /// document.
    pub fn set_root(&self, root: Value) {
        super::attach(&root, Some(self), !self.is_accepting_updates());
        *self.0.root.borrow_mut() = Some(root);
    }

    pub fn root(&self) -> Option<Value> {
        self.0.root.borrow().clone()
    }

    /// Snapshot of every value reachable from the root that changed after
    /// loading finished.
    pub fn build_increment(&self) -> Increment {
        match self.root() {
            Some(root) => increment::collect(self, &root),
            None => Increment::default(),
        }
    }
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("accepting_updates", &self.is_accepting_updates())
            .field("has_root", &self.0.root.borrow().is_some())
            .finish()
    }
}
