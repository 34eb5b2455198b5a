//! Indirect object references
//!
//! A [`CosObject`] is the cell behind every `n g R` in a document. Cells
//! created by a parser start unresolved and ask the parser for their value
//! the first time [`CosObject::resolve`] is called. That request happens at
//! most once: the parser handle is dropped before the call is made, so a
//! failing parser is never retried and a cycle leading back into the same
//! cell finds it already settled.

use super::key::ObjectKey;
use super::value::Value;
use crate::error::{Error, Result};
use crate::update::{self, UpdateInfo, UpdateState};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Source of indirect objects, typically backed by a file and its
/// cross-reference table
pub trait ObjectParser {
    fn dereference(&self, key: ObjectKey) -> Result<Value>;
}

/// Observable resolution state of a [`CosObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolved,
    PermanentlyNull,
}

enum Resolution {
    Unresolved(Weak<dyn ObjectParser>),
    /// `None` when the parser failed
    Resolved(Option<Value>),
    PermanentlyNull,
}

struct ObjectInner {
    key: ObjectKey,
    resolution: Resolution,
    update: UpdateState,
    load_error: Option<String>,
}

/// Shared handle to an indirect object cell
#[derive(Clone)]
pub struct CosObject(Rc<RefCell<ObjectInner>>);

impl CosObject {
    /// A cell that already holds its value
    pub fn new(key: ObjectKey, value: Value) -> Self {
        Self::with_resolution(key, Resolution::Resolved(Some(value)))
    }

    /// A cell that loads its value from `parser` on first use.
    ///
    /// Only a weak handle is kept; if the parser is gone by then, the cell
    /// resolves to nothing.
    pub fn lazy(key: ObjectKey, parser: Weak<dyn ObjectParser>) -> Self {
        Self::with_resolution(key, Resolution::Unresolved(parser))
    }

    fn with_resolution(key: ObjectKey, resolution: Resolution) -> Self {
        Self(Rc::new(RefCell::new(ObjectInner {
            key,
            resolution,
            update: UpdateState::new(),
            load_error: None,
        })))
    }

    pub(crate) fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn key(&self) -> ObjectKey {
        self.0.borrow().key
    }

    pub fn state(&self) -> ResolutionState {
        match self.0.borrow().resolution {
            Resolution::Unresolved(_) => ResolutionState::Unresolved,
            Resolution::Resolved(_) => ResolutionState::Resolved,
            Resolution::PermanentlyNull => ResolutionState::PermanentlyNull,
        }
    }

    /// The value, loading it on first call.
    ///
    /// Returns `None` after [`set_to_null`](Self::set_to_null) and when the
    /// parser failed. Parser failures are logged and kept in
    /// [`load_error`](Self::load_error) but never returned from here.
    pub fn resolve(&self) -> Option<Value> {
        let parser = {
            let mut inner = self.0.borrow_mut();
            match std::mem::replace(&mut inner.resolution, Resolution::Resolved(None)) {
                Resolution::Unresolved(parser) => parser,
                settled => {
                    inner.resolution = settled;
                    return inner.cached();
                }
            }
        };

        let key = self.key();
        let outcome = match parser.upgrade() {
            Some(parser) => parser.dereference(key),
            None => Err(Error::resolution("parser is no longer available")),
        };

        match outcome {
            Ok(value) => {
                let origin = {
                    let mut inner = self.0.borrow_mut();
                    // set_to_null may have run while the parser was busy
                    if matches!(inner.resolution, Resolution::PermanentlyNull) {
                        return None;
                    }
                    inner.resolution = Resolution::Resolved(Some(value.clone()));
                    inner.update.origin()
                };
                update::attach(&value, origin.as_ref(), true);
                Some(value)
            }
            Err(e) => {
                tracing::warn!(object = %key, error = %e, "failed to dereference object");
                self.0.borrow_mut().load_error = Some(e.to_string());
                None
            }
        }
    }

    /// The value if already resolved; never calls the parser
    pub fn cached(&self) -> Option<Value> {
        self.0.borrow().cached()
    }

    /// Whether the cell is known to hold nothing. Never calls the parser,
    /// so an unresolved cell reports false.
    pub fn is_object_null(&self) -> bool {
        match &self.0.borrow().resolution {
            Resolution::Unresolved(_) => false,
            Resolution::Resolved(value) => value.as_ref().is_none_or(Value::is_null),
            Resolution::PermanentlyNull => true,
        }
    }

    /// Message of the parser failure, if resolution failed
    pub fn load_error(&self) -> Option<String> {
        self.0.borrow().load_error.clone()
    }

    /// Empty the cell for good.
    ///
    /// Dropping a real value is a change to the document; returns whether
    /// this call marked the cell updated.
    pub fn set_to_null(&self) -> bool {
        let mut inner = self.0.borrow_mut();
        let had_value = matches!(
            &inner.resolution,
            Resolution::Resolved(Some(value)) if !value.is_null()
        );
        inner.resolution = Resolution::PermanentlyNull;
        had_value && inner.update.update()
    }

    /// Settle the cell as null without recording a change, handing back
    /// the value it held. Used when the owning document goes away.
    pub(crate) fn release(&self) -> Option<Value> {
        let mut inner = self.0.try_borrow_mut().ok()?;
        match std::mem::replace(&mut inner.resolution, Resolution::PermanentlyNull) {
            Resolution::Resolved(value) => value,
            Resolution::Unresolved(_) | Resolution::PermanentlyNull => None,
        }
    }
}

impl ObjectInner {
    fn cached(&self) -> Option<Value> {
        match &self.resolution {
            Resolution::Resolved(value) => value.clone(),
            Resolution::Unresolved(_) | Resolution::PermanentlyNull => None,
        }
    }
}

impl UpdateInfo for CosObject {
    fn update_state(&self) -> Ref<'_, UpdateState> {
        Ref::map(self.0.borrow(), |inner| &inner.update)
    }

    fn update_state_mut(&self) -> RefMut<'_, UpdateState> {
        RefMut::map(self.0.borrow_mut(), |inner| &mut inner.update)
    }

    fn direct_children(&self) -> Vec<Value> {
        self.cached().into_iter().collect()
    }
}

impl PartialEq for CosObject {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for CosObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosObject")
            .field("key", &self.key())
            .field("state", &self.state())
            .finish()
    }
}

/// An in-memory [`ObjectParser`] serving values from a table
#[derive(Default)]
pub struct ObjectTable {
    objects: RefCell<HashMap<ObjectKey, Value>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: ObjectKey, value: Value) {
        self.objects.borrow_mut().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }
}

impl ObjectParser for ObjectTable {
    fn dereference(&self, key: ObjectKey) -> Result<Value> {
        self.objects
            .borrow()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::resolution(format!("object {} not found", key)))
    }
}
