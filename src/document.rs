//! Documents: a trailer, an object pool and the update tracking around them
use crate::cos::{self, CosDictionary, CosObject, Name, ObjectKey, ObjectParser, Value};
use crate::error::{Error, Result};
use crate::update::{DocumentState, Increment};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

/// An open document.
///
/// Every indirect object is reached through [`object_from_pool`], which
/// hands out one cell per key. That keeps resolution at most once per
/// object even when many references point at it.
///
/// Dropping the document settles every pooled cell as null. Handles kept
/// past that point see empty references instead of the old graph.
///
/// [`object_from_pool`]: CosDocument::object_from_pool
pub struct CosDocument {
    state: DocumentState,
    trailer: RefCell<CosDictionary>,
    parser: Option<Rc<dyn ObjectParser>>,
    pool: RefCell<HashMap<ObjectKey, CosObject>>,
    highest_number: Cell<u64>,
}

impl CosDocument {
    /// An empty document with nothing to load; changes are tracked at once
    pub fn new() -> Self {
        let document = Self::build(CosDictionary::new(), None);
        document.finish_loading();
        document
    }

    /// A document whose objects come from `parser`.
    ///
    /// The document stays in loading mode until
    /// [`finish_loading`](Self::finish_loading) is called.
    pub fn with_parser(parser: Rc<dyn ObjectParser>, trailer: CosDictionary) -> Self {
        Self::build(trailer, Some(parser))
    }

    fn build(trailer: CosDictionary, parser: Option<Rc<dyn ObjectParser>>) -> Self {
        let state = DocumentState::new();
        state.set_root(Value::Dictionary(trailer.clone()));
        let highest_number = trailer
            .get_i64(&Name::new("Size"))
            .and_then(|size| size.checked_sub(1))
            .and_then(|highest| u64::try_from(highest).ok())
            .unwrap_or(0);
        Self {
            state,
            trailer: RefCell::new(trailer),
            parser,
            pool: RefCell::new(HashMap::new()),
            highest_number: Cell::new(highest_number),
        }
    }

    pub fn state(&self) -> &DocumentState {
        &self.state
    }

    pub fn trailer(&self) -> CosDictionary {
        self.trailer.borrow().clone()
    }

    pub fn set_trailer(&self, trailer: CosDictionary) {
        self.state.set_root(Value::Dictionary(trailer.clone()));
        *self.trailer.borrow_mut() = trailer;
    }

    /// The cell for `key`, created on first request
    pub fn object_from_pool(&self, key: ObjectKey) -> CosObject {
        let mut pool = self.pool.borrow_mut();
        if let Some(cell) = pool.get(&key) {
            return cell.clone();
        }
        let cell = match &self.parser {
            Some(parser) => CosObject::lazy(key, Rc::downgrade(parser)),
            None => CosObject::new(key, Value::Null),
        };
        pool.insert(key, cell.clone());
        self.highest_number
            .set(self.highest_number.get().max(key.number));
        cell
    }

    /// Shorthand for resolving the pooled cell of `key`
    pub fn resolve(&self, key: ObjectKey) -> Option<Value> {
        self.object_from_pool(key).resolve()
    }

    /// A new indirect object holding `value`, numbered after every known
    /// object. It becomes part of the next increment once it is referenced
    /// from the document.
    pub fn create_object(&self, value: impl Into<Value>) -> Result<CosObject> {
        let number = self
            .highest_number
            .get()
            .checked_add(1)
            .ok_or_else(|| Error::unsupported("object numbers exhausted"))?;
        self.highest_number.set(number);
        let key = ObjectKey::new(number, 0);
        let cell = CosObject::new(key, value.into());
        self.pool.borrow_mut().insert(key, cell.clone());
        Ok(cell)
    }

    pub fn highest_object_number(&self) -> u64 {
        self.highest_number.get()
    }

    pub fn pooled_objects(&self) -> usize {
        self.pool.borrow().len()
    }

    pub fn is_accepting_updates(&self) -> bool {
        self.state.is_accepting_updates()
    }

    /// End the initial load; from here on mutations are changes
    pub fn finish_loading(&self) -> bool {
        self.state.finish_loading()
    }

    pub fn build_increment(&self) -> Increment {
        self.state.build_increment()
    }

    /// Write the objects changed since loading; see [`cos::write_increment`]
    pub fn write_increment<W: Write>(
        &self,
        writer: &mut W,
        start_offset: u64,
    ) -> Result<Vec<(ObjectKey, u64)>> {
        cos::write_increment(writer, &self.build_increment(), start_offset)
    }
}

impl Default for CosDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CosDocument {
    fn drop(&mut self) {
        let pool = std::mem::take(self.pool.get_mut());
        tracing::trace!(objects = pool.len(), "releasing object pool");
        for cell in pool.values() {
            drop(cell.release());
        }
    }
}

impl fmt::Debug for CosDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosDocument")
            .field("state", &self.state)
            .field("has_parser", &self.parser.is_some())
            .field("pooled_objects", &self.pooled_objects())
            .field("highest_number", &self.highest_number.get())
            .finish()
    }
}
