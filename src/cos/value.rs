//! The COS value enum
use super::array::CosArray;
use super::dictionary::CosDictionary;
use super::name::{CosString, Name};
use super::number::{CosBoolean, CosInteger};
use super::object::CosObject;
use super::stream::CosStream;
use super::write::MAX_DEPTH;
use crate::update::UpdateInfo;
use std::cell::Cell;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Any COS value.
///
/// Primitives are held by value. Arrays, dictionaries, streams and
/// references are shared handles: cloning a `Value` holding one of them
/// yields another handle to the same container.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(&'static CosBoolean),
    Integer(Arc<CosInteger>),
    Real(f64),
    Name(Name),
    String(CosString),
    Array(CosArray),
    Dictionary(CosDictionary),
    Stream(CosStream),
    Reference(CosObject),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Real,
    Name,
    String,
    Array,
    Dictionary,
    Stream,
    Reference,
}

/// One callback per value kind, see [`Value::accept`]
pub trait ValueVisitor {
    type Output;

    fn visit_null(&mut self) -> Self::Output;
    fn visit_boolean(&mut self, value: bool) -> Self::Output;
    fn visit_integer(&mut self, value: i64) -> Self::Output;
    fn visit_real(&mut self, value: f64) -> Self::Output;
    fn visit_name(&mut self, name: &Name) -> Self::Output;
    fn visit_string(&mut self, string: &CosString) -> Self::Output;
    fn visit_array(&mut self, array: &CosArray) -> Self::Output;
    fn visit_dictionary(&mut self, dictionary: &CosDictionary) -> Self::Output;
    fn visit_stream(&mut self, stream: &CosStream) -> Self::Output;
    fn visit_reference(&mut self, object: &CosObject) -> Self::Output;
}

impl Value {
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(CosBoolean::value_of(value))
    }

    pub fn integer(value: i64) -> Self {
        Value::Integer(CosInteger::get(value))
    }

    pub fn name(name: &str) -> Self {
        Value::Name(Name::new(name))
    }

    pub fn string(bytes: impl Into<CosString>) -> Self {
        Value::String(bytes.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::Real(_) => ValueKind::Real,
            Value::Name(_) => ValueKind::Name,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Dictionary(_) => ValueKind::Dictionary,
            Value::Stream(_) => ValueKind::Stream,
            Value::Reference(_) => ValueKind::Reference,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(b.value()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(i.value()),
            _ => None,
        }
    }

    /// Integers widen to reals
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            Value::Integer(i) => Some(i.value() as f64),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Value::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&CosString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&CosArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Streams expose their dictionary here as well
    pub fn as_dictionary(&self) -> Option<&CosDictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            Value::Stream(s) => Some(s.dictionary()),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&CosStream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&CosObject> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Follow a reference to its target; anything else is returned as is.
    /// A reference that resolves to nothing reads as `Null`.
    pub fn dereference(&self) -> Value {
        match self {
            Value::Reference(cell) => cell.resolve().unwrap_or_default(),
            other => other.clone(),
        }
    }

    /// The change-tracking view of this value, if it has one
    pub fn update_info(&self) -> Option<&dyn UpdateInfo> {
        match self {
            Value::Array(a) => Some(a),
            Value::Dictionary(d) => Some(d),
            Value::Stream(s) => Some(s),
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Address of the shared container, for handle kinds
    pub(crate) fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(a.identity()),
            Value::Dictionary(d) => Some(d.identity()),
            Value::Stream(s) => Some(s.dictionary().identity()),
            Value::Reference(r) => Some(r.identity()),
            _ => None,
        }
    }

    /// Dispatch to the `visitor` method for this value's kind
    pub fn accept<V: ValueVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Value::Null => visitor.visit_null(),
            Value::Boolean(b) => visitor.visit_boolean(b.value()),
            Value::Integer(i) => visitor.visit_integer(i.value()),
            Value::Real(r) => visitor.visit_real(*r),
            Value::Name(n) => visitor.visit_name(n),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(a) => visitor.visit_array(a),
            Value::Dictionary(d) => visitor.visit_dictionary(d),
            Value::Stream(s) => visitor.visit_stream(s),
            Value::Reference(r) => visitor.visit_reference(r),
        }
    }

    /// Whether both values are the very same instance, as opposed to
    /// merely equal
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => std::ptr::eq(*a, *b),
            (Value::Integer(a), Value::Integer(b)) => Arc::ptr_eq(a, b),
            (Value::Stream(_), Value::Stream(_))
            | (Value::Array(_), Value::Array(_))
            | (Value::Dictionary(_), Value::Dictionary(_))
            | (Value::Reference(_), Value::Reference(_)) => self.identity() == other.identity(),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        structural_eq(self, other, &mut HashSet::new())
    }
}

/// Pairs of containers met again while comparing them are taken as
/// equal, so containers holding themselves compare in finite time.
pub(crate) type ComparedPairs = HashSet<(usize, usize)>;

pub(crate) fn structural_eq(a: &Value, b: &Value, seen: &mut ComparedPairs) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Real(a), Value::Real(b)) => a == b,
        (Value::Name(a), Value::Name(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => a.eq_with(b, seen),
        (Value::Dictionary(a), Value::Dictionary(b)) => a.eq_with(b, seen),
        (Value::Stream(a), Value::Stream(b)) => a.eq_with(b, seen),
        (Value::Reference(a), Value::Reference(b)) => a == b,
        _ => false,
    }
}

thread_local! {
    static DEBUG_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Format one container level; past `MAX_DEPTH` nested levels only `..`
/// is written
pub(crate) fn debug_nested(
    f: &mut fmt::Formatter<'_>,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    let depth = DEBUG_DEPTH.with(Cell::get);
    if depth >= MAX_DEPTH {
        return f.write_str("..");
    }
    DEBUG_DEPTH.with(|d| d.set(depth + 1));
    let result = body(f);
    DEBUG_DEPTH.with(|d| d.set(depth));
    result
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<Name> for Value {
    fn from(n: Name) -> Self {
        Value::Name(n)
    }
}

impl From<CosString> for Value {
    fn from(s: CosString) -> Self {
        Value::String(s)
    }
}

impl From<CosArray> for Value {
    fn from(a: CosArray) -> Self {
        Value::Array(a)
    }
}

impl From<CosDictionary> for Value {
    fn from(d: CosDictionary) -> Self {
        Value::Dictionary(d)
    }
}

impl From<CosStream> for Value {
    fn from(s: CosStream) -> Self {
        Value::Stream(s)
    }
}

impl From<CosObject> for Value {
    fn from(r: CosObject) -> Self {
        Value::Reference(r)
    }
}
