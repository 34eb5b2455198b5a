//! The COS object model
//!
//! Primitive values (null, booleans, numbers, names, strings) are plain
//! data. Arrays, dictionaries, streams and indirect object cells are
//! shared handles that carry change tracking and, for the containers,
//! mutation observers.

pub mod array;
pub mod dictionary;
pub mod key;
pub mod name;
pub mod number;
pub mod object;
pub mod stream;
pub mod value;
pub mod write;

pub use array::CosArray;
pub use dictionary::CosDictionary;
pub use key::ObjectKey;
pub use name::{CosString, Name};
pub use number::{CosBoolean, CosInteger, parse_number};
pub use object::{CosObject, ObjectParser, ObjectTable, ResolutionState};
pub use stream::{CosStream, StreamSink};
pub use value::{Value, ValueKind, ValueVisitor};
pub use write::{to_bytes, write_increment, write_indirect, write_value};
