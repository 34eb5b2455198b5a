// Clippy lints that are too pedantic for this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::new_without_default)]

//! pdfcos - the COS object model of PDF documents
//!
//! Values, indirect objects resolved lazily from a parser, change tracking
//! for incremental saves and filtered stream output.
//!
//! # Modules
//!
//! - [`cos`] - value kinds, containers, indirect objects and serialization
//! - [`update`] - update state, document state and increments
//! - [`observer`] - mutation observers on containers
//! - [`filter`] - stream filters and the filter registry
//! - [`pipeline`] - scratch buffers and the stream output pipeline
//! - [`document`] - documents with an object pool
//! - [`config`] - runtime configuration
//!
//! # Example
//!
//! ```rust
//! use pdfcos::{CosDictionary, CosDocument, Name};
//!
//! let document = CosDocument::new();
//! let page = CosDictionary::new();
//! page.set("Type", Name::new("Page")).unwrap();
//! let cell = document.create_object(page).unwrap();
//! document.trailer().set("Page", cell).unwrap();
//!
//! let mut out = Vec::new();
//! let offsets = document.write_increment(&mut out, 0).unwrap();
//! assert_eq!(offsets.len(), 1);
//! ```

pub mod config;
pub mod cos;
pub mod document;
pub mod error;
pub mod filter;
pub mod observer;
pub mod pipeline;
pub mod update;

pub use config::{CosConfig, ScratchKind};
pub use cos::{
    CosArray, CosBoolean, CosDictionary, CosInteger, CosObject, CosStream, CosString, Name,
    ObjectKey, ObjectParser, ObjectTable, ResolutionState, Value, ValueKind, ValueVisitor,
    parse_number,
};
pub use document::CosDocument;
pub use error::{Error, Result};
pub use filter::{Filter, FilterRegistry};
pub use observer::{MutationEvent, MutationObserver, ObserverId, Slot};
pub use pipeline::{MemoryScratchCache, ScratchCache, StreamOutput, TempFileScratchCache};
pub use update::{DocumentState, Increment, IncrementEntry, UpdateInfo, UpdateState};
