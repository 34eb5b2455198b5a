//! Stream filters
//!
//! A filter transforms a stream payload in one direction (`encode`) and
//! back (`decode`). Filters are looked up by name through a
//! [`FilterRegistry`], which also knows the abbreviated names used in
//! inline images.

pub mod asciihex;
pub mod flate;

pub use asciihex::AsciiHexFilter;
pub use flate::FlateFilter;

use crate::config::CosConfig;
use crate::cos::{CosDictionary, Name, Value};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::rc::Rc;

/// One byte-transform stage.
///
/// `parameters` is the dictionary of the stream being processed and
/// `index` the position of this filter in its `/Filter` entry; use
/// [`decode_parameters`] to find the stage's own parameters.
pub trait Filter {
    /// Canonical name, as written to `/Filter`
    fn name(&self) -> &str;

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        parameters: &CosDictionary,
        index: usize,
    ) -> Result<()>;

    fn decode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        parameters: &CosDictionary,
        index: usize,
    ) -> Result<()>;
}

/// The `/DecodeParms` dictionary for the filter at `index`.
///
/// A single dictionary applies to the first filter; an array holds one
/// entry per filter. A missing or `null` entry yields an empty dictionary.
pub fn decode_parameters(parameters: &CosDictionary, index: usize) -> CosDictionary {
    let entry = parameters
        .get_resolved(&Name::new("DecodeParms"))
        .or_else(|| parameters.get_resolved(&Name::new("DP")));
    let found = match entry {
        Some(Value::Dictionary(dict)) if index == 0 => Some(dict),
        Some(Value::Array(array)) => array
            .get_resolved(index)
            .and_then(|value| value.as_dictionary().cloned()),
        _ => None,
    };
    found.unwrap_or_default()
}

/// Filters by name
#[derive(Default, Clone)]
pub struct FilterRegistry {
    filters: HashMap<Name, Rc<dyn Filter>>,
}

impl FilterRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// `FlateDecode` and `ASCIIHexDecode` with their abbreviations
    pub fn standard(config: &CosConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Rc::new(FlateFilter::new(config.compression_level)), &["Fl"]);
        registry.register(Rc::new(AsciiHexFilter), &["AHx"]);
        registry
    }

    /// Register `filter` under its own name and any `aliases`; replaces an
    /// earlier filter of the same name
    pub fn register(&mut self, filter: Rc<dyn Filter>, aliases: &[&str]) {
        for alias in aliases {
            self.filters.insert(Name::new(alias), Rc::clone(&filter));
        }
        self.filters.insert(Name::new(filter.name()), filter);
    }

    pub fn get(&self, name: &Name) -> Option<Rc<dyn Filter>> {
        self.filters.get(name).cloned()
    }

    pub fn contains(&self, name: &Name) -> bool {
        self.filters.contains_key(name)
    }

    /// Look up every name of a chain, failing on the first unknown one
    pub fn resolve_chain(&self, names: &[Name]) -> Result<Vec<Rc<dyn Filter>>> {
        names
            .iter()
            .map(|name| {
                self.get(name)
                    .ok_or_else(|| Error::unsupported(format!("unknown filter {}", name)))
            })
            .collect()
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.filters.keys().map(Name::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}
