//! COS streams
use super::array::CosArray;
use super::dictionary::CosDictionary;
use super::name::Name;
use super::value::{ComparedPairs, Value};
use crate::error::Result;
use crate::filter::FilterRegistry;
use crate::pipeline::{ScratchCache, StreamOutput};
use crate::update::{self, UpdateInfo, UpdateState};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// Shared handle to a stream: a dictionary plus an encoded payload.
///
/// The stream and its dictionary share one update state, so a change to
/// either marks the stream.
#[derive(Clone, Default)]
pub struct CosStream {
    dictionary: CosDictionary,
    payload: Rc<RefCell<Vec<u8>>>,
}

impl CosStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream over an existing dictionary and raw payload, as read from
    /// a file. Nothing is recorded as changed.
    pub fn with_dictionary(dictionary: CosDictionary, raw: Vec<u8>) -> Self {
        Self {
            dictionary,
            payload: Rc::new(RefCell::new(raw)),
        }
    }

    pub fn dictionary(&self) -> &CosDictionary {
        &self.dictionary
    }

    /// The payload exactly as stored, still encoded
    pub fn raw_data(&self) -> Vec<u8> {
        self.payload.borrow().clone()
    }

    pub fn raw_len(&self) -> usize {
        self.payload.borrow().len()
    }

    /// Filter names from `/Filter`, in declaration order
    pub fn filters(&self) -> Vec<Name> {
        match self.dictionary.get_resolved(&Name::new("Filter")) {
            Some(Value::Name(name)) => vec![name],
            Some(Value::Array(array)) => array
                .to_vec()
                .iter()
                .filter_map(|value| value.dereference().as_name().cloned())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Replace the encoded payload as is
    pub fn set_raw_data(&self, raw: Vec<u8>) {
        *self.payload.borrow_mut() = raw;
        update::record(self);
    }

    /// Encode `data` through `filters` and store the result, recording the
    /// chain in `/Filter`.
    ///
    /// On error the payload and `/Filter` are left as they were.
    pub fn set_data(
        &self,
        data: &[u8],
        filters: &[Name],
        registry: &FilterRegistry,
        cache: &dyn ScratchCache,
    ) -> Result<()> {
        let chain = registry.resolve_chain(filters)?;
        let mut output = StreamOutput::new(Vec::new(), chain, self.dictionary.clone(), cache)?;
        output.write_all(data)?;
        let encoded = output.close()?;
        self.set_filter_entry(filters)?;
        self.set_raw_data(encoded);
        Ok(())
    }

    /// A writer that encodes through `filters` into this stream's payload.
    ///
    /// The payload and `/Filter` are replaced once the returned output
    /// closes successfully. A failed close, or dropping the output without
    /// closing it, leaves the stream unchanged.
    pub fn create_output<'a>(
        &self,
        filters: &[Name],
        registry: &FilterRegistry,
        cache: &'a dyn ScratchCache,
    ) -> Result<StreamOutput<'a, StreamSink>> {
        let chain = registry.resolve_chain(filters)?;
        let sink = StreamSink {
            stream: self.clone(),
            filters: filters.to_vec(),
            pending: Vec::new(),
            dirty: true,
        };
        StreamOutput::new(sink, chain, self.dictionary.clone(), cache)
    }

    fn set_filter_entry(&self, filters: &[Name]) -> Result<()> {
        let key = Name::new("Filter");
        match filters {
            [] => self.dictionary.remove(&key).map(|_| ()),
            [single] => self.dictionary.set(key, single.clone()),
            many => {
                let names = many.iter().cloned().map(Value::Name).collect();
                self.dictionary.set(key, CosArray::from_values(names))
            }
        }
    }

    /// The payload with every filter undone, f0 first
    pub fn decoded_data(&self, registry: &FilterRegistry) -> Result<Vec<u8>> {
        let chain = registry.resolve_chain(&self.filters())?;
        let mut data = self.raw_data();
        for (index, filter) in chain.iter().enumerate() {
            let mut decoded = Vec::with_capacity(data.len());
            filter.decode(&mut data.as_slice(), &mut decoded, &self.dictionary, index)?;
            data = decoded;
        }
        Ok(data)
    }
}

/// Destination collecting the encoded payload of a [`CosStream`].
///
/// Bytes are kept aside until flushed. A flush stores them as the stream's
/// payload and writes `/Filter`; [`StreamOutput::close`] flushes only after
/// every stage succeeded.
pub struct StreamSink {
    stream: CosStream,
    filters: Vec<Name>,
    pending: Vec<u8>,
    dirty: bool,
}

impl StreamSink {
    fn commit(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        self.stream.set_filter_entry(&self.filters)?;
        self.stream.set_raw_data(self.pending.clone());
        Ok(())
    }
}

impl Write for StreamSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.dirty = true;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit().map_err(io::Error::from)
    }
}

impl UpdateInfo for CosStream {
    fn update_state(&self) -> Ref<'_, UpdateState> {
        self.dictionary.update_state()
    }

    fn update_state_mut(&self) -> RefMut<'_, UpdateState> {
        self.dictionary.update_state_mut()
    }

    fn direct_children(&self) -> Vec<Value> {
        self.dictionary.direct_children()
    }
}

impl CosStream {
    pub(crate) fn eq_with(&self, other: &Self, seen: &mut ComparedPairs) -> bool {
        *self.payload.borrow() == *other.payload.borrow()
            && self.dictionary.eq_with(&other.dictionary, seen)
    }
}

impl PartialEq for CosStream {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut ComparedPairs::new())
    }
}

impl fmt::Debug for CosStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosStream")
            .field("dictionary", &self.dictionary)
            .field("raw_len", &self.raw_len())
            .finish()
    }
}
