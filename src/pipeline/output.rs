//! Filtered stream output
//!
//! [`StreamOutput`] accepts the raw bytes of a stream and writes them to a
//! destination encoded by a filter chain. The chain `[f0, f1, .., fn-1]` is
//! applied in reverse: `fn-1` encodes the raw bytes and `f0` writes the
//! final result into the destination, so `f0` is the outermost encoding.
//!
//! Without filters every write goes straight to the destination. With
//! filters the raw bytes are staged in one scratch buffer, and closing
//! keeps at most two scratch buffers alive: the input of the current stage
//! and its output.

use super::scratch::{RandomAccessBuffer, ScratchCache};
use crate::cos::CosDictionary;
use crate::error::{Error, Result};
use crate::filter::Filter;
use std::io::{self, Seek, SeekFrom, Write};
use std::rc::Rc;

pub struct StreamOutput<'a, W: Write> {
    destination: W,
    filters: Vec<Rc<dyn Filter>>,
    parameters: CosDictionary,
    cache: &'a dyn ScratchCache,
    staging: Option<Box<dyn RandomAccessBuffer>>,
}

impl<'a, W: Write> StreamOutput<'a, W> {
    /// `parameters` is the stream dictionary handed to every stage
    pub fn new(
        destination: W,
        filters: Vec<Rc<dyn Filter>>,
        parameters: CosDictionary,
        cache: &'a dyn ScratchCache,
    ) -> Result<Self> {
        let staging = if filters.is_empty() {
            None
        } else {
            Some(cache.create_buffer()?)
        };
        Ok(Self {
            destination,
            filters,
            parameters,
            cache,
            staging,
        })
    }

    pub fn is_buffered(&self) -> bool {
        self.staging.is_some()
    }

    /// Run the filter chain and hand back the destination.
    ///
    /// Scratch buffers are released on every path; a failing stage is
    /// reported as a [`Error::Pipeline`] naming its index and filter.
    pub fn close(self) -> Result<W> {
        let StreamOutput {
            mut destination,
            filters,
            parameters,
            cache,
            staging,
        } = self;

        let Some(mut input) = staging else {
            destination.flush()?;
            return Ok(destination);
        };

        for (index, filter) in filters.iter().enumerate().rev() {
            input.seek(SeekFrom::Start(0))?;
            tracing::debug!(
                stage = index,
                filter = filter.name(),
                bytes = input.len(),
                "encoding stream stage"
            );
            if index == 0 {
                filter
                    .encode(&mut input, &mut destination, &parameters, index)
                    .map_err(|e| stage_failed(index, filter.as_ref(), &e))?;
            } else {
                let mut output = cache.create_buffer()?;
                filter
                    .encode(&mut input, &mut output, &parameters, index)
                    .map_err(|e| stage_failed(index, filter.as_ref(), &e))?;
                // the consumed input is released here
                input = output;
            }
        }
        drop(input);

        destination.flush()?;
        Ok(destination)
    }
}

fn stage_failed(index: usize, filter: &dyn Filter, error: &Error) -> Error {
    Error::pipeline(format!(
        "filter stage {} ({}) failed: {}",
        index,
        filter.name(),
        error
    ))
}

impl<W: Write> Write for StreamOutput<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.staging {
            Some(buffer) => buffer.write(buf),
            None => self.destination.write(buf),
        }
    }

    /// Forwards to the destination when unbuffered; staged data is only
    /// final once [`close`](StreamOutput::close) runs
    fn flush(&mut self) -> io::Result<()> {
        match self.staging {
            Some(_) => Ok(()),
            None => self.destination.flush(),
        }
    }
}
