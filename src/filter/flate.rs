//! FlateDecode (zlib/deflate) filter

use super::{Filter, decode_parameters};
use crate::cos::{CosDictionary, Name};
use crate::error::{Error, Result};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{self, Read, Write};

/// zlib compression at a fixed level
#[derive(Debug, Clone, Copy)]
pub struct FlateFilter {
    level: u32,
}

impl FlateFilter {
    /// `level` is clamped to 0..=9
    pub fn new(level: u32) -> Self {
        Self { level: level.min(9) }
    }

    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for FlateFilter {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Filter for FlateFilter {
    fn name(&self) -> &str {
        "FlateDecode"
    }

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        let mut encoder = ZlibEncoder::new(output, Compression::new(self.level));
        io::copy(input, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        parameters: &CosDictionary,
        index: usize,
    ) -> Result<()> {
        let predictor = decode_parameters(parameters, index)
            .get_i64(&Name::new("Predictor"))
            .unwrap_or(1);
        if predictor > 1 {
            return Err(Error::unsupported(format!(
                "FlateDecode predictor {}",
                predictor
            )));
        }
        let mut decoder = ZlibDecoder::new(input);
        io::copy(&mut decoder, output)
            .map_err(|e| Error::format(format!("FlateDecode failed: {}", e)))?;
        Ok(())
    }
}
