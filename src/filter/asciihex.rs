//! ASCIIHexDecode filter

use super::Filter;
use crate::cos::CosDictionary;
use crate::error::{Error, Result};
use std::io::{Read, Write};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Two hex digits per byte, terminated by `>`
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiHexFilter;

impl Filter for AsciiHexFilter {
    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }

    fn encode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        let mut chunk = [0u8; 4096];
        let mut encoded = Vec::with_capacity(chunk.len() * 2);
        loop {
            let read = input.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            encoded.clear();
            for &byte in &chunk[..read] {
                encoded.push(HEX_DIGITS[usize::from(byte >> 4)]);
                encoded.push(HEX_DIGITS[usize::from(byte & 0x0F)]);
            }
            output.write_all(&encoded)?;
        }
        output.write_all(b">")?;
        Ok(())
    }

    fn decode(
        &self,
        input: &mut dyn Read,
        output: &mut dyn Write,
        _parameters: &CosDictionary,
        _index: usize,
    ) -> Result<()> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        output.write_all(&decode_ascii_hex(&data)?)?;
        Ok(())
    }
}

fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len() / 2);
    let mut high_nibble: Option<u8> = None;

    for &byte in data {
        if byte.is_ascii_whitespace() {
            continue;
        }
        if byte == b'>' {
            break;
        }

        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'F' => byte - b'A' + 10,
            b'a'..=b'f' => byte - b'a' + 10,
            _ => return Err(Error::format(format!("Invalid hex character: {}", byte))),
        };

        match high_nibble {
            None => high_nibble = Some(nibble),
            Some(high) => {
                result.push((high << 4) | nibble);
                high_nibble = None;
            }
        }
    }

    // odd digit count: the last digit is padded with 0
    if let Some(high) = high_nibble {
        result.push(high << 4);
    }

    Ok(result)
}
