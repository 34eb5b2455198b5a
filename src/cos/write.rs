//! Serialization of values to the textual object syntax
use super::dictionary::CosDictionary;
use super::key::ObjectKey;
use super::name::{CosString, Name};
use super::stream::CosStream;
use super::value::Value;
use crate::error::{Error, Result};
use crate::update::Increment;
use std::io::{self, Write};

/// Deepest container nesting that is written before giving up; only a
/// container holding itself without an indirect reference gets here
pub const MAX_DEPTH: usize = 256;

pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    write_nested(writer, value, 0)
}

/// `n g obj` .. `endobj`
pub fn write_indirect<W: Write>(writer: &mut W, key: ObjectKey, value: &Value) -> Result<()> {
    writeln!(writer, "{} {} obj", key.number, key.generation)?;
    write_value(writer, value)?;
    writer.write_all(b"\nendobj\n")?;
    Ok(())
}

pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Append every object of `increment` as an indirect object.
///
/// `start_offset` is the position of `writer` within the file. Returns the
/// file offset of each object, for the cross-reference section.
pub fn write_increment<W: Write>(
    writer: &mut W,
    increment: &Increment,
    start_offset: u64,
) -> Result<Vec<(ObjectKey, u64)>> {
    let mut counter = CountingWriter {
        inner: writer,
        written: 0,
    };
    let mut offsets = Vec::with_capacity(increment.objects().len());
    for (key, value) in increment.objects() {
        offsets.push((*key, start_offset + counter.written));
        write_indirect(&mut counter, *key, value)?;
    }
    tracing::debug!(
        objects = offsets.len(),
        bytes = counter.written,
        "wrote increment"
    );
    Ok(offsets)
}

struct CountingWriter<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_nested<W: Write>(writer: &mut W, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::format(format!(
            "object nesting deeper than {}",
            MAX_DEPTH
        )));
    }
    match value {
        Value::Null => writer.write_all(b"null")?,
        Value::Boolean(b) => writer.write_all(b.as_bytes())?,
        Value::Integer(i) => write!(writer, "{}", i.value())?,
        Value::Real(r) => write_real(writer, *r)?,
        Value::Name(n) => write_name(writer, n)?,
        Value::String(s) => write_string(writer, s)?,
        Value::Array(array) => {
            writer.write_all(b"[")?;
            for (i, item) in array.to_vec().iter().enumerate() {
                if i > 0 {
                    writer.write_all(b" ")?;
                }
                write_nested(writer, item, depth + 1)?;
            }
            writer.write_all(b"]")?;
        }
        Value::Dictionary(dict) => write_dictionary(writer, dict, None, depth)?,
        Value::Stream(stream) => write_stream(writer, stream, depth)?,
        Value::Reference(cell) => {
            let key = cell.key();
            write!(writer, "{} {} R", key.number, key.generation)?;
        }
    }
    Ok(())
}

fn write_real<W: Write>(writer: &mut W, r: f64) -> Result<()> {
    if !r.is_finite() {
        return Err(Error::format(format!("cannot write non-finite real {}", r)));
    }
    // Display never uses an exponent and drops trailing zeros
    if r == 0.0 {
        writer.write_all(b"0")?;
    } else {
        write!(writer, "{}", r)?;
    }
    Ok(())
}

fn write_name<W: Write>(writer: &mut W, name: &Name) -> Result<()> {
    writer.write_all(b"/")?;
    for &byte in name.as_str().as_bytes() {
        let delimiter = matches!(
            byte,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        );
        if delimiter || !(0x21..=0x7E).contains(&byte) {
            write!(writer, "#{:02X}", byte)?;
        } else {
            writer.write_all(&[byte])?;
        }
    }
    Ok(())
}

fn write_string<W: Write>(writer: &mut W, s: &CosString) -> Result<()> {
    let bytes = s.as_bytes();
    let printable = bytes
        .iter()
        .all(|&b| (32..=126).contains(&b) || matches!(b, b'\n' | b'\r' | b'\t'));
    if !printable {
        writer.write_all(b"<")?;
        for byte in bytes {
            write!(writer, "{:02X}", byte)?;
        }
        writer.write_all(b">")?;
        return Ok(());
    }

    writer.write_all(b"(")?;
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => writer.write_all(&[b'\\', byte])?,
            b'\n' => writer.write_all(b"\\n")?,
            b'\r' => writer.write_all(b"\\r")?,
            b'\t' => writer.write_all(b"\\t")?,
            _ => writer.write_all(&[byte])?,
        }
    }
    writer.write_all(b")")?;
    Ok(())
}

/// With `length` set, `/Length` is written with that value whether or not
/// the dictionary holds one
fn write_dictionary<W: Write>(
    writer: &mut W,
    dict: &CosDictionary,
    length: Option<usize>,
    depth: usize,
) -> Result<()> {
    let length_key = Name::new("Length");
    writer.write_all(b"<<")?;
    for (key, value) in dict.entries() {
        if length.is_some() && key == length_key {
            continue;
        }
        writer.write_all(b"\n")?;
        write_name(writer, &key)?;
        writer.write_all(b" ")?;
        write_nested(writer, &value, depth + 1)?;
    }
    if let Some(length) = length {
        write!(writer, "\n/Length {}", length)?;
    }
    writer.write_all(b"\n>>")?;
    Ok(())
}

fn write_stream<W: Write>(writer: &mut W, stream: &CosStream, depth: usize) -> Result<()> {
    let data = stream.raw_data();
    write_dictionary(writer, stream.dictionary(), Some(data.len()), depth)?;
    writer.write_all(b"\nstream\n")?;
    writer.write_all(&data)?;
    writer.write_all(b"\nendstream")?;
    Ok(())
}
