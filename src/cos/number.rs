//! Booleans, integers and numeral parsing
//!
//! Booleans and small integers are canonical: asking for `true` or for an
//! integer in `-100..=256` always hands back the same instance. The integer
//! table is populated once through `LazyLock`, so concurrent first use from
//! several threads is safe.

use super::value::Value;
use crate::error::{Error, Result};
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A COS boolean. Only two instances exist, see [`CosBoolean::value_of`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct CosBoolean {
    value: bool,
}

static TRUE: CosBoolean = CosBoolean { value: true };
static FALSE: CosBoolean = CosBoolean { value: false };

impl CosBoolean {
    pub fn value_of(value: bool) -> &'static CosBoolean {
        if value { &TRUE } else { &FALSE }
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// The literal written to a file
    pub fn as_bytes(&self) -> &'static [u8] {
        if self.value { b"true" } else { b"false" }
    }
}

impl fmt::Display for CosBoolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.value { "true" } else { "false" })
    }
}

const CACHE_LOW: i64 = -100;
const CACHE_HIGH: i64 = 256;

static SMALL_INTEGERS: LazyLock<Vec<Arc<CosInteger>>> = LazyLock::new(|| {
    (CACHE_LOW..=CACHE_HIGH)
        .map(|value| Arc::new(CosInteger { value }))
        .collect()
});

/// A COS integer
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CosInteger {
    value: i64,
}

impl CosInteger {
    /// Returns the shared instance for values in `-100..=256` and a fresh
    /// allocation for anything else.
    pub fn get(value: i64) -> Arc<CosInteger> {
        if (CACHE_LOW..=CACHE_HIGH).contains(&value) {
            Arc::clone(&SMALL_INTEGERS[(value - CACHE_LOW) as usize])
        } else {
            Arc::new(CosInteger { value })
        }
    }

    pub fn zero() -> Arc<CosInteger> {
        Self::get(0)
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl fmt::Display for CosInteger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Parse a numeral into the narrowest value kind.
///
/// A lone `-` or `.` reads as integer zero; real files contain these and
/// readers have always accepted them. Integers too large for `i64` saturate
/// as long as they are made of digits.
pub fn parse_number(text: &str) -> Result<Value> {
    let bytes = text.as_bytes();
    match bytes {
        [] => return Err(Error::format("Not a number: empty numeral")),
        [digit @ b'0'..=b'9'] => return Ok(Value::Integer(CosInteger::get(i64::from(digit - b'0')))),
        [b'-' | b'.'] => return Ok(Value::Integer(CosInteger::zero())),
        [_] => return Err(Error::format(format!("Not a number: {}", text))),
        _ => {}
    }

    if bytes.iter().any(|b| matches!(b, b'.' | b'e' | b'E')) {
        return match text.parse::<f64>() {
            Ok(real) if real.is_finite() => Ok(Value::Real(real)),
            _ => Err(Error::format(format!("Not a number: {}", text))),
        };
    }

    match text.parse::<i64>() {
        Ok(value) => Ok(Value::Integer(CosInteger::get(value))),
        Err(_) => {
            let (negative, digits) = match bytes[0] {
                b'-' => (true, &bytes[1..]),
                b'+' => (false, &bytes[1..]),
                _ => (false, bytes),
            };
            if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
                return Err(Error::format(format!("Not a number: {}", text)));
            }
            tracing::debug!(numeral = text, "integer out of range, saturating");
            let value = if negative { i64::MIN } else { i64::MAX };
            Ok(Value::Integer(CosInteger::get(value)))
        }
    }
}
