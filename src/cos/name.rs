//! Names and byte strings
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A COS name with shared storage.
///
/// Names such as `Type`, `Length` or `Filter` repeat in nearly every
/// dictionary, so a fixed table of well-known names is interned once and
/// handed out by pointer. Any other name gets its own `Arc<str>`. Equality
/// and hashing are by value either way.
#[derive(Debug, Clone, Eq)]
pub struct Name(Arc<str>);

impl Name {
    pub fn new(s: &str) -> Self {
        Self::well_known(s).unwrap_or_else(|| Self(Arc::from(s)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this name shares storage with the well-known table
    pub fn is_well_known(&self) -> bool {
        WELL_KNOWN.iter().any(|arc| Arc::ptr_eq(&self.0, arc))
    }

    fn well_known(s: &str) -> Option<Self> {
        WELL_KNOWN
            .iter()
            .find(|arc| arc.as_ref() == s)
            .map(|arc| Self(Arc::clone(arc)))
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.as_ref() == other.0.as_ref()
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self::well_known(&s).unwrap_or_else(|| Self(Arc::from(s)))
    }
}

impl From<&Name> for Name {
    fn from(n: &Name) -> Self {
        n.clone()
    }
}

static WELL_KNOWN: LazyLock<Vec<Arc<str>>> = LazyLock::new(|| {
    [
        // structure
        "Type", "Subtype", "Root", "Info", "Size", "Prev", "ID", "Encrypt",
        // streams
        "Length", "Filter", "DecodeParms", "DL", "F", "FFilter", "FDecodeParms",
        // filters and their abbreviations
        "FlateDecode", "Fl", "ASCIIHexDecode", "AHx", "ASCII85Decode", "A85",
        "LZWDecode", "LZW", "RunLengthDecode", "RL", "DCTDecode", "DCT",
        "CCITTFaxDecode", "CCF", "JPXDecode", "JBIG2Decode", "Crypt",
        // predictor parameters
        "Predictor", "Colors", "BitsPerComponent", "Columns", "EarlyChange",
        // pages
        "Catalog", "Pages", "Page", "Kids", "Count", "Parent", "Resources",
        "Contents", "MediaBox",
        // object and xref streams
        "ObjStm", "XRef", "N", "First", "Index", "W",
    ]
    .into_iter()
    .map(Arc::from)
    .collect()
});

/// A COS string: arbitrary bytes, no encoding implied
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CosString(Vec<u8>);

impl CosString {
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CosString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for CosString {
    fn from(b: &[u8]) -> Self {
        Self(b.to_vec())
    }
}

impl From<Vec<u8>> for CosString {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}
