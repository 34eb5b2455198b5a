//! Stream output pipeline and its scratch storage

pub mod output;
pub mod scratch;

pub use output::StreamOutput;
pub use scratch::{
    MemoryScratchCache, RandomAccessBuffer, ScratchCache, ScratchStats, TempFileScratchCache,
};
