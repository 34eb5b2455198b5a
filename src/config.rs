//! Runtime configuration
use crate::error::{Error, Result};
use crate::pipeline::{MemoryScratchCache, ScratchCache, TempFileScratchCache};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Where filter stages stage their intermediate data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScratchKind {
    #[default]
    Memory,
    TempFile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosConfig {
    pub scratch: ScratchKind,
    /// zlib level for `FlateDecode`, 0..=9
    pub compression_level: u32,
    /// Upper bound for a single in-memory scratch buffer
    pub memory_scratch_limit: Option<usize>,
}

impl Default for CosConfig {
    fn default() -> Self {
        Self {
            scratch: ScratchKind::Memory,
            compression_level: 6,
            memory_scratch_limit: None,
        }
    }
}

impl CosConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Write the configuration as pretty JSON, replacing `path` atomically
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(data.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::config(format!(
                "compression_level must be between 0 and 9, got {}",
                self.compression_level
            )));
        }
        if self.memory_scratch_limit == Some(0) {
            return Err(Error::config("memory_scratch_limit must be positive"));
        }
        Ok(())
    }

    /// The scratch cache this configuration asks for
    pub fn scratch_cache(&self) -> Box<dyn ScratchCache> {
        match (self.scratch, self.memory_scratch_limit) {
            (ScratchKind::TempFile, _) => Box::new(TempFileScratchCache::new()),
            (ScratchKind::Memory, Some(limit)) => Box::new(MemoryScratchCache::with_limit(limit)),
            (ScratchKind::Memory, None) => Box::new(MemoryScratchCache::new()),
        }
    }
}
