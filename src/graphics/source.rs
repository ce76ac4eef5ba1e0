//! Shader source factories.
//!
//! Shaders created from files resolve their text through a
//! [`ShaderSourceFactory`]. The render state cache layers its reload source on
//! top of the original factory with [`CompoundSourceFactory`], so edited files
//! are picked up on reload.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{CacheError, Result};

pub trait ShaderSourceFactory: Send + Sync + fmt::Debug {
    fn read_source(&self, path: &str) -> Result<String>;
}

/// Reads shader files from a list of search directories, first match wins.
#[derive(Debug, Clone, Default)]
pub struct FileSystemSourceFactory {
    search_dirs: Vec<PathBuf>,
}

impl FileSystemSourceFactory {
    pub fn new(search_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }
}

impl ShaderSourceFactory for FileSystemSourceFactory {
    fn read_source(&self, path: &str) -> Result<String> {
        for dir in &self.search_dirs {
            let full_path = dir.join(path);
            if full_path.is_file() {
                return Ok(std::fs::read_to_string(full_path)?);
            }
        }
        let direct = PathBuf::from(path);
        if self.search_dirs.is_empty() && direct.is_file() {
            return Ok(std::fs::read_to_string(direct)?);
        }
        Err(CacheError::SourceNotFound(path.to_string()))
    }
}

/// In-memory shader files; contents may be replaced at any time.
#[derive(Debug, Default)]
pub struct MemorySourceFactory {
    files: RwLock<FxHashMap<String, String>>,
}

impl MemorySourceFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&self, path: impl Into<String>, text: impl Into<String>) {
        self.files.write().insert(path.into(), text.into());
    }

    pub fn remove_source(&self, path: &str) -> Option<String> {
        self.files.write().remove(path)
    }
}

impl ShaderSourceFactory for MemorySourceFactory {
    fn read_source(&self, path: &str) -> Result<String> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| CacheError::SourceNotFound(path.to_string()))
    }
}

/// Tries each factory in order.
#[derive(Debug, Clone)]
pub struct CompoundSourceFactory {
    factories: Vec<Arc<dyn ShaderSourceFactory>>,
}

impl CompoundSourceFactory {
    #[must_use]
    pub fn new(factories: Vec<Arc<dyn ShaderSourceFactory>>) -> Self {
        Self { factories }
    }
}

impl ShaderSourceFactory for CompoundSourceFactory {
    fn read_source(&self, path: &str) -> Result<String> {
        for factory in &self.factories {
            match factory.read_source(path) {
                Ok(text) => return Ok(text),
                Err(CacheError::SourceNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(CacheError::SourceNotFound(path.to_string()))
    }
}
