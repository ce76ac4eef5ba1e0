//! Error Types
//!
//! This module defines the error types used throughout the render state cache.
//!
//! # Overview
//!
//! The main error type [`CacheError`] covers all failure modes including:
//! - Archive format and version problems
//! - Name collisions and missing archive entries
//! - Backend compilation and object creation failures
//!
//! # Usage
//!
//! Internal factories return [`Result<T>`], an alias for
//! `std::result::Result<T, CacheError>`. Only the public entry points of
//! [`RenderStateCache`](crate::cache::RenderStateCache) convert errors into
//! logged messages and `None`/`false` results.
//!
//! ```rust,ignore
//! use render_state_cache::errors::{CacheError, Result};
//!
//! fn load_archive(blob: &[u8]) -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::archive::ResourceType;
use crate::graphics::ArchiveDeviceType;

/// The main error type for the render state cache.
#[derive(Error, Debug)]
pub enum CacheError {
    // ========================================================================
    // Archive Format Errors
    // ========================================================================
    /// The blob does not start with the archive magic number.
    #[error("Invalid archive magic: {0:#010X}")]
    InvalidMagic(u32),

    /// The archive was written by an incompatible archive format version.
    #[error("Unsupported archive version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The archive was written with a different content hasher.
    #[error("Archive hasher version {found} does not match the current hasher version {expected}")]
    HasherVersionMismatch { found: u32, expected: u32 },

    /// The archive content version does not match the requested version.
    #[error("Archive content version {found} does not match the requested version {expected}")]
    ContentVersionMismatch { found: u32, expected: u32 },

    /// Structural corruption detected while parsing an archive.
    #[error("Corrupt archive: {0}")]
    Corrupt(String),

    /// Description encoding or decoding error.
    #[error("Description encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    // ========================================================================
    // Archive Content Errors
    // ========================================================================
    /// A different object already occupies this name.
    #[error("{kind} '{name}' already exists and is different")]
    NameConflict { kind: ResourceType, name: String },

    /// Two archives disagree on the backend-independent data of an entry.
    #[error("Common data of {kind} '{name}' does not match")]
    CommonDataMismatch { kind: ResourceType, name: String },

    /// The requested archive entry does not exist.
    #[error("{kind} '{name}' is not found in the archive")]
    ResourceNotFound { kind: ResourceType, name: String },

    /// The archive entry exists but carries no data for the backend.
    #[error("{kind} '{name}' has no {device} data")]
    MissingDeviceData {
        kind: ResourceType,
        name: String,
        device: ArchiveDeviceType,
    },

    /// No archive has been loaded.
    #[error("No archive is loaded")]
    NotLoaded,

    // ========================================================================
    // Object Creation Errors
    // ========================================================================
    /// Offline compilation for one of the requested backends failed.
    #[error("Failed to compile '{name}' for {device}: {reason}")]
    CompilationFailed {
        name: String,
        device: ArchiveDeviceType,
        reason: String,
    },

    /// The backend device failed to create an object.
    #[error("Failed to create {0}")]
    CreationFailed(String),

    /// Caller-class programming error.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Shader source could not be resolved.
    #[error("Shader source '{0}' is not found")]
    SourceNotFound(String),

    /// Hot reload was requested on a cache created without it.
    #[error("Hot reload is not enabled for this render state cache")]
    HotReloadDisabled,

    // ========================================================================
    // I/O & Configuration Errors
    // ========================================================================
    /// File or stream I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Text that is expected to be UTF-8 is not.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON configuration parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, CacheError>`.
pub type Result<T> = std::result::Result<T, CacheError>;
