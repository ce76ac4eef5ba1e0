//! Cache file location.

use std::path::PathBuf;

use crate::errors::{CacheError, Result};
use crate::graphics::RenderDeviceType;

/// Cache file extension.
pub const CACHE_FILE_EXTENSION: &str = "diligentcache";

/// Where the cache file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// The platform's local application data directory.
    AppData,
    Directory(PathBuf),
}

/// Returns `<dir>/[<app_name>_]<device>_<d|r>.diligentcache`, creating the
/// directory when it does not exist.
///
/// The `d`/`r` suffix separates debug and release builds, whose shader
/// hashes differ.
pub fn render_state_cache_file_path(
    location: &CacheLocation,
    app_name: Option<&str>,
    device_type: RenderDeviceType,
) -> Result<PathBuf> {
    let dir = match location {
        CacheLocation::AppData => dirs::data_local_dir().ok_or_else(|| {
            CacheError::InvalidArgument("the local application data directory is unknown".to_string())
        })?,
        CacheLocation::Directory(dir) => dir.clone(),
    };
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }

    let build = if cfg!(debug_assertions) { 'd' } else { 'r' };
    let file_name = match app_name {
        Some(app) if !app.is_empty() => {
            format!("{app}_{}_{build}.{CACHE_FILE_EXTENSION}", device_type.short_name())
        }
        _ => format!("{}_{build}.{CACHE_FILE_EXTENSION}", device_type.short_name()),
    };
    Ok(dir.join(file_name))
}
