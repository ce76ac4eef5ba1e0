//! Render state cache configuration.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::archive::ArchiverFactory;
use crate::errors::Result;
use crate::graphics::{RenderDevice, ShaderSourceFactory};

/// Verbosity of the cache's informational messages. Errors are always logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLogLevel {
    Disabled,
    /// Objects added to the cache.
    #[default]
    Normal,
    /// Also objects found in the cache.
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStateCacheConfig {
    pub log_level: CacheLogLevel,
    /// Wrap created objects in reloadable proxies so [`reload`] can swap
    /// them in place.
    ///
    /// [`reload`]: crate::cache::RenderStateCache::reload
    pub enable_hot_reload: bool,
    /// Run the GL shader optimizer when serializing GL shaders.
    pub optimize_gl_shaders: bool,
}

impl Default for RenderStateCacheConfig {
    fn default() -> Self {
        Self {
            log_level: CacheLogLevel::Normal,
            enable_hot_reload: false,
            optimize_gl_shaders: true,
        }
    }
}

impl RenderStateCacheConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

pub struct RenderStateCacheCreateInfo {
    pub device: Arc<dyn RenderDevice>,
    pub archiver_factory: Arc<ArchiverFactory>,
    pub config: RenderStateCacheConfig,
    /// Source used to re-read shader files on reload. It takes precedence
    /// over each shader's own source factory.
    pub reload_source: Option<Arc<dyn ShaderSourceFactory>>,
}

impl RenderStateCacheCreateInfo {
    #[must_use]
    pub fn new(device: Arc<dyn RenderDevice>, archiver_factory: Arc<ArchiverFactory>) -> Self {
        Self {
            device,
            archiver_factory,
            config: RenderStateCacheConfig::default(),
            reload_source: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RenderStateCacheConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_reload_source(mut self, source: Arc<dyn ShaderSourceFactory>) -> Self {
        self.reload_source = Some(source);
        self
    }
}

impl fmt::Debug for RenderStateCacheCreateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderStateCacheCreateInfo")
            .field("device", &self.device.device_info().device_type)
            .field("config", &self.config)
            .field("reload_source", &self.reload_source)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = RenderStateCacheConfig::from_json_str(r#"{ "enable_hot_reload": true }"#).unwrap();
        assert!(config.enable_hot_reload);
        assert!(config.optimize_gl_shaders);
        assert_eq!(config.log_level, CacheLogLevel::Normal);
    }

    #[test]
    fn log_levels_are_ordered() {
        assert!(CacheLogLevel::Verbose > CacheLogLevel::Normal);
        assert!(CacheLogLevel::Normal > CacheLogLevel::Disabled);
    }
}
