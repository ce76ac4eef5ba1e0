//! Render State Cache
//!
//! - [`RenderStateCache`]: content-addressed shader and pipeline creation
//! - [`ReloadableShader`] / [`ReloadablePipelineState`]: hot-reload proxies
//! - [`AsyncPipelineState`]: placeholder for pipelines with compiling shaders
//! - [`render_state_cache_file_path`]: where cache files live

pub mod async_pipeline;
pub mod config;
pub mod file_path;
pub mod reloadable;
pub mod render_state_cache;

pub use async_pipeline::AsyncPipelineState;
pub use config::{CacheLogLevel, RenderStateCacheConfig, RenderStateCacheCreateInfo};
pub use file_path::{CACHE_FILE_EXTENSION, CacheLocation, render_state_cache_file_path};
pub use reloadable::{ReloadablePipelineState, ReloadableShader};
pub use render_state_cache::RenderStateCache;
