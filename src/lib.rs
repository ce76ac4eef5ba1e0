#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod archive;
pub mod cache;
pub mod errors;
pub mod graphics;
pub mod hash;
pub mod serialization;

pub use archive::{Archiver, ArchiverFactory, Dearchiver, DeviceObjectArchive, ResourceType};
pub use cache::{
    CacheLocation, CacheLogLevel, RenderStateCache, RenderStateCacheConfig,
    RenderStateCacheCreateInfo, render_state_cache_file_path,
};
pub use errors::{CacheError, Result};
pub use hash::{ContentHash, ContentHasher, make_hash_str};
pub use serialization::{SerializationDevice, SerializationDeviceCreateInfo};
