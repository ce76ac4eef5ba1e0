//! Archiver Factory
//!
//! Explicitly constructed entry point for archive tooling. It owns the set of
//! registered offline [`BackendCompiler`]s and hands them to every
//! [`SerializationDevice`] it creates. There is no process-wide instance:
//! callers create a factory and pass it to whatever needs one.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::archive::archiver::Archiver;
use crate::archive::dearchiver::Dearchiver;
use crate::archive::device_object_archive::DeviceObjectArchive;
use crate::errors::{CacheError, Result};
use crate::graphics::ArchiveDeviceDataFlags;
use crate::serialization::{BackendCompiler, SerializationDevice, SerializationDeviceCreateInfo};

#[derive(Default)]
pub struct ArchiverFactory {
    compilers: RwLock<Vec<Arc<dyn BackendCompiler>>>,
}

impl ArchiverFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an offline compiler. Later registrations take precedence for
    /// the backends they cover. Devices created earlier are not affected.
    pub fn register_compiler(&self, compiler: Arc<dyn BackendCompiler>) {
        self.compilers.write().push(compiler);
    }

    #[must_use]
    pub fn create_serialization_device(
        &self,
        create_info: SerializationDeviceCreateInfo,
    ) -> Arc<SerializationDevice> {
        let compilers = self.compilers.read().clone();
        Arc::new(SerializationDevice::new(create_info, compilers))
    }

    #[must_use]
    pub fn create_archiver(&self, device: Arc<SerializationDevice>) -> Archiver {
        Archiver::new(device)
    }

    #[must_use]
    pub fn create_dearchiver(&self) -> Dearchiver {
        Dearchiver::new()
    }

    // ── Blob Operations ──────────────────────────────────────────────────

    /// Strips the data of every backend in `flags`.
    pub fn remove_device_data(&self, blob: &[u8], flags: ArchiveDeviceDataFlags) -> Result<Vec<u8>> {
        let mut archive = DeviceObjectArchive::deserialize(blob)?;
        for device in flags.device_types() {
            archive.remove_device_data(device);
        }
        archive.serialize()
    }

    /// Copies the data of every backend in `flags` from `device_blob`, which
    /// must describe the same objects.
    pub fn append_device_data(
        &self,
        blob: &[u8],
        flags: ArchiveDeviceDataFlags,
        device_blob: &[u8],
    ) -> Result<Vec<u8>> {
        let mut archive = DeviceObjectArchive::deserialize(blob)?;
        let device_archive = DeviceObjectArchive::deserialize(device_blob)?;
        for device in flags.device_types() {
            archive.append_device_data(&device_archive, device)?;
        }
        archive.serialize()
    }

    /// Unions several archives into one. The result takes the content
    /// version of the first archive.
    pub fn merge_archives(&self, blobs: &[&[u8]]) -> Result<Vec<u8>> {
        let (first, rest) = blobs.split_first().ok_or_else(|| {
            CacheError::InvalidArgument("at least one archive is required to merge".to_string())
        })?;
        let mut merged = DeviceObjectArchive::deserialize(first)?;
        for blob in rest {
            merged.merge(&DeviceObjectArchive::deserialize(blob)?)?;
        }
        merged.serialize()
    }

    // ── Diagnostics ──────────────────────────────────────────────────────

    /// Logs a human-readable dump of the archive.
    pub fn print_archive_content(&self, blob: &[u8]) -> bool {
        match DeviceObjectArchive::deserialize(blob) {
            Ok(archive) => {
                log::info!("{archive}");
                true
            }
            Err(err) => {
                log::error!("Failed to read archive: {err}");
                false
            }
        }
    }

    /// Parses the archive and checks every shader reference.
    pub fn validate_archive(&self, blob: &[u8]) -> bool {
        match DeviceObjectArchive::deserialize(blob).and_then(|archive| archive.validate()) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Archive validation failed: {err}");
                false
            }
        }
    }
}
