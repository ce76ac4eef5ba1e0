//! Render State Cache
//!
//! Content-addressed front end for shader and pipeline creation on one live
//! device.
//!
//! # Lookup Order
//!
//! For every request the cache computes the [`ContentHash`] of the create
//! info and tries, in order:
//!
//! 1. objects created earlier in this session (weak references, keyed by hash)
//! 2. the loaded archives, by HashString
//! 3. the archiver, which holds objects serialized in this session
//! 4. the live device
//!
//! Objects that were not found are serialized into the archiver, so the next
//! [`write_to_blob`](RenderStateCache::write_to_blob) persists them.
//!
//! # Errors
//!
//! Internals return [`Result`]. The public entry points log failures and
//! return `None` / `false`.
//!
//! # Thread Safety
//!
//! Object creation may run concurrently. `write_to_blob`, `write_to_stream`,
//! `reset` and `reload` must not overlap with each other or with creation.

use std::collections::hash_map::Entry;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::archive::{
    Archiver, Dearchiver, PipelineStateUnpackInfo, ShaderUnpackInfo,
};
use crate::cache::async_pipeline::AsyncPipelineState;
use crate::cache::config::{CacheLogLevel, RenderStateCacheConfig, RenderStateCacheCreateInfo};
use crate::cache::reloadable::{ReloadablePipelineState, ReloadableShader};
use crate::errors::{CacheError, Result};
use crate::graphics::objects::{
    DeviceObject, PipelineState, PipelineStateRef, PipelineStateStatus, RenderPassRef, Shader,
    ShaderRef, ShaderStatus, SignatureRef, UniqueId, query_interface,
};
use crate::graphics::pipeline::{
    ComputePipelineStateCreateInfo, GraphicsPipelineDesc, GraphicsPipelineStateCreateInfo,
    PipelineStateCreateInfo, RayTracingPipelineStateCreateInfo, TilePipelineStateCreateInfo,
};
use crate::graphics::shader::{ShaderCreateInfo, ShaderDesc};
use crate::graphics::source::{CompoundSourceFactory, ShaderSourceFactory};
use crate::graphics::{RenderDevice, RenderDeviceType};
use crate::hash::{ContentHash, ContentHasher, make_hash_str};
use crate::serialization::{
    PipelineStateArchiveInfo, ResourceSignatureArchiveInfo, SerializationDevice,
    SerializationDeviceCreateInfo, SerializedShader, ShaderArchiveInfo,
};

/// Logs an informational message if the configured level allows it.
macro_rules! cache_log {
    ($cache:expr, $level:expr, $($arg:tt)*) => {
        if $cache.config.log_level >= $level {
            log::info!("Render state cache: {}", format_args!($($arg)*));
        }
    };
}

/// Looks up a live object in a weak map, evicting the entry if it died.
fn find_live<K: std::hash::Hash + Eq, T: ?Sized>(map: &Mutex<FxHashMap<K, Weak<T>>>, key: &K) -> Option<Arc<T>> {
    let mut map = map.lock();
    let object = map.get(key)?.upgrade();
    if object.is_none() {
        map.remove(key);
    }
    object
}

/// Inserts `object` unless a live object already holds the key, in which case
/// that one is returned instead.
fn insert_live<K: std::hash::Hash + Eq, T: ?Sized>(
    map: &Mutex<FxHashMap<K, Weak<T>>>,
    key: K,
    object: Arc<T>,
) -> std::result::Result<Arc<T>, Arc<T>> {
    let mut map = map.lock();
    match map.entry(key) {
        Entry::Occupied(mut entry) => match entry.get().upgrade() {
            Some(existing) => Err(existing),
            None => {
                entry.insert(Arc::downgrade(&object));
                Ok(object)
            }
        },
        Entry::Vacant(entry) => {
            entry.insert(Arc::downgrade(&object));
            Ok(object)
        }
    }
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

fn display_name(name: &str) -> &str {
    if name.is_empty() { "<unnamed>" } else { name }
}

pub struct RenderStateCache {
    self_ref: Weak<RenderStateCache>,
    device: Arc<dyn RenderDevice>,
    device_type: RenderDeviceType,
    device_hash: u64,
    config: RenderStateCacheConfig,
    reload_source: Option<Arc<dyn ShaderSourceFactory>>,

    serialization_device: Arc<SerializationDevice>,
    archiver: Archiver,
    dearchiver: Dearchiver,

    shaders: Mutex<FxHashMap<ContentHash, Weak<dyn Shader>>>,
    pipelines: Mutex<FxHashMap<ContentHash, Weak<dyn PipelineState>>>,
    reloadable_shaders: Mutex<FxHashMap<UniqueId, Weak<ReloadableShader>>>,
    reloadable_pipelines: Mutex<FxHashMap<UniqueId, Weak<ReloadablePipelineState>>>,
}

impl RenderStateCache {
    pub fn new(create_info: RenderStateCacheCreateInfo) -> Result<Arc<Self>> {
        let RenderStateCacheCreateInfo {
            device,
            archiver_factory,
            config,
            reload_source,
        } = create_info;

        let device_info = device.device_info();
        let reload_source = if config.enable_hot_reload {
            reload_source
        } else {
            if reload_source.is_some() {
                log::warn!("Render state cache: reload source is ignored because hot reload is disabled");
            }
            None
        };

        let serialization_device = archiver_factory.create_serialization_device(
            SerializationDeviceCreateInfo::for_device(device_info, config.optimize_gl_shaders),
        );
        serialization_device.add_render_device(device.clone());
        let archiver = archiver_factory.create_archiver(serialization_device.clone());
        let dearchiver = archiver_factory.create_dearchiver();

        log::debug!(
            "Render state cache: created for {} (hot reload: {})",
            device_info.device_type,
            config.enable_hot_reload
        );

        Ok(Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            device,
            device_type: device_info.device_type,
            device_hash: ContentHasher::device_hash(&device_info),
            config,
            reload_source,
            serialization_device,
            archiver,
            dearchiver,
            shaders: Mutex::new(FxHashMap::default()),
            pipelines: Mutex::new(FxHashMap::default()),
            reloadable_shaders: Mutex::new(FxHashMap::default()),
            reloadable_pipelines: Mutex::new(FxHashMap::default()),
        }))
    }

    #[must_use]
    pub fn device_type(&self) -> RenderDeviceType {
        self.device_type
    }

    #[must_use]
    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    #[must_use]
    pub fn config(&self) -> &RenderStateCacheConfig {
        &self.config
    }

    #[must_use]
    pub fn serialization_device(&self) -> &Arc<SerializationDevice> {
        &self.serialization_device
    }

    /// Content version of the loaded archives, `u32::MAX` when none is loaded.
    #[must_use]
    pub fn content_version(&self) -> u32 {
        self.dearchiver.content_version()
    }

    // ── Loading & Writing ────────────────────────────────────────────────

    /// Loads a cache blob. `content_version` must match the blob's unless it
    /// is `u32::MAX`.
    pub fn load(&self, blob: Arc<[u8]>, content_version: u32, make_copy: bool) -> bool {
        match self.dearchiver.load_archive(blob, content_version, make_copy) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Render state cache: failed to load archive: {err}");
                false
            }
        }
    }

    /// Loads a cache file. A missing file is not an error worth logging as
    /// such; it only means there is nothing to load yet.
    pub fn load_from_file(&self, path: impl AsRef<Path>, content_version: u32) -> bool {
        let path = path.as_ref();
        if !path.is_file() {
            log::info!("Render state cache: '{}' does not exist", path.display());
            return false;
        }
        match std::fs::read(path) {
            Ok(bytes) => self.load(Arc::from(bytes), content_version, false),
            Err(err) => {
                log::error!("Render state cache: failed to read '{}': {err}", path.display());
                false
            }
        }
    }

    fn write_to_blob_internal(&self, content_version: u32) -> Result<Vec<u8>> {
        let content_version = match content_version {
            u32::MAX => match self.dearchiver.content_version() {
                u32::MAX => 0,
                loaded => loaded,
            },
            explicit => explicit,
        };

        // The archiver only writes and the dearchiver only reads and merges,
        // so new objects go through a blob into the dearchiver.
        let blob = self.archiver.serialize_to_blob(content_version)?;
        self.dearchiver.load_archive(Arc::from(blob), content_version, false)?;
        self.archiver.reset();
        self.dearchiver.store()
    }

    /// Consolidates the loaded archives and everything created since into
    /// one blob. `u32::MAX` keeps the loaded content version (or 0).
    pub fn write_to_blob(&self, content_version: u32) -> Option<Vec<u8>> {
        match self.write_to_blob_internal(content_version) {
            Ok(blob) => Some(blob),
            Err(err) => {
                log::error!("Render state cache: failed to write archive: {err}");
                None
            }
        }
    }

    pub fn write_to_stream<W: Write + ?Sized>(&self, content_version: u32, writer: &mut W) -> bool {
        let Some(blob) = self.write_to_blob(content_version) else {
            return false;
        };
        match writer.write_all(&blob) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Render state cache: failed to write archive to stream: {err}");
                false
            }
        }
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>, content_version: u32) -> bool {
        let path = path.as_ref();
        let Some(blob) = self.write_to_blob(content_version) else {
            return false;
        };
        match std::fs::write(path, blob) {
            Ok(()) => true,
            Err(err) => {
                log::error!("Render state cache: failed to write '{}': {err}", path.display());
                false
            }
        }
    }

    /// Unloads all archives and forgets every tracked object. Objects already
    /// handed out stay valid.
    pub fn reset(&self) {
        self.dearchiver.reset();
        self.archiver.reset();
        self.shaders.lock().clear();
        self.pipelines.lock().clear();
        self.reloadable_shaders.lock().clear();
        self.reloadable_pipelines.lock().clear();
    }

    // ── Shaders ──────────────────────────────────────────────────────────

    /// Creates a shader, or returns the cached one. The flag reports whether
    /// the shader was found in the cache.
    pub fn create_shader(&self, create_info: &ShaderCreateInfo) -> (Option<ShaderRef>, bool) {
        let (shader, found) = match self.create_shader_internal(create_info) {
            Ok(result) => result,
            Err(err) => {
                log::error!(
                    "Render state cache: failed to create shader '{}': {err}",
                    display_name(&create_info.desc.name)
                );
                return (None, false);
            }
        };

        if !self.config.enable_hot_reload {
            return (Some(shader), found);
        }
        (Some(self.reloadable_shader(shader, create_info)), found)
    }

    fn reloadable_shader(&self, shader: ShaderRef, create_info: &ShaderCreateInfo) -> ShaderRef {
        let id = shader.unique_id();
        if let Some(reloadable) = find_live(&self.reloadable_shaders, &id) {
            return reloadable;
        }

        let mut reload_ci = create_info.clone();
        if let Some(reload_source) = &self.reload_source {
            reload_ci.source_factory = Some(match &create_info.source_factory {
                Some(original) => Arc::new(CompoundSourceFactory::new(vec![
                    reload_source.clone(),
                    original.clone(),
                ])),
                None => reload_source.clone(),
            });
        }

        let reloadable = Arc::new(ReloadableShader::new(self.self_ref.clone(), shader, reload_ci));
        match insert_live(&self.reloadable_shaders, id, reloadable) {
            Ok(reloadable) | Err(reloadable) => reloadable,
        }
    }

    pub(crate) fn create_shader_internal(&self, create_info: &ShaderCreateInfo) -> Result<(ShaderRef, bool)> {
        let resolved = create_info.resolve_source()?;
        let hash = ContentHash::of_shader(&resolved, self.device_hash, cfg!(debug_assertions))?;

        if let Some(shader) = find_live(&self.shaders, &hash) {
            cache_log!(self, CacheLogLevel::Verbose, "reusing existing shader '{}'", resolved.desc.name);
            return Ok((shader, true));
        }

        let (shader, found) = self.find_or_create_shader(&resolved, hash)?;
        // Another thread may have created the same shader meanwhile.
        match insert_live(&self.shaders, hash, shader) {
            Ok(shader) => Ok((shader, found)),
            Err(existing) => Ok((existing, true)),
        }
    }

    fn find_or_create_shader(&self, resolved: &ShaderCreateInfo, hash: ContentHash) -> Result<(ShaderRef, bool)> {
        let user_name = resolved.desc.name.clone();
        let hash_str = make_hash_str(non_empty(&user_name), hash);

        let mut rename = |desc: &mut ShaderDesc| desc.name.clone_from(&user_name);
        let unpack_info = ShaderUnpackInfo {
            device: self.device.as_ref(),
            name: Some(&hash_str),
            modify: Some(&mut rename),
        };
        match self.dearchiver.unpack_shader(unpack_info) {
            Ok(shader) if shader.desc() == resolved.desc => {
                cache_log!(self, CacheLogLevel::Verbose, "found shader '{hash_str}' in the archive");
                return Ok((shader, true));
            }
            Ok(_) => log::error!(
                "Description of shader '{}' does not match the description of the shader unpacked from the cache. \
                 This may be the result of a hash conflict.",
                display_name(&user_name)
            ),
            Err(CacheError::NotLoaded | CacheError::ResourceNotFound { .. }) => {}
            Err(err) => log::warn!("Render state cache: failed to unpack shader '{hash_str}': {err}"),
        }

        let (serialized, found_in_archiver) = match self.archiver.get_shader(&hash_str) {
            Some(serialized) => (Some(serialized), true),
            None => (self.serialize_shader(resolved, &hash_str), false),
        };

        if let Some(serialized) = serialized {
            match serialized.device_shader(self.device_type) {
                Ok(Some(shader)) if shader.desc() == resolved.desc => return Ok((shader, found_in_archiver)),
                Ok(Some(_)) => log::error!(
                    "Description of shader '{}' does not match the description of the shader recently added to the cache. \
                     This may be the result of a hash conflict.",
                    display_name(&user_name)
                ),
                Ok(None) => log::error!("Render state cache: serialized shader '{hash_str}' has no device shader"),
                Err(err) => log::warn!("Render state cache: failed to create device shader '{hash_str}': {err}"),
            }
        }

        Ok((self.device.create_shader(resolved)?, false))
    }

    /// Serializes a shader under `hash_str` and adds it to the archiver.
    fn serialize_shader(&self, resolved: &ShaderCreateInfo, hash_str: &str) -> Option<Arc<SerializedShader>> {
        let mut archive_ci = resolved.clone();
        archive_ci.desc.name = hash_str.to_string();
        let archive_info = ShaderArchiveInfo {
            device_flags: self.device_type.archive_flag(),
        };
        let serialized = match self.serialization_device.create_shader(&archive_ci, &archive_info) {
            Ok(serialized) => serialized,
            Err(err) => {
                log::warn!("Render state cache: failed to serialize shader '{hash_str}': {err}");
                return None;
            }
        };
        match self.archiver.add_shader(serialized.clone()) {
            Ok(()) => cache_log!(self, CacheLogLevel::Normal, "added shader '{hash_str}'"),
            Err(err) => log::error!("Render state cache: failed to archive shader '{hash_str}': {err}"),
        }
        Some(serialized)
    }

    // ── Pipelines ────────────────────────────────────────────────────────

    /// Creates a pipeline of any family, or returns the cached one.
    pub fn create_pipeline_state(&self, create_info: &PipelineStateCreateInfo) -> (Option<PipelineStateRef>, bool) {
        let (pipeline, found) = match self.create_pipeline_state_internal(create_info) {
            Ok(result) => result,
            Err(err) => {
                log::error!(
                    "Render state cache: failed to create pipeline state '{}': {err}",
                    display_name(create_info.name())
                );
                return (None, false);
            }
        };

        if !self.config.enable_hot_reload {
            return (Some(pipeline), found);
        }
        (Some(self.reloadable_pipeline(pipeline, create_info)), found)
    }

    pub fn create_graphics_pipeline_state(
        &self,
        create_info: &GraphicsPipelineStateCreateInfo,
    ) -> (Option<PipelineStateRef>, bool) {
        self.create_pipeline_state(&create_info.clone().into())
    }

    pub fn create_compute_pipeline_state(
        &self,
        create_info: &ComputePipelineStateCreateInfo,
    ) -> (Option<PipelineStateRef>, bool) {
        self.create_pipeline_state(&create_info.clone().into())
    }

    pub fn create_ray_tracing_pipeline_state(
        &self,
        create_info: &RayTracingPipelineStateCreateInfo,
    ) -> (Option<PipelineStateRef>, bool) {
        self.create_pipeline_state(&create_info.clone().into())
    }

    pub fn create_tile_pipeline_state(
        &self,
        create_info: &TilePipelineStateCreateInfo,
    ) -> (Option<PipelineStateRef>, bool) {
        self.create_pipeline_state(&create_info.clone().into())
    }

    fn reloadable_pipeline(&self, pipeline: PipelineStateRef, create_info: &PipelineStateCreateInfo) -> PipelineStateRef {
        let id = pipeline.unique_id();
        if let Some(reloadable) = find_live(&self.reloadable_pipelines, &id) {
            return reloadable;
        }

        // Point shader slots at the reloadable shaders so that reloading the
        // shaders first is enough for the pipeline to pick up new bytecode.
        let mut reload_ci = create_info.clone();
        reload_ci.for_each_shader_slot_mut(|slot| {
            let Some(shader) = slot else {
                return;
            };
            if shader.as_any().is::<ReloadableShader>() {
                return;
            }
            if let Some(reloadable) = find_live(&self.reloadable_shaders, &shader.unique_id()) {
                *slot = Some(reloadable as ShaderRef);
            }
        });

        let reloadable = Arc::new(ReloadablePipelineState::new(self.self_ref.clone(), pipeline, reload_ci));
        match insert_live(&self.reloadable_pipelines, id, reloadable) {
            Ok(reloadable) | Err(reloadable) => reloadable,
        }
    }

    pub(crate) fn create_pipeline_state_internal(
        &self,
        create_info: &PipelineStateCreateInfo,
    ) -> Result<(PipelineStateRef, bool)> {
        match create_info.shaders_status() {
            ShaderStatus::Failed => {
                return Err(CacheError::CreationFailed(format!(
                    "pipeline state '{}': one or more shaders failed to compile",
                    display_name(create_info.name())
                )));
            }
            ShaderStatus::Compiling => {
                let placeholder: PipelineStateRef =
                    Arc::new(AsyncPipelineState::new(self.self_ref.clone(), create_info.clone()));
                return Ok((placeholder, false));
            }
            ShaderStatus::Ready => {}
        }

        let hash = ContentHash::of_pipeline(create_info, self.device_hash)?;
        if let Some(pipeline) = find_live(&self.pipelines, &hash) {
            cache_log!(
                self,
                CacheLogLevel::Verbose,
                "reusing existing pipeline '{}'",
                create_info.name()
            );
            return Ok((pipeline, true));
        }

        let hash_str = make_hash_str(non_empty(create_info.name()), hash);
        let (pipeline, found) = match self.unpack_pipeline(create_info, &hash_str) {
            Some(pipeline) => (pipeline, true),
            None => (self.device.create_pipeline_state(create_info)?, false),
        };
        let pipeline = match insert_live(&self.pipelines, hash, pipeline) {
            Ok(pipeline) => pipeline,
            Err(existing) => return Ok((existing, true)),
        };

        if found {
            cache_log!(self, CacheLogLevel::Verbose, "found pipeline '{hash_str}' in the archive");
            return Ok((pipeline, true));
        }
        if self
            .archiver
            .get_pipeline_state(create_info.pipeline_type(), &hash_str)
            .is_some()
        {
            return Ok((pipeline, true));
        }

        match self.archive_pipeline(create_info, &hash_str) {
            Ok(()) => cache_log!(self, CacheLogLevel::Normal, "added pipeline '{hash_str}'"),
            Err(err) => log::error!("Render state cache: failed to archive pipeline '{hash_str}': {err}"),
        }
        Ok((pipeline, false))
    }

    fn unpack_pipeline(&self, create_info: &PipelineStateCreateInfo, hash_str: &str) -> Option<PipelineStateRef> {
        let user_name = create_info.name().to_string();
        let mut rename = |ci: &mut PipelineStateCreateInfo| ci.pso_desc_mut().name.clone_from(&user_name);
        let mut unpack_info = PipelineStateUnpackInfo::new(self.device.as_ref(), Some(hash_str), create_info.pipeline_type());
        unpack_info.modify = Some(&mut rename);

        let pipeline = match self.dearchiver.unpack_pipeline_state(unpack_info) {
            Ok(pipeline) => pipeline,
            Err(CacheError::NotLoaded | CacheError::ResourceNotFound { .. }) => return None,
            Err(err) => {
                log::warn!("Render state cache: failed to unpack pipeline '{hash_str}': {err}");
                return None;
            }
        };

        match pipeline.status() {
            PipelineStateStatus::Ready if pipeline.desc() == *create_info.pso_desc() => Some(pipeline),
            PipelineStateStatus::Ready => {
                log::error!(
                    "Description of pipeline state '{}' does not match the description of the pipeline unpacked from the cache. \
                     This may be the result of a hash conflict.",
                    display_name(&user_name)
                );
                None
            }
            PipelineStateStatus::Compiling => Some(pipeline),
            PipelineStateStatus::Failed => {
                log::error!("Pipeline state '{}' is in failed state", display_name(&user_name));
                None
            }
        }
    }

    /// Serializes a pipeline under `hash_str` and adds it to the archiver.
    ///
    /// Signatures and the render pass are serialized under their own hash
    /// strings; shaders that are not serialized objects are serialized from
    /// their bytecode.
    fn archive_pipeline(&self, create_info: &PipelineStateCreateInfo, hash_str: &str) -> Result<()> {
        let device_flags = self.device_type.archive_flag();
        let mut serialized_ci = create_info.clone();

        let signatures = serialized_ci
            .resource_signatures()
            .iter()
            .map(|sign| {
                let mut desc = sign.desc();
                let hash = ContentHash::of_signature(&desc, self.device_type)?;
                desc.name = make_hash_str(non_empty(&desc.name), hash);
                let serialized = self
                    .serialization_device
                    .create_pipeline_resource_signature(&desc, &ResourceSignatureArchiveInfo { device_flags })?;
                Ok(serialized as SignatureRef)
            })
            .collect::<Result<Vec<_>>>()?;
        *serialized_ci.resource_signatures_mut() = signatures;

        if let PipelineStateCreateInfo::Graphics(graphics) = &mut serialized_ci
            && let Some(render_pass) = &graphics.render_pass
        {
            let mut desc = render_pass.desc();
            let hash = ContentHash::of_render_pass(&desc, self.device_type)?;
            desc.name = make_hash_str(non_empty(&desc.name), hash);
            let serialized = self.serialization_device.create_render_pass(&desc)?;
            graphics.render_pass = Some(serialized as RenderPassRef);
        }

        let mut result = Ok(());
        serialized_ci.for_each_shader_slot_mut(|slot| {
            if result.is_err() {
                return;
            }
            if let Some(shader) = slot {
                match self.serialized_pipeline_shader(shader) {
                    Ok(serialized) => *slot = Some(serialized),
                    Err(err) => result = Err(err),
                }
            }
        });
        result?;

        serialized_ci.pso_desc_mut().name = hash_str.to_string();
        let serialized = self
            .serialization_device
            .create_pipeline_state(&serialized_ci, &PipelineStateArchiveInfo { device_flags })?;
        self.archiver.add_pipeline_state(serialized)
    }

    fn serialized_pipeline_shader(&self, shader: &ShaderRef) -> Result<ShaderRef> {
        if let Some(serialized) = query_interface::<SerializedShader>(shader.clone() as Arc<dyn DeviceObject>) {
            return Ok(serialized as ShaderRef);
        }
        let bytecode = shader.bytecode();
        let create_info =
            ShaderCreateInfo::from_device_bytecode(shader.desc(), shader.entry_point(), self.device_type, &bytecode)?;
        let archive_info = ShaderArchiveInfo {
            device_flags: self.device_type.archive_flag(),
        };
        let serialized = self.serialization_device.create_shader(&create_info, &archive_info)?;
        Ok(serialized as ShaderRef)
    }

    // ── Hot Reload ───────────────────────────────────────────────────────

    /// Reloads every live reloadable shader, then every live reloadable
    /// pipeline. Returns the number of objects whose content changed.
    ///
    /// `modify_graphics` is called with the name and graphics state of every
    /// graphics pipeline before it is re-created.
    pub fn reload(&self, mut modify_graphics: Option<&mut dyn FnMut(&str, &mut GraphicsPipelineDesc)>) -> u32 {
        if !self.config.enable_hot_reload {
            log::error!("Render state cache: {}", CacheError::HotReloadDisabled);
            return 0;
        }

        let shaders: Vec<Arc<ReloadableShader>> = self
            .reloadable_shaders
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect();
        let pipelines: Vec<Arc<ReloadablePipelineState>> = self
            .reloadable_pipelines
            .lock()
            .values()
            .filter_map(Weak::upgrade)
            .collect();

        let mut reloaded = 0;
        for shader in shaders {
            match shader.reload() {
                Ok(true) => reloaded += 1,
                Ok(false) => {}
                Err(err) => log::error!(
                    "Render state cache: failed to reload shader '{}': {err}",
                    display_name(&shader.desc().name)
                ),
            }
        }

        for pipeline in pipelines {
            match pipeline.reload(modify_graphics.as_deref_mut()) {
                Ok(true) => reloaded += 1,
                Ok(false) => {}
                Err(err) => log::error!(
                    "Render state cache: failed to reload pipeline '{}': {err}",
                    display_name(&pipeline.desc().name)
                ),
            }
        }

        cache_log!(self, CacheLogLevel::Normal, "reloaded {reloaded} objects");
        reloaded
    }
}
