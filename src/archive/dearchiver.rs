//! Dearchiver
//!
//! Loads archives and re-creates live device objects from them.
//!
//! Several archives may be loaded at once. Entry names are resolved across
//! all of them; when two archives define the same name, the one loaded first
//! wins. [`Dearchiver::store`] writes every loaded archive back out as a
//! single archive.
//!
//! Objects unpacked without a modify callback are tracked weakly per device
//! type, so unpacking the same entry twice while the first object is alive
//! returns that object.
//!
//! The archive lock is never held across device calls.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_128;

use crate::archive::ResourceType;
use crate::archive::device_object_archive::{
    ArchivedShaderData, DeviceObjectArchive, decode_shader_indices,
};
use crate::errors::{CacheError, Result};
use crate::graphics::objects::{
    PipelineResourceSignature, PipelineState, PipelineStateRef, RenderPass, RenderPassRef,
    Shader, ShaderRef, SignatureRef,
};
use crate::graphics::pipeline::{PipelineStateCreateInfo, PipelineTemplate};
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::{ShaderCreateInfo, ShaderDesc};
use crate::graphics::signature::PipelineResourceSignatureDesc;
use crate::graphics::{ArchiveDeviceType, PipelineType, RenderDevice, RenderDeviceType};

// ─── Unpack Info ─────────────────────────────────────────────────────────────

pub struct ShaderUnpackInfo<'a> {
    pub device: &'a dyn RenderDevice,
    /// Entry name; may be omitted when the archives hold exactly one shader.
    pub name: Option<&'a str>,
    /// Called once with the archived description before the shader is created.
    pub modify: Option<&'a mut dyn FnMut(&mut ShaderDesc)>,
}

impl<'a> ShaderUnpackInfo<'a> {
    #[must_use]
    pub fn new(device: &'a dyn RenderDevice, name: Option<&'a str>) -> Self {
        Self {
            device,
            name,
            modify: None,
        }
    }
}

pub struct ResourceSignatureUnpackInfo<'a> {
    pub device: &'a dyn RenderDevice,
    pub name: Option<&'a str>,
}

impl<'a> ResourceSignatureUnpackInfo<'a> {
    #[must_use]
    pub fn new(device: &'a dyn RenderDevice, name: Option<&'a str>) -> Self {
        Self { device, name }
    }
}

pub struct RenderPassUnpackInfo<'a> {
    pub device: &'a dyn RenderDevice,
    pub name: Option<&'a str>,
    pub modify: Option<&'a mut dyn FnMut(&mut RenderPassDesc)>,
}

impl<'a> RenderPassUnpackInfo<'a> {
    #[must_use]
    pub fn new(device: &'a dyn RenderDevice, name: Option<&'a str>) -> Self {
        Self {
            device,
            name,
            modify: None,
        }
    }
}

pub struct PipelineStateUnpackInfo<'a> {
    pub device: &'a dyn RenderDevice,
    pub name: Option<&'a str>,
    pub pipeline_type: PipelineType,
    /// Overrides the archived SRB allocation granularity.
    pub srb_allocation_granularity: Option<u32>,
    /// Overrides the archived immediate context mask.
    pub immediate_context_mask: Option<u64>,
    /// Called once with the rebuilt create info before the pipeline is
    /// created. It must not change the pipeline type or the number of
    /// resource signatures.
    pub modify: Option<&'a mut dyn FnMut(&mut PipelineStateCreateInfo)>,
}

impl<'a> PipelineStateUnpackInfo<'a> {
    #[must_use]
    pub fn new(device: &'a dyn RenderDevice, name: Option<&'a str>, pipeline_type: PipelineType) -> Self {
        Self {
            device,
            name,
            pipeline_type,
            srb_allocation_granularity: None,
            immediate_context_mask: None,
            modify: None,
        }
    }
}

// ─── State ───────────────────────────────────────────────────────────────────

struct LoadedArchive {
    data: Arc<[u8]>,
    digest: u128,
    archive: DeviceObjectArchive,
}

#[derive(Default)]
struct DearchiverState {
    archives: Vec<LoadedArchive>,
    /// Owning archive of every entry name.
    index: FxHashMap<(ResourceType, String), usize>,
}

type UnpackKey = (RenderDeviceType, ResourceType, String);

/// Entry data copied out of the loaded archives for one backend.
struct EntryData {
    name: String,
    common: Vec<u8>,
    device_data: Option<Vec<u8>>,
    /// Shader list entries referenced by the device data, one per slot.
    shaders: Vec<Option<ArchivedShaderData>>,
}

impl EntryData {
    fn require_device_data(&self, kind: ResourceType, device: ArchiveDeviceType) -> Result<()> {
        if self.device_data.is_some() {
            Ok(())
        } else {
            Err(CacheError::MissingDeviceData {
                kind,
                name: self.name.clone(),
                device,
            })
        }
    }
}

fn cached<T: ?Sized>(map: &Mutex<FxHashMap<UnpackKey, Weak<T>>>, key: &UnpackKey) -> Option<Arc<T>> {
    let mut map = map.lock();
    let object = map.get(key)?.upgrade();
    if object.is_none() {
        map.remove(key);
    }
    object
}

// ─── Dearchiver ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Dearchiver {
    state: RwLock<DearchiverState>,
    shaders: Mutex<FxHashMap<UnpackKey, Weak<dyn Shader>>>,
    signatures: Mutex<FxHashMap<UnpackKey, Weak<dyn PipelineResourceSignature>>>,
    render_passes: Mutex<FxHashMap<UnpackKey, Weak<dyn RenderPass>>>,
    pipelines: Mutex<FxHashMap<UnpackKey, Weak<dyn PipelineState>>>,
}

impl Dearchiver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an archive blob.
    ///
    /// `content_version` must match the archive's unless it is `u32::MAX`.
    /// Loading a blob that is already loaded is a successful no-op. With
    /// `make_copy` the dearchiver keeps its own copy of the bytes instead of
    /// sharing `data`.
    pub fn load_archive(&self, data: Arc<[u8]>, content_version: u32, make_copy: bool) -> Result<()> {
        let check_version = |found: u32| {
            if content_version != u32::MAX && found != content_version {
                return Err(CacheError::ContentVersionMismatch {
                    found,
                    expected: content_version,
                });
            }
            Ok(())
        };

        let digest = xxh3_128(&data);
        let already_loaded = self
            .state
            .read()
            .archives
            .iter()
            .find(|loaded| Arc::ptr_eq(&loaded.data, &data) || loaded.digest == digest)
            .map(|loaded| loaded.archive.content_version());
        if let Some(found) = already_loaded {
            check_version(found)?;
            log::debug!("Dearchiver: archive is already loaded");
            return Ok(());
        }

        let archive = DeviceObjectArchive::deserialize(&data)?;
        check_version(archive.content_version())?;
        let data = if make_copy { Arc::from(data.to_vec()) } else { data };

        let mut state = self.state.write();
        let archive_index = state.archives.len();
        for (kind, name, data) in archive.resources() {
            let key = (kind, name.to_string());
            match state.index.get(&key) {
                None => {
                    state.index.insert(key, archive_index);
                }
                Some(&owner) => {
                    let same = state.archives[owner]
                        .archive
                        .resource(kind, name)
                        .is_some_and(|existing| existing.common == data.common);
                    if !same {
                        log::error!(
                            "{kind} '{name}' is defined differently in more than one loaded archive; the first definition is used"
                        );
                    }
                }
            }
        }
        state.archives.push(LoadedArchive {
            data,
            digest,
            archive,
        });
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.state.read().archives.is_empty()
    }

    /// Content version of the most recently loaded archive, `u32::MAX` when
    /// nothing is loaded.
    #[must_use]
    pub fn content_version(&self) -> u32 {
        self.state
            .read()
            .archives
            .last()
            .map_or(u32::MAX, |loaded| loaded.archive.content_version())
    }

    /// Unloads every archive and forgets unpacked objects.
    pub fn reset(&self) {
        *self.state.write() = DearchiverState::default();
        self.shaders.lock().clear();
        self.signatures.lock().clear();
        self.render_passes.lock().clear();
        self.pipelines.lock().clear();
    }

    /// Writes all loaded archives out as one archive.
    pub fn store(&self) -> Result<Vec<u8>> {
        let state = self.state.read();
        let Some(last) = state.archives.last() else {
            return Err(CacheError::NotLoaded);
        };

        let mut merged = DeviceObjectArchive::new(last.archive.content_version());
        for (archive_index, loaded) in state.archives.iter().enumerate() {
            let mut owned = loaded.archive.clone();
            owned.retain_resources(|kind, name| {
                state.index.get(&(kind, name.to_string())) == Some(&archive_index)
            });
            merged.merge(&owned)?;
        }
        merged.serialize()
    }

    // ── Entry Lookup ─────────────────────────────────────────────────────

    fn resolve_name(state: &DearchiverState, kind: ResourceType, name: Option<&str>) -> Result<String> {
        if let Some(name) = name {
            return Ok(name.to_string());
        }
        let mut names = state.index.keys().filter(|(ty, _)| *ty == kind);
        match (names.next(), names.next()) {
            (Some((_, name)), None) => Ok(name.clone()),
            (None, _) => Err(CacheError::ResourceNotFound {
                kind,
                name: String::new(),
            }),
            (Some(_), Some(_)) => Err(CacheError::InvalidArgument(format!(
                "a name is required to unpack a {kind} when the archive holds more than one"
            ))),
        }
    }

    fn extract(&self, kind: ResourceType, name: Option<&str>, device: ArchiveDeviceType) -> Result<EntryData> {
        let state = self.state.read();
        if state.archives.is_empty() {
            return Err(CacheError::NotLoaded);
        }
        let name = Self::resolve_name(&state, kind, name)?;
        let not_found = || CacheError::ResourceNotFound {
            kind,
            name: name.clone(),
        };
        let &archive_index = state.index.get(&(kind, name.clone())).ok_or_else(not_found)?;
        let archive = &state.archives[archive_index].archive;
        let resource = archive.resource(kind, &name).ok_or_else(not_found)?;

        let device_data = resource.device_data(device).map(<[u8]>::to_vec);
        let mut shaders = Vec::new();
        if kind.has_shader_indices()
            && let Some(bytes) = &device_data
        {
            for index in decode_shader_indices(bytes)? {
                let shader = index
                    .map(|index| {
                        let bytes = archive.shader(device, index).ok_or_else(|| {
                            CacheError::Corrupt(format!(
                                "{kind} '{name}' references missing {device} shader {index}"
                            ))
                        })?;
                        ArchivedShaderData::decode(bytes)
                    })
                    .transpose()?;
                shaders.push(shader);
            }
        }

        Ok(EntryData {
            common: resource.common.clone(),
            name,
            device_data,
            shaders,
        })
    }

    fn create_shader(device: &dyn RenderDevice, data: ArchivedShaderData) -> Result<ShaderRef> {
        let device_type = device.device_info().device_type;
        let mut ci = ShaderCreateInfo::from_device_bytecode(
            data.desc,
            data.entry_point,
            device_type,
            &data.bytecode,
        )?;
        ci.compile_flags = data.compile_flags;
        device.create_shader(&ci)
    }

    // ── Unpacking ────────────────────────────────────────────────────────

    pub fn unpack_shader(&self, info: ShaderUnpackInfo<'_>) -> Result<ShaderRef> {
        let device_type = info.device.device_info().device_type;
        let archive_device = device_type.archive_device_type();
        let kind = ResourceType::Shader;
        let entry = self.extract(kind, info.name, archive_device)?;
        entry.require_device_data(kind, archive_device)?;

        let key = (device_type, kind, entry.name.clone());
        if info.modify.is_none()
            && let Some(shader) = cached(&self.shaders, &key)
        {
            return Ok(shader);
        }

        let Some(Some(mut data)) = entry.shaders.into_iter().next() else {
            return Err(CacheError::Corrupt(format!(
                "shader '{}' has no {archive_device} bytecode",
                entry.name
            )));
        };
        let has_modify = info.modify.is_some();
        if let Some(modify) = info.modify {
            modify(&mut data.desc);
        }
        let shader = Self::create_shader(info.device, data)?;
        if !has_modify {
            self.shaders.lock().insert(key, Arc::downgrade(&shader));
        }
        Ok(shader)
    }

    pub fn unpack_resource_signature(&self, info: ResourceSignatureUnpackInfo<'_>) -> Result<SignatureRef> {
        let device_type = info.device.device_info().device_type;
        let archive_device = device_type.archive_device_type();
        let kind = ResourceType::ResourceSignature;
        let entry = self.extract(kind, info.name, archive_device)?;
        entry.require_device_data(kind, archive_device)?;

        let key = (device_type, kind, entry.name.clone());
        if let Some(sign) = cached(&self.signatures, &key) {
            return Ok(sign);
        }
        let desc: PipelineResourceSignatureDesc = bincode::deserialize(&entry.common)?;
        let sign = info.device.create_pipeline_resource_signature(&desc)?;
        self.signatures.lock().insert(key, Arc::downgrade(&sign));
        Ok(sign)
    }

    pub fn unpack_render_pass(&self, info: RenderPassUnpackInfo<'_>) -> Result<RenderPassRef> {
        let device_type = info.device.device_info().device_type;
        let kind = ResourceType::RenderPass;
        let entry = self.extract(kind, info.name, device_type.archive_device_type())?;

        let key = (device_type, kind, entry.name.clone());
        if info.modify.is_none()
            && let Some(render_pass) = cached(&self.render_passes, &key)
        {
            return Ok(render_pass);
        }
        let mut desc: RenderPassDesc = bincode::deserialize(&entry.common)?;
        let has_modify = info.modify.is_some();
        if let Some(modify) = info.modify {
            modify(&mut desc);
        }
        let render_pass = info.device.create_render_pass(&desc)?;
        if !has_modify {
            self.render_passes.lock().insert(key, Arc::downgrade(&render_pass));
        }
        Ok(render_pass)
    }

    pub fn unpack_pipeline_state(&self, info: PipelineStateUnpackInfo<'_>) -> Result<PipelineStateRef> {
        let device = info.device;
        let device_type = device.device_info().device_type;
        let archive_device = device_type.archive_device_type();
        let kind = ResourceType::for_pipeline(info.pipeline_type);
        let entry = self.extract(kind, info.name, archive_device)?;
        entry.require_device_data(kind, archive_device)?;

        let use_cache = info.modify.is_none()
            && info.srb_allocation_granularity.is_none()
            && info.immediate_context_mask.is_none();
        let key = (device_type, kind, entry.name.clone());
        if use_cache && let Some(pipeline) = cached(&self.pipelines, &key) {
            return Ok(pipeline);
        }

        let template: PipelineTemplate = bincode::deserialize(&entry.common)?;
        let signatures = template
            .signature_names
            .iter()
            .map(|name| self.unpack_resource_signature(ResourceSignatureUnpackInfo::new(device, Some(name))))
            .collect::<Result<Vec<_>>>()?;
        let render_pass = template
            .render_pass_name
            .as_deref()
            .map(|name| self.unpack_render_pass(RenderPassUnpackInfo::new(device, Some(name))))
            .transpose()?;
        let shaders = entry
            .shaders
            .into_iter()
            .map(|slot| slot.map(|data| Self::create_shader(device, data)).transpose())
            .collect::<Result<Vec<_>>>()?;

        let mut ci = template.instantiate(signatures, render_pass, shaders)?;
        if let Some(granularity) = info.srb_allocation_granularity {
            ci.pso_desc_mut().srb_allocation_granularity = granularity;
        }
        if let Some(mask) = info.immediate_context_mask {
            ci.pso_desc_mut().immediate_context_mask = mask;
        }
        if let Some(modify) = info.modify {
            let pipeline_type = ci.pipeline_type();
            let signature_count = ci.resource_signatures().len();
            modify(&mut ci);
            if ci.pipeline_type() != pipeline_type {
                return Err(CacheError::InvalidArgument(format!(
                    "modifying pipeline '{}' must not change its type",
                    entry.name
                )));
            }
            if ci.resource_signatures().len() != signature_count {
                return Err(CacheError::InvalidArgument(format!(
                    "modifying pipeline '{}' must not change its resource signature count",
                    entry.name
                )));
            }
        }

        let pipeline = device.create_pipeline_state(&ci)?;
        if use_cache {
            self.pipelines.lock().insert(key, Arc::downgrade(&pipeline));
        }
        Ok(pipeline)
    }
}

impl std::fmt::Debug for Dearchiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Dearchiver")
            .field("archives", &state.archives.len())
            .field("entries", &state.index.len())
            .finish()
    }
}
