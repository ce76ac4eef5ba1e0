//! Archiver
//!
//! Collects serialized objects by name and writes them out as a
//! [`DeviceObjectArchive`]. Adding is insert-if-absent: re-adding the same
//! object (or an object with identical content) under a taken name is a
//! no-op, while a different object under that name is rejected.
//!
//! Pipelines pull their resource signatures and render pass into the archiver
//! with them. Their shaders are not named entries; they are written to the
//! per-backend shader lists, deduplicated by content, and referenced by index
//! from the pipeline's device data.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::archive::ResourceType;
use crate::archive::device_object_archive::{
    DeviceObjectArchive, ResourceData, encode_shader_indices,
};
use crate::errors::{CacheError, Result};
use crate::graphics::{ARCHIVE_DEVICE_COUNT, ArchiveDeviceType, PipelineType};
use crate::serialization::{
    SerializationDevice, SerializedPipelineState, SerializedRenderPass,
    SerializedResourceSignature, SerializedShader,
};

#[derive(Default)]
struct ArchiverState {
    shaders: BTreeMap<String, Arc<SerializedShader>>,
    signatures: BTreeMap<String, Arc<SerializedResourceSignature>>,
    render_passes: BTreeMap<String, Arc<SerializedRenderPass>>,
    pipelines: BTreeMap<(ResourceType, String), Arc<SerializedPipelineState>>,
}

/// Checks whether `name` can take `object`; returns `false` when the same
/// content is already present.
fn check_slot<T>(
    existing: Option<&Arc<T>>,
    object: &Arc<T>,
    same_content: impl Fn(&T, &T) -> bool,
    kind: ResourceType,
    name: &str,
) -> Result<bool> {
    match existing {
        None => Ok(true),
        Some(existing) if Arc::ptr_eq(existing, object) || same_content(existing.as_ref(), object.as_ref()) => Ok(false),
        Some(_) => Err(CacheError::NameConflict {
            kind,
            name: name.to_string(),
        }),
    }
}

impl ArchiverState {
    fn check_signature(&self, sign: &Arc<SerializedResourceSignature>) -> Result<bool> {
        let name = &sign.signature_desc().name;
        check_slot(
            self.signatures.get(name),
            sign,
            SerializedResourceSignature::same_content,
            ResourceType::ResourceSignature,
            name,
        )
    }

    fn check_render_pass(&self, render_pass: &Arc<SerializedRenderPass>) -> Result<bool> {
        let name = &render_pass.desc.name;
        check_slot(
            self.render_passes.get(name),
            render_pass,
            SerializedRenderPass::same_content,
            ResourceType::RenderPass,
            name,
        )
    }
}

pub struct Archiver {
    device: Arc<SerializationDevice>,
    state: Mutex<ArchiverState>,
}

impl Archiver {
    #[must_use]
    pub fn new(device: Arc<SerializationDevice>) -> Self {
        Self {
            device,
            state: Mutex::new(ArchiverState::default()),
        }
    }

    #[must_use]
    pub fn device(&self) -> &Arc<SerializationDevice> {
        &self.device
    }

    // ── Adding ───────────────────────────────────────────────────────────

    pub fn add_shader(&self, shader: Arc<SerializedShader>) -> Result<()> {
        let name = shader.create_info().desc.name.clone();
        if name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "archived shaders must have a name".to_string(),
            ));
        }
        let mut state = self.state.lock();
        if check_slot(
            state.shaders.get(&name),
            &shader,
            SerializedShader::same_content,
            ResourceType::Shader,
            &name,
        )? {
            log::debug!("Archiver: added shader '{name}'");
            state.shaders.insert(name, shader);
        }
        Ok(())
    }

    pub fn add_pipeline_resource_signature(
        &self,
        sign: Arc<SerializedResourceSignature>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.check_signature(&sign)? {
            state.signatures.insert(sign.signature_desc().name.clone(), sign);
        }
        Ok(())
    }

    pub fn add_render_pass(&self, render_pass: Arc<SerializedRenderPass>) -> Result<()> {
        let mut state = self.state.lock();
        if state.check_render_pass(&render_pass)? {
            state.render_passes.insert(render_pass.desc.name.clone(), render_pass);
        }
        Ok(())
    }

    /// Adds a pipeline together with its signatures and render pass.
    ///
    /// All names are checked before anything is inserted, so a conflict
    /// leaves the archiver unchanged.
    pub fn add_pipeline_state(&self, pipeline: Arc<SerializedPipelineState>) -> Result<()> {
        let kind = ResourceType::for_pipeline(pipeline.template().desc.pipeline_type);
        let name = pipeline.name().to_string();
        let key = (kind, name.clone());

        let mut state = self.state.lock();
        let insert_pipeline = check_slot(
            state.pipelines.get(&key),
            &pipeline,
            SerializedPipelineState::same_content,
            kind,
            &name,
        )?;
        let mut new_signatures = Vec::new();
        for sign in pipeline.signatures() {
            if state.check_signature(sign)? {
                new_signatures.push(sign.clone());
            }
        }
        let new_render_pass = match pipeline.render_pass() {
            Some(render_pass) if state.check_render_pass(render_pass)? => Some(render_pass.clone()),
            _ => None,
        };

        for sign in new_signatures {
            state.signatures.insert(sign.signature_desc().name.clone(), sign);
        }
        if let Some(render_pass) = new_render_pass {
            state.render_passes.insert(render_pass.desc.name.clone(), render_pass);
        }
        if insert_pipeline {
            log::debug!("Archiver: added {kind} '{name}'");
            state.pipelines.insert(key, pipeline);
        }
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_shader(&self, name: &str) -> Option<Arc<SerializedShader>> {
        self.state.lock().shaders.get(name).cloned()
    }

    #[must_use]
    pub fn get_pipeline_state(
        &self,
        pipeline_type: PipelineType,
        name: &str,
    ) -> Option<Arc<SerializedPipelineState>> {
        let key = (ResourceType::for_pipeline(pipeline_type), name.to_string());
        self.state.lock().pipelines.get(&key).cloned()
    }

    #[must_use]
    pub fn get_pipeline_resource_signature(
        &self,
        name: &str,
    ) -> Option<Arc<SerializedResourceSignature>> {
        self.state.lock().signatures.get(name).cloned()
    }

    #[must_use]
    pub fn get_render_pass(&self, name: &str) -> Option<Arc<SerializedRenderPass>> {
        self.state.lock().render_passes.get(name).cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.shaders.is_empty()
            && state.signatures.is_empty()
            && state.render_passes.is_empty()
            && state.pipelines.is_empty()
    }

    // ── Serialization ────────────────────────────────────────────────────

    /// Builds the archive model of everything added so far.
    pub fn serialize_to_archive(&self, content_version: u32) -> Result<DeviceObjectArchive> {
        let state = self.state.lock();
        let mut archive = DeviceObjectArchive::new(content_version);
        let mut shader_lists = ShaderLists::default();

        for (name, sign) in &state.signatures {
            let mut data = ResourceData::new(sign.common_data()?);
            for device in sign.device_flags().device_types() {
                if let Some(bytes) = sign.device_data(device) {
                    data.set_device_data(device, bytes.to_vec());
                }
            }
            archive.insert_resource(ResourceType::ResourceSignature, name, data)?;
        }

        for (name, render_pass) in &state.render_passes {
            archive.insert_resource(
                ResourceType::RenderPass,
                name,
                ResourceData::new(render_pass.common_data()?),
            )?;
        }

        for (name, shader) in &state.shaders {
            let mut data = ResourceData::new(shader.common_data()?);
            for device in shader.device_flags().device_types() {
                let index = shader_lists.index_of(&mut archive, shader, device)?;
                data.set_device_data(device, encode_shader_indices(&[index])?);
            }
            archive.insert_resource(ResourceType::Shader, name, data)?;
        }

        for ((kind, name), pipeline) in &state.pipelines {
            let mut data = ResourceData::new(pipeline.common_data()?);
            for device in pipeline.device_flags().device_types() {
                let indices = pipeline
                    .shader_slots()
                    .iter()
                    .map(|slot| match slot {
                        Some(shader) => shader_lists.index_of(&mut archive, shader, device),
                        None => Ok(None),
                    })
                    .collect::<Result<Vec<_>>>()?;
                data.set_device_data(device, encode_shader_indices(&indices)?);
            }
            archive.insert_resource(*kind, name, data)?;
        }

        Ok(archive)
    }

    pub fn serialize_to_blob(&self, content_version: u32) -> Result<Vec<u8>> {
        self.serialize_to_archive(content_version)?.serialize()
    }

    pub fn serialize_to_stream<W: Write + ?Sized>(&self, content_version: u32, writer: &mut W) -> Result<()> {
        self.serialize_to_archive(content_version)?.write_to(writer)
    }

    /// Drops every added object.
    pub fn reset(&self) {
        *self.state.lock() = ArchiverState::default();
    }
}

/// Per-backend shader list builder with content deduplication.
#[derive(Default)]
struct ShaderLists {
    indices: [FxHashMap<Vec<u8>, u32>; ARCHIVE_DEVICE_COUNT],
}

impl ShaderLists {
    fn index_of(
        &mut self,
        archive: &mut DeviceObjectArchive,
        shader: &SerializedShader,
        device: ArchiveDeviceType,
    ) -> Result<Option<u32>> {
        let Some(data) = shader.archived_data(device) else {
            return Err(CacheError::MissingDeviceData {
                kind: ResourceType::Shader,
                name: shader.create_info().desc.name.clone(),
                device,
            });
        };
        let bytes = data.encode()?;
        let known = &mut self.indices[device.index()];
        if let Some(&index) = known.get(&bytes) {
            return Ok(Some(index));
        }
        let index = archive.push_shader(device, bytes.clone());
        known.insert(bytes, index);
        Ok(Some(index))
    }
}
