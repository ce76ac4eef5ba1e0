//! Serialized Objects
//!
//! Immutable results of the [`SerializationDevice`](super::SerializationDevice):
//! one canonical description plus one data blob per requested backend. They
//! implement the same capability traits as live objects, so they can stand in
//! for live objects inside create infos handed back to the serialization
//! device.

use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::archive::device_object_archive::ArchivedShaderData;
use crate::errors::Result;
use crate::graphics::objects::{
    PipelineResourceSignature, PipelineState, RenderPass, Shader, ShaderRef, SignatureRef,
    UniqueId, impl_device_object,
};
use crate::graphics::pipeline::{
    GraphicsPipelineDesc, PipelineKindTemplate, PipelineStateDesc, PipelineTemplate,
};
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::{ShaderCreateInfo, ShaderDesc};
use crate::graphics::signature::PipelineResourceSignatureDesc;
use crate::graphics::{
    ARCHIVE_DEVICE_COUNT, ArchiveDeviceDataFlags, ArchiveDeviceType, RenderDevice, RenderDeviceType,
};

// ─── Shader ──────────────────────────────────────────────────────────────────

pub struct SerializedShader {
    pub(crate) id: UniqueId,
    pub(crate) owner: UniqueId,
    pub(crate) create_info: ShaderCreateInfo,
    pub(crate) device_flags: ArchiveDeviceDataFlags,
    pub(crate) bytecode: [Option<Arc<[u8]>>; ARCHIVE_DEVICE_COUNT],
    /// Live devices registered with the serialization device at creation.
    pub(crate) render_devices: SmallVec<[Arc<dyn RenderDevice>; 1]>,
    /// Live shaders created so far, one per device type.
    pub(crate) device_shaders: Mutex<SmallVec<[(RenderDeviceType, ShaderRef); 2]>>,
}

impl SerializedShader {
    /// Resolved create info the shader was serialized from.
    #[must_use]
    pub fn create_info(&self) -> &ShaderCreateInfo {
        &self.create_info
    }

    #[must_use]
    pub fn device_flags(&self) -> ArchiveDeviceDataFlags {
        self.device_flags
    }

    #[must_use]
    pub fn device_bytecode(&self, device: ArchiveDeviceType) -> Option<&[u8]> {
        self.bytecode[device.index()].as_deref()
    }

    /// Live shader for a render device registered with the serialization
    /// device. Created on first request; `None` when no device of that type
    /// was registered or the shader has no data for it.
    pub fn device_shader(&self, device_type: RenderDeviceType) -> Result<Option<ShaderRef>> {
        if let Some(shader) = self.find_device_shader(device_type) {
            return Ok(Some(shader));
        }
        let Some(device) = self
            .render_devices
            .iter()
            .find(|device| device.device_info().device_type == device_type)
        else {
            return Ok(None);
        };
        let Some(bytecode) = self.device_bytecode(device_type.archive_device_type()) else {
            return Ok(None);
        };

        let mut ci = ShaderCreateInfo::from_device_bytecode(
            self.create_info.desc.clone(),
            self.create_info.entry_point.clone(),
            device_type,
            bytecode,
        )?;
        ci.compile_flags = self.create_info.compile_flags;
        let shader = device.create_shader(&ci)?;

        let mut shaders = self.device_shaders.lock();
        if let Some((_, existing)) = shaders.iter().find(|(ty, _)| *ty == device_type) {
            return Ok(Some(existing.clone()));
        }
        shaders.push((device_type, shader.clone()));
        Ok(Some(shader))
    }

    fn find_device_shader(&self, device_type: RenderDeviceType) -> Option<ShaderRef> {
        self.device_shaders
            .lock()
            .iter()
            .find(|(ty, _)| *ty == device_type)
            .map(|(_, shader)| shader.clone())
    }

    /// Entry of a backend shader list, `None` without data for `device`.
    #[must_use]
    pub fn archived_data(&self, device: ArchiveDeviceType) -> Option<ArchivedShaderData> {
        self.device_bytecode(device).map(|bytecode| ArchivedShaderData {
            desc: self.create_info.desc.clone(),
            entry_point: self.create_info.entry_point.clone(),
            compile_flags: self.create_info.compile_flags,
            bytecode: bytecode.to_vec(),
        })
    }

    pub fn common_data(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.create_info.desc)?)
    }

    /// Same description, entry point and per-backend data.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.create_info.desc == other.create_info.desc
            && self.create_info.entry_point == other.create_info.entry_point
            && self.bytecode == other.bytecode
    }
}

impl_device_object!(SerializedShader);

impl Shader for SerializedShader {
    fn desc(&self) -> ShaderDesc {
        self.create_info.desc.clone()
    }

    fn bytecode(&self) -> Arc<[u8]> {
        self.bytecode
            .iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    fn entry_point(&self) -> String {
        self.create_info.entry_point.clone()
    }
}

// ─── Resource Signature ──────────────────────────────────────────────────────

pub struct SerializedResourceSignature {
    pub(crate) id: UniqueId,
    pub(crate) owner: UniqueId,
    pub(crate) desc: PipelineResourceSignatureDesc,
    pub(crate) device_flags: ArchiveDeviceDataFlags,
    /// `bincode`-encoded binding layout per backend.
    pub(crate) device_data: [Vec<u8>; ARCHIVE_DEVICE_COUNT],
}

impl SerializedResourceSignature {
    #[must_use]
    pub fn signature_desc(&self) -> &PipelineResourceSignatureDesc {
        &self.desc
    }

    #[must_use]
    pub fn device_flags(&self) -> ArchiveDeviceDataFlags {
        self.device_flags
    }

    #[must_use]
    pub fn device_data(&self, device: ArchiveDeviceType) -> Option<&[u8]> {
        let data = &self.device_data[device.index()];
        (!data.is_empty()).then_some(data.as_slice())
    }

    pub fn common_data(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.desc)?)
    }

    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.desc == other.desc && self.device_data == other.device_data
    }
}

impl_device_object!(SerializedResourceSignature);

impl PipelineResourceSignature for SerializedResourceSignature {
    fn desc(&self) -> PipelineResourceSignatureDesc {
        self.desc.clone()
    }
}

// ─── Render Pass ─────────────────────────────────────────────────────────────

pub struct SerializedRenderPass {
    pub(crate) id: UniqueId,
    pub(crate) owner: UniqueId,
    pub(crate) desc: RenderPassDesc,
}

impl SerializedRenderPass {
    pub fn common_data(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.desc)?)
    }

    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.desc == other.desc
    }
}

impl_device_object!(SerializedRenderPass);

impl RenderPass for SerializedRenderPass {
    fn desc(&self) -> RenderPassDesc {
        self.desc.clone()
    }
}

// ─── Pipeline State ──────────────────────────────────────────────────────────

pub struct SerializedPipelineState {
    pub(crate) id: UniqueId,
    pub(crate) owner: UniqueId,
    pub(crate) template: PipelineTemplate,
    pub(crate) device_flags: ArchiveDeviceDataFlags,
    pub(crate) signatures: Vec<Arc<SerializedResourceSignature>>,
    pub(crate) render_pass: Option<Arc<SerializedRenderPass>>,
    /// One entry per shader slot, canonical order.
    pub(crate) shaders: Vec<Option<Arc<SerializedShader>>>,
}

impl SerializedPipelineState {
    #[must_use]
    pub fn template(&self) -> &PipelineTemplate {
        &self.template
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.template.desc.name
    }

    #[must_use]
    pub fn device_flags(&self) -> ArchiveDeviceDataFlags {
        self.device_flags
    }

    #[must_use]
    pub fn signatures(&self) -> &[Arc<SerializedResourceSignature>] {
        &self.signatures
    }

    #[must_use]
    pub fn render_pass(&self) -> Option<&Arc<SerializedRenderPass>> {
        self.render_pass.as_ref()
    }

    #[must_use]
    pub fn shader_slots(&self) -> &[Option<Arc<SerializedShader>>] {
        &self.shaders
    }

    pub fn common_data(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.template)?)
    }

    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.template == other.template
            && self.device_flags == other.device_flags
            && self.shaders.len() == other.shaders.len()
            && self
                .shaders
                .iter()
                .zip(&other.shaders)
                .all(|pair| match pair {
                    (Some(a), Some(b)) => a.same_content(b),
                    (None, None) => true,
                    _ => false,
                })
    }
}

impl_device_object!(SerializedPipelineState);

impl PipelineState for SerializedPipelineState {
    fn desc(&self) -> PipelineStateDesc {
        self.template.desc.clone()
    }

    fn graphics_desc(&self) -> Option<GraphicsPipelineDesc> {
        match &self.template.kind {
            PipelineKindTemplate::Graphics { graphics_pipeline } => Some(graphics_pipeline.clone()),
            _ => None,
        }
    }

    fn resource_signature_count(&self) -> usize {
        self.signatures.len()
    }

    fn resource_signature(&self, index: usize) -> Option<SignatureRef> {
        self.signatures
            .get(index)
            .map(|sign| sign.clone() as SignatureRef)
    }
}
