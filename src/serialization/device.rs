//! Serialization Device
//!
//! Produces [serialized objects](super::serialized) for any set of backends
//! without a live GPU. Shader bytecode comes from registered
//! [`BackendCompiler`]s; pre-compiled bytecode and verbatim sources pass
//! straight through.
//!
//! Creation is all-or-nothing across the requested backends: if one backend
//! fails, no object is returned.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use crate::errors::{CacheError, Result};
use crate::graphics::objects::{
    RenderPassRef, ShaderRef, SignatureRef, UniqueId, next_unique_id, query_interface,
};
use crate::graphics::pipeline::{
    ComputePipelineStateCreateInfo, GraphicsPipelineStateCreateInfo, PipelineStateCreateInfo,
    PipelineTemplate, RayTracingPipelineStateCreateInfo, TilePipelineStateCreateInfo,
};
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::{ShaderCreateInfo, ShaderStages, ShaderVersion};
use crate::graphics::signature::PipelineResourceSignatureDesc;
use crate::graphics::{
    ARCHIVE_DEVICE_COUNT, ArchiveDeviceDataFlags, ArchiveDeviceType, RenderDevice,
    RenderDeviceInfo, RenderDeviceType, Version,
};
use crate::serialization::bindings::{PipelineResourceBinding, compute_resource_bindings};
use crate::serialization::serialized::{
    SerializedPipelineState, SerializedRenderPass, SerializedResourceSignature, SerializedShader,
};

// ─── Create Info ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct D3D11Options {
    pub feature_level: Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct D3D12Options {
    pub shader_version: ShaderVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlOptions {
    pub zero_to_one_clip_z: bool,
    pub optimize_shaders: bool,
}

impl Default for GlOptions {
    fn default() -> Self {
        Self {
            zero_to_one_clip_z: false,
            optimize_shaders: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VulkanOptions {
    pub api_version: Version,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetalOptions {
    /// Directory for intermediate Metal sources, if the compiler keeps them.
    pub dump_directory: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WebGpuOptions {}

#[derive(Debug, Clone)]
pub struct SerializationDeviceCreateInfo {
    pub device_info: RenderDeviceInfo,
    pub d3d11: D3D11Options,
    pub d3d12: D3D12Options,
    pub gl: GlOptions,
    pub vulkan: VulkanOptions,
    pub metal: MetalOptions,
    pub webgpu: WebGpuOptions,
}

impl SerializationDeviceCreateInfo {
    #[must_use]
    pub fn new(device_info: RenderDeviceInfo) -> Self {
        Self {
            device_info,
            d3d11: D3D11Options::default(),
            d3d12: D3D12Options::default(),
            gl: GlOptions::default(),
            vulkan: VulkanOptions::default(),
            metal: MetalOptions::default(),
            webgpu: WebGpuOptions::default(),
        }
    }

    /// Options matching a live device, so serialized data is valid for it.
    #[must_use]
    pub fn for_device(device_info: RenderDeviceInfo, optimize_gl_shaders: bool) -> Self {
        let mut ci = Self::new(device_info);
        match device_info.device_type {
            RenderDeviceType::D3D11 => ci.d3d11.feature_level = device_info.api_version,
            RenderDeviceType::D3D12 => ci.d3d12.shader_version = device_info.max_shader_version,
            RenderDeviceType::Gl | RenderDeviceType::Gles => {
                ci.gl.zero_to_one_clip_z = device_info.ndc.min_z >= 0.0;
                ci.gl.optimize_shaders = optimize_gl_shaders;
            }
            RenderDeviceType::Vulkan => ci.vulkan.api_version = device_info.api_version,
            RenderDeviceType::Metal | RenderDeviceType::WebGpu => {}
        }
        ci
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShaderArchiveInfo {
    pub device_flags: ArchiveDeviceDataFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceSignatureArchiveInfo {
    pub device_flags: ArchiveDeviceDataFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStateArchiveInfo {
    pub device_flags: ArchiveDeviceDataFlags,
}

/// Input of [`SerializationDevice::get_pipeline_resource_bindings`].
#[derive(Clone)]
pub struct PipelineResourceBindingAttribs<'a> {
    pub resource_signatures: &'a [SignatureRef],
    /// Stages to report; empty reports all.
    pub shader_stages: ShaderStages,
    pub num_render_targets: u32,
    pub device_type: RenderDeviceType,
}

// ─── Backend Compilers ───────────────────────────────────────────────────────

/// Offline producer of backend shader data.
pub trait BackendCompiler: Send + Sync {
    /// Backends this compiler produces data for.
    fn device_flags(&self) -> ArchiveDeviceDataFlags;

    /// Compiles a resolved create info. The error is a human-readable reason.
    fn compile(
        &self,
        create_info: &ShaderCreateInfo,
        device: ArchiveDeviceType,
        options: &SerializationDeviceCreateInfo,
    ) -> std::result::Result<Vec<u8>, String>;
}

/// Accepts only data that needs no compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

impl BackendCompiler for PassthroughCompiler {
    fn device_flags(&self) -> ArchiveDeviceDataFlags {
        ArchiveDeviceDataFlags::all()
    }

    fn compile(
        &self,
        create_info: &ShaderCreateInfo,
        device: ArchiveDeviceType,
        _options: &SerializationDeviceCreateInfo,
    ) -> std::result::Result<Vec<u8>, String> {
        create_info
            .precompiled_data()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| format!("no offline compiler is registered for {device}"))
    }
}

// ─── Serialization Device ────────────────────────────────────────────────────

pub struct SerializationDevice {
    id: UniqueId,
    create_info: SerializationDeviceCreateInfo,
    compilers: Vec<Arc<dyn BackendCompiler>>,
    render_devices: RwLock<Vec<Arc<dyn RenderDevice>>>,
}

impl SerializationDevice {
    #[must_use]
    pub fn new(
        create_info: SerializationDeviceCreateInfo,
        compilers: Vec<Arc<dyn BackendCompiler>>,
    ) -> Self {
        Self {
            id: next_unique_id(),
            create_info,
            compilers,
            render_devices: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn device_info(&self) -> &RenderDeviceInfo {
        &self.create_info.device_info
    }

    #[must_use]
    pub fn create_info(&self) -> &SerializationDeviceCreateInfo {
        &self.create_info
    }

    /// Registers a live device. Shaders created afterwards also get a live
    /// shader for this device's type.
    pub fn add_render_device(&self, device: Arc<dyn RenderDevice>) {
        let device_type = device.device_info().device_type;
        let mut devices = self.render_devices.write();
        devices.retain(|existing| existing.device_info().device_type != device_type);
        devices.push(device);
    }

    fn compiler_for(&self, device: ArchiveDeviceType) -> Option<&dyn BackendCompiler> {
        self.compilers
            .iter()
            .rev()
            .find(|compiler| compiler.device_flags().contains(device.flag()))
            .map(|compiler| compiler.as_ref())
    }

    fn check_flags(flags: ArchiveDeviceDataFlags, what: &str) -> Result<()> {
        if flags.is_empty() {
            return Err(CacheError::InvalidArgument(format!(
                "device flags for {what} must not be empty"
            )));
        }
        Ok(())
    }

    // ── Shaders ──────────────────────────────────────────────────────────

    pub fn create_shader(
        &self,
        create_info: &ShaderCreateInfo,
        archive_info: &ShaderArchiveInfo,
    ) -> Result<Arc<SerializedShader>> {
        Self::check_flags(archive_info.device_flags, "shader")?;

        let mut resolved = create_info.resolve_source()?;
        resolved.source_factory = None;

        let mut bytecode: [Option<Arc<[u8]>>; ARCHIVE_DEVICE_COUNT] = Default::default();
        for device in archive_info.device_flags.device_types() {
            let data = match resolved.precompiled_data() {
                Some(data) => data.to_vec(),
                None => {
                    let compiled = match self.compiler_for(device) {
                        Some(compiler) => compiler.compile(&resolved, device, &self.create_info),
                        None => PassthroughCompiler.compile(&resolved, device, &self.create_info),
                    };
                    compiled.map_err(|reason| CacheError::CompilationFailed {
                        name: resolved.desc.name.clone(),
                        device,
                        reason,
                    })?
                }
            };
            bytecode[device.index()] = Some(Arc::from(data));
        }

        Ok(Arc::new(SerializedShader {
            id: next_unique_id(),
            owner: self.id,
            create_info: resolved,
            device_flags: archive_info.device_flags,
            bytecode,
            render_devices: self.render_devices.read().iter().cloned().collect(),
            device_shaders: Mutex::new(SmallVec::new()),
        }))
    }

    // ── Signatures & Render Passes ───────────────────────────────────────

    pub fn create_pipeline_resource_signature(
        &self,
        desc: &PipelineResourceSignatureDesc,
        archive_info: &ResourceSignatureArchiveInfo,
    ) -> Result<Arc<SerializedResourceSignature>> {
        Self::check_flags(archive_info.device_flags, "resource signature")?;
        if desc.name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "resource signature name must not be empty".to_string(),
            ));
        }

        let mut device_data: [Vec<u8>; ARCHIVE_DEVICE_COUNT] = Default::default();
        for device in archive_info.device_flags.device_types() {
            let bindings = compute_resource_bindings(
                &[desc],
                device.render_device_type(),
                ShaderStages::empty(),
                0,
            );
            device_data[device.index()] = bincode::serialize(&bindings)?;
        }

        Ok(Arc::new(SerializedResourceSignature {
            id: next_unique_id(),
            owner: self.id,
            desc: desc.clone(),
            device_flags: archive_info.device_flags,
            device_data,
        }))
    }

    pub fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<SerializedRenderPass>> {
        if desc.name.is_empty() {
            return Err(CacheError::InvalidArgument(
                "render pass name must not be empty".to_string(),
            ));
        }
        Ok(Arc::new(SerializedRenderPass {
            id: next_unique_id(),
            owner: self.id,
            desc: desc.clone(),
        }))
    }

    // ── Pipelines ────────────────────────────────────────────────────────

    /// Creates a serialized pipeline. Every referenced shader, signature and
    /// render pass must be a serialized object created by this device.
    pub fn create_pipeline_state(
        &self,
        create_info: &PipelineStateCreateInfo,
        archive_info: &PipelineStateArchiveInfo,
    ) -> Result<Arc<SerializedPipelineState>> {
        let flags = archive_info.device_flags;
        Self::check_flags(flags, "pipeline state")?;
        if create_info.name().is_empty() {
            return Err(CacheError::InvalidArgument(
                "pipeline state name must not be empty".to_string(),
            ));
        }

        let signatures = create_info
            .resource_signatures()
            .iter()
            .map(|sign| self.serialized_signature(sign, flags))
            .collect::<Result<Vec<_>>>()?;

        let render_pass = create_info
            .render_pass()
            .map(|render_pass| self.serialized_render_pass(render_pass))
            .transpose()?;

        let mut slots = Vec::new();
        create_info.for_each_shader_slot(|slot| slots.push(slot.cloned()));
        let shaders = slots
            .into_iter()
            .map(|slot| {
                slot.map(|shader| self.serialized_shader(&shader, flags))
                    .transpose()
            })
            .collect::<Result<Vec<_>>>()?;
        if shaders.iter().all(Option::is_none) {
            return Err(CacheError::InvalidArgument(format!(
                "pipeline state '{}' has no shaders",
                create_info.name()
            )));
        }

        Ok(Arc::new(SerializedPipelineState {
            id: next_unique_id(),
            owner: self.id,
            template: PipelineTemplate::from_create_info(create_info),
            device_flags: flags,
            signatures,
            render_pass,
            shaders,
        }))
    }

    pub fn create_graphics_pipeline_state(
        &self,
        create_info: &GraphicsPipelineStateCreateInfo,
        archive_info: &PipelineStateArchiveInfo,
    ) -> Result<Arc<SerializedPipelineState>> {
        self.create_pipeline_state(&create_info.clone().into(), archive_info)
    }

    pub fn create_compute_pipeline_state(
        &self,
        create_info: &ComputePipelineStateCreateInfo,
        archive_info: &PipelineStateArchiveInfo,
    ) -> Result<Arc<SerializedPipelineState>> {
        self.create_pipeline_state(&create_info.clone().into(), archive_info)
    }

    pub fn create_ray_tracing_pipeline_state(
        &self,
        create_info: &RayTracingPipelineStateCreateInfo,
        archive_info: &PipelineStateArchiveInfo,
    ) -> Result<Arc<SerializedPipelineState>> {
        self.create_pipeline_state(&create_info.clone().into(), archive_info)
    }

    pub fn create_tile_pipeline_state(
        &self,
        create_info: &TilePipelineStateCreateInfo,
        archive_info: &PipelineStateArchiveInfo,
    ) -> Result<Arc<SerializedPipelineState>> {
        self.create_pipeline_state(&create_info.clone().into(), archive_info)
    }

    fn serialized_shader(
        &self,
        shader: &ShaderRef,
        flags: ArchiveDeviceDataFlags,
    ) -> Result<Arc<SerializedShader>> {
        let name = shader.desc().name;
        let serialized = query_interface::<SerializedShader>(shader.clone()).ok_or_else(|| {
            CacheError::InvalidArgument(format!("shader '{name}' is not a serialized shader"))
        })?;
        self.check_owner(serialized.owner, "shader", &name)?;
        if !serialized.device_flags.contains(flags) {
            return Err(CacheError::InvalidArgument(format!(
                "shader '{name}' was not serialized for all requested devices"
            )));
        }
        Ok(serialized)
    }

    fn serialized_signature(
        &self,
        sign: &SignatureRef,
        flags: ArchiveDeviceDataFlags,
    ) -> Result<Arc<SerializedResourceSignature>> {
        let name = sign.desc().name;
        let serialized =
            query_interface::<SerializedResourceSignature>(sign.clone()).ok_or_else(|| {
                CacheError::InvalidArgument(format!(
                    "resource signature '{name}' is not a serialized signature"
                ))
            })?;
        self.check_owner(serialized.owner, "resource signature", &name)?;
        if !serialized.device_flags.contains(flags) {
            return Err(CacheError::InvalidArgument(format!(
                "resource signature '{name}' was not serialized for all requested devices"
            )));
        }
        Ok(serialized)
    }

    fn serialized_render_pass(&self, render_pass: &RenderPassRef) -> Result<Arc<SerializedRenderPass>> {
        let name = render_pass.desc().name;
        let serialized =
            query_interface::<SerializedRenderPass>(render_pass.clone()).ok_or_else(|| {
                CacheError::InvalidArgument(format!(
                    "render pass '{name}' is not a serialized render pass"
                ))
            })?;
        self.check_owner(serialized.owner, "render pass", &name)?;
        Ok(serialized)
    }

    fn check_owner(&self, owner: UniqueId, what: &str, name: &str) -> Result<()> {
        if owner == self.id {
            Ok(())
        } else {
            Err(CacheError::InvalidArgument(format!(
                "{what} '{name}' was created by a different serialization device"
            )))
        }
    }

    // ── Bindings ─────────────────────────────────────────────────────────

    /// Register / space / slot assignment of every resource of the given
    /// signatures on the target backend.
    #[must_use]
    pub fn get_pipeline_resource_bindings(
        &self,
        attribs: &PipelineResourceBindingAttribs<'_>,
    ) -> Vec<PipelineResourceBinding> {
        let descs: Vec<PipelineResourceSignatureDesc> = attribs
            .resource_signatures
            .iter()
            .map(|sign| sign.desc())
            .collect();
        let refs: Vec<&PipelineResourceSignatureDesc> = descs.iter().collect();
        compute_resource_bindings(
            &refs,
            attribs.device_type,
            attribs.shader_stages,
            attribs.num_render_targets,
        )
    }
}
