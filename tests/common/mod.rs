//! Shared test fixtures: an in-memory render device and an offline compiler
//! that produce matching bytecode, plus create-info builders.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use render_state_cache::archive::ArchiverFactory;
use render_state_cache::cache::{RenderStateCache, RenderStateCacheConfig, RenderStateCacheCreateInfo};
use render_state_cache::errors::{CacheError, Result};
use render_state_cache::graphics::pipeline::{ComputePipelineStateCreateInfo, GraphicsPipelineStateCreateInfo};
use render_state_cache::graphics::shader::{ShaderCompileFlags, ShaderSource};
use render_state_cache::graphics::signature::{
    PipelineResourceDesc, ShaderResourceType, ShaderResourceVariableType,
};
use render_state_cache::graphics::shader::ShaderStages;
use render_state_cache::graphics::{
    ArchiveDeviceDataFlags, ArchiveDeviceType, DeviceObject, GraphicsPipelineDesc, PipelineResourceSignature,
    PipelineResourceSignatureDesc, PipelineState, PipelineStateCreateInfo, PipelineStateDesc, RenderDevice,
    RenderDeviceInfo, RenderDeviceType, RenderPass, RenderPassDesc, Shader, ShaderCreateInfo, ShaderDesc,
    ShaderRef, ShaderStatus, ShaderType, SignatureRef, UniqueId, next_unique_id,
};
use render_state_cache::serialization::{BackendCompiler, SerializationDeviceCreateInfo};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Bytecode
// ============================================================================

/// Bytecode both the mock device and the mock compiler produce for a source.
pub fn mock_bytecode(device_type: RenderDeviceType, entry_point: &str, source: &str) -> std::result::Result<Vec<u8>, String> {
    if source.contains("#error") {
        return Err(format!("error directive in '{entry_point}'"));
    }
    Ok(format!("{device_type}:{entry_point}:{source}").into_bytes())
}

pub struct MockCompiler;

impl BackendCompiler for MockCompiler {
    fn device_flags(&self) -> ArchiveDeviceDataFlags {
        ArchiveDeviceDataFlags::all()
    }

    fn compile(
        &self,
        create_info: &ShaderCreateInfo,
        device: ArchiveDeviceType,
        _options: &SerializationDeviceCreateInfo,
    ) -> std::result::Result<Vec<u8>, String> {
        match &create_info.source {
            ShaderSource::Code(text) => mock_bytecode(device.render_device_type(), &create_info.entry_point, text),
            ShaderSource::Bytecode(bytes) => Ok(bytes.clone()),
            ShaderSource::File(path) => Err(format!("unresolved file '{path}'")),
        }
    }
}

// ============================================================================
// Device Objects
// ============================================================================

pub struct MockShader {
    id: UniqueId,
    desc: ShaderDesc,
    entry_point: String,
    bytecode: Arc<[u8]>,
    status: Mutex<ShaderStatus>,
}

impl MockShader {
    pub fn set_status(&self, status: ShaderStatus) {
        *self.status.lock() = status;
    }
}

impl DeviceObject for MockShader {
    fn unique_id(&self) -> UniqueId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl Shader for MockShader {
    fn desc(&self) -> ShaderDesc {
        self.desc.clone()
    }

    fn bytecode(&self) -> Arc<[u8]> {
        self.bytecode.clone()
    }

    fn entry_point(&self) -> String {
        self.entry_point.clone()
    }

    fn status(&self) -> ShaderStatus {
        *self.status.lock()
    }
}

pub struct MockSignature {
    id: UniqueId,
    desc: PipelineResourceSignatureDesc,
    static_resources: Mutex<Vec<(String, UniqueId)>>,
}

impl DeviceObject for MockSignature {
    fn unique_id(&self) -> UniqueId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl PipelineResourceSignature for MockSignature {
    fn desc(&self) -> PipelineResourceSignatureDesc {
        self.desc.clone()
    }

    fn bind_static_resource(&self, name: &str, resource: UniqueId) {
        let mut resources = self.static_resources.lock();
        resources.retain(|(bound, _)| bound != name);
        resources.push((name.to_string(), resource));
    }

    fn static_resources(&self) -> Vec<(String, UniqueId)> {
        self.static_resources.lock().clone()
    }
}

pub struct MockRenderPass {
    id: UniqueId,
    desc: RenderPassDesc,
}

impl DeviceObject for MockRenderPass {
    fn unique_id(&self) -> UniqueId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl RenderPass for MockRenderPass {
    fn desc(&self) -> RenderPassDesc {
        self.desc.clone()
    }
}

pub struct MockPipeline {
    id: UniqueId,
    desc: PipelineStateDesc,
    graphics: Option<GraphicsPipelineDesc>,
    signatures: Vec<SignatureRef>,
    pub shaders: Vec<ShaderRef>,
}

impl DeviceObject for MockPipeline {
    fn unique_id(&self) -> UniqueId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl PipelineState for MockPipeline {
    fn desc(&self) -> PipelineStateDesc {
        self.desc.clone()
    }

    fn graphics_desc(&self) -> Option<GraphicsPipelineDesc> {
        self.graphics.clone()
    }

    fn resource_signature_count(&self) -> usize {
        self.signatures.len()
    }

    fn resource_signature(&self, index: usize) -> Option<SignatureRef> {
        self.signatures.get(index).cloned()
    }
}

// ============================================================================
// Device
// ============================================================================

/// Render device that records how many objects it created.
pub struct MockDevice {
    info: RenderDeviceInfo,
    shaders_created: AtomicUsize,
    signatures_created: AtomicUsize,
    render_passes_created: AtomicUsize,
    pipelines_created: AtomicUsize,
}

impl MockDevice {
    pub fn new(device_type: RenderDeviceType) -> Arc<Self> {
        Arc::new(Self {
            info: RenderDeviceInfo::new(device_type),
            shaders_created: AtomicUsize::new(0),
            signatures_created: AtomicUsize::new(0),
            render_passes_created: AtomicUsize::new(0),
            pipelines_created: AtomicUsize::new(0),
        })
    }

    pub fn shaders_created(&self) -> usize {
        self.shaders_created.load(Ordering::SeqCst)
    }

    pub fn signatures_created(&self) -> usize {
        self.signatures_created.load(Ordering::SeqCst)
    }

    pub fn pipelines_created(&self) -> usize {
        self.pipelines_created.load(Ordering::SeqCst)
    }

    pub fn signature(&self, desc: &PipelineResourceSignatureDesc) -> SignatureRef {
        self.create_pipeline_resource_signature(desc).unwrap()
    }
}

impl RenderDevice for MockDevice {
    fn device_info(&self) -> RenderDeviceInfo {
        self.info
    }

    fn create_shader(&self, create_info: &ShaderCreateInfo) -> Result<Arc<dyn Shader>> {
        let resolved = create_info.resolve_source()?;
        let bytecode = match (resolved.precompiled_data(), &resolved.source) {
            (Some(data), _) => data.to_vec(),
            (None, ShaderSource::Code(text)) => {
                mock_bytecode(self.info.device_type, &resolved.entry_point, text).map_err(|reason| {
                    CacheError::CreationFailed(format!("shader '{}': {reason}", resolved.desc.name))
                })?
            }
            (None, _) => return Err(CacheError::CreationFailed("unsupported shader source".to_string())),
        };
        let status = if resolved.compile_flags.contains(ShaderCompileFlags::ASYNCHRONOUS) {
            ShaderStatus::Compiling
        } else {
            ShaderStatus::Ready
        };
        self.shaders_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockShader {
            id: next_unique_id(),
            desc: resolved.desc.clone(),
            entry_point: resolved.entry_point.clone(),
            bytecode: Arc::from(bytecode),
            status: Mutex::new(status),
        }))
    }

    fn create_pipeline_resource_signature(
        &self,
        desc: &PipelineResourceSignatureDesc,
    ) -> Result<Arc<dyn PipelineResourceSignature>> {
        self.signatures_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockSignature {
            id: next_unique_id(),
            desc: desc.clone(),
            static_resources: Mutex::new(Vec::new()),
        }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        self.render_passes_created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockRenderPass {
            id: next_unique_id(),
            desc: desc.clone(),
        }))
    }

    fn create_pipeline_state(&self, create_info: &PipelineStateCreateInfo) -> Result<Arc<dyn PipelineState>> {
        let shaders = create_info.shaders();
        if shaders.is_empty() {
            return Err(CacheError::CreationFailed(format!(
                "pipeline '{}' has no shaders",
                create_info.name()
            )));
        }
        self.pipelines_created.fetch_add(1, Ordering::SeqCst);
        let graphics = match create_info {
            PipelineStateCreateInfo::Graphics(ci) => Some(ci.graphics_pipeline.clone()),
            _ => None,
        };
        Ok(Arc::new(MockPipeline {
            id: next_unique_id(),
            desc: create_info.pso_desc().clone(),
            graphics,
            signatures: create_info.resource_signatures().to_vec(),
            shaders: shaders.into_iter().collect(),
        }))
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn factory() -> Arc<ArchiverFactory> {
    let factory = Arc::new(ArchiverFactory::new());
    factory.register_compiler(Arc::new(MockCompiler));
    factory
}

pub fn cache_with(device: &Arc<MockDevice>, config: RenderStateCacheConfig) -> Arc<RenderStateCache> {
    let ci = RenderStateCacheCreateInfo::new(device.clone(), factory()).with_config(config);
    RenderStateCache::new(ci).unwrap()
}

pub fn cache(device: &Arc<MockDevice>) -> Arc<RenderStateCache> {
    cache_with(device, RenderStateCacheConfig::default())
}

pub fn shader_ci(name: &str, shader_type: ShaderType, source: &str) -> ShaderCreateInfo {
    ShaderCreateInfo::from_source(ShaderDesc::new(name, shader_type), source)
}

pub fn signature_desc(name: &str) -> PipelineResourceSignatureDesc {
    PipelineResourceSignatureDesc {
        name: name.to_string(),
        resources: vec![
            PipelineResourceDesc::new(
                "g_Constants",
                ShaderStages::VERTEX | ShaderStages::PIXEL,
                ShaderResourceType::ConstantBuffer,
                ShaderResourceVariableType::Static,
            ),
            PipelineResourceDesc::new(
                "g_Texture",
                ShaderStages::PIXEL,
                ShaderResourceType::TextureSrv,
                ShaderResourceVariableType::Mutable,
            ),
        ],
        ..PipelineResourceSignatureDesc::default()
    }
}

pub fn graphics_ci(
    name: &str,
    vs: ShaderRef,
    ps: ShaderRef,
    signatures: Vec<SignatureRef>,
) -> GraphicsPipelineStateCreateInfo {
    GraphicsPipelineStateCreateInfo {
        vs: Some(vs),
        ps: Some(ps),
        resource_signatures: signatures,
        ..GraphicsPipelineStateCreateInfo::new(name)
    }
}

pub fn compute_ci(name: &str, cs: ShaderRef) -> ComputePipelineStateCreateInfo {
    ComputePipelineStateCreateInfo {
        cs: Some(cs),
        ..ComputePipelineStateCreateInfo::new(name)
    }
}

pub const VS_SOURCE: &str = "float4 main(float3 pos : ATTRIB0) : SV_POSITION { return float4(pos, 1.0); }";
pub const PS_SOURCE: &str = "float4 main() : SV_TARGET { return float4(1.0, 0.0, 0.0, 1.0); }";
pub const CS_SOURCE: &str = "[numthreads(8, 8, 1)] void main() {}";
