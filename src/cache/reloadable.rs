//! Hot-reload proxies.
//!
//! A proxy is a stable handle around a swappable slot holding the current
//! live object. Every trait method reads the slot and forwards the call, so
//! handles obtained before a reload observe the new object afterwards.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::cache::RenderStateCache;
use crate::errors::{CacheError, Result};
use crate::graphics::objects::{
    DeviceObject, PipelineState, PipelineStateRef, PipelineStateStatus, Shader, ShaderRef,
    ShaderStatus, SignatureRef, UniqueId,
};
use crate::graphics::pipeline::{GraphicsPipelineDesc, PipelineStateCreateInfo, PipelineStateDesc};
use crate::graphics::shader::{ShaderCreateInfo, ShaderDesc};

fn upgrade_cache(cache: &Weak<RenderStateCache>) -> Result<Arc<RenderStateCache>> {
    cache
        .upgrade()
        .ok_or_else(|| CacheError::InvalidArgument("the render state cache has been dropped".to_string()))
}

// ─── Shader ──────────────────────────────────────────────────────────────────

pub struct ReloadableShader {
    cache: Weak<RenderStateCache>,
    shader: RwLock<ShaderRef>,
    create_info: ShaderCreateInfo,
}

impl ReloadableShader {
    pub(crate) fn new(cache: Weak<RenderStateCache>, shader: ShaderRef, create_info: ShaderCreateInfo) -> Self {
        Self {
            cache,
            shader: RwLock::new(shader),
            create_info,
        }
    }

    /// The live shader calls are currently forwarded to.
    #[must_use]
    pub fn current(&self) -> ShaderRef {
        self.shader.read().clone()
    }

    /// Re-creates the shader from its stored create info. Returns `true`
    /// when the shader was not found in the cache, i.e. its content changed.
    /// On error the current shader is kept.
    pub fn reload(&self) -> Result<bool> {
        let cache = upgrade_cache(&self.cache)?;
        let (shader, found) = cache.create_shader_internal(&self.create_info)?;
        if shader.unique_id() != self.current().unique_id() {
            *self.shader.write() = shader;
        }
        Ok(!found)
    }
}

impl DeviceObject for ReloadableShader {
    fn unique_id(&self) -> UniqueId {
        self.current().unique_id()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    fn delegate(&self) -> Option<Arc<dyn DeviceObject>> {
        Some(self.current() as Arc<dyn DeviceObject>)
    }
}

impl Shader for ReloadableShader {
    fn desc(&self) -> ShaderDesc {
        self.current().desc()
    }

    fn bytecode(&self) -> Arc<[u8]> {
        self.current().bytecode()
    }

    fn entry_point(&self) -> String {
        self.current().entry_point()
    }

    fn status(&self) -> ShaderStatus {
        self.current().status()
    }
}

// ─── Pipeline State ──────────────────────────────────────────────────────────

pub struct ReloadablePipelineState {
    cache: Weak<RenderStateCache>,
    pipeline: RwLock<PipelineStateRef>,
    /// Shader slots reference reloadable shaders, so a reload after the
    /// shaders were reloaded picks up their new bytecode.
    create_info: Mutex<PipelineStateCreateInfo>,
}

impl ReloadablePipelineState {
    pub(crate) fn new(
        cache: Weak<RenderStateCache>,
        pipeline: PipelineStateRef,
        create_info: PipelineStateCreateInfo,
    ) -> Self {
        Self {
            cache,
            pipeline: RwLock::new(pipeline),
            create_info: Mutex::new(create_info),
        }
    }

    #[must_use]
    pub fn current(&self) -> PipelineStateRef {
        self.pipeline.read().clone()
    }

    /// Re-creates the pipeline. `modify_graphics` may patch the stored
    /// graphics state first; the patch persists for later reloads.
    ///
    /// When a new pipeline replaces the old one, static resource bindings are
    /// copied over.
    pub fn reload(
        &self,
        modify_graphics: Option<&mut (dyn FnMut(&str, &mut GraphicsPipelineDesc) + '_)>,
    ) -> Result<bool> {
        let cache = upgrade_cache(&self.cache)?;
        let create_info = {
            let mut ci = self.create_info.lock();
            if let (Some(modify), PipelineStateCreateInfo::Graphics(graphics)) = (modify_graphics, &mut *ci) {
                modify(&graphics.pso_desc.name, &mut graphics.graphics_pipeline);
            }
            ci.clone()
        };

        let (pipeline, found) = cache.create_pipeline_state_internal(&create_info)?;
        let old = self.current();
        if pipeline.unique_id() != old.unique_id() {
            old.copy_static_resources(pipeline.as_ref());
            *self.pipeline.write() = pipeline;
        }
        Ok(!found)
    }
}

impl DeviceObject for ReloadablePipelineState {
    fn unique_id(&self) -> UniqueId {
        self.current().unique_id()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    fn delegate(&self) -> Option<Arc<dyn DeviceObject>> {
        Some(self.current() as Arc<dyn DeviceObject>)
    }
}

impl PipelineState for ReloadablePipelineState {
    fn desc(&self) -> PipelineStateDesc {
        self.current().desc()
    }

    fn graphics_desc(&self) -> Option<GraphicsPipelineDesc> {
        self.current().graphics_desc()
    }

    fn status(&self) -> PipelineStateStatus {
        self.current().status()
    }

    fn resource_signature_count(&self) -> usize {
        self.current().resource_signature_count()
    }

    fn resource_signature(&self, index: usize) -> Option<SignatureRef> {
        self.current().resource_signature(index)
    }
}
