//! Placeholder for pipelines whose shaders are still compiling.
//!
//! The real pipeline is requested from the cache the first time the status is
//! polled after every shader became ready. Until then the placeholder reports
//! [`PipelineStateStatus::Compiling`] and answers description queries from the
//! stored create info.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::cache::RenderStateCache;
use crate::graphics::objects::{
    DeviceObject, PipelineState, PipelineStateRef, PipelineStateStatus, ShaderStatus, SignatureRef,
    UniqueId, next_unique_id,
};
use crate::graphics::pipeline::{GraphicsPipelineDesc, PipelineStateCreateInfo, PipelineStateDesc};

enum AsyncState {
    Pending,
    Created(PipelineStateRef),
    Failed,
}

pub struct AsyncPipelineState {
    id: UniqueId,
    cache: Weak<RenderStateCache>,
    create_info: PipelineStateCreateInfo,
    state: Mutex<AsyncState>,
}

impl AsyncPipelineState {
    pub(crate) fn new(cache: Weak<RenderStateCache>, create_info: PipelineStateCreateInfo) -> Self {
        Self {
            id: next_unique_id(),
            cache,
            create_info,
            state: Mutex::new(AsyncState::Pending),
        }
    }

    /// The real pipeline, once created.
    #[must_use]
    pub fn pipeline(&self) -> Option<PipelineStateRef> {
        match &*self.state.lock() {
            AsyncState::Created(pipeline) => Some(pipeline.clone()),
            AsyncState::Pending | AsyncState::Failed => None,
        }
    }

    fn poll(&self) -> PipelineStateStatus {
        match &*self.state.lock() {
            AsyncState::Created(pipeline) => return pipeline.status(),
            AsyncState::Failed => return PipelineStateStatus::Failed,
            AsyncState::Pending => {}
        }

        match self.create_info.shaders_status() {
            ShaderStatus::Compiling => return PipelineStateStatus::Compiling,
            ShaderStatus::Failed => {
                log::error!(
                    "Failed to create pipeline state '{}': one or more shaders failed to compile",
                    self.create_info.name()
                );
                *self.state.lock() = AsyncState::Failed;
                return PipelineStateStatus::Failed;
            }
            ShaderStatus::Ready => {}
        }

        let Some(cache) = self.cache.upgrade() else {
            return PipelineStateStatus::Compiling;
        };
        let created = cache.create_pipeline_state_internal(&self.create_info);
        let mut state = self.state.lock();
        match created {
            Ok((pipeline, _)) => {
                if let AsyncState::Created(existing) = &*state {
                    return existing.status();
                }
                let status = pipeline.status();
                *state = AsyncState::Created(pipeline);
                status
            }
            Err(err) => {
                log::error!("Failed to create pipeline state '{}': {err}", self.create_info.name());
                *state = AsyncState::Failed;
                PipelineStateStatus::Failed
            }
        }
    }
}

impl DeviceObject for AsyncPipelineState {
    fn unique_id(&self) -> UniqueId {
        self.id
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn std::any::Any + Send + Sync> {
        self
    }

    fn delegate(&self) -> Option<Arc<dyn DeviceObject>> {
        self.pipeline().map(|pipeline| pipeline as Arc<dyn DeviceObject>)
    }
}

impl PipelineState for AsyncPipelineState {
    fn desc(&self) -> PipelineStateDesc {
        self.pipeline()
            .map_or_else(|| self.create_info.pso_desc().clone(), |pipeline| pipeline.desc())
    }

    fn graphics_desc(&self) -> Option<GraphicsPipelineDesc> {
        if let Some(pipeline) = self.pipeline() {
            return pipeline.graphics_desc();
        }
        match &self.create_info {
            PipelineStateCreateInfo::Graphics(ci) => Some(ci.graphics_pipeline.clone()),
            _ => None,
        }
    }

    fn status(&self) -> PipelineStateStatus {
        self.poll()
    }

    fn resource_signature_count(&self) -> usize {
        self.pipeline().map_or_else(
            || self.create_info.resource_signatures().len(),
            |pipeline| pipeline.resource_signature_count(),
        )
    }

    fn resource_signature(&self, index: usize) -> Option<SignatureRef> {
        match self.pipeline() {
            Some(pipeline) => pipeline.resource_signature(index),
            None => self.create_info.resource_signatures().get(index).cloned(),
        }
    }
}
