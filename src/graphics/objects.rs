//! Device Object Capabilities
//!
//! Every object the cache hands out implements [`DeviceObject`] plus one of
//! the capability traits ([`Shader`], [`PipelineState`],
//! [`PipelineResourceSignature`], [`RenderPass`]). Objects are shared through
//! `Arc` and tracked by caches through `Weak`.
//!
//! # Proxies
//!
//! Hot-reload proxies forward every call to a swappable inner object. They
//! expose the inner object through [`DeviceObject::delegate`], so
//! [`query_interface`] can reach backend-specific implementation types through
//! any number of proxy layers.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::graphics::pipeline::{GraphicsPipelineDesc, PipelineStateDesc};
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::ShaderDesc;
use crate::graphics::signature::PipelineResourceSignatureDesc;

/// Process-unique object identifier.
pub type UniqueId = u64;

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates a new process-unique object identifier.
#[inline]
#[must_use]
pub fn next_unique_id() -> UniqueId {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Base capability shared by all device objects.
pub trait DeviceObject: Any + Send + Sync {
    fn unique_id(&self) -> UniqueId;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;

    /// Object this one forwards to. `None` for everything except proxies.
    fn delegate(&self) -> Option<Arc<dyn DeviceObject>> {
        None
    }
}

/// Implements [`DeviceObject`] for a type with an `id: UniqueId` field.
macro_rules! impl_device_object {
    ($ty:ty) => {
        impl $crate::graphics::objects::DeviceObject for $ty {
            fn unique_id(&self) -> $crate::graphics::objects::UniqueId {
                self.id
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(
                self: ::std::sync::Arc<Self>,
            ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
                self
            }
        }
    };
}

pub(crate) use impl_device_object;

/// Resolves `T` on `object` or on any object it delegates to.
pub fn query_interface<T: DeviceObject>(object: Arc<dyn DeviceObject>) -> Option<Arc<T>> {
    let mut current = object;
    loop {
        if current.as_any().is::<T>() {
            return current.into_any().downcast::<T>().ok();
        }
        current = current.delegate()?;
    }
}

// ─── Shader ──────────────────────────────────────────────────────────────────

/// Compilation status of a shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStatus {
    Compiling,
    Ready,
    Failed,
}

pub trait Shader: DeviceObject {
    fn desc(&self) -> ShaderDesc;

    /// Backend bytecode (or verbatim source for source-based backends).
    fn bytecode(&self) -> Arc<[u8]>;

    fn entry_point(&self) -> String {
        "main".to_string()
    }

    fn status(&self) -> ShaderStatus {
        ShaderStatus::Ready
    }
}

pub type ShaderRef = Arc<dyn Shader>;

// ─── Resource Signature ──────────────────────────────────────────────────────

pub trait PipelineResourceSignature: DeviceObject {
    fn desc(&self) -> PipelineResourceSignatureDesc;

    /// Binds a static resource by variable name.
    fn bind_static_resource(&self, _name: &str, _resource: UniqueId) {}

    /// Currently bound static resources, as `(variable name, resource id)`.
    fn static_resources(&self) -> Vec<(String, UniqueId)> {
        Vec::new()
    }

    fn copy_static_resources(&self, dst: &dyn PipelineResourceSignature) {
        for (name, resource) in self.static_resources() {
            dst.bind_static_resource(&name, resource);
        }
    }
}

pub type SignatureRef = Arc<dyn PipelineResourceSignature>;

// ─── Render Pass ─────────────────────────────────────────────────────────────

pub trait RenderPass: DeviceObject {
    fn desc(&self) -> RenderPassDesc;
}

pub type RenderPassRef = Arc<dyn RenderPass>;

// ─── Pipeline State ──────────────────────────────────────────────────────────

/// Creation status of a pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStateStatus {
    Compiling,
    Ready,
    Failed,
}

pub trait PipelineState: DeviceObject {
    fn desc(&self) -> PipelineStateDesc;

    /// Graphics state for graphics and mesh pipelines.
    fn graphics_desc(&self) -> Option<GraphicsPipelineDesc> {
        None
    }

    fn status(&self) -> PipelineStateStatus {
        PipelineStateStatus::Ready
    }

    fn resource_signature_count(&self) -> usize;

    fn resource_signature(&self, index: usize) -> Option<SignatureRef>;

    /// Copies static resource bindings into `dst`, matching signatures by index.
    fn copy_static_resources(&self, dst: &dyn PipelineState) {
        let src_count = self.resource_signature_count();
        let dst_count = dst.resource_signature_count();
        if src_count != dst_count {
            log::error!(
                "Pipeline '{}' has {src_count} resource signatures while '{}' has {dst_count}",
                self.desc().name,
                dst.desc().name,
            );
        }
        for index in 0..src_count.min(dst_count) {
            if let (Some(src_sign), Some(dst_sign)) =
                (self.resource_signature(index), dst.resource_signature(index))
            {
                src_sign.copy_static_resources(dst_sign.as_ref());
            }
        }
    }
}

pub type PipelineStateRef = Arc<dyn PipelineState>;
