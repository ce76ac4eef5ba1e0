//! Offline Serialization
//!
//! The [`SerializationDevice`] produces backend data for any set of backends
//! without a GPU; its results are the [serialized objects](serialized) that
//! an [`Archiver`](crate::archive::Archiver) collects.

pub mod bindings;
pub mod device;
pub mod serialized;

pub use bindings::{PipelineResourceBinding, compute_resource_bindings};
pub use device::{
    BackendCompiler, D3D11Options, D3D12Options, GlOptions, MetalOptions, PassthroughCompiler,
    PipelineResourceBindingAttribs, PipelineStateArchiveInfo, ResourceSignatureArchiveInfo,
    SerializationDevice, SerializationDeviceCreateInfo, ShaderArchiveInfo, VulkanOptions,
    WebGpuOptions,
};
pub use serialized::{
    SerializedPipelineState, SerializedRenderPass, SerializedResourceSignature, SerializedShader,
};
