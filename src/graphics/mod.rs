//! Graphics Object Model
//!
//! Backend-independent descriptions of shaders, resource signatures, render
//! passes and pipelines, plus the traits through which live backend objects
//! and devices are reached.

pub mod device;
pub mod objects;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod signature;
pub mod source;

pub use device::{
    ARCHIVE_DEVICE_COUNT, ArchiveDeviceDataFlags, ArchiveDeviceType, DeviceFeatures, NdcAttribs,
    RenderDevice, RenderDeviceInfo, RenderDeviceType, Version,
};
pub use objects::{
    DeviceObject, PipelineResourceSignature, PipelineState, PipelineStateRef, PipelineStateStatus,
    RenderPass, RenderPassRef, Shader, ShaderRef, ShaderStatus, SignatureRef, UniqueId,
    next_unique_id, query_interface,
};
pub use pipeline::{
    ComputePipelineStateCreateInfo, GraphicsPipelineDesc, GraphicsPipelineStateCreateInfo,
    PipelineStateCreateInfo, PipelineStateDesc, PipelineTemplate, PipelineType,
    RayTracingPipelineStateCreateInfo, TilePipelineStateCreateInfo,
};
pub use render_pass::RenderPassDesc;
pub use shader::{ShaderCreateInfo, ShaderDesc, ShaderSource, ShaderSourceLanguage, ShaderType};
pub use signature::PipelineResourceSignatureDesc;
pub use source::{
    CompoundSourceFactory, FileSystemSourceFactory, MemorySourceFactory, ShaderSourceFactory,
};
