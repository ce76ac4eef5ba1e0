//! Archives
//!
//! - [`DeviceObjectArchive`]: the binary archive model
//! - [`Archiver`]: accumulates serialized objects and writes archives
//! - [`Dearchiver`]: loads archives and unpacks live objects from them
//! - [`ArchiverFactory`]: explicitly owned entry point for archive tooling

pub mod archiver;
pub mod dearchiver;
pub mod device_object_archive;
pub mod factory;
pub mod io;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CacheError, Result};
use crate::graphics::PipelineType;

pub use archiver::Archiver;
pub use dearchiver::{
    Dearchiver, PipelineStateUnpackInfo, RenderPassUnpackInfo, ResourceSignatureUnpackInfo,
    ShaderUnpackInfo,
};
pub use device_object_archive::{DeviceObjectArchive, ResourceData};
pub use factory::ArchiverFactory;

/// Kind of a named archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ResourceType {
    ResourceSignature = 1,
    GraphicsPipeline = 2,
    ComputePipeline = 3,
    RayTracingPipeline = 4,
    TilePipeline = 5,
    RenderPass = 6,
    Shader = 7,
}

impl ResourceType {
    pub const ALL: [Self; 7] = [
        Self::ResourceSignature,
        Self::RenderPass,
        Self::Shader,
        Self::GraphicsPipeline,
        Self::ComputePipeline,
        Self::RayTracingPipeline,
        Self::TilePipeline,
    ];

    pub fn from_u32(value: u32) -> Result<Self> {
        Ok(match value {
            1 => Self::ResourceSignature,
            2 => Self::GraphicsPipeline,
            3 => Self::ComputePipeline,
            4 => Self::RayTracingPipeline,
            5 => Self::TilePipeline,
            6 => Self::RenderPass,
            7 => Self::Shader,
            _ => return Err(CacheError::Corrupt(format!("unknown resource type {value}"))),
        })
    }

    /// Entry kind that stores pipelines of the given type. Mesh pipelines
    /// are stored with graphics pipelines.
    #[must_use]
    pub const fn for_pipeline(pipeline_type: PipelineType) -> Self {
        match pipeline_type {
            PipelineType::Graphics | PipelineType::Mesh => Self::GraphicsPipeline,
            PipelineType::Compute => Self::ComputePipeline,
            PipelineType::RayTracing => Self::RayTracingPipeline,
            PipelineType::Tile => Self::TilePipeline,
        }
    }

    #[must_use]
    pub const fn is_pipeline(self) -> bool {
        matches!(
            self,
            Self::GraphicsPipeline | Self::ComputePipeline | Self::RayTracingPipeline | Self::TilePipeline
        )
    }

    /// Whether device data of this kind is a shader index list.
    #[must_use]
    pub const fn has_shader_indices(self) -> bool {
        self.is_pipeline() || matches!(self, Self::Shader)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ResourceSignature => "Resource signature",
            Self::GraphicsPipeline => "Graphics pipeline",
            Self::ComputePipeline => "Compute pipeline",
            Self::RayTracingPipeline => "Ray tracing pipeline",
            Self::TilePipeline => "Tile pipeline",
            Self::RenderPass => "Render pass",
            Self::Shader => "Shader",
        }
    }

    #[must_use]
    pub const fn plural_name(self) -> &'static str {
        match self {
            Self::ResourceSignature => "Resource signatures",
            Self::GraphicsPipeline => "Graphics pipelines",
            Self::ComputePipeline => "Compute pipelines",
            Self::RayTracingPipeline => "Ray tracing pipelines",
            Self::TilePipeline => "Tile pipelines",
            Self::RenderPass => "Render passes",
            Self::Shader => "Shaders",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
