//! Pipeline resource signature descriptions.

use serde::{Deserialize, Serialize};

use crate::graphics::shader::ShaderStages;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderResourceType {
    ConstantBuffer,
    TextureSrv,
    BufferSrv,
    TextureUav,
    BufferUav,
    Sampler,
    InputAttachment,
    AccelStruct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderResourceVariableType {
    #[default]
    Static,
    Mutable,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterType {
    Point,
    #[default]
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureAddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    Border,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SamplerDesc {
    pub min_filter: FilterType,
    pub mag_filter: FilterType,
    pub mip_filter: FilterType,
    pub address_u: TextureAddressMode,
    pub address_v: TextureAddressMode,
    pub address_w: TextureAddressMode,
    pub max_anisotropy: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImmutableSamplerDesc {
    pub shader_stages: ShaderStages,
    pub sampler_or_texture_name: String,
    pub desc: SamplerDesc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineResourceDesc {
    pub name: String,
    pub shader_stages: ShaderStages,
    pub array_size: u32,
    pub resource_type: ShaderResourceType,
    pub var_type: ShaderResourceVariableType,
}

impl PipelineResourceDesc {
    pub fn new(
        name: impl Into<String>,
        shader_stages: ShaderStages,
        resource_type: ShaderResourceType,
        var_type: ShaderResourceVariableType,
    ) -> Self {
        Self {
            name: name.into(),
            shader_stages,
            array_size: 1,
            resource_type,
            var_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PipelineResourceSignatureDesc {
    pub name: String,
    pub resources: Vec<PipelineResourceDesc>,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
    /// Slot of this signature within a pipeline; also selects the register
    /// space / descriptor set on backends that have them.
    pub binding_index: u8,
    pub use_combined_texture_samplers: bool,
    pub combined_sampler_suffix: String,
}
