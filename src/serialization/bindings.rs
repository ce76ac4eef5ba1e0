//! Backend resource binding layout.
//!
//! Assigns registers, spaces and slots to the resources of a set of
//! pipeline resource signatures, following each backend's binding model.
//! The assignment is a pure function of the signature descriptions.

use serde::{Deserialize, Serialize};

use crate::graphics::RenderDeviceType;
use crate::graphics::shader::ShaderStages;
use crate::graphics::signature::{PipelineResourceSignatureDesc, ShaderResourceType};

/// Location of one resource in the backend binding model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineResourceBinding {
    pub name: String,
    pub resource_type: ShaderResourceType,
    pub shader_stages: ShaderStages,
    pub array_size: u32,
    pub register: u32,
    pub space: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RegisterRange {
    ConstantBuffer,
    ShaderResource,
    UnorderedAccess,
    Sampler,
    StorageBuffer,
}

impl RegisterRange {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }

    fn for_resource(device_type: RenderDeviceType, resource_type: ShaderResourceType) -> Self {
        use ShaderResourceType as Res;
        match device_type {
            RenderDeviceType::Gl | RenderDeviceType::Gles => match resource_type {
                Res::ConstantBuffer => Self::ConstantBuffer,
                Res::TextureSrv | Res::InputAttachment | Res::AccelStruct => Self::ShaderResource,
                Res::TextureUav => Self::UnorderedAccess,
                Res::BufferSrv | Res::BufferUav => Self::StorageBuffer,
                Res::Sampler => Self::Sampler,
            },
            RenderDeviceType::Metal => match resource_type {
                Res::ConstantBuffer | Res::BufferSrv | Res::BufferUav | Res::AccelStruct => {
                    Self::ConstantBuffer
                }
                Res::TextureSrv | Res::TextureUav | Res::InputAttachment => Self::ShaderResource,
                Res::Sampler => Self::Sampler,
            },
            _ => match resource_type {
                Res::ConstantBuffer => Self::ConstantBuffer,
                Res::TextureSrv | Res::BufferSrv | Res::InputAttachment | Res::AccelStruct => {
                    Self::ShaderResource
                }
                Res::TextureUav | Res::BufferUav => Self::UnorderedAccess,
                Res::Sampler => Self::Sampler,
            },
        }
    }
}

/// Computes the binding layout of `signatures` for `device_type`.
///
/// Signatures are laid out in `binding_index` order. Only resources visible
/// to `shader_stages` are returned, but every resource occupies its
/// registers, so filtering never shifts the layout. `num_render_targets`
/// offsets D3D11 UAV registers, which share slots with render targets.
#[must_use]
pub fn compute_resource_bindings(
    signatures: &[&PipelineResourceSignatureDesc],
    device_type: RenderDeviceType,
    shader_stages: ShaderStages,
    num_render_targets: u32,
) -> Vec<PipelineResourceBinding> {
    let mut ordered: Vec<&PipelineResourceSignatureDesc> = signatures.to_vec();
    ordered.sort_by_key(|sign| sign.binding_index);

    let mut bindings = Vec::new();
    let mut counters = [0u32; RegisterRange::COUNT];
    if device_type == RenderDeviceType::D3D11 {
        counters[RegisterRange::UnorderedAccess.index()] = num_render_targets;
    }

    for sign in ordered {
        let space = match device_type {
            RenderDeviceType::D3D12 | RenderDeviceType::Vulkan | RenderDeviceType::WebGpu => {
                // Each signature gets its own space / set / group.
                counters = [0; RegisterRange::COUNT];
                u32::from(sign.binding_index)
            }
            _ => 0,
        };

        for res in &sign.resources {
            let range = match device_type {
                // Single binding sequence per descriptor set / bind group.
                RenderDeviceType::Vulkan | RenderDeviceType::WebGpu => RegisterRange::ConstantBuffer,
                _ => RegisterRange::for_resource(device_type, res.resource_type),
            };
            let counter = &mut counters[range.index()];
            let register = *counter;
            *counter += res.array_size.max(1);

            if shader_stages.is_empty() || shader_stages.intersects(res.shader_stages) {
                bindings.push(PipelineResourceBinding {
                    name: res.name.clone(),
                    resource_type: res.resource_type,
                    shader_stages: res.shader_stages,
                    array_size: res.array_size,
                    register,
                    space,
                });
            }
        }
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::signature::{PipelineResourceDesc, ShaderResourceVariableType};

    fn sign(binding_index: u8) -> PipelineResourceSignatureDesc {
        PipelineResourceSignatureDesc {
            name: format!("Sign{binding_index}"),
            binding_index,
            resources: vec![
                PipelineResourceDesc::new(
                    "Constants",
                    ShaderStages::VERTEX | ShaderStages::PIXEL,
                    ShaderResourceType::ConstantBuffer,
                    ShaderResourceVariableType::Static,
                ),
                PipelineResourceDesc::new(
                    "Texture",
                    ShaderStages::PIXEL,
                    ShaderResourceType::TextureSrv,
                    ShaderResourceVariableType::Mutable,
                ),
                PipelineResourceDesc::new(
                    "Output",
                    ShaderStages::PIXEL,
                    ShaderResourceType::TextureUav,
                    ShaderResourceVariableType::Dynamic,
                ),
            ],
            ..PipelineResourceSignatureDesc::default()
        }
    }

    #[test]
    fn d3d12_uses_binding_index_as_space() {
        let (a, b) = (sign(0), sign(1));
        let bindings = compute_resource_bindings(&[&b, &a], RenderDeviceType::D3D12, ShaderStages::empty(), 0);
        assert_eq!(bindings.len(), 6);
        assert_eq!((bindings[0].space, bindings[0].register), (0, 0));
        assert_eq!((bindings[3].space, bindings[3].register), (1, 0));
    }

    #[test]
    fn d3d11_offsets_uavs_by_render_targets() {
        let a = sign(0);
        let bindings = compute_resource_bindings(&[&a], RenderDeviceType::D3D11, ShaderStages::empty(), 2);
        let uav = bindings.iter().find(|b| b.name == "Output").unwrap();
        assert_eq!(uav.register, 2);
    }

    #[test]
    fn vulkan_numbers_bindings_sequentially() {
        let a = sign(0);
        let bindings = compute_resource_bindings(&[&a], RenderDeviceType::Vulkan, ShaderStages::empty(), 0);
        let registers: Vec<u32> = bindings.iter().map(|b| b.register).collect();
        assert_eq!(registers, [0, 1, 2]);
    }

    #[test]
    fn stage_filter_keeps_layout() {
        let a = sign(0);
        let bindings = compute_resource_bindings(&[&a], RenderDeviceType::Vulkan, ShaderStages::VERTEX, 0);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "Constants");
        assert_eq!(bindings[0].register, 0);
    }
}
