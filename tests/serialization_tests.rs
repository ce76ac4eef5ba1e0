//! Serialization device tests
//!
//! Tests for:
//! - Offline shader compilation through registered compilers
//! - Pre-compiled bytecode without a compiler
//! - Sub-object validation when serializing pipelines
//! - Live device shaders created from serialized data
//! - Resource binding queries

mod common;

use std::sync::Arc;

use common::*;
use render_state_cache::archive::ArchiverFactory;
use render_state_cache::errors::CacheError;
use render_state_cache::graphics::shader::{ShaderSource, ShaderSourceLanguage, ShaderStages};
use render_state_cache::graphics::{
    ArchiveDeviceDataFlags, ArchiveDeviceType, DeviceObject, RenderDeviceInfo, RenderDeviceType, Shader,
    ShaderCreateInfo, ShaderDesc, ShaderRef, ShaderType, SignatureRef,
};
use render_state_cache::serialization::{
    PipelineResourceBindingAttribs, PipelineStateArchiveInfo, ResourceSignatureArchiveInfo, SerializationDevice,
    SerializationDeviceCreateInfo, ShaderArchiveInfo,
};

fn device_from(factory: &ArchiverFactory) -> Arc<SerializationDevice> {
    let info = RenderDeviceInfo::new(RenderDeviceType::Vulkan);
    factory.create_serialization_device(SerializationDeviceCreateInfo::new(info))
}

fn archive_info(flags: ArchiveDeviceDataFlags) -> ShaderArchiveInfo {
    ShaderArchiveInfo { device_flags: flags }
}

// ============================================================================
// Shaders
// ============================================================================

#[test]
fn compiles_for_every_requested_backend() {
    let device = device_from(&factory());
    let flags = ArchiveDeviceDataFlags::VULKAN | ArchiveDeviceDataFlags::GL | ArchiveDeviceDataFlags::D3D11;
    let shader = device
        .create_shader(&shader_ci("VS", ShaderType::Vertex, VS_SOURCE), &archive_info(flags))
        .unwrap();

    assert_eq!(shader.device_flags(), flags);
    for device_type in flags.device_types() {
        let expected = mock_bytecode(device_type.render_device_type(), "main", VS_SOURCE).unwrap();
        assert_eq!(shader.device_bytecode(device_type), Some(expected.as_slice()));
    }
    assert!(shader.device_bytecode(ArchiveDeviceType::D3D12).is_none());
}

#[test]
fn compiler_errors_name_the_backend() {
    let device = device_from(&factory());
    let result = device.create_shader(
        &shader_ci("Broken", ShaderType::Pixel, "#error nope"),
        &archive_info(ArchiveDeviceDataFlags::METAL_MACOS),
    );
    assert!(matches!(
        result,
        Err(CacheError::CompilationFailed { device: ArchiveDeviceType::MetalMacOs, .. })
    ));
}

#[test]
fn source_needs_a_compiler_but_bytecode_does_not() {
    let device = device_from(&ArchiverFactory::new());
    let info = archive_info(ArchiveDeviceDataFlags::VULKAN);

    let from_source = device.create_shader(&shader_ci("VS", ShaderType::Vertex, VS_SOURCE), &info);
    assert!(matches!(from_source, Err(CacheError::CompilationFailed { .. })));

    let from_bytecode = ShaderCreateInfo {
        desc: ShaderDesc::new("VS", ShaderType::Vertex),
        source: ShaderSource::Bytecode(vec![0x03, 0x02, 0x23, 0x07]),
        source_language: ShaderSourceLanguage::Bytecode,
        ..ShaderCreateInfo::default()
    };
    let shader = device.create_shader(&from_bytecode, &info).unwrap();
    assert_eq!(
        shader.device_bytecode(ArchiveDeviceType::Vulkan),
        Some([0x03, 0x02, 0x23, 0x07].as_slice())
    );
}

#[test]
fn empty_device_flags_are_rejected() {
    let device = device_from(&factory());
    let result = device.create_shader(
        &shader_ci("VS", ShaderType::Vertex, VS_SOURCE),
        &archive_info(ArchiveDeviceDataFlags::empty()),
    );
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
}

#[test]
fn device_shader_is_created_lazily_for_registered_devices() {
    let device = device_from(&factory());
    let live = MockDevice::new(RenderDeviceType::Vulkan);
    device.add_render_device(live.clone());

    let shader = device
        .create_shader(
            &shader_ci("VS", ShaderType::Vertex, VS_SOURCE),
            &archive_info(ArchiveDeviceDataFlags::VULKAN | ArchiveDeviceDataFlags::D3D12),
        )
        .unwrap();
    assert_eq!(live.shaders_created(), 0);

    let first = shader.device_shader(RenderDeviceType::Vulkan).unwrap().unwrap();
    let second = shader.device_shader(RenderDeviceType::Vulkan).unwrap().unwrap();
    assert_eq!(first.unique_id(), second.unique_id());
    assert_eq!(live.shaders_created(), 1);
    assert_eq!(
        &*first.bytecode(),
        shader.device_bytecode(ArchiveDeviceType::Vulkan).unwrap()
    );

    // No live D3D12 device was registered.
    assert!(shader.device_shader(RenderDeviceType::D3D12).unwrap().is_none());
}

// ============================================================================
// Pipelines
// ============================================================================

#[test]
fn pipeline_requires_serialized_sub_objects_of_the_same_device() {
    let factory = factory();
    let device = device_from(&factory);
    let other = device_from(&factory);
    let flags = ArchiveDeviceDataFlags::VULKAN;
    let pso_info = PipelineStateArchiveInfo { device_flags: flags };

    let vs: ShaderRef = device
        .create_shader(&shader_ci("VS", ShaderType::Vertex, VS_SOURCE), &archive_info(flags))
        .unwrap();
    let ps: ShaderRef = device
        .create_shader(&shader_ci("PS", ShaderType::Pixel, PS_SOURCE), &archive_info(flags))
        .unwrap();
    let foreign_ps: ShaderRef = other
        .create_shader(&shader_ci("PS", ShaderType::Pixel, PS_SOURCE), &archive_info(flags))
        .unwrap();
    let live = MockDevice::new(RenderDeviceType::Vulkan);
    let live_sign = live.signature(&signature_desc("Material"));

    let ok = device.create_graphics_pipeline_state(&graphics_ci("Opaque", vs.clone(), ps.clone(), Vec::new()), &pso_info);
    assert!(ok.is_ok());

    let foreign = device.create_graphics_pipeline_state(&graphics_ci("Opaque", vs.clone(), foreign_ps, Vec::new()), &pso_info);
    assert!(matches!(foreign, Err(CacheError::InvalidArgument(_))));

    let unserialized =
        device.create_graphics_pipeline_state(&graphics_ci("Opaque", vs.clone(), ps.clone(), vec![live_sign]), &pso_info);
    assert!(matches!(unserialized, Err(CacheError::InvalidArgument(_))));

    let unnamed = device.create_graphics_pipeline_state(&graphics_ci("", vs, ps, Vec::new()), &pso_info);
    assert!(matches!(unnamed, Err(CacheError::InvalidArgument(_))));
}

#[test]
fn pipeline_flags_must_be_covered_by_shaders() {
    let device = device_from(&factory());
    let vs: ShaderRef = device
        .create_shader(
            &shader_ci("VS", ShaderType::Vertex, VS_SOURCE),
            &archive_info(ArchiveDeviceDataFlags::VULKAN),
        )
        .unwrap();
    let ps: ShaderRef = device
        .create_shader(
            &shader_ci("PS", ShaderType::Pixel, PS_SOURCE),
            &archive_info(ArchiveDeviceDataFlags::VULKAN),
        )
        .unwrap();

    let result = device.create_graphics_pipeline_state(
        &graphics_ci("Opaque", vs, ps, Vec::new()),
        &PipelineStateArchiveInfo {
            device_flags: ArchiveDeviceDataFlags::VULKAN | ArchiveDeviceDataFlags::D3D12,
        },
    );
    assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
}

// ============================================================================
// Resource Bindings
// ============================================================================

#[test]
fn binding_query_filters_by_stage() {
    let device = device_from(&factory());
    let sign: SignatureRef = device
        .create_pipeline_resource_signature(
            &signature_desc("Material"),
            &ResourceSignatureArchiveInfo {
                device_flags: ArchiveDeviceDataFlags::VULKAN,
            },
        )
        .unwrap();
    let signatures = [sign];

    let all = device.get_pipeline_resource_bindings(&PipelineResourceBindingAttribs {
        resource_signatures: &signatures,
        shader_stages: ShaderStages::empty(),
        num_render_targets: 0,
        device_type: RenderDeviceType::Vulkan,
    });
    assert_eq!(all.len(), 2);

    let vertex_only = device.get_pipeline_resource_bindings(&PipelineResourceBindingAttribs {
        resource_signatures: &signatures,
        shader_stages: ShaderStages::VERTEX,
        num_render_targets: 0,
        device_type: RenderDeviceType::Vulkan,
    });
    assert_eq!(vertex_only.len(), 1);
    assert_eq!(vertex_only[0].name, "g_Constants");
}
