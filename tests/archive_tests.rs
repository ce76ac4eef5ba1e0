//! Archive tests
//!
//! Tests for:
//! - Binary archive parsing and header validation
//! - Merging archives and shader list deduplication
//! - Per-backend device data removal and appending
//! - Archiver name conflicts and content deduplication
//! - Unpacking objects with the Dearchiver

mod common;

use std::sync::Arc;

use common::*;
use render_state_cache::archive::device_object_archive::{ARCHIVE_MAGIC, encode_shader_indices};
use render_state_cache::archive::{
    Archiver, ArchiverFactory, Dearchiver, DeviceObjectArchive, PipelineStateUnpackInfo, ResourceData, ResourceType,
    ShaderUnpackInfo,
};
use render_state_cache::errors::CacheError;
use render_state_cache::graphics::{
    ArchiveDeviceDataFlags, ArchiveDeviceType, PipelineState, PipelineType, RenderDeviceInfo, RenderDeviceType,
    Shader, ShaderRef, ShaderType, SignatureRef,
};
use render_state_cache::serialization::{
    PipelineStateArchiveInfo, ResourceSignatureArchiveInfo, SerializationDevice, SerializationDeviceCreateInfo,
    ShaderArchiveInfo,
};

// ============================================================================
// Helper
// ============================================================================

const ALL_TEST_DEVICES: ArchiveDeviceDataFlags = ArchiveDeviceDataFlags::VULKAN.union(ArchiveDeviceDataFlags::D3D12);

fn serialization_device(factory: &ArchiverFactory) -> Arc<SerializationDevice> {
    let info = RenderDeviceInfo::new(RenderDeviceType::Vulkan);
    factory.create_serialization_device(SerializationDeviceCreateInfo::new(info))
}

/// Archiver holding one graphics pipeline with one signature, serialized for
/// Vulkan and D3D12.
fn archiver_with_pipeline(factory: &ArchiverFactory, vs_source: &str) -> Archiver {
    let device = serialization_device(factory);
    let shader_info = ShaderArchiveInfo {
        device_flags: ALL_TEST_DEVICES,
    };
    let vs = device
        .create_shader(&shader_ci("VS", ShaderType::Vertex, vs_source), &shader_info)
        .unwrap();
    let ps = device
        .create_shader(&shader_ci("PS", ShaderType::Pixel, PS_SOURCE), &shader_info)
        .unwrap();
    let sign = device
        .create_pipeline_resource_signature(
            &signature_desc("Material"),
            &ResourceSignatureArchiveInfo {
                device_flags: ALL_TEST_DEVICES,
            },
        )
        .unwrap();
    let ci = graphics_ci("Opaque", vs as ShaderRef, ps as ShaderRef, vec![sign as SignatureRef]);
    let pipeline = device
        .create_graphics_pipeline_state(
            &ci,
            &PipelineStateArchiveInfo {
                device_flags: ALL_TEST_DEVICES,
            },
        )
        .unwrap();

    let archiver = factory.create_archiver(device);
    archiver.add_pipeline_state(pipeline).unwrap();
    archiver
}

// ============================================================================
// Binary Format
// ============================================================================

#[test]
fn empty_archive_round_trips() {
    let archive = DeviceObjectArchive::new(5);
    let bytes = archive.serialize().unwrap();
    let parsed = DeviceObjectArchive::deserialize(&bytes).unwrap();
    assert_eq!(parsed, archive);
    assert_eq!(parsed.content_version(), 5);
    assert!(parsed.is_empty());
}

#[test]
fn wrong_magic_is_rejected() {
    let mut bytes = DeviceObjectArchive::new(0).serialize().unwrap();
    bytes[0] ^= 0xFF;
    assert!(matches!(
        DeviceObjectArchive::deserialize(&bytes),
        Err(CacheError::InvalidMagic(magic)) if magic != ARCHIVE_MAGIC
    ));
}

#[test]
fn truncated_and_padded_archives_are_rejected() {
    let factory = factory();
    let bytes = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();

    assert!(DeviceObjectArchive::deserialize(&bytes[..bytes.len() - 3]).is_err());

    let mut padded = bytes.clone();
    padded.push(0);
    assert!(matches!(DeviceObjectArchive::deserialize(&padded), Err(CacheError::Corrupt(_))));

    assert!(factory.validate_archive(&bytes));
    assert!(!factory.validate_archive(&padded));
}

#[test]
fn validation_catches_dangling_shader_indices() {
    let mut archive = DeviceObjectArchive::new(0);
    let mut data = ResourceData::new(vec![1, 2, 3]);
    data.set_device_data(ArchiveDeviceType::Vulkan, encode_shader_indices(&[Some(0)]).unwrap());
    archive.insert_resource(ResourceType::Shader, "Dangling", data).unwrap();
    assert!(archive.validate().is_err());

    archive.push_shader(ArchiveDeviceType::Vulkan, vec![0xAA]);
    assert!(archive.validate().is_ok());
}

// ============================================================================
// Merging & Device Data
// ============================================================================

#[test]
fn merge_deduplicates_shared_shaders() {
    let factory = factory();
    let a = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_archive(0).unwrap();
    let b = {
        let device = serialization_device(&factory);
        let ps = device
            .create_shader(
                &shader_ci("PS", ShaderType::Pixel, PS_SOURCE),
                &ShaderArchiveInfo {
                    device_flags: ALL_TEST_DEVICES,
                },
            )
            .unwrap();
        let archiver = factory.create_archiver(device);
        archiver.add_shader(ps).unwrap();
        archiver.serialize_to_archive(0).unwrap()
    };

    let mut merged = a.clone();
    merged.merge(&b).unwrap();
    assert_eq!(merged.resource_count(ResourceType::GraphicsPipeline), 1);
    assert_eq!(merged.resource_count(ResourceType::Shader), 1);
    // The standalone pixel shader is identical to the pipeline's.
    assert_eq!(
        merged.shaders(ArchiveDeviceType::Vulkan).len(),
        a.shaders(ArchiveDeviceType::Vulkan).len()
    );
    merged.validate().unwrap();
}

#[test]
fn merging_conflicting_entries_fails() {
    let factory = factory();
    let a = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();
    let mut b = DeviceObjectArchive::deserialize(&a).unwrap();
    let name = b.resource_names(ResourceType::ResourceSignature).next().unwrap().to_string();
    b.resource_mut(ResourceType::ResourceSignature, &name).unwrap().common.push(0);
    let b = b.serialize().unwrap();

    assert!(matches!(
        factory.merge_archives(&[a.as_slice(), b.as_slice()]),
        Err(CacheError::CommonDataMismatch { .. })
    ));
    assert!(factory.merge_archives(&[]).is_err());
}

#[test]
fn device_data_can_be_removed_and_appended() {
    let factory = factory();
    let blob = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();

    let stripped = factory.remove_device_data(&blob, ArchiveDeviceDataFlags::D3D12).unwrap();
    let archive = DeviceObjectArchive::deserialize(&stripped).unwrap();
    assert!(archive.shaders(ArchiveDeviceType::D3D12).is_empty());
    assert!(!archive.shaders(ArchiveDeviceType::Vulkan).is_empty());
    for (_, _, data) in archive.resources() {
        assert!(data.device_data(ArchiveDeviceType::D3D12).is_none());
    }

    let restored = factory
        .append_device_data(&stripped, ArchiveDeviceDataFlags::D3D12, &blob)
        .unwrap();
    assert_eq!(
        DeviceObjectArchive::deserialize(&restored).unwrap(),
        DeviceObjectArchive::deserialize(&blob).unwrap()
    );
}

#[test]
fn appending_from_a_different_archive_fails() {
    let factory = factory();
    let blob = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();
    let other = DeviceObjectArchive::new(0).serialize().unwrap();
    assert!(matches!(
        factory.append_device_data(&blob, ArchiveDeviceDataFlags::VULKAN, &other),
        Err(CacheError::ResourceNotFound { .. })
    ));
}

// ============================================================================
// Archiver
// ============================================================================

#[test]
fn archiver_rejects_different_object_under_taken_name() {
    let factory = factory();
    let device = serialization_device(&factory);
    let info = ShaderArchiveInfo {
        device_flags: ArchiveDeviceDataFlags::VULKAN,
    };
    let archiver = factory.create_archiver(device.clone());

    let a = device.create_shader(&shader_ci("Foo", ShaderType::Pixel, PS_SOURCE), &info).unwrap();
    let same = device.create_shader(&shader_ci("Foo", ShaderType::Pixel, PS_SOURCE), &info).unwrap();
    let different = device
        .create_shader(&shader_ci("Foo", ShaderType::Pixel, "float4 main() : SV_TARGET { return 1; }"), &info)
        .unwrap();

    archiver.add_shader(a.clone()).unwrap();
    archiver.add_shader(a).unwrap();
    archiver.add_shader(same).unwrap();
    assert!(matches!(
        archiver.add_shader(different),
        Err(CacheError::NameConflict { kind: ResourceType::Shader, .. })
    ));

    let archive = archiver.serialize_to_archive(0).unwrap();
    assert_eq!(archive.resource_count(ResourceType::Shader), 1);
    assert_eq!(archive.shaders(ArchiveDeviceType::Vulkan).len(), 1);

    archiver.reset();
    assert!(archiver.is_empty());
}

#[test]
fn archiver_pulls_in_pipeline_dependencies() {
    let factory = factory();
    let archiver = archiver_with_pipeline(&factory, VS_SOURCE);
    assert!(archiver.get_pipeline_state(PipelineType::Graphics, "Opaque").is_some());
    assert!(archiver.get_pipeline_resource_signature("Material").is_some());

    let archive = archiver.serialize_to_archive(0).unwrap();
    assert_eq!(archive.resource_count(ResourceType::ResourceSignature), 1);
    // Pipeline shaders live in the shader lists, not as named entries.
    assert_eq!(archive.resource_count(ResourceType::Shader), 0);
    assert_eq!(archive.shaders(ArchiveDeviceType::Vulkan).len(), 2);
    assert_eq!(archive.shaders(ArchiveDeviceType::D3D12).len(), 2);
}

// ============================================================================
// Dearchiver
// ============================================================================

#[test]
fn dearchiver_unpacks_pipelines_with_overrides() {
    init_logger();
    let factory = factory();
    let blob = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();

    let dearchiver = factory.create_dearchiver();
    assert!(!dearchiver.is_loaded());
    dearchiver.load_archive(Arc::from(blob), 0, false).unwrap();
    assert!(dearchiver.is_loaded());

    let device = MockDevice::new(RenderDeviceType::Vulkan);
    let pso = dearchiver
        .unpack_pipeline_state(PipelineStateUnpackInfo::new(
            device.as_ref(),
            Some("Opaque"),
            PipelineType::Graphics,
        ))
        .unwrap();
    assert_eq!(pso.desc().name, "Opaque");
    assert_eq!(pso.resource_signature_count(), 1);
    assert_eq!(pso.resource_signature(0).unwrap().desc().name, "Material");

    // Unpacking again reuses the live object.
    let again = dearchiver
        .unpack_pipeline_state(PipelineStateUnpackInfo::new(
            device.as_ref(),
            Some("Opaque"),
            PipelineType::Graphics,
        ))
        .unwrap();
    assert_eq!(again.unique_id(), pso.unique_id());
    assert_eq!(device.pipelines_created(), 1);

    let mut info = PipelineStateUnpackInfo::new(device.as_ref(), Some("Opaque"), PipelineType::Graphics);
    info.srb_allocation_granularity = Some(16);
    let patched = dearchiver.unpack_pipeline_state(info).unwrap();
    assert_eq!(patched.desc().srb_allocation_granularity, 16);
    assert_ne!(patched.unique_id(), pso.unique_id());
}

#[test]
fn dearchiver_rejects_type_changing_modification() {
    let factory = factory();
    let blob = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(0).unwrap();
    let dearchiver = Dearchiver::new();
    dearchiver.load_archive(Arc::from(blob), u32::MAX, false).unwrap();

    let device = MockDevice::new(RenderDeviceType::Vulkan);
    let mut drop_signatures = |ci: &mut render_state_cache::graphics::PipelineStateCreateInfo| {
        ci.resource_signatures_mut().clear();
    };
    let mut info = PipelineStateUnpackInfo::new(device.as_ref(), Some("Opaque"), PipelineType::Graphics);
    info.modify = Some(&mut drop_signatures);
    assert!(matches!(
        dearchiver.unpack_pipeline_state(info),
        Err(CacheError::InvalidArgument(_))
    ));
}

#[test]
fn dearchiver_resolves_omitted_names_only_when_unique() {
    let factory = factory();
    let device = serialization_device(&factory);
    let info = ShaderArchiveInfo {
        device_flags: ArchiveDeviceDataFlags::VULKAN,
    };
    let archiver = factory.create_archiver(device.clone());
    archiver
        .add_shader(device.create_shader(&shader_ci("Only", ShaderType::Compute, CS_SOURCE), &info).unwrap())
        .unwrap();

    let dearchiver = factory.create_dearchiver();
    dearchiver
        .load_archive(Arc::from(archiver.serialize_to_blob(0).unwrap()), 0, false)
        .unwrap();
    let live = MockDevice::new(RenderDeviceType::Vulkan);
    let shader: ShaderRef = dearchiver
        .unpack_shader(ShaderUnpackInfo::new(live.as_ref(), None))
        .unwrap();
    assert_eq!(shader.desc().name, "Only");
    assert_eq!(shader.desc().shader_type, ShaderType::Compute);

    archiver
        .add_shader(device.create_shader(&shader_ci("Second", ShaderType::Compute, CS_SOURCE), &info).unwrap())
        .unwrap();
    dearchiver
        .load_archive(Arc::from(archiver.serialize_to_blob(0).unwrap()), 0, false)
        .unwrap();
    assert!(matches!(
        dearchiver.unpack_shader(ShaderUnpackInfo::new(live.as_ref(), None)),
        Err(CacheError::InvalidArgument(_))
    ));
    assert!(matches!(
        dearchiver.unpack_shader(ShaderUnpackInfo::new(live.as_ref(), Some("Missing"))),
        Err(CacheError::ResourceNotFound { .. })
    ));
}

#[test]
fn dearchiver_store_keeps_first_definition_and_latest_version() {
    let factory = factory();
    let first = archiver_with_pipeline(&factory, VS_SOURCE).serialize_to_blob(1).unwrap();
    let second = archiver_with_pipeline(&factory, "float4 main() : SV_POSITION { return 0; }")
        .serialize_to_blob(2)
        .unwrap();

    let dearchiver = factory.create_dearchiver();
    assert!(matches!(dearchiver.store(), Err(CacheError::NotLoaded)));
    dearchiver.load_archive(Arc::from(first.clone()), u32::MAX, false).unwrap();
    dearchiver.load_archive(Arc::from(second), u32::MAX, false).unwrap();
    assert_eq!(dearchiver.content_version(), 2);

    let stored = DeviceObjectArchive::deserialize(&dearchiver.store().unwrap()).unwrap();
    let expected = DeviceObjectArchive::deserialize(&first).unwrap();
    assert_eq!(stored.content_version(), 2);
    assert_eq!(
        stored.resource(ResourceType::GraphicsPipeline, "Opaque"),
        expected.resource(ResourceType::GraphicsPipeline, "Opaque")
    );

    dearchiver.reset();
    assert!(!dearchiver.is_loaded());
}
