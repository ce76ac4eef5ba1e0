//! Content hash tests
//!
//! Tests for:
//! - Shader hash inputs (source, macros, device, debug bit)
//! - Pipeline hashes keyed by shader content rather than shader names
//! - HashString formatting

mod common;

use common::*;
use render_state_cache::graphics::shader::ShaderMacro;
use render_state_cache::graphics::{
    PipelineStateCreateInfo, RenderDevice, RenderDeviceInfo, RenderDeviceType, ShaderRef, ShaderType,
};
use render_state_cache::hash::{ContentHash, ContentHasher, make_hash_str};

fn device_hash(device_type: RenderDeviceType) -> u64 {
    ContentHasher::device_hash(&RenderDeviceInfo::new(device_type))
}

#[test]
fn shader_hash_covers_every_input() {
    let vk = device_hash(RenderDeviceType::Vulkan);
    let ci = shader_ci("VS", ShaderType::Vertex, VS_SOURCE);
    let base = ContentHash::of_shader(&ci, vk, false).unwrap();
    assert_eq!(base, ContentHash::of_shader(&ci.clone(), vk, false).unwrap());

    let mut with_macro = ci.clone();
    with_macro.macros.push(ShaderMacro::new("USE_FOG", "1"));
    assert_ne!(base, ContentHash::of_shader(&with_macro, vk, false).unwrap());

    let edited = shader_ci("VS", ShaderType::Vertex, PS_SOURCE);
    assert_ne!(base, ContentHash::of_shader(&edited, vk, false).unwrap());

    assert_ne!(base, ContentHash::of_shader(&ci, vk, true).unwrap());
    assert_ne!(
        base,
        ContentHash::of_shader(&ci, device_hash(RenderDeviceType::D3D12), false).unwrap()
    );
}

#[test]
fn device_hash_depends_on_ndc_convention() {
    let mut info = RenderDeviceInfo::new(RenderDeviceType::Gl);
    let zero_to_one = ContentHasher::device_hash(&info);
    info.ndc.min_z = -1.0;
    assert_ne!(zero_to_one, ContentHasher::device_hash(&info));
}

#[test]
fn pipeline_hash_ignores_shader_names() {
    let device = MockDevice::new(RenderDeviceType::Vulkan);
    let vk = device_hash(RenderDeviceType::Vulkan);
    let shader = |name: &str, shader_type: ShaderType, source: &str| -> ShaderRef {
        device.create_shader(&shader_ci(name, shader_type, source)).unwrap()
    };

    let a = graphics_ci(
        "Opaque",
        shader("VS", ShaderType::Vertex, VS_SOURCE),
        shader("PS", ShaderType::Pixel, PS_SOURCE),
        Vec::new(),
    );
    let b = graphics_ci(
        "Opaque",
        shader("Renamed VS", ShaderType::Vertex, VS_SOURCE),
        shader("Renamed PS", ShaderType::Pixel, PS_SOURCE),
        Vec::new(),
    );
    let c = graphics_ci(
        "Opaque",
        shader("VS", ShaderType::Vertex, VS_SOURCE),
        shader("PS", ShaderType::Pixel, "float4 main() : SV_TARGET { return 0.5; }"),
        Vec::new(),
    );

    let hash = |ci: PipelineStateCreateInfo| ContentHash::of_pipeline(&ci, vk).unwrap();
    let (ha, hb, hc) = (hash(a.into()), hash(b.into()), hash(c.into()));
    assert_eq!(ha, hb);
    assert_ne!(ha, hc);
}

#[test]
fn hash_string_omits_empty_names() {
    let hash = ContentHash::from_u128(0xDEAD_BEEF);
    assert_eq!(make_hash_str(None, hash), "000000000000000000000000DEADBEEF");
    assert!(make_hash_str(Some("Sky"), hash).starts_with("Sky ["));
}
