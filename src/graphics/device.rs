//! Backend identity and the live render device contract.
//!
//! [`RenderDeviceType`] names the API a live device runs on, while
//! [`ArchiveDeviceType`] names the per-backend data slot inside an archive.
//! The two differ only for Metal, which is archived separately for macOS
//! and iOS.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::graphics::objects::{PipelineResourceSignature, PipelineState, RenderPass, Shader};
use crate::graphics::pipeline::PipelineStateCreateInfo;
use crate::graphics::render_pass::RenderPassDesc;
use crate::graphics::shader::{ShaderCreateInfo, ShaderVersion};
use crate::graphics::signature::PipelineResourceSignatureDesc;

// ─── Render Device Type ──────────────────────────────────────────────────────

/// Graphics API of a live render device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum RenderDeviceType {
    D3D11 = 1,
    D3D12 = 2,
    Gl = 3,
    Gles = 4,
    Vulkan = 5,
    Metal = 6,
    WebGpu = 7,
}

impl RenderDeviceType {
    /// Short name used in cache file names and log messages.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::D3D11 => "D3D11",
            Self::D3D12 => "D3D12",
            Self::Gl => "GL",
            Self::Gles => "GLES",
            Self::Vulkan => "VK",
            Self::Metal => "MTL",
            Self::WebGpu => "WGPU",
        }
    }

    /// Archive slot that stores data for this device type on the current platform.
    #[must_use]
    pub const fn archive_device_type(self) -> ArchiveDeviceType {
        match self {
            Self::D3D11 => ArchiveDeviceType::D3D11,
            Self::D3D12 => ArchiveDeviceType::D3D12,
            Self::Gl => ArchiveDeviceType::Gl,
            Self::Gles => ArchiveDeviceType::Gles,
            Self::Vulkan => ArchiveDeviceType::Vulkan,
            #[cfg(target_os = "ios")]
            Self::Metal => ArchiveDeviceType::MetalIos,
            #[cfg(not(target_os = "ios"))]
            Self::Metal => ArchiveDeviceType::MetalMacOs,
            Self::WebGpu => ArchiveDeviceType::WebGpu,
        }
    }

    #[inline]
    #[must_use]
    pub const fn archive_flag(self) -> ArchiveDeviceDataFlags {
        self.archive_device_type().flag()
    }
}

impl fmt::Display for RenderDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

// ─── Archive Device Type ─────────────────────────────────────────────────────

/// Number of per-backend data slots in an archive.
pub const ARCHIVE_DEVICE_COUNT: usize = 8;

/// Per-backend data slot of an archive entry.
///
/// The discriminant is the slot index and the bit position of the matching
/// [`ArchiveDeviceDataFlags`] flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ArchiveDeviceType {
    D3D11 = 0,
    D3D12 = 1,
    Gl = 2,
    Gles = 3,
    Vulkan = 4,
    MetalMacOs = 5,
    MetalIos = 6,
    WebGpu = 7,
}

impl ArchiveDeviceType {
    pub const ALL: [Self; ARCHIVE_DEVICE_COUNT] = [
        Self::D3D11,
        Self::D3D12,
        Self::Gl,
        Self::Gles,
        Self::Vulkan,
        Self::MetalMacOs,
        Self::MetalIos,
        Self::WebGpu,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    #[must_use]
    pub const fn flag(self) -> ArchiveDeviceDataFlags {
        ArchiveDeviceDataFlags::from_bits_truncate(1 << self as u32)
    }

    /// Live device type that consumes this slot.
    #[must_use]
    pub const fn render_device_type(self) -> RenderDeviceType {
        match self {
            Self::D3D11 => RenderDeviceType::D3D11,
            Self::D3D12 => RenderDeviceType::D3D12,
            Self::Gl => RenderDeviceType::Gl,
            Self::Gles => RenderDeviceType::Gles,
            Self::Vulkan => RenderDeviceType::Vulkan,
            Self::MetalMacOs | Self::MetalIos => RenderDeviceType::Metal,
            Self::WebGpu => RenderDeviceType::WebGpu,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::D3D11 => "Direct3D11",
            Self::D3D12 => "Direct3D12",
            Self::Gl => "OpenGL",
            Self::Gles => "OpenGLES",
            Self::Vulkan => "Vulkan",
            Self::MetalMacOs => "Metal for MacOS",
            Self::MetalIos => "Metal for iOS",
            Self::WebGpu => "WebGPU",
        }
    }
}

impl fmt::Display for ArchiveDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Set of backends an archive entry carries data for.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ArchiveDeviceDataFlags: u32 {
        const D3D11       = 1 << 0;
        const D3D12       = 1 << 1;
        const GL          = 1 << 2;
        const GLES        = 1 << 3;
        const VULKAN      = 1 << 4;
        const METAL_MACOS = 1 << 5;
        const METAL_IOS   = 1 << 6;
        const WEBGPU      = 1 << 7;
    }
}

impl ArchiveDeviceDataFlags {
    /// Iterates the archive slots selected by these flags, lowest bit first.
    pub fn device_types(self) -> impl Iterator<Item = ArchiveDeviceType> {
        ArchiveDeviceType::ALL
            .into_iter()
            .filter(move |ty| self.contains(ty.flag()))
    }
}

// ─── Device Info ─────────────────────────────────────────────────────────────

/// Major/minor API version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

/// Normalized device coordinate conventions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NdcAttribs {
    pub min_z: f32,
    pub z_to_depth_scale: f32,
    pub y_to_v_scale: f32,
}

impl Default for NdcAttribs {
    fn default() -> Self {
        Self {
            min_z: 0.0,
            z_to_depth_scale: 1.0,
            y_to_v_scale: -0.5,
        }
    }
}

/// Optional device capabilities that affect serialized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceFeatures {
    pub separable_programs: bool,
    pub ray_tracing: bool,
    pub tile_shaders: bool,
    pub mesh_shaders: bool,
}

/// Static description of a live render device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderDeviceInfo {
    pub device_type: RenderDeviceType,
    pub api_version: Version,
    pub ndc: NdcAttribs,
    pub features: DeviceFeatures,
    pub max_shader_version: ShaderVersion,
}

impl RenderDeviceInfo {
    #[must_use]
    pub fn new(device_type: RenderDeviceType) -> Self {
        Self {
            device_type,
            api_version: Version::default(),
            ndc: NdcAttribs::default(),
            features: DeviceFeatures::default(),
            max_shader_version: ShaderVersion::default(),
        }
    }
}

// ─── Render Device ───────────────────────────────────────────────────────────

/// A live backend device.
///
/// Implementations are shared with the application and are expected to be
/// internally synchronized for object creation.
pub trait RenderDevice: Send + Sync {
    fn device_info(&self) -> RenderDeviceInfo;

    fn create_shader(&self, create_info: &ShaderCreateInfo) -> Result<Arc<dyn Shader>>;

    fn create_pipeline_resource_signature(
        &self,
        desc: &PipelineResourceSignatureDesc,
    ) -> Result<Arc<dyn PipelineResourceSignature>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_pipeline_state(
        &self,
        create_info: &PipelineStateCreateInfo,
    ) -> Result<Arc<dyn PipelineState>>;
}
