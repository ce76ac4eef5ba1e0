//! Shader descriptions and create info.

use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::errors::{CacheError, Result};
use crate::graphics::device::RenderDeviceType;
use crate::graphics::source::ShaderSourceFactory;

/// Pipeline stage a shader is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderType {
    #[default]
    Vertex,
    Pixel,
    Geometry,
    Hull,
    Domain,
    Compute,
    Amplification,
    Mesh,
    RayGen,
    RayMiss,
    RayClosestHit,
    RayAnyHit,
    RayIntersection,
    Callable,
    Tile,
}

impl ShaderType {
    #[must_use]
    pub const fn stage(self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::Pixel => ShaderStages::PIXEL,
            Self::Geometry => ShaderStages::GEOMETRY,
            Self::Hull => ShaderStages::HULL,
            Self::Domain => ShaderStages::DOMAIN,
            Self::Compute => ShaderStages::COMPUTE,
            Self::Amplification => ShaderStages::AMPLIFICATION,
            Self::Mesh => ShaderStages::MESH,
            Self::RayGen => ShaderStages::RAY_GEN,
            Self::RayMiss => ShaderStages::RAY_MISS,
            Self::RayClosestHit => ShaderStages::RAY_CLOSEST_HIT,
            Self::RayAnyHit => ShaderStages::RAY_ANY_HIT,
            Self::RayIntersection => ShaderStages::RAY_INTERSECTION,
            Self::Callable => ShaderStages::CALLABLE,
            Self::Tile => ShaderStages::TILE,
        }
    }
}

bitflags! {
    /// Set of pipeline stages.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderStages: u32 {
        const VERTEX           = 1 << 0;
        const PIXEL            = 1 << 1;
        const GEOMETRY         = 1 << 2;
        const HULL             = 1 << 3;
        const DOMAIN           = 1 << 4;
        const COMPUTE          = 1 << 5;
        const AMPLIFICATION    = 1 << 6;
        const MESH             = 1 << 7;
        const RAY_GEN          = 1 << 8;
        const RAY_MISS         = 1 << 9;
        const RAY_CLOSEST_HIT  = 1 << 10;
        const RAY_ANY_HIT      = 1 << 11;
        const RAY_INTERSECTION = 1 << 12;
        const CALLABLE         = 1 << 13;
        const TILE             = 1 << 14;

        const ALL_GRAPHICS = Self::VERTEX.bits() | Self::PIXEL.bits() | Self::GEOMETRY.bits()
            | Self::HULL.bits() | Self::DOMAIN.bits();
        const ALL_RAY_TRACING = Self::RAY_GEN.bits() | Self::RAY_MISS.bits()
            | Self::RAY_CLOSEST_HIT.bits() | Self::RAY_ANY_HIT.bits()
            | Self::RAY_INTERSECTION.bits() | Self::CALLABLE.bits();
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ShaderCompileFlags: u32 {
        const SKIP_REFLECTION         = 1 << 0;
        /// Let the backend compile in the background; the shader starts in
        /// the `Compiling` status.
        const ASYNCHRONOUS            = 1 << 1;
        const PACK_MATRIX_ROW_MAJOR   = 1 << 2;
        const HLSL_TO_SPIRV_VIA_GLSL  = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderSourceLanguage {
    #[default]
    Default,
    Hlsl,
    Glsl,
    /// GLSL passed to the driver without any processing.
    GlslVerbatim,
    Msl,
    MslVerbatim,
    Wgsl,
    /// Pre-compiled backend bytecode.
    Bytecode,
}

impl ShaderSourceLanguage {
    /// Languages the backend consumes as-is, without an offline compiler.
    #[must_use]
    pub const fn is_verbatim(self) -> bool {
        matches!(self, Self::GlslVerbatim | Self::MslVerbatim | Self::Wgsl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShaderCompiler {
    #[default]
    Default,
    Glslang,
    Dxc,
    Fxc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ShaderVersion {
    pub major: u8,
    pub minor: u8,
}

impl ShaderVersion {
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderMacro {
    pub name: String,
    pub definition: String,
}

impl ShaderMacro {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
        }
    }
}

// ─── Shader Desc ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaderDesc {
    pub name: String,
    pub shader_type: ShaderType,
    pub use_combined_texture_samplers: bool,
    pub combined_sampler_suffix: String,
}

impl ShaderDesc {
    pub fn new(name: impl Into<String>, shader_type: ShaderType) -> Self {
        Self {
            name: name.into(),
            shader_type,
            ..Self::default()
        }
    }
}

/// Names are debug labels and do not take part in comparison.
impl PartialEq for ShaderDesc {
    fn eq(&self, other: &Self) -> bool {
        self.shader_type == other.shader_type
            && self.use_combined_texture_samplers == other.use_combined_texture_samplers
            && self.combined_sampler_suffix == other.combined_sampler_suffix
    }
}

impl Eq for ShaderDesc {}

// ─── Shader Create Info ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderSource {
    /// Source text.
    Code(String),
    /// Path resolved through the create info's source factory.
    File(String),
    /// Pre-compiled bytecode.
    Bytecode(Vec<u8>),
}

impl Default for ShaderSource {
    fn default() -> Self {
        Self::Code(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderCreateInfo {
    pub desc: ShaderDesc,
    pub source: ShaderSource,
    pub entry_point: String,
    pub macros: Vec<ShaderMacro>,
    pub source_language: ShaderSourceLanguage,
    pub compiler: ShaderCompiler,
    pub compile_flags: ShaderCompileFlags,
    pub hlsl_version: ShaderVersion,
    pub glsl_version: ShaderVersion,
    #[serde(skip)]
    pub source_factory: Option<Arc<dyn ShaderSourceFactory>>,
}

impl Default for ShaderCreateInfo {
    fn default() -> Self {
        Self {
            desc: ShaderDesc::default(),
            source: ShaderSource::default(),
            entry_point: "main".to_string(),
            macros: Vec::new(),
            source_language: ShaderSourceLanguage::default(),
            compiler: ShaderCompiler::default(),
            compile_flags: ShaderCompileFlags::empty(),
            hlsl_version: ShaderVersion::default(),
            glsl_version: ShaderVersion::default(),
            source_factory: None,
        }
    }
}

impl ShaderCreateInfo {
    /// Create info for a shader given as source text.
    pub fn from_source(desc: ShaderDesc, source: impl Into<String>) -> Self {
        Self {
            desc,
            source: ShaderSource::Code(source.into()),
            ..Self::default()
        }
    }

    /// Create info for a shader loaded through `factory`.
    pub fn from_file(
        desc: ShaderDesc,
        path: impl Into<String>,
        factory: Arc<dyn ShaderSourceFactory>,
    ) -> Self {
        Self {
            desc,
            source: ShaderSource::File(path.into()),
            source_factory: Some(factory),
            ..Self::default()
        }
    }

    /// Returns a copy whose file source is replaced with the file contents.
    ///
    /// Resolution happens on every call, so a changed file yields a changed
    /// create info and therefore a different content hash.
    pub fn resolve_source(&self) -> Result<Self> {
        let ShaderSource::File(path) = &self.source else {
            return Ok(self.clone());
        };
        let factory = self.source_factory.as_ref().ok_or_else(|| {
            CacheError::InvalidArgument(format!(
                "shader '{}' is loaded from file '{path}' but has no source factory",
                self.desc.name
            ))
        })?;
        let text = factory.read_source(path)?;
        Ok(Self {
            source: ShaderSource::Code(text),
            ..self.clone()
        })
    }

    /// Rebuilds a create info from backend data stored in an archive or
    /// obtained from a live shader.
    ///
    /// Source-based backends receive their data back as verbatim source.
    pub fn from_device_bytecode(
        desc: ShaderDesc,
        entry_point: impl Into<String>,
        device_type: RenderDeviceType,
        bytecode: &[u8],
    ) -> Result<Self> {
        let (source, source_language) = match device_type {
            RenderDeviceType::Gl | RenderDeviceType::Gles => (
                ShaderSource::Code(String::from_utf8(bytecode.to_vec())?),
                ShaderSourceLanguage::GlslVerbatim,
            ),
            RenderDeviceType::WebGpu => (
                ShaderSource::Code(String::from_utf8(bytecode.to_vec())?),
                ShaderSourceLanguage::Wgsl,
            ),
            RenderDeviceType::Metal => (
                ShaderSource::Bytecode(bytecode.to_vec()),
                ShaderSourceLanguage::MslVerbatim,
            ),
            RenderDeviceType::D3D11 | RenderDeviceType::D3D12 | RenderDeviceType::Vulkan => (
                ShaderSource::Bytecode(bytecode.to_vec()),
                ShaderSourceLanguage::Bytecode,
            ),
        };
        Ok(Self {
            desc,
            source,
            entry_point: entry_point.into(),
            source_language,
            ..Self::default()
        })
    }

    /// Data the backend consumes without running an offline compiler, if any.
    #[must_use]
    pub fn precompiled_data(&self) -> Option<&[u8]> {
        match &self.source {
            ShaderSource::Bytecode(bytes) => Some(bytes),
            ShaderSource::Code(text) if self.source_language.is_verbatim() => Some(text.as_bytes()),
            _ => None,
        }
    }
}
