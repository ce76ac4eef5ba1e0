//! Pipeline State Descriptions
//!
//! [`PipelineStateCreateInfo`] is a sum type over the four pipeline families.
//! Code that needs to treat all families uniformly goes through the shared
//! accessors and the canonical shader-slot walk
//! ([`PipelineStateCreateInfo::for_each_shader_slot_mut`]); code that needs
//! family-specific behavior matches on the variant.
//!
//! # Canonical Shader Slot Order
//!
//! | Family      | Slots                                                       |
//! |-------------|-------------------------------------------------------------|
//! | Graphics    | VS, PS, DS, HS, GS, AS, MS                                  |
//! | Compute     | CS                                                          |
//! | Tile        | TS                                                          |
//! | Ray tracing | general groups, then triangle hit (closest, any), then     |
//! |             | procedural hit (intersection, closest, any)                 |
//!
//! Archives store one shader index per slot in this order, so the order is
//! part of the archive format.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::{CacheError, Result};
use crate::graphics::objects::{RenderPassRef, ShaderRef, ShaderStatus, SignatureRef};
use crate::graphics::render_pass::TextureFormat;
use crate::graphics::shader::ShaderStages;
use crate::graphics::signature::{ImmutableSamplerDesc, ShaderResourceVariableType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PipelineType {
    #[default]
    Graphics,
    Compute,
    Mesh,
    RayTracing,
    Tile,
}

// ─── Pipeline State Desc ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShaderResourceVariableDesc {
    pub shader_stages: ShaderStages,
    pub name: String,
    pub var_type: ShaderResourceVariableType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PipelineResourceLayoutDesc {
    pub default_variable_type: ShaderResourceVariableType,
    pub variables: Vec<ShaderResourceVariableDesc>,
    pub immutable_samplers: Vec<ImmutableSamplerDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStateDesc {
    pub name: String,
    pub pipeline_type: PipelineType,
    pub srb_allocation_granularity: u32,
    pub immediate_context_mask: u64,
    pub resource_layout: PipelineResourceLayoutDesc,
}

impl Default for PipelineStateDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            pipeline_type: PipelineType::Graphics,
            srb_allocation_granularity: 1,
            immediate_context_mask: 1,
            resource_layout: PipelineResourceLayoutDesc::default(),
        }
    }
}

impl PipelineStateDesc {
    pub fn new(name: impl Into<String>, pipeline_type: PipelineType) -> Self {
        Self {
            name: name.into(),
            pipeline_type,
            ..Self::default()
        }
    }
}

/// Names are debug labels and do not take part in comparison.
impl PartialEq for PipelineStateDesc {
    fn eq(&self, other: &Self) -> bool {
        self.pipeline_type == other.pipeline_type
            && self.srb_allocation_granularity == other.srb_allocation_granularity
            && self.immediate_context_mask == other.immediate_context_mask
            && self.resource_layout == other.resource_layout
    }
}

// ─── Graphics State ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTargetBlendDesc {
    pub blend_enable: bool,
    pub src_blend: BlendFactor,
    pub dest_blend: BlendFactor,
    pub blend_op: BlendOperation,
    pub src_blend_alpha: BlendFactor,
    pub dest_blend_alpha: BlendFactor,
    pub blend_op_alpha: BlendOperation,
    pub write_mask: u8,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_blend: BlendFactor::One,
            dest_blend: BlendFactor::Zero,
            blend_op: BlendOperation::Add,
            src_blend_alpha: BlendFactor::One,
            dest_blend_alpha: BlendFactor::Zero,
            blend_op_alpha: BlendOperation::Add,
            write_mask: 0xF,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlendStateDesc {
    pub alpha_to_coverage_enable: bool,
    pub independent_blend_enable: bool,
    pub render_targets: Vec<RenderTargetBlendDesc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FillMode {
    Wireframe,
    #[default]
    Solid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterizerStateDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_clip_enable: bool,
    pub scissor_enable: bool,
    pub antialiased_line_enable: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
}

impl Default for RasterizerStateDesc {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_counter_clockwise: false,
            depth_clip_enable: true,
            scissor_enable: false,
            antialiased_line_enable: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComparisonFunction {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthStencilStateDesc {
    pub depth_enable: bool,
    pub depth_write_enable: bool,
    pub depth_func: ComparisonFunction,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
}

impl Default for DepthStencilStateDesc {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write_enable: true,
            depth_func: ComparisonFunction::Less,
            stencil_enable: false,
            stencil_read_mask: 0xFF,
            stencil_write_mask: 0xFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueType {
    Int8,
    Int16,
    Int32,
    Uint8,
    Uint16,
    Uint32,
    Float16,
    #[default]
    Float32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InputElementFrequency {
    #[default]
    PerVertex,
    PerInstance,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutElement {
    pub hlsl_semantic: String,
    pub input_index: u32,
    pub buffer_slot: u32,
    pub num_components: u32,
    pub value_type: ValueType,
    pub is_normalized: bool,
    pub relative_offset: u32,
    pub stride: u32,
    pub frequency: InputElementFrequency,
    pub instance_data_step_rate: u32,
}

impl LayoutElement {
    #[must_use]
    pub fn new(input_index: u32, buffer_slot: u32, num_components: u32, value_type: ValueType) -> Self {
        Self {
            hlsl_semantic: "ATTRIB".to_string(),
            input_index,
            buffer_slot,
            num_components,
            value_type,
            is_normalized: false,
            relative_offset: u32::MAX,
            stride: u32::MAX,
            frequency: InputElementFrequency::PerVertex,
            instance_data_step_rate: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    PointList,
    LineList,
    LineStrip,
}

/// Fixed-function state of a graphics or mesh pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsPipelineDesc {
    pub blend_desc: BlendStateDesc,
    pub sample_mask: u32,
    pub rasterizer_desc: RasterizerStateDesc,
    pub depth_stencil_desc: DepthStencilStateDesc,
    pub input_layout: Vec<LayoutElement>,
    pub primitive_topology: PrimitiveTopology,
    pub num_viewports: u8,
    pub subpass_index: u8,
    pub rtv_formats: Vec<TextureFormat>,
    pub dsv_format: TextureFormat,
    pub sample_count: u8,
}

impl Default for GraphicsPipelineDesc {
    fn default() -> Self {
        Self {
            blend_desc: BlendStateDesc::default(),
            sample_mask: u32::MAX,
            rasterizer_desc: RasterizerStateDesc::default(),
            depth_stencil_desc: DepthStencilStateDesc::default(),
            input_layout: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            num_viewports: 1,
            subpass_index: 0,
            rtv_formats: Vec::new(),
            dsv_format: TextureFormat::Unknown,
            sample_count: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RayTracingPipelineDesc {
    pub shader_record_size: u16,
    pub max_recursion_depth: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePipelineDesc {
    pub num_render_targets: u8,
    pub sample_count: u8,
    pub rtv_formats: Vec<TextureFormat>,
}

impl Default for TilePipelineDesc {
    fn default() -> Self {
        Self {
            num_render_targets: 0,
            sample_count: 1,
            rtv_formats: Vec::new(),
        }
    }
}

// ─── Create Info Variants ────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct GraphicsPipelineStateCreateInfo {
    pub pso_desc: PipelineStateDesc,
    pub resource_signatures: Vec<SignatureRef>,
    pub graphics_pipeline: GraphicsPipelineDesc,
    pub render_pass: Option<RenderPassRef>,
    pub vs: Option<ShaderRef>,
    pub ps: Option<ShaderRef>,
    pub ds: Option<ShaderRef>,
    pub hs: Option<ShaderRef>,
    pub gs: Option<ShaderRef>,
    pub amp: Option<ShaderRef>,
    pub ms: Option<ShaderRef>,
}

impl GraphicsPipelineStateCreateInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pso_desc: PipelineStateDesc::new(name, PipelineType::Graphics),
            ..Self::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct ComputePipelineStateCreateInfo {
    pub pso_desc: PipelineStateDesc,
    pub resource_signatures: Vec<SignatureRef>,
    pub cs: Option<ShaderRef>,
}

impl ComputePipelineStateCreateInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pso_desc: PipelineStateDesc::new(name, PipelineType::Compute),
            ..Self::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct TilePipelineStateCreateInfo {
    pub pso_desc: PipelineStateDesc,
    pub resource_signatures: Vec<SignatureRef>,
    pub tile_pipeline: TilePipelineDesc,
    pub ts: Option<ShaderRef>,
}

impl TilePipelineStateCreateInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pso_desc: PipelineStateDesc::new(name, PipelineType::Tile),
            ..Self::default()
        }
    }
}

#[derive(Clone, Default)]
pub struct RayTracingGeneralShaderGroup {
    pub name: String,
    pub shader: Option<ShaderRef>,
}

#[derive(Clone, Default)]
pub struct RayTracingTriangleHitShaderGroup {
    pub name: String,
    pub closest_hit_shader: Option<ShaderRef>,
    pub any_hit_shader: Option<ShaderRef>,
}

#[derive(Clone, Default)]
pub struct RayTracingProceduralHitShaderGroup {
    pub name: String,
    pub intersection_shader: Option<ShaderRef>,
    pub closest_hit_shader: Option<ShaderRef>,
    pub any_hit_shader: Option<ShaderRef>,
}

#[derive(Clone, Default)]
pub struct RayTracingPipelineStateCreateInfo {
    pub pso_desc: PipelineStateDesc,
    pub resource_signatures: Vec<SignatureRef>,
    pub ray_tracing_pipeline: RayTracingPipelineDesc,
    pub general_shaders: Vec<RayTracingGeneralShaderGroup>,
    pub triangle_hit_shaders: Vec<RayTracingTriangleHitShaderGroup>,
    pub procedural_hit_shaders: Vec<RayTracingProceduralHitShaderGroup>,
    pub shader_record_name: String,
    pub max_attribute_size: u32,
    pub max_payload_size: u32,
}

impl RayTracingPipelineStateCreateInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            pso_desc: PipelineStateDesc::new(name, PipelineType::RayTracing),
            ..Self::default()
        }
    }
}

// ─── Pipeline State Create Info ──────────────────────────────────────────────

/// Create info of any pipeline family.
#[derive(Clone)]
pub enum PipelineStateCreateInfo {
    Graphics(GraphicsPipelineStateCreateInfo),
    Compute(ComputePipelineStateCreateInfo),
    RayTracing(RayTracingPipelineStateCreateInfo),
    Tile(TilePipelineStateCreateInfo),
}

impl fmt::Debug for PipelineStateCreateInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateCreateInfo")
            .field("name", &self.pso_desc().name)
            .field("pipeline_type", &self.pipeline_type())
            .field("resource_signatures", &self.resource_signatures().len())
            .field("shaders", &self.shaders().len())
            .finish()
    }
}

impl From<GraphicsPipelineStateCreateInfo> for PipelineStateCreateInfo {
    fn from(ci: GraphicsPipelineStateCreateInfo) -> Self {
        Self::Graphics(ci)
    }
}

impl From<ComputePipelineStateCreateInfo> for PipelineStateCreateInfo {
    fn from(ci: ComputePipelineStateCreateInfo) -> Self {
        Self::Compute(ci)
    }
}

impl From<RayTracingPipelineStateCreateInfo> for PipelineStateCreateInfo {
    fn from(ci: RayTracingPipelineStateCreateInfo) -> Self {
        Self::RayTracing(ci)
    }
}

impl From<TilePipelineStateCreateInfo> for PipelineStateCreateInfo {
    fn from(ci: TilePipelineStateCreateInfo) -> Self {
        Self::Tile(ci)
    }
}

impl PipelineStateCreateInfo {
    #[must_use]
    pub fn pso_desc(&self) -> &PipelineStateDesc {
        match self {
            Self::Graphics(ci) => &ci.pso_desc,
            Self::Compute(ci) => &ci.pso_desc,
            Self::RayTracing(ci) => &ci.pso_desc,
            Self::Tile(ci) => &ci.pso_desc,
        }
    }

    pub fn pso_desc_mut(&mut self) -> &mut PipelineStateDesc {
        match self {
            Self::Graphics(ci) => &mut ci.pso_desc,
            Self::Compute(ci) => &mut ci.pso_desc,
            Self::RayTracing(ci) => &mut ci.pso_desc,
            Self::Tile(ci) => &mut ci.pso_desc,
        }
    }

    #[inline]
    #[must_use]
    pub fn pipeline_type(&self) -> PipelineType {
        self.pso_desc().pipeline_type
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.pso_desc().name
    }

    #[must_use]
    pub fn resource_signatures(&self) -> &[SignatureRef] {
        match self {
            Self::Graphics(ci) => &ci.resource_signatures,
            Self::Compute(ci) => &ci.resource_signatures,
            Self::RayTracing(ci) => &ci.resource_signatures,
            Self::Tile(ci) => &ci.resource_signatures,
        }
    }

    pub fn resource_signatures_mut(&mut self) -> &mut Vec<SignatureRef> {
        match self {
            Self::Graphics(ci) => &mut ci.resource_signatures,
            Self::Compute(ci) => &mut ci.resource_signatures,
            Self::RayTracing(ci) => &mut ci.resource_signatures,
            Self::Tile(ci) => &mut ci.resource_signatures,
        }
    }

    #[must_use]
    pub fn render_pass(&self) -> Option<&RenderPassRef> {
        match self {
            Self::Graphics(ci) => ci.render_pass.as_ref(),
            _ => None,
        }
    }

    /// Visits every shader slot, present or not, in canonical order.
    pub fn for_each_shader_slot(&self, mut f: impl FnMut(Option<&ShaderRef>)) {
        match self {
            Self::Graphics(ci) => {
                for slot in [&ci.vs, &ci.ps, &ci.ds, &ci.hs, &ci.gs, &ci.amp, &ci.ms] {
                    f(slot.as_ref());
                }
            }
            Self::Compute(ci) => f(ci.cs.as_ref()),
            Self::Tile(ci) => f(ci.ts.as_ref()),
            Self::RayTracing(ci) => {
                for group in &ci.general_shaders {
                    f(group.shader.as_ref());
                }
                for group in &ci.triangle_hit_shaders {
                    f(group.closest_hit_shader.as_ref());
                    f(group.any_hit_shader.as_ref());
                }
                for group in &ci.procedural_hit_shaders {
                    f(group.intersection_shader.as_ref());
                    f(group.closest_hit_shader.as_ref());
                    f(group.any_hit_shader.as_ref());
                }
            }
        }
    }

    /// Mutable counterpart of [`Self::for_each_shader_slot`], same order.
    pub fn for_each_shader_slot_mut(&mut self, mut f: impl FnMut(&mut Option<ShaderRef>)) {
        match self {
            Self::Graphics(ci) => {
                for slot in [
                    &mut ci.vs,
                    &mut ci.ps,
                    &mut ci.ds,
                    &mut ci.hs,
                    &mut ci.gs,
                    &mut ci.amp,
                    &mut ci.ms,
                ] {
                    f(slot);
                }
            }
            Self::Compute(ci) => f(&mut ci.cs),
            Self::Tile(ci) => f(&mut ci.ts),
            Self::RayTracing(ci) => {
                for group in &mut ci.general_shaders {
                    f(&mut group.shader);
                }
                for group in &mut ci.triangle_hit_shaders {
                    f(&mut group.closest_hit_shader);
                    f(&mut group.any_hit_shader);
                }
                for group in &mut ci.procedural_hit_shaders {
                    f(&mut group.intersection_shader);
                    f(&mut group.closest_hit_shader);
                    f(&mut group.any_hit_shader);
                }
            }
        }
    }

    /// All present shaders, in canonical slot order.
    #[must_use]
    pub fn shaders(&self) -> SmallVec<[ShaderRef; 8]> {
        let mut shaders = SmallVec::new();
        self.for_each_shader_slot(|slot| {
            if let Some(shader) = slot {
                shaders.push(shader.clone());
            }
        });
        shaders
    }

    /// Combined status of the referenced shaders: any failure wins, then any
    /// shader still compiling.
    #[must_use]
    pub fn shaders_status(&self) -> ShaderStatus {
        let mut status = ShaderStatus::Ready;
        for shader in self.shaders() {
            match shader.status() {
                ShaderStatus::Failed => return ShaderStatus::Failed,
                ShaderStatus::Compiling => status = ShaderStatus::Compiling,
                ShaderStatus::Ready => {}
            }
        }
        status
    }
}

// ─── Pipeline Template ───────────────────────────────────────────────────────

/// Family-specific part of a [`PipelineTemplate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineKindTemplate {
    Graphics {
        graphics_pipeline: GraphicsPipelineDesc,
    },
    Compute,
    RayTracing {
        ray_tracing_pipeline: RayTracingPipelineDesc,
        shader_record_name: String,
        max_attribute_size: u32,
        max_payload_size: u32,
        general_groups: Vec<String>,
        triangle_hit_groups: Vec<String>,
        procedural_hit_groups: Vec<String>,
    },
    Tile {
        tile_pipeline: TilePipelineDesc,
    },
}

/// Object-free form of a pipeline create info.
///
/// Sub-objects are referenced by name (signatures, render pass) or by slot
/// (shaders). This is what archives store as the common data of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineTemplate {
    pub desc: PipelineStateDesc,
    pub kind: PipelineKindTemplate,
    pub signature_names: Vec<String>,
    pub render_pass_name: Option<String>,
}

impl PipelineTemplate {
    #[must_use]
    pub fn from_create_info(ci: &PipelineStateCreateInfo) -> Self {
        let kind = match ci {
            PipelineStateCreateInfo::Graphics(ci) => PipelineKindTemplate::Graphics {
                graphics_pipeline: ci.graphics_pipeline.clone(),
            },
            PipelineStateCreateInfo::Compute(_) => PipelineKindTemplate::Compute,
            PipelineStateCreateInfo::RayTracing(ci) => PipelineKindTemplate::RayTracing {
                ray_tracing_pipeline: ci.ray_tracing_pipeline,
                shader_record_name: ci.shader_record_name.clone(),
                max_attribute_size: ci.max_attribute_size,
                max_payload_size: ci.max_payload_size,
                general_groups: ci.general_shaders.iter().map(|g| g.name.clone()).collect(),
                triangle_hit_groups: ci.triangle_hit_shaders.iter().map(|g| g.name.clone()).collect(),
                procedural_hit_groups: ci
                    .procedural_hit_shaders
                    .iter()
                    .map(|g| g.name.clone())
                    .collect(),
            },
            PipelineStateCreateInfo::Tile(ci) => PipelineKindTemplate::Tile {
                tile_pipeline: ci.tile_pipeline.clone(),
            },
        };
        Self {
            desc: ci.pso_desc().clone(),
            kind,
            signature_names: ci
                .resource_signatures()
                .iter()
                .map(|sign| sign.desc().name)
                .collect(),
            render_pass_name: ci.render_pass().map(|rp| rp.desc().name),
        }
    }

    /// Number of shader slots the instantiated create info has.
    #[must_use]
    pub fn shader_slot_count(&self) -> usize {
        match &self.kind {
            PipelineKindTemplate::Graphics { .. } => 7,
            PipelineKindTemplate::Compute | PipelineKindTemplate::Tile { .. } => 1,
            PipelineKindTemplate::RayTracing {
                general_groups,
                triangle_hit_groups,
                procedural_hit_groups,
                ..
            } => general_groups.len() + triangle_hit_groups.len() * 2 + procedural_hit_groups.len() * 3,
        }
    }

    /// Rebuilds a create info from live sub-objects.
    ///
    /// `shaders` holds one entry per slot in canonical order.
    pub fn instantiate(
        &self,
        resource_signatures: Vec<SignatureRef>,
        render_pass: Option<RenderPassRef>,
        shaders: Vec<Option<ShaderRef>>,
    ) -> Result<PipelineStateCreateInfo> {
        if shaders.len() != self.shader_slot_count() {
            return Err(CacheError::Corrupt(format!(
                "pipeline '{}' expects {} shader slots, found {}",
                self.desc.name,
                self.shader_slot_count(),
                shaders.len()
            )));
        }
        if resource_signatures.len() != self.signature_names.len() {
            return Err(CacheError::Corrupt(format!(
                "pipeline '{}' expects {} resource signatures, found {}",
                self.desc.name,
                self.signature_names.len(),
                resource_signatures.len()
            )));
        }

        let pso_desc = self.desc.clone();
        let mut ci = match &self.kind {
            PipelineKindTemplate::Graphics { graphics_pipeline } => {
                PipelineStateCreateInfo::Graphics(GraphicsPipelineStateCreateInfo {
                    pso_desc,
                    resource_signatures,
                    graphics_pipeline: graphics_pipeline.clone(),
                    render_pass,
                    ..GraphicsPipelineStateCreateInfo::default()
                })
            }
            PipelineKindTemplate::Compute => {
                PipelineStateCreateInfo::Compute(ComputePipelineStateCreateInfo {
                    pso_desc,
                    resource_signatures,
                    cs: None,
                })
            }
            PipelineKindTemplate::Tile { tile_pipeline } => {
                PipelineStateCreateInfo::Tile(TilePipelineStateCreateInfo {
                    pso_desc,
                    resource_signatures,
                    tile_pipeline: tile_pipeline.clone(),
                    ts: None,
                })
            }
            PipelineKindTemplate::RayTracing {
                ray_tracing_pipeline,
                shader_record_name,
                max_attribute_size,
                max_payload_size,
                general_groups,
                triangle_hit_groups,
                procedural_hit_groups,
            } => PipelineStateCreateInfo::RayTracing(RayTracingPipelineStateCreateInfo {
                pso_desc,
                resource_signatures,
                ray_tracing_pipeline: *ray_tracing_pipeline,
                general_shaders: general_groups
                    .iter()
                    .map(|name| RayTracingGeneralShaderGroup {
                        name: name.clone(),
                        shader: None,
                    })
                    .collect(),
                triangle_hit_shaders: triangle_hit_groups
                    .iter()
                    .map(|name| RayTracingTriangleHitShaderGroup {
                        name: name.clone(),
                        ..RayTracingTriangleHitShaderGroup::default()
                    })
                    .collect(),
                procedural_hit_shaders: procedural_hit_groups
                    .iter()
                    .map(|name| RayTracingProceduralHitShaderGroup {
                        name: name.clone(),
                        ..RayTracingProceduralHitShaderGroup::default()
                    })
                    .collect(),
                shader_record_name: shader_record_name.clone(),
                max_attribute_size: *max_attribute_size,
                max_payload_size: *max_payload_size,
            }),
        };

        let mut shaders = shaders.into_iter();
        ci.for_each_shader_slot_mut(|slot| *slot = shaders.next().flatten());
        Ok(ci)
    }
}
