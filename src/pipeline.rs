//! Pipelines: attached shaders, resource bindings and fixed-function state.

use bitflags::bitflags;
use fxhash::FxHashMap;

use crate::error::{Error, Result};
use crate::format::Format;
use crate::sampler::CompareOp;
use crate::script::{BufferRef, PipelineRef, SamplerRef, ShaderRef, TlasRef};
use crate::shader::{ShaderFormat, ShaderKind};
use crate::types::Type;
use crate::value::Value;

pub const DEFAULT_FRAMEBUFFER_WIDTH: u32 = 250;
pub const DEFAULT_FRAMEBUFFER_HEIGHT: u32 = 250;

/// Name given to the implicitly generated color attachment of a graphics
/// pipeline that never binds one.
pub const GENERATED_COLOR_BUFFER_NAME: &str = "framebuffer";

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PipelineKind {
    Graphics,
    Compute,
    Raytracing,
}

impl PipelineKind {
    pub fn from_name(name: &str) -> Result<PipelineKind> {
        match name {
            "graphics" => Ok(PipelineKind::Graphics),
            "compute" => Ok(PipelineKind::Compute),
            "raytracing" => Ok(PipelineKind::Raytracing),
            _ => Err(Error::new(format!("unknown pipeline type: {}", name))),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Fixed-function state

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

impl BlendFactor {
    pub fn from_name(name: &str) -> Option<BlendFactor> {
        match name {
            "zero" => Some(BlendFactor::Zero),
            "one" => Some(BlendFactor::One),
            "src_color" => Some(BlendFactor::SrcColor),
            "one_minus_src_color" => Some(BlendFactor::OneMinusSrcColor),
            "dst_color" => Some(BlendFactor::DstColor),
            "one_minus_dst_color" => Some(BlendFactor::OneMinusDstColor),
            "src_alpha" => Some(BlendFactor::SrcAlpha),
            "one_minus_src_alpha" => Some(BlendFactor::OneMinusSrcAlpha),
            "dst_alpha" => Some(BlendFactor::DstAlpha),
            "one_minus_dst_alpha" => Some(BlendFactor::OneMinusDstAlpha),
            "constant_color" => Some(BlendFactor::ConstantColor),
            "one_minus_constant_color" => Some(BlendFactor::OneMinusConstantColor),
            "constant_alpha" => Some(BlendFactor::ConstantAlpha),
            "one_minus_constant_alpha" => Some(BlendFactor::OneMinusConstantAlpha),
            "src_alpha_saturate" => Some(BlendFactor::SrcAlphaSaturate),
            "src1_color" => Some(BlendFactor::Src1Color),
            "one_minus_src1_color" => Some(BlendFactor::OneMinusSrc1Color),
            "src1_alpha" => Some(BlendFactor::Src1Alpha),
            "one_minus_src1_alpha" => Some(BlendFactor::OneMinusSrc1Alpha),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

impl BlendOp {
    pub fn from_name(name: &str) -> Option<BlendOp> {
        match name {
            "add" => Some(BlendOp::Add),
            "subtract" => Some(BlendOp::Subtract),
            "reverse_subtract" => Some(BlendOp::ReverseSubtract),
            "min" => Some(BlendOp::Min),
            "max" => Some(BlendOp::Max),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

impl StencilOp {
    pub fn from_name(name: &str) -> Option<StencilOp> {
        match name {
            "keep" => Some(StencilOp::Keep),
            "zero" => Some(StencilOp::Zero),
            "replace" => Some(StencilOp::Replace),
            "increment_and_clamp" => Some(StencilOp::IncrementAndClamp),
            "decrement_and_clamp" => Some(StencilOp::DecrementAndClamp),
            "invert" => Some(StencilOp::Invert),
            "increment_and_wrap" => Some(StencilOp::IncrementAndWrap),
            "decrement_and_wrap" => Some(StencilOp::DecrementAndWrap),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StencilFaceState {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareOp,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl Default for StencilFaceState {
    fn default() -> StencilFaceState {
        StencilFaceState {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xffff_ffff,
            write_mask: 0xffff_ffff,
            reference: 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Fixed-function state collected from BLEND/DEPTH/STENCIL/VIEWPORT blocks.
#[derive(Clone, Debug)]
pub struct PipelineData {
    pub enable_blend: bool,
    pub src_color_blend_factor: BlendFactor,
    pub dst_color_blend_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_blend_factor: BlendFactor,
    pub dst_alpha_blend_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,

    pub enable_depth_test: bool,
    pub enable_depth_write: bool,
    pub depth_compare_op: CompareOp,
    pub enable_depth_clamp: bool,
    pub enable_depth_bounds_test: bool,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
    pub enable_depth_bias: bool,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,

    pub enable_stencil_test: bool,
    pub front: StencilFaceState,
    pub back: StencilFaceState,

    pub viewport: Option<Viewport>,
}

impl Default for PipelineData {
    fn default() -> PipelineData {
        PipelineData {
            enable_blend: false,
            src_color_blend_factor: BlendFactor::One,
            dst_color_blend_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::One,
            dst_alpha_blend_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
            enable_depth_test: false,
            enable_depth_write: false,
            depth_compare_op: CompareOp::Always,
            enable_depth_clamp: false,
            enable_depth_bounds_test: false,
            min_depth_bounds: 0.0,
            max_depth_bounds: 1.0,
            enable_depth_bias: false,
            depth_bias_constant_factor: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope_factor: 0.0,
            enable_stencil_test: false,
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
            viewport: None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Shader attachment

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RequiredSubgroupSize {
    Specific(u32),
    Min,
    Max,
}

/// A shader attached to a pipeline, plus its per-pipeline settings.
#[derive(Clone, Debug)]
pub struct ShaderInfo {
    pub shader: ShaderRef,
    pub shader_name: String,
    /// Declared kind of the shader itself (`Multi` possible).
    pub declared_kind: ShaderKind,
    /// Effective stage after a `TYPE` override.
    pub kind: ShaderKind,
    pub format: ShaderFormat,
    pub entry_point: String,
    entry_point_assigned: bool,
    pub optimizations: Vec<String>,
    pub compile_options: Vec<String>,
    pub specialization: FxHashMap<u32, u32>,
    pub emit_debug_info: bool,
    pub required_subgroup_size: Option<RequiredSubgroupSize>,
    pub fully_populated_subgroups: Option<bool>,
    pub varying_subgroup_size: Option<bool>,
}

impl ShaderInfo {
    fn new(shader: ShaderRef, name: &str, kind: ShaderKind, format: ShaderFormat) -> ShaderInfo {
        ShaderInfo {
            shader,
            shader_name: name.to_owned(),
            declared_kind: kind,
            kind,
            format,
            entry_point: "main".to_owned(),
            entry_point_assigned: false,
            optimizations: Vec::new(),
            compile_options: Vec::new(),
            specialization: FxHashMap::default(),
            emit_debug_info: false,
            required_subgroup_size: None,
            fully_populated_subgroups: None,
            varying_subgroup_size: None,
        }
    }

    pub fn set_entry_point(&mut self, entry_point: &str) -> Result<()> {
        if self.entry_point_assigned {
            return Err(Error::new("multiple entry points given for the same shader"));
        }
        self.entry_point_assigned = true;
        self.entry_point = entry_point.to_owned();
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Resource bindings

#[derive(Clone, Debug, PartialEq)]
pub enum KernelArg {
    Name(String),
    Number(u32),
}

/// Where a descriptor-style binding lands: a Vulkan (set, binding) pair or
/// an OpenCL kernel argument.
#[derive(Clone, Debug, PartialEq)]
pub enum BindingPoint {
    Descriptor { descriptor_set: u32, binding: u32 },
    Kernel(KernelArg),
}

#[derive(Clone, Debug)]
pub struct ColorAttachment {
    pub buffer: BufferRef,
    pub location: u32,
    pub base_mip_level: u32,
}

#[derive(Clone, Debug)]
pub struct VertexBufferInfo {
    pub buffer: BufferRef,
    pub location: u32,
    pub offset: u32,
    pub stride: Option<u32>,
    pub rate: InputRate,
    pub format: Option<Format>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InputRate {
    Vertex,
    Instance,
}

/// One `BIND BUFFER`/`BIND BUFFER_ARRAY` descriptor entry.
#[derive(Clone, Debug)]
pub struct BufferBinding {
    pub buffers: Vec<BufferRef>,
    pub kind: crate::buffer::BufferKind,
    pub point: BindingPoint,
    pub dynamic_offsets: Vec<u32>,
    pub descriptor_offsets: Vec<u64>,
    pub descriptor_ranges: Vec<i64>,
    pub base_mip_level: u32,
    pub sampler: Option<SamplerRef>,
}

#[derive(Clone, Debug)]
pub struct SamplerBinding {
    pub samplers: Vec<SamplerRef>,
    pub point: BindingPoint,
}

#[derive(Clone, Debug)]
pub struct TlasBinding {
    pub tlas: TlasRef,
    pub descriptor_set: u32,
    pub binding: u32,
}

/// A value assigned to an OpenCL kernel argument with `SET KERNEL`.
#[derive(Clone, Debug)]
pub struct ArgSetInfo {
    pub name: Option<String>,
    pub ordinal: Option<u32>,
    pub ty: Type,
    pub value: Value,
}

//--------------------------------------------------------------------------------------------------
// Raytracing

bitflags! {
    #[derive(Default)]
    pub struct PipelineFlags: u32 {
        const LIBRARY = 1 << 0;
    }
}

/// A raytracing shader group: either a general group (one raygen/miss/
/// callable shader) or a hit group (closest-hit/any-hit/intersection).
#[derive(Clone, Debug, Default)]
pub struct ShaderGroup {
    pub name: String,
    pub general: Option<ShaderRef>,
    pub closest_hit: Option<ShaderRef>,
    pub any_hit: Option<ShaderRef>,
    pub intersection: Option<ShaderRef>,
}

impl ShaderGroup {
    fn has_hit_shaders(&self) -> bool {
        self.closest_hit.is_some() || self.any_hit.is_some() || self.intersection.is_some()
    }

    pub fn add_shader(&mut self, kind: ShaderKind, shader: ShaderRef) -> Result<()> {
        match kind {
            ShaderKind::RayGeneration | ShaderKind::Miss | ShaderKind::Callable => {
                if self.has_hit_shaders() {
                    return Err(Error::new("Hit group cannot contain general shaders"));
                }
                if self.general.is_some() {
                    return Err(Error::new("Two general shaders cannot be in one group"));
                }
                self.general = Some(shader);
            }
            ShaderKind::ClosestHit => {
                if self.general.is_some() {
                    return Err(Error::new("General group cannot contain closest hit shaders"));
                }
                if self.closest_hit.is_some() {
                    return Err(Error::new("Two closest hit shaders cannot be in one group"));
                }
                self.closest_hit = Some(shader);
            }
            ShaderKind::AnyHit => {
                if self.general.is_some() {
                    return Err(Error::new("General group cannot contain any hit shaders"));
                }
                if self.any_hit.is_some() {
                    return Err(Error::new("Two any hit shaders cannot be in one group"));
                }
                self.any_hit = Some(shader);
            }
            ShaderKind::Intersection => {
                if self.general.is_some() {
                    return Err(Error::new(
                        "General group cannot contain intersection shaders",
                    ));
                }
                if self.intersection.is_some() {
                    return Err(Error::new(
                        "Two intersection shaders cannot be in one group",
                    ));
                }
                self.intersection = Some(shader);
            }
            _ => return Err(Error::new("Shader must be of raytracing type")),
        }
        Ok(())
    }
}

/// A shader binding table listing shader-group names.
#[derive(Clone, Debug, Default)]
pub struct ShaderBindingTable {
    pub name: String,
    pub groups: Vec<String>,
}

//--------------------------------------------------------------------------------------------------
// Pipeline

#[derive(Clone, Debug)]
pub struct Pipeline {
    name: String,
    kind: PipelineKind,
    pub shaders: Vec<ShaderInfo>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<BufferRef>,
    pub resolve_targets: Vec<BufferRef>,
    pub vertex_buffers: Vec<VertexBufferInfo>,
    pub index_buffer: Option<BufferRef>,
    pub push_constant: Option<BufferRef>,
    pub buffer_bindings: Vec<BufferBinding>,
    pub sampler_bindings: Vec<SamplerBinding>,
    pub tlas_bindings: Vec<TlasBinding>,
    pub arg_values: Vec<ArgSetInfo>,
    pub pipeline_data: PipelineData,
    fb_width: u32,
    fb_height: u32,
    pub shader_groups: Vec<ShaderGroup>,
    pub shader_binding_tables: Vec<ShaderBindingTable>,
    pub libraries: Vec<PipelineRef>,
    pub max_ray_payload_size: Option<u32>,
    pub max_ray_hit_attribute_size: Option<u32>,
    pub max_ray_recursion_depth: Option<u32>,
    pub flags: PipelineFlags,
}

impl Pipeline {
    pub fn new(kind: PipelineKind, name: impl Into<String>) -> Pipeline {
        Pipeline {
            name: name.into(),
            kind,
            shaders: Vec::new(),
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            resolve_targets: Vec::new(),
            vertex_buffers: Vec::new(),
            index_buffer: None,
            push_constant: None,
            buffer_bindings: Vec::new(),
            sampler_bindings: Vec::new(),
            tlas_bindings: Vec::new(),
            arg_values: Vec::new(),
            pipeline_data: PipelineData::default(),
            fb_width: DEFAULT_FRAMEBUFFER_WIDTH,
            fb_height: DEFAULT_FRAMEBUFFER_HEIGHT,
            shader_groups: Vec::new(),
            shader_binding_tables: Vec::new(),
            libraries: Vec::new(),
            max_ray_payload_size: None,
            max_ray_hit_attribute_size: None,
            max_ray_recursion_depth: None,
            flags: PipelineFlags::default(),
        }
    }

    /// Clones the parent pipeline for `DERIVE_PIPELINE`, keeping every
    /// attachment, binding and specialization but taking a new name.
    pub fn derive(&self, name: impl Into<String>) -> Pipeline {
        let mut child = self.clone();
        child.name = name.into();
        child
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PipelineKind {
        self.kind
    }

    pub fn is_graphics(&self) -> bool {
        self.kind == PipelineKind::Graphics
    }

    pub fn is_compute(&self) -> bool {
        self.kind == PipelineKind::Compute
    }

    pub fn is_raytracing(&self) -> bool {
        self.kind == PipelineKind::Raytracing
    }

    pub fn framebuffer_width(&self) -> u32 {
        self.fb_width
    }

    pub fn framebuffer_height(&self) -> u32 {
        self.fb_height
    }

    pub fn set_framebuffer_size(&mut self, width: u32, height: u32) {
        self.fb_width = width;
        self.fb_height = height;
    }

    /// Attaches a shader, checking stage legality for this pipeline kind.
    pub fn add_shader(
        &mut self,
        shader: ShaderRef,
        name: &str,
        kind: ShaderKind,
        format: ShaderFormat,
    ) -> Result<&mut ShaderInfo> {
        if self.shaders.iter().any(|s| s.shader == shader) {
            return Err(Error::new("can not add duplicate shader to pipeline"));
        }
        match self.kind {
            PipelineKind::Graphics => {
                if kind == ShaderKind::Compute {
                    return Err(Error::new(
                        "can not add a compute shader to a graphics pipeline",
                    ));
                }
                if kind.is_raytracing() {
                    return Err(Error::new(
                        "can not add a raytracing shader to a graphics pipeline",
                    ));
                }
            }
            PipelineKind::Compute => {
                if kind != ShaderKind::Compute && kind != ShaderKind::Multi {
                    return Err(Error::new(
                        "only compute shaders allowed in a compute pipeline",
                    ));
                }
            }
            PipelineKind::Raytracing => {
                if !kind.is_raytracing() && kind != ShaderKind::Multi {
                    return Err(Error::new(
                        "only raytracing shaders allowed in a raytracing pipeline",
                    ));
                }
            }
        }
        self.shaders.push(ShaderInfo::new(shader, name, kind, format));
        Ok(self.shaders.last_mut().unwrap())
    }

    pub fn shader_info(&self, shader: ShaderRef) -> Option<&ShaderInfo> {
        self.shaders.iter().find(|s| s.shader == shader)
    }

    pub fn shader_info_mut(&mut self, shader: ShaderRef) -> Option<&mut ShaderInfo> {
        self.shaders.iter_mut().find(|s| s.shader == shader)
    }

    pub fn shader_of_kind(&self, kind: ShaderKind) -> Option<&ShaderInfo> {
        self.shaders.iter().find(|s| s.kind == kind)
    }

    pub fn group(&self, name: &str) -> Option<&ShaderGroup> {
        self.shader_groups.iter().find(|g| g.name == name)
    }

    pub fn shader_binding_table(&self, name: &str) -> Option<&ShaderBindingTable> {
        self.shader_binding_tables.iter().find(|t| t.name == name)
    }

    /// Final checks when the pipeline block closes.
    pub fn validate(&self) -> Result<()> {
        match self.kind {
            PipelineKind::Compute => {
                if self.shader_of_kind(ShaderKind::Compute).is_none() {
                    return Err(Error::new("compute pipeline requires a compute shader"));
                }
            }
            PipelineKind::Graphics => {
                if self.shader_of_kind(ShaderKind::Vertex).is_none() {
                    return Err(Error::new("graphics pipeline requires a vertex shader"));
                }
                if self.shader_of_kind(ShaderKind::Fragment).is_none() {
                    return Err(Error::new("graphics pipeline requires a fragment shader"));
                }
            }
            PipelineKind::Raytracing => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shader_ref(i: usize) -> ShaderRef {
        ShaderRef(i)
    }

    #[test]
    fn compute_pipeline_rejects_graphics_shaders() {
        let mut p = Pipeline::new(PipelineKind::Compute, "p");
        let err = p
            .add_shader(shader_ref(0), "v", ShaderKind::Vertex, ShaderFormat::Glsl)
            .unwrap_err();
        assert_eq!(
            "only compute shaders allowed in a compute pipeline",
            err.to_string()
        );
    }

    #[test]
    fn graphics_pipeline_rejects_compute_shaders() {
        let mut p = Pipeline::new(PipelineKind::Graphics, "p");
        let err = p
            .add_shader(shader_ref(0), "c", ShaderKind::Compute, ShaderFormat::Glsl)
            .unwrap_err();
        assert_eq!(
            "can not add a compute shader to a graphics pipeline",
            err.to_string()
        );
    }

    #[test]
    fn duplicate_shader_rejected() {
        let mut p = Pipeline::new(PipelineKind::Graphics, "p");
        p.add_shader(shader_ref(0), "v", ShaderKind::Vertex, ShaderFormat::Glsl)
            .unwrap();
        let err = p
            .add_shader(shader_ref(0), "v", ShaderKind::Vertex, ShaderFormat::Glsl)
            .unwrap_err();
        assert_eq!("can not add duplicate shader to pipeline", err.to_string());
    }

    #[test]
    fn entry_point_assigned_once() {
        let mut p = Pipeline::new(PipelineKind::Compute, "p");
        let info = p
            .add_shader(shader_ref(0), "c", ShaderKind::Compute, ShaderFormat::Glsl)
            .unwrap();
        info.set_entry_point("green").unwrap();
        let err = info.set_entry_point("blue").unwrap_err();
        assert_eq!(
            "multiple entry points given for the same shader",
            err.to_string()
        );
    }

    #[test]
    fn validate_requires_stage_shaders() {
        let p = Pipeline::new(PipelineKind::Compute, "p");
        assert_eq!(
            "compute pipeline requires a compute shader",
            p.validate().unwrap_err().to_string()
        );

        let p = Pipeline::new(PipelineKind::Graphics, "p");
        assert_eq!(
            "graphics pipeline requires a vertex shader",
            p.validate().unwrap_err().to_string()
        );

        let p = Pipeline::new(PipelineKind::Raytracing, "p");
        assert!(p.validate().is_ok());
    }

    #[test]
    fn shader_group_rules() {
        let mut g = ShaderGroup::default();
        g.add_shader(ShaderKind::RayGeneration, shader_ref(0)).unwrap();
        assert_eq!(
            "Two general shaders cannot be in one group",
            g.add_shader(ShaderKind::RayGeneration, shader_ref(1))
                .unwrap_err()
                .to_string()
        );
        assert_eq!(
            "General group cannot contain any hit shaders",
            g.add_shader(ShaderKind::AnyHit, shader_ref(2))
                .unwrap_err()
                .to_string()
        );

        let mut hit = ShaderGroup::default();
        hit.add_shader(ShaderKind::Intersection, shader_ref(0)).unwrap();
        assert_eq!(
            "Hit group cannot contain general shaders",
            hit.add_shader(ShaderKind::RayGeneration, shader_ref(1))
                .unwrap_err()
                .to_string()
        );
        assert_eq!(
            "Two intersection shaders cannot be in one group",
            hit.add_shader(ShaderKind::Intersection, shader_ref(2))
                .unwrap_err()
                .to_string()
        );

        let mut g = ShaderGroup::default();
        assert_eq!(
            "Shader must be of raytracing type",
            g.add_shader(ShaderKind::Vertex, shader_ref(0))
                .unwrap_err()
                .to_string()
        );
    }

    #[test]
    fn derive_copies_state() {
        let mut p = Pipeline::new(PipelineKind::Graphics, "parent");
        p.set_framebuffer_size(64, 64);
        p.add_shader(shader_ref(0), "v", ShaderKind::Vertex, ShaderFormat::Glsl)
            .unwrap();
        let child = p.derive("child");
        assert_eq!("child", child.name());
        assert_eq!(64, child.framebuffer_width());
        assert_eq!(1, child.shaders.len());
    }
}
