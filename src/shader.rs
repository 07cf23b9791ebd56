//! Shader declarations.

use crate::error::{Error, Result};

/// Pipeline stage a shader runs at. `Multi` shaders bundle several entry
/// points and pick a concrete stage per `ATTACH`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    Vertex,
    Fragment,
    Geometry,
    TessellationControl,
    TessellationEvaluation,
    Compute,
    RayGeneration,
    AnyHit,
    ClosestHit,
    Miss,
    Intersection,
    Callable,
    Multi,
}

impl ShaderKind {
    pub fn from_name(name: &str) -> Result<ShaderKind> {
        let kind = match name {
            "vertex" => ShaderKind::Vertex,
            "fragment" => ShaderKind::Fragment,
            "geometry" => ShaderKind::Geometry,
            "tessellation_control" => ShaderKind::TessellationControl,
            "tessellation_evaluation" => ShaderKind::TessellationEvaluation,
            "compute" => ShaderKind::Compute,
            "ray_generation" => ShaderKind::RayGeneration,
            "any_hit" => ShaderKind::AnyHit,
            "closest_hit" => ShaderKind::ClosestHit,
            "miss" => ShaderKind::Miss,
            "intersection" => ShaderKind::Intersection,
            "callable" => ShaderKind::Callable,
            "multi" => ShaderKind::Multi,
            _ => return Err(Error::new(format!("unknown shader type: {}", name))),
        };
        Ok(kind)
    }

    /// True for the raytracing-only stages.
    pub fn is_raytracing(self) -> bool {
        match self {
            ShaderKind::RayGeneration
            | ShaderKind::AnyHit
            | ShaderKind::ClosestHit
            | ShaderKind::Miss
            | ShaderKind::Intersection
            | ShaderKind::Callable => true,
            _ => false,
        }
    }

    /// True for stages legal in a graphics pipeline.
    pub fn is_graphics(self) -> bool {
        match self {
            ShaderKind::Vertex
            | ShaderKind::Fragment
            | ShaderKind::Geometry
            | ShaderKind::TessellationControl
            | ShaderKind::TessellationEvaluation => true,
            _ => false,
        }
    }
}

/// Source language of a shader body.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShaderFormat {
    Default,
    Glsl,
    Hlsl,
    OpenClC,
    SpirvAsm,
    SpirvHex,
}

impl ShaderFormat {
    pub fn from_name(name: &str) -> Result<ShaderFormat> {
        let fmt = match name {
            "GLSL" => ShaderFormat::Glsl,
            "HLSL" => ShaderFormat::Hlsl,
            "OPENCL-C" => ShaderFormat::OpenClC,
            "SPIRV-ASM" => ShaderFormat::SpirvAsm,
            "SPIRV-HEX" => ShaderFormat::SpirvHex,
            _ => return Err(Error::new(format!("unknown shader format: {}", name))),
        };
        Ok(fmt)
    }
}

/// The stock vertex shader used by `SHADER vertex <name> PASSTHROUGH`:
/// copies attribute 0 into `gl_Position`.
pub const PASS_THROUGH_SHADER: &str = r#"; SPIR-V
; Version: 1.0
; Generator: Khronos Glslang Reference Front End; 7
; Bound: 21
; Schema: 0
               OpCapability Shader
          %1 = OpExtInstImport "GLSL.std.450"
               OpMemoryModel Logical GLSL450
               OpEntryPoint Vertex %main "main" %_ %position
               OpSource GLSL 430
               OpName %main "main"
               OpName %gl_PerVertex "gl_PerVertex"
               OpMemberName %gl_PerVertex 0 "gl_Position"
               OpMemberName %gl_PerVertex 1 "gl_PointSize"
               OpMemberName %gl_PerVertex 2 "gl_ClipDistance"
               OpName %_ ""
               OpName %position "position"
               OpMemberDecorate %gl_PerVertex 0 BuiltIn Position
               OpMemberDecorate %gl_PerVertex 1 BuiltIn PointSize
               OpMemberDecorate %gl_PerVertex 2 BuiltIn ClipDistance
               OpDecorate %gl_PerVertex Block
               OpDecorate %position Location 0
       %void = OpTypeVoid
          %3 = OpTypeFunction %void
      %float = OpTypeFloat 32
    %v4float = OpTypeVector %float 4
       %uint = OpTypeInt 32 0
     %uint_1 = OpConstant %uint 1
%_arr_float_uint_1 = OpTypeArray %float %uint_1
%gl_PerVertex = OpTypeStruct %v4float %float %_arr_float_uint_1
%_ptr_Output_gl_PerVertex = OpTypePointer Output %gl_PerVertex
          %_ = OpVariable %_ptr_Output_gl_PerVertex Output
        %int = OpTypeInt 32 1
      %int_0 = OpConstant %int 0
%_ptr_Input_v4float = OpTypePointer Input %v4float
   %position = OpVariable %_ptr_Input_v4float Input
%_ptr_Output_v4float = OpTypePointer Output %v4float
       %main = OpFunction %void None %3
          %5 = OpLabel
         %18 = OpLoad %v4float %position
         %20 = OpAccessChain %_ptr_Output_v4float %_ %int_0
               OpStore %20 %18
               OpReturn
               OpFunctionEnd"#;

/// A shader declaration, unique by name within a script.
#[derive(Clone, Debug)]
pub struct Shader {
    name: String,
    kind: ShaderKind,
    format: ShaderFormat,
    data: String,
    target_env: Option<String>,
    file_path: String,
}

impl Shader {
    pub fn new(kind: ShaderKind, name: impl Into<String>) -> Shader {
        Shader {
            name: name.into(),
            kind,
            format: ShaderFormat::Default,
            data: String::new(),
            target_env: None,
            file_path: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ShaderKind {
        self.kind
    }

    pub fn format(&self) -> ShaderFormat {
        self.format
    }

    pub fn set_format(&mut self, format: ShaderFormat) {
        self.format = format;
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
    }

    pub fn target_env(&self) -> Option<&str> {
        self.target_env.as_ref().map(|s| s.as_str())
    }

    pub fn set_target_env(&mut self, env: impl Into<String>) {
        self.target_env = Some(env.into());
    }

    /// Diagnostic path of the shader source: the virtual-file path when the
    /// body came from one, a synthetic `embedded-shaders/<name>` otherwise.
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn set_file_path(&mut self, path: impl Into<String>) {
        self.file_path = path.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(
            ShaderKind::Vertex,
            ShaderKind::from_name("vertex").unwrap()
        );
        assert_eq!(
            ShaderKind::TessellationEvaluation,
            ShaderKind::from_name("tessellation_evaluation").unwrap()
        );
        assert_eq!(
            ShaderKind::RayGeneration,
            ShaderKind::from_name("ray_generation").unwrap()
        );
        assert_eq!(
            "unknown shader type: UNKNOWN",
            ShaderKind::from_name("UNKNOWN").unwrap_err().to_string()
        );
    }

    #[test]
    fn format_names() {
        assert_eq!(ShaderFormat::Glsl, ShaderFormat::from_name("GLSL").unwrap());
        assert_eq!(
            ShaderFormat::SpirvHex,
            ShaderFormat::from_name("SPIRV-HEX").unwrap()
        );
        assert_eq!(
            ShaderFormat::OpenClC,
            ShaderFormat::from_name("OPENCL-C").unwrap()
        );
        assert!(ShaderFormat::from_name("INVALID").is_err());
    }

    #[test]
    fn raytracing_kinds() {
        assert!(ShaderKind::Miss.is_raytracing());
        assert!(ShaderKind::Callable.is_raytracing());
        assert!(!ShaderKind::Compute.is_raytracing());
        assert!(!ShaderKind::Vertex.is_raytracing());
    }

    #[test]
    fn pass_through_is_spirv_asm() {
        assert!(PASS_THROUGH_SHADER.starts_with("; SPIR-V"));
        assert!(PASS_THROUGH_SHADER.contains("OpEntryPoint Vertex"));
    }
}
