//! The pluggable shader-compiler seam.
//!
//! The parser never compiles shaders; the execution backend feeds each
//! attached shader through a [`ShaderCompiler`]. The built-in compiler
//! resolves pre-compiled entries from the host's shader map and packs
//! `SPIRV-HEX` sources itself; text formats (GLSL with the `glsl` feature,
//! everything else via a host-supplied implementation) are delegated.

use byteorder::{ByteOrder, LittleEndian};
use fxhash::FxHashMap;
use log::debug;

use crate::error::{Error, Result};
use crate::shader::{Shader, ShaderFormat};
use crate::tokenizer::Tokenizer;

/// Pre-compiled SPIR-V supplied by the host, keyed by shader name.
pub type ShaderMap = FxHashMap<String, Vec<u32>>;

pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Turns a shader source into a SPIR-V word vector.
pub trait ShaderCompiler {
    fn compile(&self, shader: &Shader, shader_map: &ShaderMap) -> Result<Vec<u32>>;
}

/// Packs a `SPIRV-HEX` body: a whitespace-separated stream of `0x`-prefixed
/// byte lexemes assembled into words little-endian.
pub fn parse_hex_shader(data: &str) -> Result<Vec<u32>> {
    let mut bytes = Vec::new();
    let mut tokenizer = Tokenizer::new(data);
    loop {
        let token = tokenizer.next_token();
        if token.is_eos() {
            break;
        }
        if token.is_eol() {
            continue;
        }
        if !token.is_hex() {
            return Err(Error::new("Invalid SPIRV-HEX shader provided"));
        }
        bytes.push(token.as_hex() as u8);
    }

    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(Error::new("Invalid SPIRV-HEX shader provided"));
    }

    let mut words = vec![0u32; bytes.len() / 4];
    LittleEndian::read_u32_into(&bytes, &mut words);

    if words[0] != SPIRV_MAGIC {
        return Err(Error::new("Invalid SPIR-V magic number"));
    }
    Ok(words)
}

/// The compiler used when the host does not install its own.
#[derive(Default)]
pub struct DefaultShaderCompiler;

impl ShaderCompiler for DefaultShaderCompiler {
    fn compile(&self, shader: &Shader, shader_map: &ShaderMap) -> Result<Vec<u32>> {
        if let Some(words) = shader_map.get(shader.name()) {
            debug!("shader {} resolved from shader map", shader.name());
            return Ok(words.clone());
        }

        match shader.format() {
            ShaderFormat::SpirvHex => parse_hex_shader(shader.data()),
            #[cfg(feature = "glsl")]
            ShaderFormat::Glsl => compile_glsl(shader),
            _ => Err(Error::new(format!(
                "no compiler available for shader {}",
                shader.name()
            ))),
        }
    }
}

#[cfg(feature = "glsl")]
fn compile_glsl(shader: &Shader) -> Result<Vec<u32>> {
    use crate::shader::ShaderKind;

    let kind = match shader.kind() {
        ShaderKind::Vertex => shaderc::ShaderKind::Vertex,
        ShaderKind::Fragment => shaderc::ShaderKind::Fragment,
        ShaderKind::Geometry => shaderc::ShaderKind::Geometry,
        ShaderKind::TessellationControl => shaderc::ShaderKind::TessControl,
        ShaderKind::TessellationEvaluation => shaderc::ShaderKind::TessEvaluation,
        ShaderKind::Compute => shaderc::ShaderKind::Compute,
        _ => {
            return Err(Error::new(format!(
                "no compiler available for shader {}",
                shader.name()
            )));
        }
    };

    let mut compiler =
        shaderc::Compiler::new().ok_or_else(|| Error::new("failed to initialize shaderc"))?;
    let mut options = shaderc::CompileOptions::new()
        .ok_or_else(|| Error::new("failed to initialize shaderc options"))?;
    options.set_target_env(shaderc::TargetEnv::Vulkan, 0);

    let artifact = compiler
        .compile_into_spirv(shader.data(), kind, shader.file_path(), "main", Some(&options))
        .map_err(|e| Error::new(e.to_string()))?;
    debug!(
        "compiled shader {} ({} warnings)",
        shader.name(),
        artifact.get_num_warnings()
    );
    Ok(artifact.as_binary().to_vec())
}
