//! PIPELINE and DERIVE_PIPELINE blocks, including every body directive.

use log::debug;

use super::{compare_op_from_token, token_text, Parser};
use crate::buffer::{Buffer, BufferKind};
use crate::error::{Error, Result};
use crate::format::Format;
use crate::pipeline::{
    BindingPoint, BlendFactor, BlendOp, BufferBinding, ColorAttachment, InputRate, KernelArg,
    Pipeline, PipelineFlags, PipelineKind, RequiredSubgroupSize, SamplerBinding,
    ShaderBindingTable, ShaderGroup, StencilFaceState, StencilOp, TlasBinding, VertexBufferInfo,
    Viewport,
};
use crate::pipeline::ArgSetInfo;
use crate::script::{BufferRef, SamplerRef};
use crate::shader::{ShaderFormat, ShaderKind};
use crate::tokenizer::Token;
use crate::types::parse_type_name;
use crate::value::Value;

impl Parser {
    pub(crate) fn parse_pipeline_block(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for pipeline type"));
        }
        let kind = PipelineKind::from_name(token.as_string())?;

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for pipeline name"));
        }
        let name = token.as_string().to_owned();

        let token = self.next();
        if !token.is_eol() && !token.is_eos() {
            return Err(Error::new(format!(
                "extra parameters after PIPELINE command: {}",
                token_text(&token)
            )));
        }

        let mut pipeline = Pipeline::new(kind, &name);
        self.parse_pipeline_body(&mut pipeline, "PIPELINE")?;
        self.commit_pipeline(pipeline)?;
        debug!("parsed pipeline {}", name);
        self.validate_end_of_statement("END")
    }

    pub(crate) fn parse_derive_pipeline(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing pipeline name for DERIVE_PIPELINE command"));
        }
        let name = token.as_string().to_owned();
        if self.script.pipeline(&name).is_some() {
            return Err(Error::new(
                "duplicate pipeline name for DERIVE_PIPELINE command",
            ));
        }

        let token = self.next();
        if !token.is_string() || token.as_string() != "FROM" {
            return Err(Error::new("missing FROM in DERIVE_PIPELINE command"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new(
                "missing parent pipeline name in DERIVE_PIPELINE command",
            ));
        }
        let parent = match self.script.pipeline(token.as_string()) {
            Some(p) => p,
            None => {
                return Err(Error::new(
                    "unknown parent pipeline in DERIVE_PIPELINE command",
                ));
            }
        };

        let token = self.next();
        if !token.is_eol() && !token.is_eos() {
            return Err(Error::new(format!(
                "extra parameters after DERIVE_PIPELINE command: {}",
                token_text(&token)
            )));
        }

        let mut pipeline = self.script.pipeline_at(parent).derive(&name);
        self.parse_pipeline_body(&mut pipeline, "DERIVE_PIPELINE")?;
        self.commit_pipeline(pipeline)?;
        self.validate_end_of_statement("END")
    }

    fn parse_pipeline_body(&mut self, pipeline: &mut Pipeline, block: &str) -> Result<()> {
        loop {
            let token = self.next();
            if token.is_eos() {
                return Err(Error::new(format!("{} missing END command", block)));
            }
            if token.is_eol() {
                continue;
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            match token.as_string() {
                "END" => return Ok(()),
                "ATTACH" => self.parse_pipeline_attach(pipeline)?,
                "SHADER_OPTIMIZATION" => self.parse_shader_optimization(pipeline)?,
                "COMPILE_OPTIONS" => self.parse_compile_options(pipeline)?,
                "FRAMEBUFFER_SIZE" => self.parse_framebuffer_size(pipeline)?,
                "BIND" => self.parse_bind(pipeline)?,
                "VERTEX_DATA" => self.parse_vertex_data(pipeline)?,
                "INDEX_DATA" => self.parse_index_data(pipeline)?,
                "SET" => self.parse_pipeline_set(pipeline)?,
                "BLEND" => self.parse_blend(pipeline)?,
                "DEPTH" => self.parse_depth(pipeline)?,
                "STENCIL" => self.parse_stencil(pipeline)?,
                "VIEWPORT" => self.parse_viewport(pipeline)?,
                "SUBGROUP" => self.parse_subgroup(pipeline)?,
                "SHADER_GROUP" => self.parse_shader_group(pipeline)?,
                "SHADER_BINDING_TABLE" => self.parse_shader_binding_table(pipeline)?,
                "MAX_RAY_PAYLOAD_SIZE" => {
                    if !pipeline.is_raytracing() {
                        return Err(Error::new(
                            "Ray payload size parameter is allowed only for ray tracing pipeline",
                        ));
                    }
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("Ray payload size expects an integer"));
                    }
                    pipeline.max_ray_payload_size = Some(v.as_u32());
                }
                "MAX_RAY_HIT_ATTRIBUTE_SIZE" => {
                    if !pipeline.is_raytracing() {
                        return Err(Error::new(
                            "Ray hit attribute size is allowed only for ray tracing pipeline",
                        ));
                    }
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("Ray hit attribute size expects an integer"));
                    }
                    pipeline.max_ray_hit_attribute_size = Some(v.as_u32());
                }
                "MAX_RAY_RECURSION_DEPTH" => {
                    if !pipeline.is_raytracing() {
                        return Err(Error::new(
                            "Ray recursion depth is allowed only for ray tracing pipeline",
                        ));
                    }
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("Ray recursion depth expects an integer"));
                    }
                    pipeline.max_ray_recursion_depth = Some(v.as_u32());
                }
                "FLAGS" => self.parse_pipeline_flags(pipeline)?,
                "USE_LIBRARY" => self.parse_use_library(pipeline)?,
                other => {
                    return Err(Error::new(format!(
                        "unknown token in pipeline block: {}",
                        other
                    )));
                }
            }
        }
    }

    fn commit_pipeline(&mut self, pipeline: Pipeline) -> Result<()> {
        self.script.add_pipeline(pipeline)?;
        Ok(())
    }

    /// End-of-parse pass: validates every pipeline, attaches the implicit
    /// framebuffer of graphics pipelines that bound no color buffer, and
    /// reconciles attachment sizes across pipelines. Runs once the whole
    /// script has been consumed, so its diagnostics carry no source line.
    pub(crate) fn finalize_pipelines(&mut self) -> Result<()> {
        for index in 0..self.script.pipelines().len() {
            self.finalize_pipeline(index)?;
        }
        Ok(())
    }

    fn finalize_pipeline(&mut self, index: usize) -> Result<()> {
        let handle = crate::script::PipelineRef(index);
        self.script.pipeline_at(handle).validate()?;

        if !self.script.pipeline_at(handle).is_graphics() {
            return Ok(());
        }

        if self.script.pipeline_at(handle).color_attachments.is_empty() {
            let buffer = match self.script.buffer(crate::pipeline::GENERATED_COLOR_BUFFER_NAME) {
                Some(b) => b,
                None => {
                    let mut buffer = Buffer::new(crate::pipeline::GENERATED_COLOR_BUFFER_NAME);
                    buffer.set_kind(BufferKind::Color);
                    buffer
                        .set_format(Format::from_name("B8G8R8A8_UNORM").expect("known format"));
                    self.script.add_buffer(buffer)?
                }
            };
            self.script
                .pipeline_at_mut(handle)
                .color_attachments
                .push(ColorAttachment {
                    buffer,
                    location: 0,
                    base_mip_level: 0,
                });
        }

        let pipeline = self.script.pipeline_at(handle);
        let width = pipeline.framebuffer_width();
        let height = pipeline.framebuffer_height();
        let mut attachments: Vec<BufferRef> = pipeline
            .color_attachments
            .iter()
            .map(|a| a.buffer)
            .collect();
        let color_attachments = attachments.clone();
        if let Some(ds) = pipeline.depth_stencil_attachment {
            attachments.push(ds);
        }
        attachments.extend(pipeline.resolve_targets.iter().copied());

        for attachment in attachments {
            let buffer = self.script.buffer_at_mut(attachment);
            if buffer.width() == 0 {
                buffer.set_width(width);
                buffer.set_height(height);
                buffer.recalculate_element_count_from_extents();
            } else if buffer.width() != width || buffer.height() != height {
                return Err(Error::new(
                    "shared framebuffer must have same size over all PIPELINES",
                ));
            }
        }

        for attachment in color_attachments {
            let buffer = self.script.buffer_at(attachment);
            let mips = buffer.mip_levels();
            if mips > 1 && (buffer.width() >> (mips - 1)) == 0 {
                return Err(Error::new(
                    "color attachment mip count produces a zero-width mip level",
                ));
            }
        }
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    // ATTACH

    fn parse_pipeline_attach(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token in ATTACH command"));
        }
        let shader = match self.script.shader(token.as_string()) {
            Some(s) => s,
            None => return Err(Error::new("unknown shader in ATTACH command")),
        };
        let shader_name = token.as_string().to_owned();
        let declared_kind = self.script.shader_at(shader).kind();
        let format = self.script.shader_at(shader).format();
        let is_multi = declared_kind == ShaderKind::Multi;

        let mut added = false;
        let mut type_given = false;
        let mut entry_point: Option<String> = None;
        let mut specializations: Vec<(u32, u32)> = Vec::new();

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "unknown ATTACH parameter: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "TYPE" => {
                    let ty = self.next();
                    if !ty.is_string() {
                        return Err(Error::new("invalid type in ATTACH command"));
                    }
                    let kind = ShaderKind::from_name(ty.as_string())?;
                    pipeline.add_shader(shader, &shader_name, kind, format)?;
                    added = true;
                    type_given = true;
                }
                "ENTRY_POINT" => {
                    if is_multi && !added {
                        return Err(Error::new("ATTACH missing TYPE for multi shader"));
                    }
                    let ep = self.next();
                    if !ep.is_string() {
                        return Err(Error::new(
                            "missing shader name in ATTACH ENTRY_POINT command",
                        ));
                    }
                    if entry_point.is_some() {
                        return Err(Error::new(
                            "multiple entry points given for the same shader",
                        ));
                    }
                    entry_point = Some(ep.as_string().to_owned());
                }
                "SPECIALIZE" => {
                    let (id, value) = self.parse_specialization()?;
                    specializations.push((id, value));
                }
                other => {
                    return Err(Error::new(format!("unknown ATTACH parameter: {}", other)));
                }
            }
        }

        if !added {
            if is_multi {
                return Err(Error::new("multi shader ATTACH requires TYPE"));
            }
            pipeline.add_shader(shader, &shader_name, declared_kind, format)?;
        }
        if type_given && entry_point.is_none() {
            return Err(Error::new("ATTACH TYPE requires an ENTRY_POINT"));
        }

        let info = pipeline
            .shader_info_mut(shader)
            .expect("shader added above");
        if let Some(ep) = entry_point {
            info.set_entry_point(&ep)?;
        }
        for (id, value) in specializations {
            info.specialization.insert(id, value);
        }
        Ok(())
    }

    /// Parses `SPECIALIZE <id> AS <type> <value>`, returning the constant id
    /// and the value's 32-bit representation.
    fn parse_specialization(&mut self) -> Result<(u32, u32)> {
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("specialization ID must be an integer"));
        }
        let id = token.as_u32();

        let token = self.next();
        if !token.is_string() || token.as_string() != "AS" {
            return Err(Error::new("expected AS as next token"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid data type in SPECIALIZE"));
        }
        let ty = parse_type_name(token.as_string())?;
        if !ty.is_32bit_scalar() {
            return Err(Error::new(
                "only 32-bit types are currently accepted for specialization values",
            ));
        }

        let mut token = self.next();
        if !token.is_integer() && !token.is_double() {
            return Err(Error::new("invalid value for SPECIALIZE"));
        }
        let value = if ty.is_float32() {
            token.convert_to_double()?;
            token.as_f32().to_bits()
        } else {
            token.as_u32()
        };
        Ok((id, value))
    }

    //----------------------------------------------------------------------------------------------
    // SHADER_OPTIMIZATION and COMPILE_OPTIONS

    fn parse_shader_optimization(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new(
                "missing shader name in SHADER_OPTIMIZATION command",
            ));
        }
        let shader = match self.script.shader(token.as_string()) {
            Some(s) => s,
            None => return Err(Error::new("unknown shader in SHADER_OPTIMIZATION command")),
        };
        let shader_name = token.as_string().to_owned();

        let token = self.next();
        if !token.is_eol() {
            return Err(Error::new(
                "extra parameters after SHADER_OPTIMIZATION command",
            ));
        }

        let mut optimizations = Vec::new();
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("SHADER_OPTIMIZATION missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new("SHADER_OPTIMIZATION options must be strings"));
            }
            if token.as_string() == "END" {
                break;
            }
            optimizations.push(token.as_string().to_owned());
        }

        match pipeline.shader_info_mut(shader) {
            Some(info) => info.optimizations = optimizations,
            None => {
                return Err(Error::new(format!(
                    "unknown shader specified for optimizations: {}",
                    shader_name
                )));
            }
        }
        self.validate_end_of_statement("SHADER_OPTIMIZATION command")
    }

    fn parse_compile_options(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing shader name in COMPILE_OPTIONS command"));
        }
        let shader = match self.script.shader(token.as_string()) {
            Some(s) => s,
            None => return Err(Error::new("unknown shader in COMPILE_OPTIONS command")),
        };
        if self.script.shader_at(shader).format() != ShaderFormat::OpenClC {
            return Err(Error::new(
                "COMPILE_OPTIONS currently only supports OPENCL-C shaders",
            ));
        }

        let token = self.next();
        if !token.is_eol() {
            return Err(Error::new("extra parameters after COMPILE_OPTIONS command"));
        }

        let mut options = Vec::new();
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("COMPILE_OPTIONS missing END command"));
            }
            if token.is_string() && token.as_string() == "END" {
                break;
            }
            options.push(token_text(&token));
        }

        match pipeline.shader_info_mut(shader) {
            Some(info) => info.compile_options = options,
            None => return Err(Error::new("unknown shader in COMPILE_OPTIONS command")),
        }
        self.validate_end_of_statement("COMPILE_OPTIONS command")
    }

    //----------------------------------------------------------------------------------------------
    // FRAMEBUFFER_SIZE

    fn parse_framebuffer_size(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing size for FRAMEBUFFER_SIZE command"));
        }
        if !token.is_integer() {
            return Err(Error::new("invalid width for FRAMEBUFFER_SIZE command"));
        }
        let width = token.as_u32();

        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing height for FRAMEBUFFER_SIZE command"));
        }
        if !token.is_integer() {
            return Err(Error::new("invalid height for FRAMEBUFFER_SIZE command"));
        }
        let height = token.as_u32();

        pipeline.set_framebuffer_size(width, height);
        self.validate_end_of_statement("FRAMEBUFFER_SIZE command")
    }

    //----------------------------------------------------------------------------------------------
    // BIND

    fn parse_bind(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new(
                "missing BUFFER, BUFFER_ARRAY, SAMPLER, SAMPLER_ARRAY, or \
                 ACCELERATION_STRUCTURE in BIND command",
            ));
        }
        match token.as_string() {
            "BUFFER" => self.parse_bind_buffer(pipeline, false),
            "BUFFER_ARRAY" => self.parse_bind_buffer(pipeline, true),
            "SAMPLER" => self.parse_bind_sampler(pipeline, false),
            "SAMPLER_ARRAY" => self.parse_bind_sampler(pipeline, true),
            "ACCELERATION_STRUCTURE" => self.parse_bind_acceleration_structure(pipeline),
            _ => Err(Error::new(
                "missing BUFFER, BUFFER_ARRAY, SAMPLER, SAMPLER_ARRAY, or \
                 ACCELERATION_STRUCTURE in BIND command",
            )),
        }
    }

    fn lookup_buffer(&self, token: &Token) -> Result<BufferRef> {
        if !token.is_string() {
            return Err(Error::new("expected a string token for BIND command"));
        }
        self.script
            .buffer(token.as_string())
            .ok_or_else(|| Error::new(format!("unknown buffer: {}", token.as_string())))
    }

    fn parse_bind_buffer(&mut self, pipeline: &mut Pipeline, is_array: bool) -> Result<()> {
        let mut buffers = Vec::new();
        let mut token = self.next();
        if is_array {
            while token.is_string() && token.as_string() != "AS" {
                buffers.push(self.lookup_buffer(&token)?);
                token = self.next();
            }
            if buffers.len() < 2 {
                return Err(Error::new(
                    "expecting multiple buffer names for BUFFER_ARRAY",
                ));
            }
        } else {
            buffers.push(self.lookup_buffer(&token)?);
            token = self.next();
        }

        // Typeless OpenCL form: BIND BUFFER <name> KERNEL ARG_NAME <name>.
        if token.is_string() && token.as_string() == "KERNEL" {
            let arg = self.parse_kernel_arg()?;
            pipeline.buffer_bindings.push(BufferBinding {
                buffers,
                kind: BufferKind::Unknown,
                point: BindingPoint::Kernel(arg),
                dynamic_offsets: Vec::new(),
                descriptor_offsets: Vec::new(),
                descriptor_ranges: Vec::new(),
                base_mip_level: 0,
                sampler: None,
            });
            return self.validate_end_of_statement("BIND command");
        }

        if !token.is_string() || token.as_string() != "AS" {
            return Err(Error::new("missing AS in BIND command"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token for BUFFER type"));
        }
        let kind = match BufferKind::from_name(token.as_string()) {
            Some(k) => k,
            None => {
                return Err(Error::new(format!(
                    "unknown buffer_type: {}",
                    token.as_string()
                )));
            }
        };

        for &buffer in &buffers {
            self.script.buffer_at_mut(buffer).set_kind(kind);
        }

        match kind {
            BufferKind::Color => self.parse_bind_color(pipeline, buffers[0]),
            BufferKind::DepthStencil => {
                if pipeline.depth_stencil_attachment.is_some() {
                    return Err(Error::new(
                        "can only bind one depth/stencil buffer in a PIPELINE",
                    ));
                }
                pipeline.depth_stencil_attachment = Some(buffers[0]);
                self.validate_end_of_statement("BIND command")
            }
            BufferKind::Resolve => {
                pipeline.resolve_targets.push(buffers[0]);
                self.validate_end_of_statement("BIND command")
            }
            BufferKind::PushConstant => {
                if pipeline.push_constant.is_some() {
                    return Err(Error::new(
                        "can only bind one push constant buffer in a PIPELINE",
                    ));
                }
                pipeline.push_constant = Some(buffers[0]);
                self.validate_end_of_statement("BIND command")
            }
            _ => self.parse_bind_descriptor(pipeline, buffers, kind, is_array),
        }
    }

    fn parse_bind_color(&mut self, pipeline: &mut Pipeline, buffer: BufferRef) -> Result<()> {
        let token = self.next();
        if !token.is_string() || token.as_string() != "LOCATION" {
            return Err(Error::new("BIND missing LOCATION"));
        }
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("invalid value for BIND LOCATION"));
        }
        let location = token.as_u32();

        if pipeline.color_attachments.iter().any(|a| a.buffer == buffer) {
            return Err(Error::new("color buffer may only be bound to a PIPELINE once"));
        }
        if pipeline
            .color_attachments
            .iter()
            .any(|a| a.location == location)
        {
            return Err(Error::new(
                "can not bind two color buffers to the same LOCATION",
            ));
        }

        let mut base_mip_level = 0;
        let token = self.next();
        if token.is_string() && token.as_string() == "BASE_MIP_LEVEL" {
            let v = self.next();
            if !v.is_integer() {
                return Err(Error::new("invalid value for BASE_MIP_LEVEL"));
            }
            base_mip_level = v.as_u32();
            let mips = self.script.buffer_at(buffer).mip_levels();
            if base_mip_level >= mips {
                return Err(Error::new(format!(
                    "base mip level (now {}) needs to be smaller than the number of buffer mip maps ({})",
                    base_mip_level, mips
                )));
            }
            pipeline.color_attachments.push(ColorAttachment {
                buffer,
                location,
                base_mip_level,
            });
            return self.validate_end_of_statement("BIND command");
        }
        if !token.is_eol() && !token.is_eos() {
            return Err(Error::new(format!(
                "extra parameters after BIND command: {}",
                token_text(&token)
            )));
        }

        pipeline.color_attachments.push(ColorAttachment {
            buffer,
            location,
            base_mip_level,
        });
        Ok(())
    }

    /// Parses the `KERNEL ARG_NAME <ident> | ARG_NUMBER <int>` suffix.
    fn parse_kernel_arg(&mut self) -> Result<KernelArg> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing ARG_NAME or ARG_NUMBER keyword"));
        }
        match token.as_string() {
            "ARG_NAME" => {
                let v = self.next();
                if !v.is_string() {
                    return Err(Error::new("expected argument identifier"));
                }
                Ok(KernelArg::Name(v.as_string().to_owned()))
            }
            "ARG_NUMBER" => {
                let v = self.next();
                if !v.is_integer() {
                    return Err(Error::new("expected argument number"));
                }
                Ok(KernelArg::Number(v.as_u32()))
            }
            _ => Err(Error::new("missing ARG_NAME or ARG_NUMBER keyword")),
        }
    }

    /// Parses the `DESCRIPTOR_SET <s> BINDING <b>` pair; the caller has
    /// already consumed the `DESCRIPTOR_SET` keyword.
    fn parse_descriptor_set_and_binding(&mut self) -> Result<(u32, u32)> {
        let v = self.next();
        if !v.is_integer() {
            return Err(Error::new("invalid value for DESCRIPTOR_SET in BIND command"));
        }
        let descriptor_set = v.as_u32();

        let token = self.next();
        if !token.is_string() || token.as_string() != "BINDING" {
            return Err(Error::new("missing BINDING for BIND command"));
        }
        let v = self.next();
        if !v.is_integer() {
            return Err(Error::new("invalid value for BINDING in BIND command"));
        }
        Ok((descriptor_set, v.as_u32()))
    }

    fn parse_bind_descriptor(
        &mut self,
        pipeline: &mut Pipeline,
        buffers: Vec<BufferRef>,
        kind: BufferKind,
        is_array: bool,
    ) -> Result<()> {
        let mut sampler: Option<SamplerRef> = None;

        let mut token = self.next();
        if kind == BufferKind::CombinedImageSampler {
            if !token.is_string() || token.as_string() != "SAMPLER" {
                return Err(Error::new("expecting SAMPLER for combined image sampler"));
            }
            let name = self.next();
            if !name.is_string() {
                return Err(Error::new("expecting SAMPLER for combined image sampler"));
            }
            sampler = Some(self.script.sampler(name.as_string()).ok_or_else(|| {
                Error::new(format!("unknown sampler: {}", name.as_string()))
            })?);
            token = self.next();
        }

        let point = if token.is_string() && token.as_string() == "DESCRIPTOR_SET" {
            let (set, binding) = self.parse_descriptor_set_and_binding()?;
            BindingPoint::Descriptor {
                descriptor_set: set,
                binding,
            }
        } else if token.is_string() && token.as_string() == "KERNEL" {
            BindingPoint::Kernel(self.parse_kernel_arg()?)
        } else {
            return Err(Error::new("missing DESCRIPTOR_SET or KERNEL for BIND command"));
        };

        let mut binding = BufferBinding {
            buffers,
            kind,
            point,
            dynamic_offsets: Vec::new(),
            descriptor_offsets: Vec::new(),
            descriptor_ranges: Vec::new(),
            base_mip_level: 0,
            sampler,
        };

        // Image and texel-buffer kinds take no offset or range suffixes;
        // anything trailing is an error below.
        let allow_offsets = !kind.is_image() && !kind.is_texel_buffer();

        let mut token = self.next();
        loop {
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "extra parameters after BIND command: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "OFFSET" if allow_offsets => {
                    let (values, next) = self.parse_integer_list()?;
                    if values.is_empty() {
                        return Err(Error::new("expecting an integer value for OFFSET"));
                    }
                    binding.dynamic_offsets = values.iter().map(|v| *v as u32).collect();
                    token = next;
                    continue;
                }
                "DESCRIPTOR_OFFSET" if allow_offsets => {
                    let (values, next) = self.parse_integer_list()?;
                    if values.is_empty() {
                        return Err(Error::new(
                            "expecting an integer value for DESCRIPTOR_OFFSET",
                        ));
                    }
                    binding.descriptor_offsets = values;
                    token = next;
                    continue;
                }
                "DESCRIPTOR_RANGE" if allow_offsets => {
                    let (values, next) = self.parse_integer_list()?;
                    if values.is_empty() {
                        return Err(Error::new(
                            "expecting an integer value for DESCRIPTOR_RANGE",
                        ));
                    }
                    binding.descriptor_ranges = values.iter().map(|v| *v as i64).collect();
                    token = next;
                    continue;
                }
                "BASE_MIP_LEVEL" if kind.is_image() => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("invalid value for BASE_MIP_LEVEL"));
                    }
                    let level = v.as_u32();
                    let mips = self.script.buffer_at(binding.buffers[0]).mip_levels();
                    if level >= mips {
                        return Err(Error::new(format!(
                            "base mip level (now {}) needs to be smaller than the number of buffer mip maps ({})",
                            level, mips
                        )));
                    }
                    binding.base_mip_level = level;
                }
                other => {
                    return Err(Error::new(format!(
                        "extra parameters after BIND command: {}",
                        other
                    )));
                }
            }
            token = self.next();
        }

        if kind.is_dynamic() && binding.dynamic_offsets.is_empty() {
            return Err(Error::new("expecting an OFFSET for dynamic buffer type"));
        }
        if is_array {
            let count = binding.buffers.len();
            if !binding.dynamic_offsets.is_empty() && binding.dynamic_offsets.len() != count {
                return Err(Error::new(
                    "expecting an OFFSET value for each buffer in the array",
                ));
            }
            if !binding.descriptor_offsets.is_empty()
                && binding.descriptor_offsets.len() != count
            {
                return Err(Error::new(
                    "expecting a DESCRIPTOR_OFFSET value for each buffer in the array",
                ));
            }
            if !binding.descriptor_ranges.is_empty() && binding.descriptor_ranges.len() != count {
                return Err(Error::new(
                    "expecting a DESCRIPTOR_RANGE value for each buffer in the array",
                ));
            }
        }

        pipeline.buffer_bindings.push(binding);
        Ok(())
    }

    /// Reads consecutive integer tokens, returning them plus the first
    /// non-integer token for the caller to continue with.
    fn parse_integer_list(&mut self) -> Result<(Vec<u64>, Token)> {
        let mut values = Vec::new();
        loop {
            let token = self.next();
            if token.is_integer() {
                values.push(token.as_u64());
            } else if token.is_hex() {
                values.push(token.as_hex());
            } else {
                return Ok((values, token));
            }
        }
    }

    fn parse_bind_sampler(&mut self, pipeline: &mut Pipeline, is_array: bool) -> Result<()> {
        let mut samplers = Vec::new();
        let mut token = self.next();
        loop {
            if !token.is_string() {
                return Err(Error::new("expected a string token for BIND command"));
            }
            if token.as_string() == "DESCRIPTOR_SET" || token.as_string() == "KERNEL" {
                break;
            }
            let handle = self.script.sampler(token.as_string()).ok_or_else(|| {
                Error::new(format!("unknown sampler: {}", token.as_string()))
            })?;
            samplers.push(handle);
            token = self.next();
            if !is_array && samplers.len() == 1 {
                break;
            }
        }

        if samplers.is_empty() {
            return Err(Error::new("expected a string token for BIND command"));
        }
        if is_array && samplers.len() < 2 {
            return Err(Error::new(
                "expecting multiple sampler names for SAMPLER_ARRAY",
            ));
        }

        let point = if token.is_string() && token.as_string() == "DESCRIPTOR_SET" {
            let (set, binding) = self.parse_descriptor_set_and_binding()?;
            BindingPoint::Descriptor {
                descriptor_set: set,
                binding,
            }
        } else if token.is_string() && token.as_string() == "KERNEL" {
            BindingPoint::Kernel(self.parse_kernel_arg()?)
        } else {
            return Err(Error::new("missing DESCRIPTOR_SET or KERNEL for BIND command"));
        };

        pipeline.sampler_bindings.push(SamplerBinding { samplers, point });
        self.validate_end_of_statement("BIND command")
    }

    fn parse_bind_acceleration_structure(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new(
                "missing top level acceleration structure name in BIND command",
            ));
        }
        let tlas = self.script.tlas(token.as_string()).ok_or_else(|| {
            Error::new(format!(
                "unknown top level acceleration structure: {}",
                token.as_string()
            ))
        })?;

        let token = self.next();
        if !token.is_string() || token.as_string() != "DESCRIPTOR_SET" {
            return Err(Error::new(
                "missing DESCRIPTOR_SET or BINDING in BIND command",
            ));
        }
        let (descriptor_set, binding) = self.parse_descriptor_set_and_binding()?;

        pipeline.tlas_bindings.push(TlasBinding {
            tlas,
            descriptor_set,
            binding,
        });
        self.validate_end_of_statement("BIND command")
    }

    //----------------------------------------------------------------------------------------------
    // VERTEX_DATA and INDEX_DATA

    fn parse_vertex_data(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing buffer name in VERTEX_DATA command"));
        }
        let buffer = self.lookup_buffer(&token)?;
        self.script.buffer_at_mut(buffer).set_kind(BufferKind::Vertex);

        let token = self.next();
        if !token.is_string() || token.as_string() != "LOCATION" {
            return Err(Error::new("VERTEX_DATA missing LOCATION"));
        }
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("invalid value for VERTEX_DATA LOCATION"));
        }
        let location = token.as_u32();
        if pipeline.vertex_buffers.iter().any(|v| v.location == location) {
            return Err(Error::new(
                "can not bind two vertex buffers to the same LOCATION",
            ));
        }

        let mut info = VertexBufferInfo {
            buffer,
            location,
            offset: 0,
            stride: None,
            rate: InputRate::Vertex,
            format: None,
        };

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "unexpected identifier for VERTEX_DATA command: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "OFFSET" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("expected unsigned integer for OFFSET"));
                    }
                    info.offset = v.as_u32();
                }
                "STRIDE" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("expected unsigned integer for STRIDE"));
                    }
                    if v.as_u32() == 0 {
                        return Err(Error::new("STRIDE needs to be larger than zero"));
                    }
                    info.stride = Some(v.as_u32());
                }
                "RATE" => {
                    let v = self.next();
                    if !v.is_string() {
                        return Err(Error::new("missing input rate value for RATE"));
                    }
                    info.rate = match v.as_string() {
                        "vertex" => InputRate::Vertex,
                        "instance" => InputRate::Instance,
                        _ => {
                            return Err(Error::new(
                                "expecting 'vertex' or 'instance' for RATE value",
                            ));
                        }
                    };
                }
                "FORMAT" => {
                    let v = self.next();
                    if !v.is_string() {
                        return Err(Error::new("vertex data FORMAT must be an identifier"));
                    }
                    let fmt = Format::from_name(v.as_string())
                        .map_err(|_| Error::new("invalid vertex data FORMAT"))?;
                    info.format = Some(fmt);
                }
                other => {
                    return Err(Error::new(format!(
                        "unexpected identifier for VERTEX_DATA command: {}",
                        other
                    )));
                }
            }
        }

        pipeline.vertex_buffers.push(info);
        Ok(())
    }

    fn parse_index_data(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing buffer name in INDEX_DATA command"));
        }
        let buffer = self.lookup_buffer(&token)?;
        if pipeline.index_buffer.is_some() {
            return Err(Error::new("can only bind one INDEX_DATA buffer in a pipeline"));
        }
        self.script.buffer_at_mut(buffer).set_kind(BufferKind::Index);
        pipeline.index_buffer = Some(buffer);
        self.validate_end_of_statement("INDEX_DATA command")
    }

    //----------------------------------------------------------------------------------------------
    // SET KERNEL

    fn parse_pipeline_set(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let has_opencl = pipeline
            .shaders
            .iter()
            .any(|s| s.format == ShaderFormat::OpenClC);
        if !has_opencl {
            return Err(Error::new("SET can only be used with OPENCL-C shaders"));
        }

        let token = self.next();
        if !token.is_string() || token.as_string() != "KERNEL" {
            return Err(Error::new("missing KERNEL in SET command"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("expected ARG_NAME or ARG_NUMBER"));
        }
        let (name, ordinal) = match token.as_string() {
            "ARG_NAME" => {
                let v = self.next();
                if !v.is_string() {
                    return Err(Error::new("expected argument identifier"));
                }
                (Some(v.as_string().to_owned()), None)
            }
            "ARG_NUMBER" => {
                let v = self.next();
                if !v.is_integer() {
                    return Err(Error::new("expected argument number"));
                }
                (None, Some(v.as_u32()))
            }
            _ => return Err(Error::new("expected ARG_NAME or ARG_NUMBER")),
        };

        let token = self.next();
        if !token.is_string() || token.as_string() != "AS" {
            return Err(Error::new("missing AS in SET command"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("expected data type"));
        }
        let ty = parse_type_name(token.as_string())?;

        let mut token = self.next();
        if !token.is_integer() && !token.is_double() {
            return Err(Error::new("expected data value"));
        }
        let value = if ty.is_float() {
            token.convert_to_double()?;
            Value::Double(token.as_f64())
        } else {
            if token.is_double() {
                return Err(Error::new("expected data value"));
            }
            Value::Integer(token.as_u64())
        };

        pipeline.arg_values.push(ArgSetInfo {
            name,
            ordinal,
            ty,
            value,
        });
        self.validate_end_of_statement("SET command")
    }

    //----------------------------------------------------------------------------------------------
    // BLEND, DEPTH, STENCIL, VIEWPORT

    fn parse_blend(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        pipeline.pipeline_data.enable_blend = true;
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("BLEND missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            let keyword = token.as_string().to_owned();
            if keyword == "END" {
                break;
            }
            match keyword.as_str() {
                "SRC_COLOR_FACTOR" | "DST_COLOR_FACTOR" | "SRC_ALPHA_FACTOR"
                | "DST_ALPHA_FACTOR" => {
                    let v = self.next();
                    let factor = if v.is_string() {
                        BlendFactor::from_name(v.as_string())
                    } else {
                        None
                    };
                    let factor = factor.ok_or_else(|| {
                        Error::new(format!(
                            "BLEND invalid value for {}: {}",
                            keyword,
                            token_text(&v)
                        ))
                    })?;
                    let data = &mut pipeline.pipeline_data;
                    match keyword.as_str() {
                        "SRC_COLOR_FACTOR" => data.src_color_blend_factor = factor,
                        "DST_COLOR_FACTOR" => data.dst_color_blend_factor = factor,
                        "SRC_ALPHA_FACTOR" => data.src_alpha_blend_factor = factor,
                        _ => data.dst_alpha_blend_factor = factor,
                    }
                }
                "COLOR_OP" | "ALPHA_OP" => {
                    let v = self.next();
                    let op = if v.is_string() {
                        BlendOp::from_name(v.as_string())
                    } else {
                        None
                    };
                    let op = op.ok_or_else(|| {
                        Error::new(format!(
                            "BLEND invalid value for {}: {}",
                            keyword,
                            token_text(&v)
                        ))
                    })?;
                    if keyword == "COLOR_OP" {
                        pipeline.pipeline_data.color_blend_op = op;
                    } else {
                        pipeline.pipeline_data.alpha_blend_op = op;
                    }
                }
                other => {
                    return Err(Error::new(format!(
                        "unknown token in BLEND block: {}",
                        other
                    )));
                }
            }
        }
        self.validate_end_of_statement("END")
    }

    /// Reads a float-valued token for the depth/viewport blocks.
    fn parse_float_value(&mut self) -> Option<f32> {
        let mut token = self.next();
        if token.convert_to_double().is_err() {
            return None;
        }
        Some(token.as_f32())
    }

    fn parse_depth(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("DEPTH missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            match token.as_string() {
                "END" => break,
                "TEST" => {
                    let v = self.next();
                    let enable = self.parse_on_off(&v).ok_or_else(|| on_off_error("TEST", &v))?;
                    pipeline.pipeline_data.enable_depth_test = enable;
                }
                "WRITE" => {
                    let v = self.next();
                    let enable = self.parse_on_off(&v).ok_or_else(|| on_off_error("WRITE", &v))?;
                    pipeline.pipeline_data.enable_depth_write = enable;
                }
                "CLAMP" => {
                    let v = self.next();
                    let enable = self.parse_on_off(&v).ok_or_else(|| on_off_error("CLAMP", &v))?;
                    pipeline.pipeline_data.enable_depth_clamp = enable;
                }
                "COMPARE_OP" => {
                    let v = self.next();
                    let op = compare_op_from_token(&v)
                        .ok_or_else(|| on_off_error("COMPARE_OP", &v))?;
                    pipeline.pipeline_data.depth_compare_op = op;
                }
                "BOUNDS" => {
                    let v = self.next();
                    if !v.is_string() || v.as_string() != "min" {
                        return Err(Error::new("BOUNDS expecting min"));
                    }
                    let min = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("BOUNDS invalid value for min"))?;
                    let v = self.next();
                    if !v.is_string() || v.as_string() != "max" {
                        return Err(Error::new("BOUNDS expecting max"));
                    }
                    let max = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("BOUNDS invalid value for max"))?;
                    pipeline.pipeline_data.enable_depth_bounds_test = true;
                    pipeline.pipeline_data.min_depth_bounds = min;
                    pipeline.pipeline_data.max_depth_bounds = max;
                }
                "BIAS" => {
                    let v = self.next();
                    if !v.is_string() || v.as_string() != "constant" {
                        return Err(Error::new("BIAS expecting constant"));
                    }
                    let constant = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("BIAS invalid value for constant"))?;
                    let v = self.next();
                    if !v.is_string() || v.as_string() != "clamp" {
                        return Err(Error::new("BIAS expecting clamp"));
                    }
                    let clamp = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("BIAS invalid value for clamp"))?;
                    let v = self.next();
                    if !v.is_string() || v.as_string() != "slope" {
                        return Err(Error::new("BIAS expecting slope"));
                    }
                    let slope = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("BIAS invalid value for slope"))?;
                    pipeline.pipeline_data.enable_depth_bias = true;
                    pipeline.pipeline_data.depth_bias_constant_factor = constant;
                    pipeline.pipeline_data.depth_bias_clamp = clamp;
                    pipeline.pipeline_data.depth_bias_slope_factor = slope;
                }
                other => {
                    return Err(Error::new(format!(
                        "unknown token in DEPTH block: {}",
                        other
                    )));
                }
            }
        }
        self.validate_end_of_statement("END")
    }

    fn parse_stencil(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("STENCIL missing face"));
        }
        if !token.is_string() {
            return Err(Error::new(format!(
                "STENCIL invalid face: {}",
                token_text(&token)
            )));
        }
        let face = match token.as_string() {
            "front" => StencilFace::Front,
            "back" => StencilFace::Back,
            "front_and_back" => StencilFace::Both,
            other => {
                return Err(Error::new(format!("STENCIL invalid face: {}", other)));
            }
        };

        let mut state = StencilFaceState::default();
        let mut test: Option<bool> = None;

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("STENCIL missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            match token.as_string() {
                "END" => break,
                "TEST" => {
                    let v = self.next();
                    let enable = self
                        .parse_on_off(&v)
                        .ok_or_else(|| stencil_value_error("TEST", &v))?;
                    test = Some(enable);
                }
                "FAIL_OP" => {
                    let v = self.next();
                    state.fail_op = stencil_op_from_token(&v)
                        .ok_or_else(|| stencil_value_error("FAIL_OP", &v))?;
                }
                "PASS_OP" => {
                    let v = self.next();
                    state.pass_op = stencil_op_from_token(&v)
                        .ok_or_else(|| stencil_value_error("PASS_OP", &v))?;
                }
                "DEPTH_FAIL_OP" => {
                    let v = self.next();
                    state.depth_fail_op = stencil_op_from_token(&v)
                        .ok_or_else(|| stencil_value_error("DEPTH_FAIL_OP", &v))?;
                }
                "COMPARE_OP" => {
                    let v = self.next();
                    state.compare_op = compare_op_from_token(&v)
                        .ok_or_else(|| stencil_value_error("COMPARE_OP", &v))?;
                }
                "COMPARE_MASK" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("STENCIL invalid value for COMPARE_MASK"));
                    }
                    state.compare_mask = v.as_u32();
                }
                "WRITE_MASK" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("STENCIL invalid value for WRITE_MASK"));
                    }
                    state.write_mask = v.as_u32();
                }
                "REFERENCE" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("STENCIL invalid value for REFERENCE"));
                    }
                    state.reference = v.as_u32();
                }
                other => {
                    return Err(Error::new(format!(
                        "unknown token in STENCIL block: {}",
                        other
                    )));
                }
            }
        }

        if let Some(enable) = test {
            pipeline.pipeline_data.enable_stencil_test = enable;
        }
        match face {
            StencilFace::Front => pipeline.pipeline_data.front = state,
            StencilFace::Back => pipeline.pipeline_data.back = state,
            StencilFace::Both => {
                pipeline.pipeline_data.front = state;
                pipeline.pipeline_data.back = state;
            }
        }
        self.validate_end_of_statement("END")
    }

    fn parse_viewport(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let x = self
            .parse_float_value()
            .ok_or_else(|| Error::new("invalid offset for VIEWPORT command"))?;
        let y = self
            .parse_float_value()
            .ok_or_else(|| Error::new("invalid offset for VIEWPORT command"))?;

        let token = self.next();
        if !token.is_string() || token.as_string() != "SIZE" {
            return Err(Error::new("missing SIZE for VIEWPORT command"));
        }

        let width = self
            .parse_float_value()
            .ok_or_else(|| Error::new("missing size for VIEWPORT command"))?;
        let height = self
            .parse_float_value()
            .ok_or_else(|| Error::new("missing size for VIEWPORT command"))?;

        let mut min_depth = 0.0;
        let mut max_depth = 1.0;
        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "extra parameters after VIEWPORT command: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "MIN_DEPTH" => {
                    min_depth = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("invalid min_depth for VIEWPORT command"))?;
                }
                "MAX_DEPTH" => {
                    max_depth = self
                        .parse_float_value()
                        .ok_or_else(|| Error::new("invalid max_depth for VIEWPORT command"))?;
                }
                other => {
                    return Err(Error::new(format!(
                        "extra parameters after VIEWPORT command: {}",
                        other
                    )));
                }
            }
        }

        pipeline.pipeline_data.viewport = Some(Viewport {
            x,
            y,
            width,
            height,
            min_depth,
            max_depth,
        });
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    // SUBGROUP

    fn parse_subgroup(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing shader name in SUBGROUP command"));
        }
        let shader = match self.script.shader(token.as_string()) {
            Some(s) => s,
            None => return Err(Error::new("unknown shader in SUBGROUP command")),
        };
        let shader_name = token.as_string().to_owned();
        if pipeline.shader_info(shader).is_none() {
            return Err(Error::new("unknown shader in SUBGROUP command"));
        }

        let has_size_control = self
            .script
            .required_features()
            .iter()
            .any(|f| f == "SubgroupSizeControl.subgroupSizeControl");
        let has_full_subgroups = self
            .script
            .required_features()
            .iter()
            .any(|f| f == "SubgroupSizeControl.computeFullSubgroups");

        let mut fully_populated = None;
        let mut varying_size = None;
        let mut required_size = None;

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("SUBGROUP missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            match token.as_string() {
                "END" => break,
                "FULLY_POPULATED" => {
                    if !has_full_subgroups {
                        return Err(Error::new(
                            "missing DEVICE_FEATURE SubgroupSizeControl.computeFullSubgroups",
                        ));
                    }
                    let v = self.next();
                    let enable = self.parse_on_off(&v).ok_or_else(|| {
                        Error::new("invalid value for FULLY_POPULATED command")
                    })?;
                    fully_populated = Some(enable);
                }
                "VARYING_SIZE" => {
                    if !has_size_control {
                        return Err(Error::new(
                            "missing DEVICE_FEATURE SubgroupSizeControl.subgroupSizeControl",
                        ));
                    }
                    let v = self.next();
                    let enable = self
                        .parse_on_off(&v)
                        .ok_or_else(|| Error::new("invalid value for VARYING_SIZE command"))?;
                    varying_size = Some(enable);
                }
                "REQUIRED_SIZE" => {
                    if !has_size_control {
                        return Err(Error::new(
                            "missing DEVICE_FEATURE SubgroupSizeControl.subgroupSizeControl",
                        ));
                    }
                    let v = self.next();
                    if v.is_integer() {
                        let size = v.as_u32();
                        if size == 0 || size > 128 || !size.is_power_of_two() {
                            return Err(Error::new(format!(
                                "invalid required subgroup size {} specified for shader name {}",
                                size, shader_name
                            )));
                        }
                        required_size = Some(RequiredSubgroupSize::Specific(size));
                    } else if v.is_string() && v.as_string() == "MIN" {
                        required_size = Some(RequiredSubgroupSize::Min);
                    } else if v.is_string() && v.as_string() == "MAX" {
                        required_size = Some(RequiredSubgroupSize::Max);
                    } else {
                        return Err(Error::new("invalid size for REQUIRED_SIZE command"));
                    }
                }
                other => {
                    return Err(Error::new(format!(
                        "SUBGROUP invalid value for SUBGROUP {}",
                        other
                    )));
                }
            }
        }

        let info = pipeline
            .shader_info_mut(shader)
            .expect("checked attached above");
        info.fully_populated_subgroups = fully_populated;
        info.varying_subgroup_size = varying_size;
        info.required_subgroup_size = required_size;
        self.validate_end_of_statement("END")
    }

    //----------------------------------------------------------------------------------------------
    // Raytracing pipeline directives

    fn parse_shader_group(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("Group name expected"));
        }
        let name = token.as_string().to_owned();
        if pipeline.group(&name).is_some() {
            return Err(Error::new("Group name already exists"));
        }

        let mut group = ShaderGroup {
            name,
            ..ShaderGroup::default()
        };

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new("Shader name expected"));
            }
            let shader = match self.script.shader(token.as_string()) {
                Some(s) => s,
                None => {
                    return Err(Error::new(format!(
                        "Shader not found: {}",
                        token.as_string()
                    )));
                }
            };
            let kind = self.script.shader_at(shader).kind();
            if !kind.is_raytracing() {
                return Err(Error::new("Shader must be of raytracing type"));
            }
            group.add_shader(kind, shader)?;
        }

        pipeline.shader_groups.push(group);
        Ok(())
    }

    fn parse_shader_binding_table(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("SHADER_BINDINGS_TABLE requires a name"));
        }
        let name = token.as_string().to_owned();
        if pipeline.shader_binding_table(&name).is_some() {
            return Err(Error::new(
                "SHADER_BINDINGS_TABLE with this name already defined",
            ));
        }

        let token = self.next();
        if !token.is_eol() {
            return Err(Error::new("New line expected"));
        }

        let mut table = ShaderBindingTable {
            name,
            groups: Vec::new(),
        };
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("END command missing"));
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            if token.as_string() == "END" {
                break;
            }
            table.groups.push(token.as_string().to_owned());
        }

        pipeline.shader_binding_tables.push(table);
        Ok(())
    }

    fn parse_pipeline_flags(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        if !pipeline.is_raytracing() {
            return Err(Error::new(
                "Flags are allowed only for ray tracing pipeline",
            ));
        }

        // Flags may sit on the directive's own line, or, when the line holds
        // none, continue over following lines up to an END.
        let mut parsed_any = false;
        let mut multi_line = false;
        loop {
            let token = self.next();
            if token.is_eol() {
                if parsed_any && !multi_line {
                    break;
                }
                multi_line = true;
                continue;
            }
            if token.is_eos() {
                if multi_line {
                    return Err(Error::new("END command missing"));
                }
                break;
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            match token.as_string() {
                "END" if multi_line => break,
                "LIBRARY" => {
                    pipeline.flags |= PipelineFlags::LIBRARY;
                    parsed_any = true;
                }
                other => {
                    return Err(Error::new(format!("Unknown flag: {}", other)));
                }
            }
        }
        Ok(())
    }

    fn parse_use_library(&mut self, pipeline: &mut Pipeline) -> Result<()> {
        if !pipeline.is_raytracing() {
            return Err(Error::new(
                "Use library is allowed only for ray tracing pipeline",
            ));
        }
        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new("Identifier expected"));
            }
            let library = match self.script.pipeline(token.as_string()) {
                Some(p) => p,
                None => {
                    return Err(Error::new(format!(
                        "Pipeline not found: {}",
                        token.as_string()
                    )));
                }
            };
            pipeline.libraries.push(library);
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum StencilFace {
    Front,
    Back,
    Both,
}

fn on_off_error(keyword: &str, token: &Token) -> Error {
    let text = token_text(token);
    if text.is_empty() {
        Error::new(format!("invalid value for {}", keyword))
    } else {
        Error::new(format!("invalid value for {}: {}", keyword, text))
    }
}

fn stencil_value_error(keyword: &str, token: &Token) -> Error {
    let text = token_text(token);
    if text.is_empty() {
        Error::new(format!("STENCIL invalid value for {}", keyword))
    } else {
        Error::new(format!("STENCIL invalid value for {}: {}", keyword, text))
    }
}

fn stencil_op_from_token(token: &Token) -> Option<StencilOp> {
    if !token.is_string() {
        return None;
    }
    StencilOp::from_name(token.as_string())
}
