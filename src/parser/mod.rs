//! Recursive-descent parser for AmberScript.
//!
//! The top-level loop reads a leading identifier and dispatches to a
//! directive handler; block bodies re-enter the same pattern with an `END`
//! terminator. Every handler returns `Result` and the loop tags errors with
//! the current source line unless the handler already pinned one.

mod commands;
mod pipeline;
mod raytracing;

use fxhash::FxHashMap;
use log::debug;

use crate::buffer::{is_valid_sample_count, Buffer, ImageDimension};
use crate::error::{Error, Result};
use crate::format::{Format, Layout};
use crate::sampler::{AddressMode, BorderColor, CompareOp, FilterType, Sampler};
use crate::script::Script;
use crate::shader::{Shader, ShaderFormat, ShaderKind, PASS_THROUGH_SHADER};
use crate::tokenizer::{Token, Tokenizer};
use crate::types::{parse_type_name, StructMember, StructType, Type};
use crate::value::Value;

/// Host-supplied inputs to a parse.
#[derive(Default)]
pub struct Options {
    /// Virtual files visible to `SHADER ... VIRTUAL_FILE` before any
    /// `VIRTUAL_FILE` block declares more.
    pub virtual_files: FxHashMap<String, String>,
}

/// Vulkan feature names accepted by `DEVICE_FEATURE`.
const KNOWN_FEATURES: &[&str] = &[
    "robustBufferAccess",
    "fullDrawIndexUint32",
    "imageCubeArray",
    "independentBlend",
    "geometryShader",
    "tessellationShader",
    "sampleRateShading",
    "dualSrcBlend",
    "logicOp",
    "multiDrawIndirect",
    "drawIndirectFirstInstance",
    "depthClamp",
    "depthBiasClamp",
    "fillModeNonSolid",
    "depthBounds",
    "wideLines",
    "largePoints",
    "alphaToOne",
    "multiViewport",
    "samplerAnisotropy",
    "textureCompressionETC2",
    "textureCompressionASTC_LDR",
    "textureCompressionBC",
    "occlusionQueryPrecise",
    "pipelineStatisticsQuery",
    "vertexPipelineStoresAndAtomics",
    "fragmentStoresAndAtomics",
    "shaderTessellationAndGeometryPointSize",
    "shaderImageGatherExtended",
    "shaderStorageImageExtendedFormats",
    "shaderStorageImageMultisample",
    "shaderStorageImageReadWithoutFormat",
    "shaderStorageImageWriteWithoutFormat",
    "shaderUniformBufferArrayDynamicIndexing",
    "shaderSampledImageArrayDynamicIndexing",
    "shaderStorageBufferArrayDynamicIndexing",
    "shaderStorageImageArrayDynamicIndexing",
    "shaderClipDistance",
    "shaderCullDistance",
    "shaderFloat64",
    "shaderInt64",
    "shaderInt16",
    "shaderResourceResidency",
    "shaderResourceMinLod",
    "sparseBinding",
    "sparseResidencyBuffer",
    "sparseResidencyImage2D",
    "sparseResidencyImage3D",
    "sparseResidency2Samples",
    "sparseResidency4Samples",
    "sparseResidency8Samples",
    "sparseResidency16Samples",
    "sparseResidencyAliased",
    "variableMultisampleRate",
    "inheritedQueries",
    "VariablePointerFeatures.variablePointers",
    "VariablePointerFeatures.variablePointersStorageBuffer",
    "Float16Int8Features.shaderFloat16",
    "Float16Int8Features.shaderInt8",
    "Storage8BitFeatures.storageBuffer8BitAccess",
    "Storage8BitFeatures.uniformAndStorageBuffer8BitAccess",
    "Storage8BitFeatures.storagePushConstant8",
    "Storage16BitFeatures.storageBuffer16BitAccess",
    "Storage16BitFeatures.uniformAndStorageBuffer16BitAccess",
    "Storage16BitFeatures.storagePushConstant16",
    "Storage16BitFeatures.storageInputOutput16",
    "SubgroupSizeControl.subgroupSizeControl",
    "SubgroupSizeControl.computeFullSubgroups",
    "IndexTypeUint8Features.indexTypeUint8",
    "AccelerationStructureFeaturesKHR.accelerationStructure",
    "RayTracingPipelineFeaturesKHR.rayTracingPipeline",
];

/// Property names accepted by `DEVICE_PROPERTY`.
const KNOWN_PROPERTIES: &[&str] = &[
    "FloatControlsProperties.shaderSignedZeroInfNanPreserveFloat16",
    "FloatControlsProperties.shaderSignedZeroInfNanPreserveFloat32",
    "FloatControlsProperties.shaderSignedZeroInfNanPreserveFloat64",
    "FloatControlsProperties.shaderDenormPreserveFloat16",
    "FloatControlsProperties.shaderDenormPreserveFloat32",
    "FloatControlsProperties.shaderDenormPreserveFloat64",
    "FloatControlsProperties.shaderDenormFlushToZeroFloat16",
    "FloatControlsProperties.shaderDenormFlushToZeroFloat32",
    "FloatControlsProperties.shaderDenormFlushToZeroFloat64",
    "FloatControlsProperties.shaderRoundingModeRTEFloat16",
    "FloatControlsProperties.shaderRoundingModeRTEFloat32",
    "FloatControlsProperties.shaderRoundingModeRTEFloat64",
    "FloatControlsProperties.shaderRoundingModeRTZFloat16",
    "FloatControlsProperties.shaderRoundingModeRTZFloat32",
    "FloatControlsProperties.shaderRoundingModeRTZFloat64",
];

pub struct Parser {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) script: Script,
}

/// Parses a script with no host-supplied inputs.
pub fn parse(source: &str) -> Result<Script> {
    parse_with_options(source, Options::default())
}

/// Parses a script against host-supplied options.
pub fn parse_with_options(source: &str, options: Options) -> Result<Script> {
    let mut script = Script::new();
    for (path, content) in options.virtual_files {
        script.add_virtual_file(&path, content)?;
    }
    let mut parser = Parser {
        tokenizer: Tokenizer::new(source),
        script,
    };
    parser.run()?;
    Ok(parser.script)
}

/// Renders a token for inclusion in a diagnostic.
pub(crate) fn token_text(token: &Token) -> String {
    if token.is_string() || token.is_integer() || token.is_double() || token.is_hex() {
        token.to_original_string().to_owned()
    } else {
        String::new()
    }
}

impl Parser {
    fn run(&mut self) -> Result<()> {
        loop {
            let token = self.tokenizer.next_token();
            if token.is_eos() {
                break;
            }
            if token.is_eol() {
                continue;
            }
            if !token.is_string() {
                return Err(self.error_here("expected string"));
            }

            let directive = token.as_string().to_owned();
            let r = match directive.as_str() {
                "SHADER" => self.parse_shader_block(),
                "BUFFER" => self.parse_buffer(),
                "IMAGE" => self.parse_image(),
                "SAMPLER" => self.parse_sampler(),
                "STRUCT" => self.parse_struct(),
                "PIPELINE" => self.parse_pipeline_block(),
                "DERIVE_PIPELINE" => self.parse_derive_pipeline(),
                "ACCELERATION_STRUCTURE" => self.parse_acceleration_structure(),
                "RUN" => self.parse_run(),
                "CLEAR" => self.parse_clear(),
                "CLEAR_COLOR" => self.parse_clear_color(),
                "CLEAR_DEPTH" => self.parse_clear_depth(),
                "CLEAR_STENCIL" => self.parse_clear_stencil(),
                "COPY" => self.parse_copy(),
                "EXPECT" => self.parse_expect(),
                "REPEAT" => self.parse_repeat(),
                "DEBUG" => self.parse_debug(),
                "DEVICE_FEATURE" => self.parse_device_feature(),
                "DEVICE_PROPERTY" => self.parse_device_property(),
                "DEVICE_EXTENSION" => self.parse_device_extension(),
                "INSTANCE_EXTENSION" => self.parse_instance_extension(),
                "SET" => self.parse_set(),
                "VIRTUAL_FILE" => self.parse_virtual_file(),
                _ => Err(Error::new(format!("unknown token: {}", directive))),
            };
            if let Err(e) = r {
                return Err(e.with_line(self.tokenizer.current_line()));
            }
        }
        // Whole-script validation runs with every declaration in hand; its
        // diagnostics carry no source line.
        self.finalize_pipelines()
    }

    //----------------------------------------------------------------------------------------------
    // Shared helpers

    pub(crate) fn next(&mut self) -> Token {
        self.tokenizer.next_token()
    }

    pub(crate) fn error_here(&self, message: impl Into<String>) -> Error {
        Error::at(self.tokenizer.current_line(), message.into())
    }

    /// Requires the statement to end here, naming the offending token
    /// otherwise.
    pub(crate) fn validate_end_of_statement(&mut self, name: &str) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Ok(());
        }
        Err(Error::new(format!(
            "extra parameters after {}: {}",
            name,
            token_text(&token)
        )))
    }

    /// Reads an `on`/`off` keyword.
    pub(crate) fn parse_on_off(&mut self, token: &Token) -> Option<bool> {
        if !token.is_string() {
            return None;
        }
        match token.as_string() {
            "on" => Some(true),
            "off" => Some(false),
            _ => None,
        }
    }

    //----------------------------------------------------------------------------------------------
    // SHADER

    fn parse_shader_block(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for shader type"));
        }
        let kind = ShaderKind::from_name(token.as_string())?;

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for shader name"));
        }
        let name = token.as_string().to_owned();

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for shader format"));
        }
        let fmt = token.as_string().to_owned();

        let mut shader = Shader::new(kind, &name);
        shader.set_file_path(format!("embedded-shaders/{}", name));

        if fmt == "PASSTHROUGH" {
            if kind != ShaderKind::Vertex {
                return Err(Error::new(
                    "invalid shader type for PASSTHROUGH. Only vertex PASSTHROUGH allowed",
                ));
            }
            shader.set_format(ShaderFormat::SpirvAsm);
            shader.set_data(PASS_THROUGH_SHADER);
            self.script.add_shader(shader)?;
            return self.validate_end_of_statement("SHADER PASSTHROUGH");
        }

        shader.set_format(ShaderFormat::from_name(&fmt)?);

        let mut token = self.next();
        if token.is_string() && token.as_string() == "TARGET_ENV" {
            let env = self.next();
            if !env.is_string() {
                return Err(Error::new("expected target environment after TARGET_ENV"));
            }
            shader.set_target_env(env.as_string());
            token = self.next();
        }

        if token.is_string() && token.as_string() == "VIRTUAL_FILE" {
            let path_token = self.next();
            if !path_token.is_string() {
                return Err(Error::new("expected virtual file path after VIRTUAL_FILE"));
            }
            let path = trim_quotes(path_token.as_string());
            match self.script.virtual_file(&path) {
                Some(content) => {
                    shader.set_data(content.to_owned());
                    shader.set_file_path(path);
                }
                None => return Err(Error::new("Shader file not found")),
            }
            self.script.add_shader(shader)?;
            return self.validate_end_of_statement("SHADER command");
        }

        if !token.is_eol() && !token.is_eos() {
            return Err(Error::new(format!(
                "extra parameters after SHADER command: {}",
                token_text(&token)
            )));
        }

        let data = self.tokenizer.extract_to_next("END");
        if data.is_empty() {
            return Err(Error::new("SHADER must not be empty"));
        }
        shader.set_data(data);

        let token = self.next();
        if !token.is_string() || token.as_string() != "END" {
            return Err(Error::new("SHADER missing END command"));
        }

        self.script.add_shader(shader)?;
        debug!("parsed shader {}", name);
        self.validate_end_of_statement("END")
    }

    //----------------------------------------------------------------------------------------------
    // BUFFER

    /// Resolves a `DATA_TYPE` name: scalar/vec/mat syntax, an image-format
    /// name, or a previously declared STRUCT.
    pub(crate) fn parse_data_type(&self, name: &str, layout: Layout) -> Result<Format> {
        match parse_type_name(name) {
            Ok(ty) => Ok(Format::from_type(ty, layout)),
            Err(type_err) => {
                if let Ok(mut fmt) = Format::from_name(name) {
                    fmt.set_layout(layout);
                    return Ok(fmt);
                }
                if let Some(ty) = self.script.get_type(name) {
                    return Ok(Format::from_type(ty.clone(), layout));
                }
                Err(type_err)
            }
        }
    }

    fn parse_buffer(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid BUFFER name provided"));
        }
        let name = token.as_string().to_owned();
        if name == "DATA_TYPE" || name == "FORMAT" {
            return Err(Error::new("missing BUFFER name"));
        }

        let mut buffer = Buffer::new(&name);

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid BUFFER command provided"));
        }
        match token.as_string() {
            "DATA_TYPE" => {
                self.parse_buffer_initializer(&mut buffer)?;
                self.script.add_buffer(buffer)?;
                Ok(())
            }
            "FORMAT" => {
                let token = self.next();
                if !token.is_string() {
                    return Err(Error::new("BUFFER FORMAT must be a string"));
                }
                let fmt = Format::from_name(token.as_string())
                    .map_err(|_| Error::new("invalid BUFFER FORMAT"))?;
                buffer.set_format(fmt);

                let token = self.next();
                if token.is_string() && token.as_string() == "MIP_LEVELS" {
                    let levels = self.next();
                    if !levels.is_integer() {
                        return Err(Error::new("invalid value for MIP_LEVELS"));
                    }
                    buffer.set_mip_levels(levels.as_u32());
                } else if token.is_string() {
                    // Trailing identifiers fall back to the top-level loop.
                    self.script.add_buffer(buffer)?;
                    return Err(Error::new(format!(
                        "unknown token: {}",
                        token.as_string()
                    )));
                }
                self.script.add_buffer(buffer)?;
                Ok(())
            }
            cmd => Err(Error::new(format!(
                "unknown BUFFER command provided: {}",
                cmd
            ))),
        }
    }

    fn parse_buffer_initializer(&mut self, buffer: &mut Buffer) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("BUFFER invalid data type"));
        }
        let type_name = token.as_string().to_owned();

        let mut token = self.next();
        let mut layout = Layout::Std430;
        if token.is_string() {
            match token.as_string() {
                "STD140" => {
                    layout = Layout::Std140;
                    token = self.next();
                }
                "STD430" => {
                    token = self.next();
                }
                _ => {}
            }
        }

        buffer.set_format(self.parse_data_type(&type_name, layout)?);

        if !token.is_string() {
            return Err(Error::new("BUFFER missing initializer"));
        }
        match token.as_string() {
            "DATA" => self.parse_buffer_data(buffer),
            "SIZE" => self.parse_buffer_size(buffer),
            _ => Err(Error::new("unknown initializer for BUFFER")),
        }
    }

    /// Reads the literal list of a `DATA ... END` block, promoting hex
    /// literals to the target type and rejecting floats for integer targets.
    pub(crate) fn parse_data_values(&mut self, is_float: bool) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        loop {
            let mut token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("missing BUFFER END command"));
            }
            if token.is_string() && token.as_string() == "END" {
                break;
            }
            if !token.is_integer() && !token.is_double() && !token.is_hex() {
                return Err(Error::new(format!(
                    "invalid BUFFER data value: {}",
                    token_text(&token)
                )));
            }
            if !is_float && token.is_double() {
                return Err(Error::new(format!(
                    "invalid BUFFER data value: {}",
                    token_text(&token)
                )));
            }

            let v = if is_float {
                if token.is_hex() {
                    Value::Double(token.as_hex() as f64)
                } else {
                    token.convert_to_double()?;
                    Value::Double(token.as_f64())
                }
            } else if token.is_hex() {
                Value::Integer(token.as_hex())
            } else {
                Value::Integer(token.as_u64())
            };
            values.push(v);
        }
        Ok(values)
    }

    fn parse_buffer_data(&mut self, buffer: &mut Buffer) -> Result<()> {
        let is_float = buffer.format().map(|f| f.is_float()).unwrap_or(false);
        let values = self.parse_data_values(is_float)?;
        buffer.set_data(values)?;
        self.validate_end_of_statement("BUFFER data command")
    }

    fn parse_buffer_size(&mut self, buffer: &mut Buffer) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("BUFFER size missing"));
        }
        if !token.is_integer() {
            return Err(Error::new("BUFFER size invalid"));
        }
        let size_in_items = token.as_u32();
        buffer.set_element_count(size_in_items);

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("BUFFER invalid initializer"));
        }
        match token.as_string() {
            "FILL" => self.parse_buffer_fill(buffer, size_in_items),
            "SERIES_FROM" => self.parse_buffer_series(buffer, size_in_items),
            _ => Err(Error::new("invalid BUFFER initializer provided")),
        }
    }

    fn parse_buffer_fill(&mut self, buffer: &mut Buffer, size_in_items: u32) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing BUFFER fill value"));
        }
        if !token.is_integer() && !token.is_double() {
            return Err(Error::new("invalid BUFFER fill value"));
        }

        let format = buffer.format().expect("buffer format set by initializer");
        let is_float = format.is_float();
        let count = (size_in_items * format.values_per_element()) as usize;

        let mut fill_token = token;
        let value = if is_float {
            fill_token.convert_to_double()?;
            Value::Double(fill_token.as_f64())
        } else {
            Value::Integer(fill_token.as_u64())
        };
        buffer.set_data(vec![value; count])?;
        self.validate_end_of_statement("BUFFER fill command")
    }

    fn parse_buffer_series(&mut self, buffer: &mut Buffer, size_in_items: u32) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing BUFFER series_from value"));
        }
        if !token.is_integer() && !token.is_double() {
            return Err(Error::new("invalid BUFFER series_from value"));
        }

        {
            let format = buffer.format().expect("buffer format set by initializer");
            let ty = format.ty();
            if ty.row_count() > 1 || ty.column_count() > 1 {
                return Err(Error::new(
                    "BUFFER series_from must not be multi-row/column types",
                ));
            }
        }
        let is_float = buffer.format().map(|f| f.is_float()).unwrap_or(false);

        let mut start = token;
        if is_float {
            start.convert_to_double()?;
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing BUFFER series_from inc_by"));
        }
        if token.as_string() != "INC_BY" {
            return Err(Error::new("BUFFER series_from invalid command"));
        }

        let mut inc = self.next();
        if inc.is_eol() || inc.is_eos() {
            return Err(Error::new("missing BUFFER series_from inc_by value"));
        }
        if !inc.is_integer() && !inc.is_double() {
            return Err(Error::new("invalid BUFFER series_from inc_by value"));
        }

        let mut values = Vec::with_capacity(size_in_items as usize);
        if is_float {
            inc.convert_to_double()?;
            let mut counter = start.as_f64();
            for _ in 0..size_in_items {
                values.push(Value::Double(counter));
                counter += inc.as_f64();
            }
        } else {
            let mut counter = start.as_u64();
            for _ in 0..size_in_items {
                values.push(Value::Integer(counter));
                counter = counter.wrapping_add(inc.as_u64());
            }
        }
        buffer.set_data(values)?;
        self.validate_end_of_statement("BUFFER series_from command")
    }

    //----------------------------------------------------------------------------------------------
    // IMAGE

    fn parse_image(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid IMAGE name provided"));
        }
        let name = token.as_string().to_owned();
        if name == "DATA_TYPE" || name == "FORMAT" {
            return Err(Error::new("missing IMAGE name"));
        }

        let mut buffer = Buffer::new(&name);
        buffer.set_image_dimension(ImageDimension::D2);

        let mut dimension = ImageDimension::D2;
        let mut width = 0u32;
        let mut height = 0u32;
        let mut depth = 0u32;
        let mut fill_value: Option<Value> = None;
        let mut data_values: Option<Vec<Value>> = None;

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                break;
            }
            match token.as_string() {
                "DATA_TYPE" => {
                    let ty = self.next();
                    if !ty.is_string() {
                        return Err(Error::new("invalid IMAGE data type"));
                    }
                    buffer.set_format(self.parse_data_type(ty.as_string(), Layout::Std430)?);
                }
                "FORMAT" => {
                    let fmt = self.next();
                    if !fmt.is_string() {
                        return Err(Error::new("invalid IMAGE FORMAT"));
                    }
                    let fmt = Format::from_name(fmt.as_string())
                        .map_err(|_| Error::new("invalid IMAGE FORMAT"))?;
                    buffer.set_format(fmt);
                }
                "MIP_LEVELS" => {
                    let levels = self.next();
                    if !levels.is_integer() {
                        return Err(Error::new("invalid value for MIP_LEVELS"));
                    }
                    buffer.set_mip_levels(levels.as_u32());
                }
                "DIM_1D" => dimension = ImageDimension::D1,
                "DIM_2D" => dimension = ImageDimension::D2,
                "DIM_3D" => dimension = ImageDimension::D3,
                "WIDTH" => {
                    let v = self.next();
                    if !v.is_integer() || v.as_u32() == 0 {
                        return Err(Error::new("expected positive IMAGE WIDTH"));
                    }
                    width = v.as_u32();
                }
                "HEIGHT" => {
                    let v = self.next();
                    if !v.is_integer() || v.as_u32() == 0 {
                        return Err(Error::new("expected positive IMAGE HEIGHT"));
                    }
                    height = v.as_u32();
                }
                "DEPTH" => {
                    let v = self.next();
                    if !v.is_integer() || v.as_u32() == 0 {
                        return Err(Error::new("expected positive IMAGE DEPTH"));
                    }
                    depth = v.as_u32();
                }
                "SAMPLES" => {
                    let v = self.next();
                    if !v.is_integer() {
                        return Err(Error::new("expected integer value for SAMPLES"));
                    }
                    if !is_valid_sample_count(v.as_u32()) {
                        return Err(Error::new(format!(
                            "invalid sample count: {}",
                            v.as_u32()
                        )));
                    }
                    buffer.set_samples(v.as_u32());
                }
                "FILL" => {
                    let v = self.next();
                    if !v.is_integer() && !v.is_double() {
                        return Err(Error::new("invalid IMAGE FILL value"));
                    }
                    let is_float = buffer.format().map(|f| f.is_float()).unwrap_or(false);
                    let mut v = v;
                    fill_value = Some(if is_float {
                        v.convert_to_double()?;
                        Value::Double(v.as_f64())
                    } else {
                        Value::Integer(v.as_u64())
                    });
                }
                "DATA" => {
                    let is_float = buffer.format().map(|f| f.is_float()).unwrap_or(false);
                    data_values = Some(self.parse_data_values(is_float)?);
                    break;
                }
                other => {
                    return Err(Error::new(format!(
                        "unknown IMAGE command provided: {}",
                        other
                    )));
                }
            }
        }

        if width == 0 {
            return Err(Error::new("expected IMAGE WIDTH"));
        }
        if (dimension == ImageDimension::D2 || dimension == ImageDimension::D3) && height == 0 {
            return Err(Error::new("expected IMAGE HEIGHT"));
        }
        if dimension == ImageDimension::D3 && depth == 0 {
            return Err(Error::new("expected IMAGE DEPTH"));
        }

        buffer.set_image_dimension(dimension);
        buffer.set_width(width);
        buffer.set_height(height.max(1));
        buffer.set_depth(depth.max(1));
        buffer.recalculate_element_count_from_extents();

        let expected = buffer.element_count();
        if let Some(values) = data_values {
            buffer.set_data(values)?;
            if buffer.element_count() != expected {
                return Err(Error::new(format!(
                    "Elements provided in data does not match size specified: {} specified vs {} provided",
                    expected,
                    buffer.element_count()
                )));
            }
            self.script.add_buffer(buffer)?;
            return self.validate_end_of_statement("IMAGE data command");
        } else if let Some(fill) = fill_value {
            let per_element = buffer
                .format()
                .map(|f| f.values_per_element())
                .unwrap_or(0);
            buffer.set_data(vec![fill; (expected * per_element) as usize])?;
        }

        self.script.add_buffer(buffer)?;
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    // SAMPLER

    fn parse_sampler(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid token when looking for sampler name"));
        }
        let mut sampler = Sampler::new(token.as_string());

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "unexpected sampler parameter {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "MAG_FILTER" => {
                    let v = self.next();
                    let filter = filter_from_token(&v)
                        .ok_or_else(|| value_error("MAG_FILTER", &v))?;
                    sampler.set_mag_filter(filter);
                }
                "MIN_FILTER" => {
                    let v = self.next();
                    let filter = filter_from_token(&v)
                        .ok_or_else(|| value_error("MIN_FILTER", &v))?;
                    sampler.set_min_filter(filter);
                }
                "ADDRESS_MODE_U" => {
                    let v = self.next();
                    let mode = address_mode_from_token(&v)
                        .ok_or_else(|| value_error("ADDRESS_MODE_U", &v))?;
                    sampler.set_address_mode_u(mode);
                }
                "ADDRESS_MODE_V" => {
                    let v = self.next();
                    let mode = address_mode_from_token(&v)
                        .ok_or_else(|| value_error("ADDRESS_MODE_V", &v))?;
                    sampler.set_address_mode_v(mode);
                }
                "ADDRESS_MODE_W" => {
                    let v = self.next();
                    let mode = address_mode_from_token(&v)
                        .ok_or_else(|| value_error("ADDRESS_MODE_W", &v))?;
                    sampler.set_address_mode_w(mode);
                }
                "BORDER_COLOR" => {
                    let v = self.next();
                    let color = border_color_from_token(&v)
                        .ok_or_else(|| value_error("BORDER_COLOR", &v))?;
                    sampler.set_border_color(color);
                }
                "MIN_LOD" => {
                    let mut v = self.next();
                    if v.convert_to_double().is_err() {
                        return Err(Error::new("invalid token when looking for MIN_LOD value"));
                    }
                    sampler.set_min_lod(v.as_f32());
                }
                "MAX_LOD" => {
                    let mut v = self.next();
                    if v.convert_to_double().is_err() {
                        return Err(Error::new("invalid token when looking for MAX_LOD value"));
                    }
                    sampler.set_max_lod(v.as_f32());
                }
                "NORMALIZED_COORDS" => sampler.set_normalized_coords(true),
                "UNNORMALIZED_COORDS" => sampler.set_normalized_coords(false),
                "COMPARE" => {
                    let v = self.next();
                    let enable = self
                        .parse_on_off(&v)
                        .ok_or_else(|| value_error("COMPARE", &v))?;
                    sampler.set_compare_enable(enable);
                }
                "COMPARE_OP" => {
                    let v = self.next();
                    let op = compare_op_from_token(&v)
                        .ok_or_else(|| value_error("COMPARE_OP", &v))?;
                    sampler.set_compare_op(op);
                }
                other => {
                    return Err(Error::new(format!(
                        "unexpected sampler parameter {}",
                        other
                    )));
                }
            }
        }

        sampler.validate()?;
        self.script.add_sampler(sampler)?;
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    // STRUCT

    fn parse_struct(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("invalid STRUCT name provided"));
        }
        let name = token.as_string().to_owned();
        if name == "STRIDE" {
            return Err(Error::new("missing STRUCT name"));
        }

        let mut stride = None;
        let token = self.next();
        if token.is_string() && token.as_string() == "STRIDE" {
            let v = self.next();
            if v.is_eol() || v.is_eos() {
                return Err(Error::new("missing value for STRIDE"));
            }
            if !v.is_integer() {
                return Err(Error::new("invalid value for STRIDE"));
            }
            if v.as_u32() == 0 {
                return Err(Error::new("STRIDE needs to be larger than zero"));
            }
            stride = Some(v.as_u32());
            let token = self.next();
            if !token.is_eol() && !token.is_eos() {
                return Err(Error::new(format!(
                    "extra token {} after STRUCT header",
                    token_text(&token)
                )));
            }
        } else if !token.is_eol() && !token.is_eos() {
            return Err(Error::new(format!(
                "extra token {} after STRUCT header",
                token_text(&token)
            )));
        }

        let mut s = StructType {
            members: Vec::new(),
            stride,
        };

        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if !token.is_string() {
                return Err(Error::new("invalid type for STRUCT member"));
            }
            let type_name = token.as_string().to_owned();
            if type_name == "END" {
                break;
            }

            if type_name == name {
                return Err(Error::new("recursive types are not allowed"));
            }
            let member_type = match parse_type_name(&type_name) {
                Ok(ty) => ty,
                Err(_) => match self.script.get_type(&type_name) {
                    Some(ty) => ty.clone(),
                    None => {
                        return Err(Error::new(format!(
                            "unknown type '{}' for STRUCT member",
                            type_name
                        )));
                    }
                },
            };

            let token = self.next();
            if token.is_eol() || token.is_eos() {
                return Err(Error::new("missing name for STRUCT member"));
            }
            if !token.is_string() {
                return Err(Error::new("invalid name for STRUCT member"));
            }
            let member_name = token.as_string().to_owned();
            if s.members.iter().any(|m| m.name == member_name) {
                return Err(Error::new("duplicate name for STRUCT member"));
            }

            let mut member = StructMember {
                name: member_name,
                ty: member_type,
                offset: None,
                array_stride: None,
                matrix_stride: None,
            };

            loop {
                let token = self.next();
                if token.is_eol() || token.is_eos() {
                    break;
                }
                if !token.is_string() {
                    return Err(Error::new("extra param for STRUCT member"));
                }
                match token.as_string() {
                    "OFFSET" => {
                        let v = self.next();
                        if v.is_eol() || v.is_eos() {
                            return Err(Error::new("missing value for STRUCT member OFFSET"));
                        }
                        if !v.is_integer() {
                            return Err(Error::new("invalid value for STRUCT member OFFSET"));
                        }
                        member.offset = Some(v.as_u32());
                    }
                    "ARRAY_STRIDE" => {
                        let v = self.next();
                        if v.is_eol() || v.is_eos() {
                            return Err(Error::new(
                                "missing value for STRUCT member ARRAY_STRIDE",
                            ));
                        }
                        if !v.is_integer() {
                            return Err(Error::new(
                                "invalid value for STRUCT member ARRAY_STRIDE",
                            ));
                        }
                        // Members are never arrays, so the override can only
                        // ever be misapplied.
                        return Err(Error::new("ARRAY_STRIDE only valid on array members"));
                    }
                    "MATRIX_STRIDE" => {
                        let v = self.next();
                        if v.is_eol() || v.is_eos() {
                            return Err(Error::new(
                                "missing value for STRUCT member MATRIX_STRIDE",
                            ));
                        }
                        if !v.is_integer() {
                            return Err(Error::new(
                                "invalid value for STRUCT member MATRIX_STRIDE",
                            ));
                        }
                        if !member.ty.is_matrix() {
                            return Err(Error::new("MATRIX_STRIDE only valid on matrix members"));
                        }
                        member.matrix_stride = Some(v.as_u32());
                    }
                    other => {
                        return Err(Error::new(format!(
                            "unknown param '{}' for STRUCT member",
                            other
                        )));
                    }
                }
            }

            s.members.push(member);
        }

        self.script.add_type(&name, Type::Struct(s))?;
        self.validate_end_of_statement("END")
    }

    //----------------------------------------------------------------------------------------------
    // VIRTUAL_FILE

    fn parse_virtual_file(&mut self) -> Result<()> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("expected virtual file path"));
        }
        let path = trim_quotes(token.as_string());

        let token = self.next();
        if !token.is_eol() {
            return Err(Error::new("extra parameters after VIRTUAL_FILE command"));
        }

        let content = self.tokenizer.extract_to_next("END");
        let token = self.next();
        if !token.is_string() || token.as_string() != "END" {
            return Err(Error::new("VIRTUAL_FILE missing END command"));
        }

        if path.is_empty() {
            return Err(Error::new("Virtual file path was empty"));
        }
        self.script.add_virtual_file(&path, content)?;
        self.validate_end_of_statement("END")
    }

    //----------------------------------------------------------------------------------------------
    // Device requirements

    fn parse_device_feature(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing feature name for DEVICE_FEATURE command"));
        }
        if !token.is_string() {
            return Err(Error::new("invalid feature name for DEVICE_FEATURE command"));
        }
        let name = token.as_string();
        if !KNOWN_FEATURES.contains(&name) {
            return Err(Error::new("unknown feature name for DEVICE_FEATURE command"));
        }
        self.script.add_required_feature(name);
        self.validate_end_of_statement("DEVICE_FEATURE command")
    }

    fn parse_device_property(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new(
                "missing property name for DEVICE_PROPERTY command",
            ));
        }
        if !token.is_string() {
            return Err(Error::new(
                "invalid property name for DEVICE_PROPERTY command",
            ));
        }
        let name = token.as_string();
        if !KNOWN_PROPERTIES.contains(&name) {
            return Err(Error::new(
                "unknown property name for DEVICE_PROPERTY command",
            ));
        }
        self.script.add_required_property(name);
        self.validate_end_of_statement("DEVICE_PROPERTY command")
    }

    fn parse_device_extension(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("DEVICE_EXTENSION missing name"));
        }
        if !token.is_string() {
            return Err(Error::new(format!(
                "DEVICE_EXTENSION invalid name: {}",
                token_text(&token)
            )));
        }
        self.script.add_required_device_extension(token.as_string());
        self.validate_end_of_statement("DEVICE_EXTENSION command")
    }

    fn parse_instance_extension(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("INSTANCE_EXTENSION missing name"));
        }
        if !token.is_string() {
            return Err(Error::new(format!(
                "INSTANCE_EXTENSION invalid name: {}",
                token_text(&token)
            )));
        }
        self.script
            .add_required_instance_extension(token.as_string());
        self.validate_end_of_statement("INSTANCE_EXTENSION command")
    }

    //----------------------------------------------------------------------------------------------
    // SET

    fn parse_set(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("SET missing ENGINE_DATA"));
        }
        if !token.is_string() {
            return Err(Error::new(format!(
                "SET invalid variable to set: {}",
                token_text(&token)
            )));
        }
        if token.as_string() != "ENGINE_DATA" {
            return Err(Error::new("SET missing ENGINE_DATA"));
        }

        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("SET missing variable to be set"));
        }
        if !token.is_string() {
            return Err(Error::new(format!(
                "SET invalid variable to set: {}",
                token_text(&token)
            )));
        }
        match token.as_string() {
            "fence_timeout_ms" => {
                let v = self.next();
                if v.is_eol() || v.is_eos() {
                    return Err(Error::new("SET missing value for fence_timeout_ms"));
                }
                if !v.is_integer() {
                    return Err(Error::new(
                        "SET invalid value for fence_timeout_ms, must be uint32",
                    ));
                }
                self.script.set_fence_timeout_ms(v.as_u32());
            }
            other => {
                return Err(Error::new(format!(
                    "SET unknown variable provided: {}",
                    other
                )));
            }
        }
        self.validate_end_of_statement("SET command")
    }
}

//--------------------------------------------------------------------------------------------------
// Small token-to-enum helpers

pub(crate) fn trim_quotes(s: &str) -> String {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].to_owned()
    } else {
        s.to_owned()
    }
}

fn value_error(keyword: &str, token: &Token) -> Error {
    Error::new(format!(
        "invalid {} value {}",
        keyword,
        token_text(token)
    ))
}

fn filter_from_token(token: &Token) -> Option<FilterType> {
    if !token.is_string() {
        return None;
    }
    FilterType::from_name(token.as_string())
}

fn address_mode_from_token(token: &Token) -> Option<AddressMode> {
    if !token.is_string() {
        return None;
    }
    AddressMode::from_name(token.as_string())
}

fn border_color_from_token(token: &Token) -> Option<BorderColor> {
    if !token.is_string() {
        return None;
    }
    BorderColor::from_name(token.as_string())
}

pub(crate) fn compare_op_from_token(token: &Token) -> Option<CompareOp> {
    if !token.is_string() {
        return None;
    }
    CompareOp::from_name(token.as_string())
}
