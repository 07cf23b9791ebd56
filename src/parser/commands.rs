//! RUN, CLEAR*, COPY, EXPECT, REPEAT and DEBUG directives.

use super::{token_text, trim_quotes, Parser};
use crate::command::{
    Command, Comparator, DebugCommand, DebugScript, LocalValue, ProbeCommand, ProbeSsboCommand,
    ThreadScript, ThreadSelector, Tolerance, Topology,
};
use crate::error::{Error, Result};
use crate::script::PipelineRef;
use crate::shader::ShaderKind;
use crate::tokenizer::Token;
use crate::value::Value;

impl Parser {
    //----------------------------------------------------------------------------------------------
    // RUN

    pub(crate) fn parse_run(&mut self) -> Result<()> {
        let (command, consumed_eol) = self.parse_run_command()?;
        self.script.add_command(command);
        if consumed_eol {
            Ok(())
        } else {
            self.validate_end_of_statement("RUN command")
        }
    }

    /// Parses the shared RUN grammar. The boolean reports whether the
    /// handler already consumed the statement's end-of-line.
    fn parse_run_command(&mut self) -> Result<(Command, bool)> {
        let mut token = self.next();
        let mut timed = false;
        if token.is_string() && token.as_string() == "TIMED_EXECUTION" {
            timed = true;
            token = self.next();
        }

        if !token.is_string() {
            return Err(Error::new("missing pipeline name for RUN command"));
        }
        let pipeline = match self.script.pipeline(token.as_string()) {
            Some(p) => p,
            None => {
                return Err(Error::new(format!(
                    "unknown pipeline for RUN command: {}",
                    token.as_string()
                )));
            }
        };

        let token = self.next();
        if token.is_eol() || token.is_eos() {
            if self.script.pipeline_at(pipeline).is_raytracing() {
                return Err(Error::new("Incomplete RUN command"));
            }
            return Err(Error::new("RUN command requires parameters"));
        }

        if self.script.pipeline_at(pipeline).is_raytracing() {
            return self.parse_run_raytracing(pipeline, timed, token);
        }


        if token.is_integer() {
            // Compute dispatch: RUN <pipeline> x y z.
            if !self.script.pipeline_at(pipeline).is_compute() {
                return Err(Error::new("RUN command requires compute pipeline"));
            }
            let x = token.as_u32();
            let y = self.parse_dispatch_dimension()?;
            let z = self.parse_dispatch_dimension()?;
            return Ok((
                Command::Compute {
                    pipeline,
                    x,
                    y,
                    z,
                    timed,
                    debug_script: None,
                },
                false,
            ));
        }

        if !token.is_string() {
            return Err(Error::new(format!(
                "invalid token in RUN command: {}",
                token_text(&token)
            )));
        }
        match token.as_string() {
            "DRAW_RECT" => Ok((self.parse_draw_rect(pipeline, timed)?, false)),
            "DRAW_GRID" => Ok((self.parse_draw_grid(pipeline, timed)?, false)),
            "DRAW_ARRAY" => Ok((self.parse_draw_array(pipeline, timed)?, true)),
            other => Err(Error::new(format!(
                "invalid token in RUN command: {}",
                other
            ))),
        }
    }

    fn parse_dispatch_dimension(&mut self) -> Result<u32> {
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new(format!(
                "invalid parameter for RUN command: {}",
                token_text(&token)
            )));
        }
        Ok(token.as_u32())
    }

    fn require_graphics(&self, pipeline: PipelineRef) -> Result<()> {
        if !self.script.pipeline_at(pipeline).is_graphics() {
            return Err(Error::new("RUN command requires graphics pipeline"));
        }
        Ok(())
    }

    /// Reads a float-valued position or size operand.
    fn parse_run_float(&mut self, message: &str) -> Result<f32> {
        let mut token = self.next();
        if token.convert_to_double().is_err() {
            return Err(Error::new(message));
        }
        Ok(token.as_f32())
    }

    fn expect_run_keyword(&mut self, keyword: &str) -> Result<()> {
        let token = self.next();
        if !token.is_string() || token.as_string() != keyword {
            return Err(Error::new(format!(
                "invalid token in RUN command: {}; expected {}",
                token_text(&token),
                keyword
            )));
        }
        Ok(())
    }

    fn parse_draw_rect(&mut self, pipeline: PipelineRef, timed: bool) -> Result<Command> {
        self.require_graphics(pipeline)?;

        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("RUN DRAW_RECT command requires parameters"));
        }
        if !token.is_string() || token.as_string() != "POS" {
            return Err(Error::new(format!(
                "invalid token in RUN command: {}; expected POS",
                token_text(&token)
            )));
        }
        let x = self.parse_run_float("missing X position for RUN command")?;
        let y = self.parse_run_float("missing Y position for RUN command")?;
        self.expect_run_keyword("SIZE")?;
        let width = self.parse_run_float("missing width value for RUN command")?;
        let height = self.parse_run_float("missing height value for RUN command")?;

        Ok(Command::DrawRect {
            pipeline,
            x,
            y,
            width,
            height,
            is_ortho: true,
            is_patch: false,
            timed,
        })
    }

    fn parse_draw_grid(&mut self, pipeline: PipelineRef, timed: bool) -> Result<Command> {
        self.require_graphics(pipeline)?;

        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("RUN DRAW_GRID command requires parameters"));
        }
        if !token.is_string() || token.as_string() != "POS" {
            return Err(Error::new(format!(
                "invalid token in RUN command: {}; expected POS",
                token_text(&token)
            )));
        }
        let x = self.parse_run_float("missing X position for RUN command")?;
        let y = self.parse_run_float("missing Y position for RUN command")?;
        self.expect_run_keyword("SIZE")?;
        let width = self.parse_run_float("missing width value for RUN command")?;
        let height = self.parse_run_float("missing height value for RUN command")?;
        self.expect_run_keyword("CELLS")?;

        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("missing columns value for RUN command"));
        }
        let columns = token.as_u32();
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("missing rows value for RUN command"));
        }
        let rows = token.as_u32();

        Ok(Command::DrawGrid {
            pipeline,
            x,
            y,
            width,
            height,
            columns,
            rows,
            timed,
        })
    }

    fn parse_draw_array(&mut self, pipeline: PipelineRef, timed: bool) -> Result<Command> {
        self.require_graphics(pipeline)?;
        if self.script.pipeline_at(pipeline).vertex_buffers.is_empty() {
            return Err(Error::new("RUN DRAW_ARRAY requires attached vertex buffer"));
        }

        self.expect_run_keyword("AS")?;
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing topology for RUN command"));
        }
        let topology = Topology::from_name(token.as_string())?;

        let mut indexed = false;
        let mut first_vertex = 0u32;
        let mut vertex_count: Option<u32> = None;
        let mut first_instance = 0u32;
        let mut instance_count: Option<u32> = None;

        loop {
            let token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "extra parameters after RUN command: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "INDEXED" => {
                    if self.script.pipeline_at(pipeline).index_buffer.is_none() {
                        return Err(Error::new(
                            "RUN DRAW_ARRAY INDEXED requires attached index buffer",
                        ));
                    }
                    indexed = true;
                }
                "INSTANCED" => {}
                "START_IDX" => {
                    let v = self.next();
                    if !v.is_integer() || v.is_negative() {
                        return Err(Error::new("invalid START_IDX value for RUN command"));
                    }
                    first_vertex = v.as_u32();
                }
                "COUNT" => {
                    let v = self.next();
                    if !v.is_integer() || v.is_negative() {
                        return Err(Error::new("invalid COUNT value for RUN command"));
                    }
                    vertex_count = Some(v.as_u32());
                }
                "START_INSTANCE" => {
                    let v = self.next();
                    if !v.is_integer() || v.is_negative() {
                        return Err(Error::new("invalid START_INSTANCE value for RUN command"));
                    }
                    first_instance = v.as_u32();
                }
                "INSTANCE_COUNT" => {
                    let v = self.next();
                    if !v.is_integer() || v.is_negative() {
                        return Err(Error::new("invalid INSTANCE_COUNT value for RUN command"));
                    }
                    instance_count = Some(v.as_u32());
                }
                other => {
                    return Err(Error::new(format!(
                        "extra parameters after RUN command: {}",
                        other
                    )));
                }
            }
        }

        let buffer = self.script.pipeline_at(pipeline).vertex_buffers[0].buffer;
        let available = self.script.buffer_at(buffer).element_count();
        let vertex_count = match vertex_count {
            Some(count) => count,
            None => available.saturating_sub(first_vertex),
        };
        if !indexed && first_vertex + vertex_count > available {
            return Err(Error::new(
                "START_IDX plus COUNT is larger than the number of items in vertex buffer",
            ));
        }

        Ok(Command::DrawArrays {
            pipeline,
            topology,
            first_vertex,
            vertex_count,
            first_instance,
            instance_count: instance_count.unwrap_or(1),
            indexed,
            timed,
            debug_script: None,
        })
    }

    fn parse_run_raytracing(
        &mut self,
        pipeline: PipelineRef,
        timed: bool,
        first: Token,
    ) -> Result<(Command, bool)> {
        let mut raygen: Option<String> = None;
        let mut miss: Option<String> = None;
        let mut hit: Option<String> = None;
        let mut call: Option<String> = None;
        let mut dims = (1u32, 1u32, 1u32);
        let mut consumed_eol = false;

        let mut token = first;
        loop {
            if token.is_eol() || token.is_eos() {
                consumed_eol = true;
                break;
            }
            if token.is_integer() {
                dims.0 = token.as_u32();
                dims.1 = self.parse_dispatch_dimension()?;
                dims.2 = self.parse_dispatch_dimension()?;
                break;
            }
            if !token.is_string() {
                return Err(Error::new("Shader binding table type is expected"));
            }
            let slot = match token.as_string() {
                "RAYGEN" => &mut raygen,
                "MISS" => &mut miss,
                "HIT" => &mut hit,
                "CALL" => &mut call,
                other => {
                    if raygen.is_none() && miss.is_none() && hit.is_none() && call.is_none() {
                        return Err(Error::new("Unknown shader binding table type"));
                    }
                    return Err(Error::new(format!(
                        "invalid parameter for RUN command: {}",
                        other
                    )));
                }
            };
            let kind = token.as_string().to_owned();
            if slot.is_some() {
                return Err(Error::new(format!(
                    "{} shader binding table can specified only once",
                    kind
                )));
            }

            let name = self.next();
            if !name.is_string() {
                return Err(Error::new("Shader binding table name expected"));
            }
            if self
                .script
                .pipeline_at(pipeline)
                .shader_binding_table(name.as_string())
                .is_none()
            {
                return Err(Error::new(
                    "Shader binding table with this name was not defined",
                ));
            }
            *slot = Some(name.as_string().to_owned());

            token = self.next();
        }

        let raygen = raygen
            .ok_or_else(|| Error::new("RUN command requires a RAYGEN shader binding table"))?;
        Ok((
            Command::TraceRays {
                pipeline,
                raygen_sbt: raygen,
                miss_sbt: miss,
                hit_sbt: hit,
                call_sbt: call,
                x: dims.0,
                y: dims.1,
                z: dims.2,
                timed,
            },
            consumed_eol,
        ))
    }

    //----------------------------------------------------------------------------------------------
    // CLEAR family

    fn parse_clear_pipeline(&mut self, command: &str) -> Result<PipelineRef> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new(format!(
                "missing pipeline name for {} command",
                command
            )));
        }
        let pipeline = match self.script.pipeline(token.as_string()) {
            Some(p) => p,
            None => {
                return Err(Error::new(format!(
                    "unknown pipeline for {} command: {}",
                    command,
                    token.as_string()
                )));
            }
        };
        if !self.script.pipeline_at(pipeline).is_graphics() {
            return Err(Error::new(format!(
                "{} command requires graphics pipeline",
                command
            )));
        }
        Ok(pipeline)
    }

    pub(crate) fn parse_clear(&mut self) -> Result<()> {
        let pipeline = self.parse_clear_pipeline("CLEAR")?;
        self.script.add_command(Command::Clear { pipeline });
        self.validate_end_of_statement("CLEAR command")
    }

    /// Reads one 0-255 color component for CLEAR_COLOR.
    fn parse_color_component(&mut self, channel: char) -> Result<f32> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new(format!(
                "missing {} value for CLEAR_COLOR command",
                channel
            )));
        }
        let invalid = || {
            Error::new(format!(
                "invalid {} value for CLEAR_COLOR command: {}",
                channel,
                token_text(&token)
            ))
        };
        if !token.is_integer() || token.is_negative() || token.as_u64() > 255 {
            return Err(invalid());
        }
        Ok(token.as_u32() as f32 / 255.0)
    }

    pub(crate) fn parse_clear_color(&mut self) -> Result<()> {
        let pipeline = self.parse_clear_pipeline("CLEAR_COLOR")?;
        let r = self.parse_color_component('R')?;
        let g = self.parse_color_component('G')?;
        let b = self.parse_color_component('B')?;
        let a = self.parse_color_component('A')?;
        self.script
            .add_command(Command::ClearColor { pipeline, r, g, b, a });
        self.validate_end_of_statement("CLEAR_COLOR command")
    }

    pub(crate) fn parse_clear_depth(&mut self) -> Result<()> {
        let pipeline = self.parse_clear_pipeline("CLEAR_DEPTH")?;
        let mut token = self.next();
        if token.convert_to_double().is_err() {
            return Err(Error::new("invalid depth value for CLEAR_DEPTH command"));
        }
        self.script.add_command(Command::ClearDepth {
            pipeline,
            value: token.as_f32(),
        });
        self.validate_end_of_statement("CLEAR_DEPTH command")
    }

    pub(crate) fn parse_clear_stencil(&mut self) -> Result<()> {
        let pipeline = self.parse_clear_pipeline("CLEAR_STENCIL")?;
        let token = self.next();
        if !token.is_integer() || token.is_negative() || token.as_u64() > 255 {
            return Err(Error::new(
                "invalid stencil value for CLEAR_STENCIL command",
            ));
        }
        self.script.add_command(Command::ClearStencil {
            pipeline,
            value: token.as_u32(),
        });
        self.validate_end_of_statement("CLEAR_STENCIL command")
    }

    //----------------------------------------------------------------------------------------------
    // COPY

    pub(crate) fn parse_copy(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing buffer name after COPY"));
        }
        if !token.is_string() {
            return Err(Error::new("invalid buffer name after COPY"));
        }
        if token.as_string() == "TO" {
            return Err(Error::new("missing buffer name after COPY"));
        }
        let src = match self.script.buffer(token.as_string()) {
            Some(b) => b,
            None => return Err(Error::new("COPY origin buffer was not declared")),
        };

        let token = self.next();
        if !token.is_string() || token.as_string() != "TO" {
            return Err(Error::new("expected 'TO' after COPY and buffer name"));
        }

        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("missing buffer name after TO"));
        }
        let dst = match self.script.buffer(token.as_string()) {
            Some(b) => b,
            None => return Err(Error::new("COPY destination buffer was not declared")),
        };

        if src == dst {
            return Err(Error::new("COPY origin and destination buffers are identical"));
        }

        self.script.add_command(Command::Copy { src, dst });
        self.validate_end_of_statement("COPY command")
    }

    //----------------------------------------------------------------------------------------------
    // EXPECT

    pub(crate) fn parse_expect(&mut self) -> Result<()> {
        let token = self.next();
        let buffer = if token.is_string() {
            self.script.buffer(token.as_string())
        } else {
            None
        };
        let buffer = match buffer {
            Some(b) => b,
            None => return Err(Error::new("unknown buffer name for EXPECT command")),
        };

        let token = self.next();
        if token.is_string() && token.as_string() == "EQ_BUFFER" {
            return self.parse_expect_buffer(buffer, Comparator::EqualBuffer);
        }
        if token.is_string() && token.as_string() == "RMSE_BUFFER" {
            return self.parse_expect_buffer(buffer, Comparator::RmseBuffer);
        }
        if !token.is_string() || token.as_string() != "IDX" {
            return Err(Error::new("missing IDX in EXPECT command"));
        }

        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new("invalid X value in EXPECT command"));
        }
        let x = token.as_u32();

        let token = self.next();
        if token.is_integer() {
            return self.parse_expect_framebuffer(buffer, x, token.as_u32());
        }
        if token.is_string() {
            match token.as_string() {
                "SIZE" | "EQ_RGB" | "EQ_RGBA" => {
                    return Err(Error::new("invalid Y value in EXPECT command"));
                }
                "EQ" | "NE" | "LT" | "LE" | "GT" | "GE" | "TOLERANCE" => {
                    return self.parse_expect_ssbo(buffer, x, token);
                }
                other => {
                    return Err(Error::new(format!(
                        "unexpected token in EXPECT command: {}",
                        other
                    )));
                }
            }
        }
        Err(Error::new("invalid Y value in EXPECT command"))
    }

    /// Reads one 0-255 probe color component, normalized to [0, 1].
    fn parse_probe_component(&mut self, channel: char) -> Result<f32> {
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new(format!(
                "invalid {} value in EXPECT command",
                channel
            )));
        }
        Ok(token.as_u32() as f32 / 255.0)
    }

    /// Reads a `TOLERANCE` value list: one to four numbers, each optionally
    /// suffixed with `%`. Returns the lookahead token.
    fn parse_tolerances(&mut self) -> Result<(Vec<Tolerance>, Token)> {
        let mut tolerances = Vec::new();
        let mut token = self.next();
        loop {
            if !token.is_integer() && !token.is_double() {
                break;
            }
            let mut num = token;
            num.convert_to_double()?;
            let value = num.as_f64();
            token = self.next();
            if token.is_string() && token.as_string() == "%" {
                tolerances.push(Tolerance {
                    value,
                    is_percent: true,
                });
                token = self.next();
            } else {
                tolerances.push(Tolerance {
                    value,
                    is_percent: false,
                });
            }
        }
        if tolerances.is_empty() || tolerances.len() > 4 {
            return Err(Error::new(
                "TOLERANCE expects one to four values in EXPECT command",
            ));
        }
        Ok((tolerances, token))
    }

    fn parse_expect_framebuffer(&mut self, buffer: crate::script::BufferRef, x: u32, y: u32) -> Result<()> {
        let mut is_rect = false;
        let mut width = 1u32;
        let mut height = 1u32;

        let mut token = self.next();
        if token.is_string() && token.as_string() == "SIZE" {
            is_rect = true;
            let v = self.next();
            if !v.is_integer() {
                return Err(Error::new("invalid width in EXPECT command"));
            }
            width = v.as_u32();
            let v = self.next();
            if !v.is_integer() {
                return Err(Error::new("invalid height in EXPECT command"));
            }
            height = v.as_u32();
            token = self.next();
        }

        let is_rgba = if token.is_string() {
            match token.as_string() {
                "EQ_RGB" => false,
                "EQ_RGBA" => true,
                other => {
                    return Err(Error::new(format!(
                        "unknown comparator type in EXPECT: {}",
                        other
                    )));
                }
            }
        } else if token.is_integer() {
            return Err(Error::new(format!(
                "unexpected token in EXPECT command: {}",
                token_text(&token)
            )));
        } else {
            return Err(Error::new("missing comparator in EXPECT command"));
        };

        let r = self.parse_probe_component('R')?;
        let g = self.parse_probe_component('G')?;
        let b = self.parse_probe_component('B')?;
        let a = if is_rgba {
            self.parse_probe_component('A')?
        } else {
            1.0
        };

        let mut tolerances = Vec::new();
        let token = self.next();
        if token.is_string() && token.as_string() == "TOLERANCE" {
            let (values, next) = self.parse_tolerances()?;
            tolerances = values;
            if !next.is_eol() && !next.is_eos() {
                return Err(Error::new("extra parameters after EXPECT command"));
            }
        } else if !token.is_eol() && !token.is_eos() {
            return Err(Error::new("extra parameters after EXPECT command"));
        }

        self.script.add_command(Command::Probe(ProbeCommand {
            buffer,
            is_rgba,
            is_rect,
            x,
            y,
            width,
            height,
            r,
            g,
            b,
            a,
            tolerances,
        }));
        Ok(())
    }

    fn parse_expect_ssbo(
        &mut self,
        buffer: crate::script::BufferRef,
        offset: u32,
        comparator_token: Token,
    ) -> Result<()> {
        let mut tolerances = Vec::new();
        let mut comparator_token = comparator_token;
        if comparator_token.as_string() == "TOLERANCE" {
            let (values, next) = self.parse_tolerances()?;
            tolerances = values;
            if !next.is_string() {
                return Err(Error::new("missing comparator in EXPECT command"));
            }
            comparator_token = next;
        }

        let comparator = match comparator_token.as_string() {
            "EQ" => {
                if tolerances.is_empty() {
                    Comparator::Equal
                } else {
                    Comparator::FuzzyEqual
                }
            }
            "NE" => Comparator::NotEqual,
            "LT" => Comparator::Less,
            "LE" => Comparator::LessOrEqual,
            "GT" => Comparator::Greater,
            "GE" => Comparator::GreaterOrEqual,
            other => {
                return Err(Error::new(format!(
                    "unknown comparator type in EXPECT: {}",
                    other
                )));
            }
        };
        if !tolerances.is_empty() && comparator != Comparator::FuzzyEqual {
            return Err(Error::new("TOLERANCE only available with EQ probes"));
        }

        let is_float = self
            .script
            .buffer_at(buffer)
            .format()
            .map(|f| f.is_float())
            .unwrap_or(false);
        let ty = self
            .script
            .buffer_at(buffer)
            .format()
            .map(|f| f.ty().clone())
            .unwrap_or_else(|| crate::types::Type::scalar(crate::types::FormatMode::UInt, 32));

        let mut values = Vec::new();
        loop {
            let mut token = self.next();
            if token.is_eol() || token.is_eos() {
                break;
            }
            if token.is_hex() {
                if is_float {
                    values.push(Value::Double(token.as_hex() as f64));
                } else {
                    values.push(Value::Integer(token.as_hex()));
                }
                continue;
            }
            if !token.is_integer() && !token.is_double() {
                return Err(Error::new(format!(
                    "Invalid value provided to EXPECT command: {}",
                    token_text(&token)
                )));
            }
            if is_float {
                token.convert_to_double()?;
                values.push(Value::Double(token.as_f64()));
            } else {
                if token.is_double() {
                    return Err(Error::new(format!(
                        "Invalid value provided to EXPECT command: {}",
                        token_text(&token)
                    )));
                }
                values.push(Value::Integer(token.as_u64()));
            }
        }
        if values.is_empty() {
            return Err(Error::new("missing comparison values for EXPECT command"));
        }

        self.script.add_command(Command::ProbeSsbo(ProbeSsboCommand {
            buffer,
            comparator,
            offset,
            ty,
            values,
            other_buffer: None,
            tolerances,
        }));
        Ok(())
    }

    fn parse_expect_buffer(
        &mut self,
        buffer: crate::script::BufferRef,
        comparator: Comparator,
    ) -> Result<()> {
        let token = self.next();
        let other = if token.is_string() {
            self.script.buffer(token.as_string())
        } else {
            None
        };
        let other = match other {
            Some(b) => b,
            None => return Err(Error::new("unknown buffer name for EXPECT command")),
        };

        let mut tolerances = Vec::new();
        let token = self.next();
        if token.is_string() && token.as_string() == "TOLERANCE" {
            let (values, next) = self.parse_tolerances()?;
            tolerances = values;
            if !next.is_eol() && !next.is_eos() {
                return Err(Error::new("extra parameters after EXPECT command"));
            }
        } else if !token.is_eol() && !token.is_eos() {
            return Err(Error::new("extra parameters after EXPECT command"));
        }

        let ty = self
            .script
            .buffer_at(buffer)
            .format()
            .map(|f| f.ty().clone())
            .unwrap_or_else(|| crate::types::Type::scalar(crate::types::FormatMode::UInt, 32));

        self.script.add_command(Command::ProbeSsbo(ProbeSsboCommand {
            buffer,
            comparator,
            offset: 0,
            ty,
            values: Vec::new(),
            other_buffer: Some(other),
            tolerances,
        }));
        Ok(())
    }

    //----------------------------------------------------------------------------------------------
    // REPEAT

    pub(crate) fn parse_repeat(&mut self) -> Result<()> {
        let token = self.next();
        if token.is_eol() || token.is_eos() {
            return Err(Error::new("missing count parameter for REPEAT command"));
        }
        if !token.is_integer() {
            return Err(Error::new(format!(
                "invalid count parameter for REPEAT command: {}",
                token_text(&token)
            )));
        }
        if token.is_negative() || token.as_i64() <= 0 {
            return Err(Error::new("count parameter must be > 0 for REPEAT command"));
        }
        let count = token.as_u32();

        // Inner commands are collected from the script's tail once the block
        // closes; nesting re-enters this same handler.
        let start = self.script.commands().len();
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("missing END for REPEAT command"));
            }
            if !token.is_string() {
                return Err(Error::new("expected string"));
            }
            let tok = token.as_string().to_owned();
            if tok == "END" {
                break;
            }
            match tok.as_str() {
                "RUN" => self.parse_run()?,
                "CLEAR" => self.parse_clear()?,
                "CLEAR_COLOR" => self.parse_clear_color()?,
                "CLEAR_DEPTH" => self.parse_clear_depth()?,
                "CLEAR_STENCIL" => self.parse_clear_stencil()?,
                "COPY" => self.parse_copy()?,
                "EXPECT" => self.parse_expect()?,
                "DEBUG" => self.parse_debug()?,
                "REPEAT" => self.parse_repeat()?,
                _ => return Err(Error::new(format!("unknown token: {}", tok))),
            }
        }

        let commands = self.script.take_commands_from(start);
        self.script
            .add_command(Command::Repeat { count, commands });
        self.validate_end_of_statement("REPEAT command")
    }

    //----------------------------------------------------------------------------------------------
    // DEBUG

    pub(crate) fn parse_debug(&mut self) -> Result<()> {
        let (mut command, consumed_eol) = self.parse_run_command()?;
        if !consumed_eol {
            let token = self.next();
            if !token.is_eol() {
                return Err(Error::new("extra parameters after DEBUG command"));
            }
        }

        let debug = self.parse_debug_script()?;

        let (pipeline, debugged_kinds) = match &mut command {
            Command::Compute { pipeline, debug_script, .. } => {
                *debug_script = Some(debug.clone());
                (*pipeline, debugged_stage_kinds(&debug, true))
            }
            Command::DrawArrays { pipeline, debug_script, .. } => {
                *debug_script = Some(debug.clone());
                (*pipeline, debugged_stage_kinds(&debug, false))
            }
            _ => {
                return Err(Error::new(
                    "DEBUG requires a compute dispatch or draw command",
                ));
            }
        };

        for kind in debugged_kinds {
            let pipeline = self.script.pipeline_at_mut(pipeline);
            if let Some(info) = pipeline.shaders.iter_mut().find(|s| s.kind == kind) {
                info.emit_debug_info = true;
            }
        }

        self.script.add_command(command);
        self.validate_end_of_statement("DEBUG command")
    }

    fn parse_debug_script(&mut self) -> Result<DebugScript> {
        let mut script = DebugScript::default();
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("DEBUG missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "Unknown token: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "END" => break,
                "THREAD" => script.threads.push(self.parse_debug_thread()?),
                other => {
                    return Err(Error::new(format!("Unknown token: {}", other)));
                }
            }
        }
        Ok(script)
    }

    fn parse_debug_thread(&mut self) -> Result<ThreadScript> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("expected thread selector for THREAD command"));
        }
        let selector = match token.as_string() {
            "GLOBAL_INVOCATION_ID" => {
                let x = self.parse_debug_integer("GLOBAL_INVOCATION_ID")?;
                let y = self.parse_debug_integer("GLOBAL_INVOCATION_ID")?;
                let z = self.parse_debug_integer("GLOBAL_INVOCATION_ID")?;
                ThreadSelector::GlobalInvocationId { x, y, z }
            }
            "VERTEX_INDEX" => {
                ThreadSelector::VertexIndex(self.parse_debug_integer("VERTEX_INDEX")?)
            }
            "FRAGMENT_WINDOW_SPACE_POSITION" => {
                let x = self.parse_debug_integer("FRAGMENT_WINDOW_SPACE_POSITION")?;
                let y = self.parse_debug_integer("FRAGMENT_WINDOW_SPACE_POSITION")?;
                ThreadSelector::FragmentWindowSpacePosition { x, y }
            }
            other => {
                return Err(Error::new(format!("Unknown token: {}", other)));
            }
        };

        let mut commands = Vec::new();
        loop {
            let token = self.next();
            if token.is_eol() {
                continue;
            }
            if token.is_eos() {
                return Err(Error::new("THREAD missing END command"));
            }
            if !token.is_string() {
                return Err(Error::new(format!(
                    "Unknown token: {}",
                    token_text(&token)
                )));
            }
            match token.as_string() {
                "END" => break,
                "STEP_IN" => commands.push(DebugCommand::StepIn),
                "STEP_OUT" => commands.push(DebugCommand::StepOut),
                "STEP_OVER" => commands.push(DebugCommand::StepOver),
                "CONTINUE" => commands.push(DebugCommand::Continue),
                "EXPECT" => commands.push(self.parse_debug_expect()?),
                other => {
                    return Err(Error::new(format!("Unknown token: {}", other)));
                }
            }
        }

        Ok(ThreadScript { selector, commands })
    }

    fn parse_debug_integer(&mut self, command: &str) -> Result<u32> {
        let token = self.next();
        if !token.is_integer() {
            return Err(Error::new(format!(
                "expected integer value for {}",
                command
            )));
        }
        Ok(token.as_u32())
    }

    fn parse_debug_expect(&mut self) -> Result<DebugCommand> {
        let token = self.next();
        if !token.is_string() {
            return Err(Error::new("expected LOCATION, CALLSTACK or LOCAL"));
        }
        match token.as_string() {
            "CALLSTACK" => Ok(DebugCommand::ExpectCallstack),
            "LOCATION" => {
                let file = self.next();
                if !file.is_string() {
                    return Err(Error::new("expected file name for EXPECT LOCATION"));
                }
                let file = trim_quotes(file.as_string());
                let line = self.parse_debug_integer("EXPECT LOCATION")?;
                // The optional line text is captured verbatim so embedded
                // spacing survives.
                let rest = self.tokenizer.extract_to_next("\n");
                let rest = rest.trim();
                let text = if rest.is_empty() {
                    None
                } else {
                    Some(trim_quotes(rest))
                };
                Ok(DebugCommand::ExpectLocation { file, line, text })
            }
            "LOCAL" => {
                let name = self.next();
                if !name.is_string() {
                    return Err(Error::new("expected variable name for EXPECT LOCAL"));
                }
                let name = trim_quotes(name.as_string());
                let token = self.next();
                if !token.is_string() || token.as_string() != "EQ" {
                    return Err(Error::new("expected EQ in EXPECT LOCAL"));
                }
                let token = self.next();
                let value = if token.is_integer() {
                    LocalValue::Int(token.as_i64())
                } else if token.is_double() {
                    LocalValue::Double(token.as_f64())
                } else if token.is_string() {
                    LocalValue::Str(trim_quotes(token.as_string()))
                } else {
                    return Err(Error::new("expected value for EXPECT LOCAL"));
                };
                Ok(DebugCommand::ExpectLocal { name, value })
            }
            other => Err(Error::new(format!("Unknown token: {}", other))),
        }
    }
}

/// Stages whose shaders get debug info when a thread script addresses them.
fn debugged_stage_kinds(script: &DebugScript, is_compute: bool) -> Vec<ShaderKind> {
    let mut kinds = Vec::new();
    for thread in &script.threads {
        let kind = if is_compute {
            ShaderKind::Compute
        } else {
            match thread.selector {
                ThreadSelector::VertexIndex(_) => ShaderKind::Vertex,
                ThreadSelector::FragmentWindowSpacePosition { .. } => ShaderKind::Fragment,
                ThreadSelector::GlobalInvocationId { .. } => ShaderKind::Compute,
            }
        };
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}
