//! Commands recorded by RUN/CLEAR/COPY/EXPECT/REPEAT/DEBUG, replayed by the
//! execution backend in script order.

use crate::error::{Error, Result};
use crate::script::{BufferRef, PipelineRef};
use crate::types::Type;
use crate::value::Value;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
    LineListWithAdjacency,
    LineStripWithAdjacency,
    TriangleListWithAdjacency,
    TriangleStripWithAdjacency,
    PatchList,
}

impl Topology {
    pub fn from_name(name: &str) -> Result<Topology> {
        let topo = match name {
            "POINT_LIST" => Topology::PointList,
            "LINE_LIST" => Topology::LineList,
            "LINE_STRIP" => Topology::LineStrip,
            "TRIANGLE_LIST" => Topology::TriangleList,
            "TRIANGLE_STRIP" => Topology::TriangleStrip,
            "TRIANGLE_FAN" => Topology::TriangleFan,
            "LINE_LIST_WITH_ADJACENCY" => Topology::LineListWithAdjacency,
            "LINE_STRIP_WITH_ADJACENCY" => Topology::LineStripWithAdjacency,
            "TRIANGLE_LIST_WITH_ADJACENCY" => Topology::TriangleListWithAdjacency,
            "TRIANGLE_STRIP_WITH_ADJACENCY" => Topology::TriangleStripWithAdjacency,
            "PATCH_LIST" => Topology::PatchList,
            _ => {
                return Err(Error::new(format!(
                    "invalid topology for RUN command: {}",
                    name
                )));
            }
        };
        Ok(topo)
    }
}

/// One probe tolerance: absolute, or a percentage of full scale.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerance {
    pub value: f64,
    pub is_percent: bool,
}

/// Framebuffer probe recorded by `EXPECT <buffer> IDX ... EQ_RGB[A] ...`.
#[derive(Clone, Debug)]
pub struct ProbeCommand {
    pub buffer: BufferRef,
    pub is_rgba: bool,
    pub is_rect: bool,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    pub tolerances: Vec<Tolerance>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    FuzzyEqual,
    EqualBuffer,
    RmseBuffer,
}

/// Storage-buffer probe recorded by `EXPECT <buffer> IDX <offset> <op> ...`.
#[derive(Clone, Debug)]
pub struct ProbeSsboCommand {
    pub buffer: BufferRef,
    pub comparator: Comparator,
    pub offset: u32,
    pub ty: Type,
    pub values: Vec<Value>,
    pub other_buffer: Option<BufferRef>,
    pub tolerances: Vec<Tolerance>,
}

//--------------------------------------------------------------------------------------------------
// Debugger scripts

#[derive(Clone, Debug, PartialEq)]
pub enum ThreadSelector {
    GlobalInvocationId { x: u32, y: u32, z: u32 },
    VertexIndex(u32),
    FragmentWindowSpacePosition { x: u32, y: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LocalValue {
    Int(i64),
    Double(f64),
    Str(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DebugCommand {
    StepOver,
    StepIn,
    StepOut,
    Continue,
    ExpectLocation {
        file: String,
        line: u32,
        text: Option<String>,
    },
    ExpectCallstack,
    ExpectLocal {
        name: String,
        value: LocalValue,
    },
}

/// Per-thread breakpoints and expectations attached to a debugged command.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugScript {
    pub threads: Vec<ThreadScript>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThreadScript {
    pub selector: ThreadSelector,
    pub commands: Vec<DebugCommand>,
}

//--------------------------------------------------------------------------------------------------
// Commands

/// A recorded command. The backend pattern-matches; no behavior lives here.
#[derive(Clone, Debug)]
pub enum Command {
    Clear {
        pipeline: PipelineRef,
    },
    ClearColor {
        pipeline: PipelineRef,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    },
    ClearDepth {
        pipeline: PipelineRef,
        value: f32,
    },
    ClearStencil {
        pipeline: PipelineRef,
        value: u32,
    },
    Compute {
        pipeline: PipelineRef,
        x: u32,
        y: u32,
        z: u32,
        timed: bool,
        debug_script: Option<DebugScript>,
    },
    DrawRect {
        pipeline: PipelineRef,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        is_ortho: bool,
        is_patch: bool,
        timed: bool,
    },
    DrawGrid {
        pipeline: PipelineRef,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        columns: u32,
        rows: u32,
        timed: bool,
    },
    DrawArrays {
        pipeline: PipelineRef,
        topology: Topology,
        first_vertex: u32,
        vertex_count: u32,
        first_instance: u32,
        instance_count: u32,
        indexed: bool,
        timed: bool,
        debug_script: Option<DebugScript>,
    },
    TraceRays {
        pipeline: PipelineRef,
        raygen_sbt: String,
        miss_sbt: Option<String>,
        hit_sbt: Option<String>,
        call_sbt: Option<String>,
        x: u32,
        y: u32,
        z: u32,
        timed: bool,
    },
    Copy {
        src: BufferRef,
        dst: BufferRef,
    },
    Repeat {
        count: u32,
        commands: Vec<Command>,
    },
    Probe(ProbeCommand),
    ProbeSsbo(ProbeSsboCommand),
}

impl Command {
    pub fn is_compute(&self) -> bool {
        match self {
            Command::Compute { .. } => true,
            _ => false,
        }
    }

    pub fn is_draw_arrays(&self) -> bool {
        match self {
            Command::DrawArrays { .. } => true,
            _ => false,
        }
    }

    pub fn is_probe(&self) -> bool {
        match self {
            Command::Probe(_) => true,
            _ => false,
        }
    }

    pub fn is_probe_ssbo(&self) -> bool {
        match self {
            Command::ProbeSsbo(_) => true,
            _ => false,
        }
    }
}
