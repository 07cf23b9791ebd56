//! AmberScript front-end: tokenizer, parser, script object model and the
//! semantic validation that turns a script into a backend-ready
//! representation.
//!
//! The crate is strictly single-threaded and side-effect free: a parse is a
//! pure function of the source text plus the host-supplied
//! [`Options`](parser::Options) (virtual files). Execution engines consume
//! the resulting [`Script`] read-only and feed each shader through a
//! [`ShaderCompiler`](compiler::ShaderCompiler).
//!
//! ```
//! let script = amberscript::parse(
//!     "BUFFER buf DATA_TYPE uint8 SIZE 5 SERIES_FROM 2 INC_BY 1",
//! )
//! .unwrap();
//! assert_eq!(&[2, 3, 4, 5, 6], script.buffers()[0].bytes());
//! ```

pub mod acceleration_structure;
pub mod buffer;
pub mod command;
pub mod compiler;
mod error;
pub mod float16;
pub mod format;
pub mod parser;
pub mod pipeline;
pub mod sampler;
pub mod script;
pub mod shader;
pub mod tokenizer;
pub mod types;
pub mod value;

pub use self::acceleration_structure::{Blas, BlasInstance, Geometry, Tlas};
pub use self::buffer::{Buffer, BufferKind, ImageDimension};
pub use self::command::{Command, Comparator, ProbeCommand, ProbeSsboCommand, Topology};
pub use self::compiler::{DefaultShaderCompiler, ShaderCompiler, ShaderMap};
pub use self::error::{Error, Result};
pub use self::format::{Format, Layout};
pub use self::parser::{parse, parse_with_options, Options};
pub use self::pipeline::{Pipeline, PipelineKind};
pub use self::sampler::Sampler;
pub use self::script::{
    BufferRef, EngineData, PipelineRef, SamplerRef, Script, ShaderRef, TlasRef,
};
pub use self::shader::{Shader, ShaderFormat, ShaderKind};
pub use self::types::{FormatMode, StructMember, StructType, Type};
pub use self::value::Value;
