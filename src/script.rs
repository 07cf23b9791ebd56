//! The script aggregate: every entity a parsed script owns, with
//! name-indexed lookup.
//!
//! Entities live in per-kind vectors and refer to each other through typed
//! index handles, so the whole aggregate forms a DAG without shared
//! ownership; consumers treat the finished script as immutable.

use fxhash::FxHashMap;

use crate::acceleration_structure::{Blas, Tlas};
use crate::buffer::Buffer;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::pipeline::Pipeline;
use crate::sampler::Sampler;
use crate::shader::Shader;
use crate::types::Type;

macro_rules! entity_handle {
    ($name:ident) => {
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub struct $name(pub usize);
    };
}

entity_handle!(ShaderRef);
entity_handle!(BufferRef);
entity_handle!(SamplerRef);
entity_handle!(PipelineRef);
entity_handle!(BlasRef);
entity_handle!(TlasRef);

/// Engine tunables settable from the script with `SET ENGINE_DATA`.
#[derive(Clone, Debug)]
pub struct EngineData {
    pub fence_timeout_ms: u32,
}

impl Default for EngineData {
    fn default() -> EngineData {
        EngineData {
            fence_timeout_ms: 1000,
        }
    }
}

/// Result of a successful parse; read-only for consumers.
#[derive(Default, Debug)]
pub struct Script {
    shaders: Vec<Shader>,
    shader_names: FxHashMap<String, ShaderRef>,
    buffers: Vec<Buffer>,
    buffer_names: FxHashMap<String, BufferRef>,
    samplers: Vec<Sampler>,
    sampler_names: FxHashMap<String, SamplerRef>,
    pipelines: Vec<Pipeline>,
    pipeline_names: FxHashMap<String, PipelineRef>,
    types: Vec<(String, Type)>,
    type_names: FxHashMap<String, usize>,
    blases: Vec<Blas>,
    blas_names: FxHashMap<String, BlasRef>,
    tlases: Vec<Tlas>,
    tlas_names: FxHashMap<String, TlasRef>,
    commands: Vec<Command>,
    required_features: Vec<String>,
    required_properties: Vec<String>,
    required_device_extensions: Vec<String>,
    required_instance_extensions: Vec<String>,
    engine_data: EngineData,
    virtual_files: FxHashMap<String, String>,
}

impl Script {
    pub fn new() -> Script {
        Script::default()
    }

    //----------------------------------------------------------------------------------------------
    // Shaders

    pub fn add_shader(&mut self, shader: Shader) -> Result<ShaderRef> {
        if self.shader_names.contains_key(shader.name()) {
            return Err(Error::new("duplicate shader name provided"));
        }
        let handle = ShaderRef(self.shaders.len());
        self.shader_names.insert(shader.name().to_owned(), handle);
        self.shaders.push(shader);
        Ok(handle)
    }

    pub fn shader(&self, name: &str) -> Option<ShaderRef> {
        self.shader_names.get(name).copied()
    }

    pub fn shaders(&self) -> &[Shader] {
        &self.shaders
    }

    pub fn shader_at(&self, handle: ShaderRef) -> &Shader {
        &self.shaders[handle.0]
    }

    //----------------------------------------------------------------------------------------------
    // Buffers

    pub fn add_buffer(&mut self, buffer: Buffer) -> Result<BufferRef> {
        if self.buffer_names.contains_key(buffer.name()) {
            return Err(Error::new("duplicate buffer name provided"));
        }
        let handle = BufferRef(self.buffers.len());
        self.buffer_names.insert(buffer.name().to_owned(), handle);
        self.buffers.push(buffer);
        Ok(handle)
    }

    pub fn buffer(&self, name: &str) -> Option<BufferRef> {
        self.buffer_names.get(name).copied()
    }

    pub fn buffers(&self) -> &[Buffer] {
        &self.buffers
    }

    pub fn buffer_at(&self, handle: BufferRef) -> &Buffer {
        &self.buffers[handle.0]
    }

    pub fn buffer_at_mut(&mut self, handle: BufferRef) -> &mut Buffer {
        &mut self.buffers[handle.0]
    }

    //----------------------------------------------------------------------------------------------
    // Samplers

    pub fn add_sampler(&mut self, sampler: Sampler) -> Result<SamplerRef> {
        if self.sampler_names.contains_key(sampler.name()) {
            return Err(Error::new("duplicate sampler name provided"));
        }
        let handle = SamplerRef(self.samplers.len());
        self.sampler_names.insert(sampler.name().to_owned(), handle);
        self.samplers.push(sampler);
        Ok(handle)
    }

    pub fn sampler(&self, name: &str) -> Option<SamplerRef> {
        self.sampler_names.get(name).copied()
    }

    pub fn samplers(&self) -> &[Sampler] {
        &self.samplers
    }

    pub fn sampler_at(&self, handle: SamplerRef) -> &Sampler {
        &self.samplers[handle.0]
    }

    //----------------------------------------------------------------------------------------------
    // Pipelines

    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> Result<PipelineRef> {
        if self.pipeline_names.contains_key(pipeline.name()) {
            return Err(Error::new("duplicate pipeline name provided"));
        }
        let handle = PipelineRef(self.pipelines.len());
        self.pipeline_names
            .insert(pipeline.name().to_owned(), handle);
        self.pipelines.push(pipeline);
        Ok(handle)
    }

    pub fn pipeline(&self, name: &str) -> Option<PipelineRef> {
        self.pipeline_names.get(name).copied()
    }

    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    pub fn pipeline_at(&self, handle: PipelineRef) -> &Pipeline {
        &self.pipelines[handle.0]
    }

    pub fn pipeline_at_mut(&mut self, handle: PipelineRef) -> &mut Pipeline {
        &mut self.pipelines[handle.0]
    }

    //----------------------------------------------------------------------------------------------
    // Struct types

    pub fn add_type(&mut self, name: &str, ty: Type) -> Result<()> {
        if self.type_names.contains_key(name) {
            return Err(Error::new("duplicate type name provided"));
        }
        self.type_names.insert(name.to_owned(), self.types.len());
        self.types.push((name.to_owned(), ty));
        Ok(())
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.type_names.get(name).map(|&i| &self.types[i].1)
    }

    //----------------------------------------------------------------------------------------------
    // Acceleration structures

    pub fn add_blas(&mut self, blas: Blas) -> Result<BlasRef> {
        if self.blas_names.contains_key(blas.name()) {
            return Err(Error::new(
                "Bottom level acceleration structure with this name already defined",
            ));
        }
        let handle = BlasRef(self.blases.len());
        self.blas_names.insert(blas.name().to_owned(), handle);
        self.blases.push(blas);
        Ok(handle)
    }

    pub fn blas(&self, name: &str) -> Option<BlasRef> {
        self.blas_names.get(name).copied()
    }

    pub fn blases(&self) -> &[Blas] {
        &self.blases
    }

    pub fn add_tlas(&mut self, tlas: Tlas) -> Result<TlasRef> {
        if self.tlas_names.contains_key(tlas.name()) {
            return Err(Error::new("duplicate TLAS name provided"));
        }
        let handle = TlasRef(self.tlases.len());
        self.tlas_names.insert(tlas.name().to_owned(), handle);
        self.tlases.push(tlas);
        Ok(handle)
    }

    pub fn tlas(&self, name: &str) -> Option<TlasRef> {
        self.tlas_names.get(name).copied()
    }

    pub fn tlases(&self) -> &[Tlas] {
        &self.tlases
    }

    //----------------------------------------------------------------------------------------------
    // Commands

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Splits off the commands recorded since `start`; REPEAT uses this to
    /// fold its body into a single command.
    pub fn take_commands_from(&mut self, start: usize) -> Vec<Command> {
        self.commands.split_off(start)
    }

    //----------------------------------------------------------------------------------------------
    // Device requirements and engine data

    pub fn add_required_feature(&mut self, feature: &str) {
        self.required_features.push(feature.to_owned());
    }

    pub fn required_features(&self) -> &[String] {
        &self.required_features
    }

    pub fn add_required_property(&mut self, property: &str) {
        self.required_properties.push(property.to_owned());
    }

    pub fn required_properties(&self) -> &[String] {
        &self.required_properties
    }

    pub fn add_required_device_extension(&mut self, ext: &str) {
        self.required_device_extensions.push(ext.to_owned());
    }

    pub fn required_device_extensions(&self) -> &[String] {
        &self.required_device_extensions
    }

    pub fn add_required_instance_extension(&mut self, ext: &str) {
        self.required_instance_extensions.push(ext.to_owned());
    }

    pub fn required_instance_extensions(&self) -> &[String] {
        &self.required_instance_extensions
    }

    pub fn engine_data(&self) -> &EngineData {
        &self.engine_data
    }

    pub fn set_fence_timeout_ms(&mut self, timeout: u32) {
        self.engine_data.fence_timeout_ms = timeout;
    }

    //----------------------------------------------------------------------------------------------
    // Virtual files

    pub fn add_virtual_file(&mut self, path: &str, content: String) -> Result<()> {
        if self.virtual_files.contains_key(path) {
            return Err(Error::new(format!(
                "Virtual file '{}' already declared",
                path
            )));
        }
        self.virtual_files.insert(path.to_owned(), content);
        Ok(())
    }

    pub fn virtual_file(&self, path: &str) -> Option<&str> {
        self.virtual_files.get(path).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{Shader, ShaderKind};

    #[test]
    fn duplicate_shader_names_rejected() {
        let mut script = Script::new();
        script
            .add_shader(Shader::new(ShaderKind::Vertex, "s"))
            .unwrap();
        let err = script
            .add_shader(Shader::new(ShaderKind::Fragment, "s"))
            .unwrap_err();
        assert_eq!("duplicate shader name provided", err.to_string());
    }

    #[test]
    fn name_lookup_round_trip() {
        let mut script = Script::new();
        let handle = script
            .add_buffer(crate::buffer::Buffer::new("buf"))
            .unwrap();
        assert_eq!(Some(handle), script.buffer("buf"));
        assert_eq!("buf", script.buffer_at(handle).name());
        assert_eq!(None, script.buffer("other"));
    }

    #[test]
    fn engine_data_defaults() {
        let script = Script::new();
        assert_eq!(1000, script.engine_data().fence_timeout_ms);
    }

    #[test]
    fn virtual_files_unique() {
        let mut script = Script::new();
        script.add_virtual_file("my.file", "Blah".into()).unwrap();
        let err = script
            .add_virtual_file("my.file", "Blah".into())
            .unwrap_err();
        assert_eq!("Virtual file 'my.file' already declared", err.to_string());
        assert_eq!(Some("Blah"), script.virtual_file("my.file"));
    }
}
