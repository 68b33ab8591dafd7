// src/rendering_lib/recording.rs

use std::collections::HashSet;

use crate::geometry::TextureId;

use super::backend::{
    resolve_attributes, BlendMode, GraphicsBackend, ProgramId, ProgramSource, UniformId, UniformValue, VertexArrayId,
};
use super::batch::Topology;
use super::error::BackendError;
use super::vertex::{Vertex, VertexAttribute};

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    CreateVertexArray { array: VertexArrayId, attributes: Vec<VertexAttribute> },
    Upload { array: VertexArrayId, len: usize },
    CreateProgram { program: ProgramId, label: String },
    UseProgram(ProgramId),
    BindVertexArray(VertexArrayId),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    SetBlend(BlendMode),
    BindTexture { unit: u32, texture: TextureId },
    Draw { program: ProgramId, array: VertexArrayId, topology: Topology, offset: u32, count: u32 },
}

struct RecordedArray {
    attributes: Vec<VertexAttribute>,
    len: u32,
}

struct RecordedProgram {
    label: String,
    attributes: Vec<VertexAttribute>,
    uniforms: Vec<String>,
    textured: bool,
}

/// Headless backend that validates and records every call.
///
/// Used by the pipeline tests and for running the renderer without a GPU.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    arrays: Vec<RecordedArray>,
    programs: Vec<RecordedProgram>,
    textures: HashSet<TextureId>,
    current_program: Option<ProgramId>,
    current_array: Option<VertexArrayId>,
    bound_texture: Option<TextureId>,
    failing_programs: HashSet<String>,
    discards: u32,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `create_program` fail for the program with this label.
    pub fn fail_program(&mut self, label: &str) {
        self.failing_programs.insert(label.to_string());
    }

    pub fn register_texture(&mut self, texture: TextureId) {
        self.textures.insert(texture);
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn blend_sequence(&self) -> Vec<BlendMode> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetBlend(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<&BackendCall> {
        self.calls.iter().filter(|call| matches!(call, BackendCall::Draw { .. })).collect()
    }

    pub fn program_label(&self, program: ProgramId) -> Option<&str> {
        self.programs.get(program.0 as usize).map(|p| p.label.as_str())
    }

    /// How many times the pipeline asked to drop pending draws.
    pub fn discard_count(&self) -> u32 {
        self.discards
    }

    pub fn uploaded_len(&self, array: VertexArrayId) -> Option<u32> {
        self.arrays.get(array.0 as usize).map(|a| a.len)
    }

    fn program(&self, program: ProgramId) -> Result<&RecordedProgram, BackendError> {
        self.programs
            .get(program.0 as usize)
            .ok_or(BackendError::InvalidHandle { kind: "program", id: program.0 })
    }

    fn array(&self, array: VertexArrayId) -> Result<&RecordedArray, BackendError> {
        self.arrays
            .get(array.0 as usize)
            .ok_or(BackendError::InvalidHandle { kind: "vertex array", id: array.0 })
    }
}

impl GraphicsBackend for RecordingBackend {
    fn create_vertex_array(&mut self, attributes: &[VertexAttribute]) -> Result<VertexArrayId, BackendError> {
        let array = VertexArrayId(self.arrays.len() as u32);
        self.arrays.push(RecordedArray { attributes: attributes.to_vec(), len: 0 });
        self.calls.push(BackendCall::CreateVertexArray { array, attributes: attributes.to_vec() });
        Ok(array)
    }

    fn upload_vertices(&mut self, array: VertexArrayId, vertices: &[Vertex]) -> Result<(), BackendError> {
        let len = u32::try_from(vertices.len()).map_err(|_| BackendError::Allocation(format!("{} vertices", vertices.len())))?;
        self.array(array)?;
        self.arrays[array.0 as usize].len = len;
        self.calls.push(BackendCall::Upload { array, len: vertices.len() });
        Ok(())
    }

    fn create_program(&mut self, source: &ProgramSource<'_>, attributes: &[&str]) -> Result<ProgramId, BackendError> {
        if self.failing_programs.contains(source.label) {
            return Err(BackendError::ShaderCompile {
                label: source.label.to_string(),
                message: "rejected by recording backend".to_string(),
            });
        }
        let resolved = resolve_attributes(attributes)?;
        let program = ProgramId(self.programs.len() as u32);
        self.programs.push(RecordedProgram {
            label: source.label.to_string(),
            attributes: resolved,
            uniforms: source.uniforms.iter().map(|u| u.to_string()).collect(),
            textured: source.textured,
        });
        self.calls.push(BackendCall::CreateProgram { program, label: source.label.to_string() });
        Ok(program)
    }

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<UniformId, BackendError> {
        let slot = self
            .program(program)?
            .uniforms
            .iter()
            .position(|u| u == name)
            .ok_or_else(|| BackendError::UnknownUniform { program: program.0, name: name.to_string() })?;
        Ok(UniformId { program, slot: slot as u32 })
    }

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError> {
        self.program(program)?;
        self.current_program = Some(program);
        self.calls.push(BackendCall::UseProgram(program));
        Ok(())
    }

    fn bind_vertex_array(&mut self, array: VertexArrayId) -> Result<(), BackendError> {
        self.array(array)?;
        self.current_array = Some(array);
        self.calls.push(BackendCall::BindVertexArray(array));
        Ok(())
    }

    fn set_uniform(&mut self, uniform: UniformId, value: UniformValue) -> Result<(), BackendError> {
        let name = self
            .program(uniform.program)?
            .uniforms
            .get(uniform.slot as usize)
            .cloned()
            .ok_or(BackendError::InvalidHandle { kind: "uniform", id: uniform.slot })?;
        self.calls.push(BackendCall::SetUniform { program: uniform.program, name, value });
        Ok(())
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.calls.push(BackendCall::SetBlend(mode));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), BackendError> {
        if !self.textures.contains(&texture) {
            return Err(BackendError::InvalidHandle { kind: "texture", id: texture.0 });
        }
        self.bound_texture = Some(texture);
        self.calls.push(BackendCall::BindTexture { unit, texture });
        Ok(())
    }

    fn draw(&mut self, topology: Topology, offset: u32, count: u32) -> Result<(), BackendError> {
        let program_id = self.current_program.ok_or(BackendError::NothingBound("program"))?;
        let array_id = self.current_array.ok_or(BackendError::NothingBound("vertex array"))?;
        let program = self.program(program_id)?;
        let array = self.array(array_id)?;

        if let Some(missing) = program.attributes.iter().find(|a| !array.attributes.contains(a)) {
            return Err(BackendError::AttributeMismatch {
                program: program_id.0,
                array: array_id.0,
                attribute: missing.name(),
            });
        }
        if program.textured && self.bound_texture.is_none() {
            return Err(BackendError::NoTextureBound { program: program_id.0 });
        }
        let end = offset.saturating_add(count);
        if end > array.len {
            return Err(BackendError::DrawOutOfRange { array: array_id.0, offset, end, len: array.len });
        }

        self.calls.push(BackendCall::Draw { program: program_id, array: array_id, topology, offset, count });
        Ok(())
    }

    fn discard_pending(&mut self) {
        self.discards += 1;
    }
}
