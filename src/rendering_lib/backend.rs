// src/rendering_lib/backend.rs

use crate::geometry::TextureId;

use super::batch::Topology;
use super::error::BackendError;
use super::vertex::{Vertex, VertexAttribute};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// A uniform resolved by name within one program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformId {
    pub program: ProgramId,
    pub slot: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Func { src: BlendFactor, dst: BlendFactor },
    Separate {
        src_rgb: BlendFactor,
        dst_rgb: BlendFactor,
        src_alpha: BlendFactor,
        dst_alpha: BlendFactor,
    },
}

impl BlendMode {
    /// Keeps destination colour and zeroes destination alpha under the drawn shape.
    pub const MASK: BlendMode = BlendMode::Separate {
        src_rgb: BlendFactor::Zero,
        dst_rgb: BlendFactor::One,
        src_alpha: BlendFactor::Zero,
        dst_alpha: BlendFactor::Zero,
    };
    /// Writes source colour only where destination alpha survived the mask.
    pub const VISION_GATE: BlendMode = BlendMode::Func { src: BlendFactor::DstAlpha, dst: BlendFactor::OneMinusDstAlpha };
    pub const ADDITIVE: BlendMode = BlendMode::Func { src: BlendFactor::One, dst: BlendFactor::One };
    pub const STANDARD_ALPHA: BlendMode = BlendMode::Func { src: BlendFactor::SrcAlpha, dst: BlendFactor::OneMinusSrcAlpha };
}

/// Sources and interface of one shader program.
#[derive(Clone, Copy, Debug)]
pub struct ProgramSource<'a> {
    pub label: &'a str,
    pub vertex: &'a str,
    pub fragment: &'a str,
    /// Uniform names the program declares; anything else fails to resolve.
    pub uniforms: &'a [&'a str],
    pub textured: bool,
}

/// What the frame pipeline needs from a GPU API.
///
/// Handles are only meaningful to the backend that issued them. Every
/// failure is fatal for the frame; callers do not retry.
pub trait GraphicsBackend {
    fn create_vertex_array(&mut self, attributes: &[VertexAttribute]) -> Result<VertexArrayId, BackendError>;

    /// Replaces the whole contents of the array's vertex store.
    fn upload_vertices(&mut self, array: VertexArrayId, vertices: &[Vertex]) -> Result<(), BackendError>;

    /// `attributes` is order-significant: position `i` becomes shader location `i`.
    fn create_program(&mut self, source: &ProgramSource<'_>, attributes: &[&str]) -> Result<ProgramId, BackendError>;

    fn uniform_location(&mut self, program: ProgramId, name: &str) -> Result<UniformId, BackendError>;

    fn use_program(&mut self, program: ProgramId) -> Result<(), BackendError>;

    fn bind_vertex_array(&mut self, array: VertexArrayId) -> Result<(), BackendError>;

    fn set_uniform(&mut self, uniform: UniformId, value: UniformValue) -> Result<(), BackendError>;

    fn set_blend(&mut self, mode: BlendMode);

    fn bind_texture(&mut self, unit: u32, texture: TextureId) -> Result<(), BackendError>;

    fn draw(&mut self, topology: Topology, offset: u32, count: u32) -> Result<(), BackendError>;

    /// Drops draws queued since the last submit. Called at the start of every frame.
    fn discard_pending(&mut self) {}
}

/// Resolves the attribute names of a program against the known vertex layout.
pub fn resolve_attributes(attributes: &[&str]) -> Result<Vec<VertexAttribute>, BackendError> {
    attributes
        .iter()
        .map(|name| VertexAttribute::from_name(name).ok_or_else(|| BackendError::UnknownAttribute(name.to_string())))
        .collect()
}
