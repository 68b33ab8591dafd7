// src/rendering_lib/error.rs

use crate::engine_lib::light::LightId;

/// Failures reported by a graphics backend. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("shader program '{label}' failed to compile or link: {message}")]
    ShaderCompile { label: String, message: String },

    #[error("unknown vertex attribute '{0}'")]
    UnknownAttribute(String),

    #[error("uniform '{name}' not found in program {program}")]
    UnknownUniform { program: u32, name: String },

    #[error("invalid {kind} handle {id}")]
    InvalidHandle { kind: &'static str, id: u32 },

    #[error("program {program} samples a texture but none is bound")]
    NoTextureBound { program: u32 },

    #[error("vertex array {array} lacks attribute '{attribute}' required by program {program}")]
    AttributeMismatch { program: u32, array: u32, attribute: &'static str },

    #[error("draw issued with no {0} bound")]
    NothingBound(&'static str),

    #[error("draw range {offset}..{end} exceeds the {len} vertices uploaded to array {array}")]
    DrawOutOfRange { array: u32, offset: u32, end: u32, len: u32 },

    #[error("uniform '{name}' cannot be set from a {value} value")]
    UniformType { name: String, value: &'static str },

    #[error("texture data is {actual} bytes, expected {expected} for RGBA8")]
    TextureData { expected: usize, actual: usize },

    #[error("GPU allocation failed: {0}")]
    Allocation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("shape has non-finite coordinates")]
    NonFinite,

    #[error("vertex buffer allocation of {requested} vertices failed")]
    Allocation { requested: usize },

    #[error("vertex buffer offset would exceed u32 range")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{0} is not registered")]
    UnknownLight(LightId),
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("'{operation}' is not allowed while the frame is {state}")]
    Sequence { operation: &'static str, state: &'static str },

    #[error("renderer used before init()")]
    NotInitialized,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{buffer} buffer offset {offset} does not match its length {len}")]
    OffsetMismatch { buffer: &'static str, offset: u32, len: usize },

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type RenderResult<T> = Result<T, RenderError>;
