// src/rendering_lib/mod.rs

pub mod backend;
pub mod batch;
pub mod error;
pub mod recording;
pub mod registry;
pub mod renderer;
pub mod shader;
pub mod vertex;
pub mod wgpu_backend;

pub use backend::{BlendMode, GraphicsBackend};
pub use batch::{BufferKind, DrawBatchEntry, TexturedEntry, Topology, VertexBatcher};
pub use error::{BackendError, BatchError, RegistryError, RenderError, RenderResult};
pub use recording::RecordingBackend;
pub use registry::VisibleAreaRegistry;
pub use renderer::{FrameStats, RenderMode, Renderer};
pub use vertex::{Color, Vertex};
pub use wgpu_backend::WgpuBackend;
