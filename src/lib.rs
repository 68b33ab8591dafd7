// src/lib.rs

pub mod config;
pub mod engine_lib;
pub mod generator;
pub mod geometry;
pub mod intersection;
pub mod logging;
pub mod rendering_lib;

pub use engine_lib::edges::{build_edges, edge_points, EdgeSet, MapMetrics, TileCoord};
pub use engine_lib::light::{Light, LightId};
pub use engine_lib::visibility::{compute_visibility, shadow_triangles, VisibilityConfig, VisibilityPolygon};
pub use geometry::{Circle, Point2, Rect, Segment, TextureId, TexturedQuad, Triangle};
