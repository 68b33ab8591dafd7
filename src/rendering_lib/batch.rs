// src/rendering_lib/batch.rs

use crate::engine_lib::light::Light;
use crate::geometry::{Circle, Point2, Rect, Segment, TextureId, TexturedQuad, Triangle, UvRect};

use super::error::{BatchError, RenderError};
use super::vertex::{Color, Vertex};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    TriangleFan,
    Triangles,
}

/// A contiguous run of vertices in one frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawBatchEntry {
    pub topology: Topology,
    pub offset: u32,
    pub count: u32,
}

impl DrawBatchEntry {
    pub fn end(&self) -> u32 {
        self.offset + self.count
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexturedEntry {
    pub entry: DrawBatchEntry,
    pub texture: TextureId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Geometry,
    Texture,
    Light,
}

impl BufferKind {
    pub const ALL: [BufferKind; 3] = [BufferKind::Geometry, BufferKind::Texture, BufferKind::Light];

    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Geometry => "geometry",
            BufferKind::Texture => "texture",
            BufferKind::Light => "light",
        }
    }
}

/// Growable CPU-side vertex store with its running write offset.
#[derive(Debug, Default)]
pub struct VertexBuffer {
    vertices: Vec<Vertex>,
    offset: u32,
}

impl VertexBuffer {
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Keeps capacity for the next frame.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.offset = 0;
    }

    /// Appends all of `vertices` or none of them.
    pub fn append(&mut self, topology: Topology, vertices: &[Vertex]) -> Result<DrawBatchEntry, BatchError> {
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(BatchError::NonFinite);
        }
        let count = u32::try_from(vertices.len()).map_err(|_| BatchError::Overflow)?;
        let end = self.offset.checked_add(count).ok_or(BatchError::Overflow)?;
        self.vertices
            .try_reserve(vertices.len())
            .map_err(|_| BatchError::Allocation { requested: vertices.len() })?;
        self.vertices.extend_from_slice(vertices);

        let entry = DrawBatchEntry { topology, offset: self.offset, count };
        self.offset = end;
        Ok(entry)
    }
}

/// The three per-frame vertex stores.
#[derive(Debug, Default)]
pub struct FrameBuffers {
    pub geometry: VertexBuffer,
    pub texture: VertexBuffer,
    pub light: VertexBuffer,
}

impl FrameBuffers {
    pub fn get(&self, kind: BufferKind) -> &VertexBuffer {
        match kind {
            BufferKind::Geometry => &self.geometry,
            BufferKind::Texture => &self.texture,
            BufferKind::Light => &self.light,
        }
    }

    pub fn get_mut(&mut self, kind: BufferKind) -> &mut VertexBuffer {
        match kind {
            BufferKind::Geometry => &mut self.geometry,
            BufferKind::Texture => &mut self.texture,
            BufferKind::Light => &mut self.light,
        }
    }

    pub fn reset(&mut self) {
        self.geometry.reset();
        self.texture.reset();
        self.light.reset();
    }

    /// Every buffer's write offset must equal its length once accumulation is done.
    pub fn verify_offsets(&self) -> Result<(), RenderError> {
        for kind in BufferKind::ALL {
            let buffer = self.get(kind);
            if buffer.offset as usize != buffer.vertices.len() {
                return Err(RenderError::OffsetMismatch {
                    buffer: kind.name(),
                    offset: buffer.offset,
                    len: buffer.vertices.len(),
                });
            }
        }
        Ok(())
    }
}

fn quad_vertices(rect: &Rect, color: Color, uv: &UvRect) -> [Vertex; 6] {
    let min = rect.min();
    let max = rect.max();
    // World +Y is up while texture V grows downwards.
    let bottom_left = Vertex::textured([min.x, min.y], color, [uv.min[0], uv.max[1]]);
    let bottom_right = Vertex::textured([max.x, min.y], color, [uv.max[0], uv.max[1]]);
    let top_right = Vertex::textured([max.x, max.y], color, [uv.max[0], uv.min[1]]);
    let top_left = Vertex::textured([min.x, max.y], color, [uv.min[0], uv.min[1]]);
    [bottom_left, bottom_right, top_right, bottom_left, top_right, top_left]
}

fn circle_vertices(circle: &Circle, color: Color) -> Vec<Vertex> {
    let step = std::f32::consts::TAU / circle.segments as f32;
    (0..circle.segments)
        .map(|i| {
            let angle = i as f32 * step;
            let p = circle.center + Point2::new(angle.cos(), angle.sin()) * circle.radius;
            Vertex::new([p.x, p.y], color)
        })
        .collect()
}

/// Tessellates canonical shapes into a [`FrameBuffers`] target.
///
/// Each `append_*` returns `Ok(None)` for degenerate input (zero size, zero
/// radius, zero length) and never leaves a partially written shape behind.
#[derive(Debug, Default)]
pub struct VertexBatcher {
    buffers: FrameBuffers,
}

impl VertexBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    pub fn reset(&mut self) {
        self.buffers.reset();
    }

    pub fn append_square(&mut self, target: BufferKind, rect: Rect, color: Color) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !rect.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if rect.width == 0.0 || rect.height == 0.0 {
            return Ok(None);
        }
        let vertices = quad_vertices(&rect, color, &UvRect::FULL);
        self.buffers.get_mut(target).append(Topology::Triangles, &vertices).map(Some)
    }

    pub fn append_circle(&mut self, target: BufferKind, circle: Circle, color: Color) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !circle.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if circle.radius <= 0.0 || circle.segments < 3 {
            return Ok(None);
        }
        let vertices = circle_vertices(&circle, color);
        self.buffers.get_mut(target).append(Topology::TriangleFan, &vertices).map(Some)
    }

    pub fn append_line(&mut self, target: BufferKind, segment: Segment, color: Color) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !segment.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if segment.is_degenerate() {
            return Ok(None);
        }
        let vertices = [
            Vertex::new([segment.a.x, segment.a.y], color),
            Vertex::new([segment.b.x, segment.b.y], color),
        ];
        self.buffers.get_mut(target).append(Topology::Lines, &vertices).map(Some)
    }

    pub fn append_point(&mut self, target: BufferKind, point: Point2, color: Color) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !point.is_finite() {
            return Err(BatchError::NonFinite);
        }
        let vertices = [Vertex::new([point.x, point.y], color)];
        self.buffers.get_mut(target).append(Topology::Points, &vertices).map(Some)
    }

    pub fn append_triangle(&mut self, target: BufferKind, triangle: Triangle, color: Color) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !triangle.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if triangle.area() == 0.0 {
            return Ok(None);
        }
        let vertices = triangle.points.map(|p| Vertex::new([p.x, p.y], color));
        self.buffers.get_mut(target).append(Topology::Triangles, &vertices).map(Some)
    }

    pub fn append_textured_quad(&mut self, target: BufferKind, quad: TexturedQuad, color: Color) -> Result<Option<TexturedEntry>, BatchError> {
        if !quad.rect.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if quad.rect.width == 0.0 || quad.rect.height == 0.0 {
            return Ok(None);
        }
        let vertices = quad_vertices(&quad.rect, color, &quad.uv);
        let entry = self.buffers.get_mut(target).append(Topology::Triangles, &vertices)?;
        Ok(Some(TexturedEntry { entry, texture: quad.texture }))
    }

    /// Glow quad over the light's bounding square; UVs span the whole quad so
    /// the light program can compute a radial falloff.
    pub fn append_light_quad(&mut self, target: BufferKind, light: &Light) -> Result<Option<DrawBatchEntry>, BatchError> {
        if !light.is_finite() {
            return Err(BatchError::NonFinite);
        }
        let square = light.bounding_square();
        if !square.is_finite() {
            return Err(BatchError::NonFinite);
        }
        if square.width == 0.0 || square.height == 0.0 {
            return Ok(None);
        }
        let vertices = quad_vertices(&square, light.color, &UvRect::FULL);
        self.buffers.get_mut(target).append(Topology::Triangles, &vertices).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::light::LightId;

    fn assert_entries_cover_buffer(entries: &[DrawBatchEntry], buffer: &VertexBuffer) {
        let total: u32 = entries.iter().map(|e| e.count).sum();
        assert_eq!(total as usize, buffer.len());
        assert_eq!(buffer.offset() as usize, buffer.len());
        for entry in entries {
            assert!(entry.end() as usize <= buffer.len());
        }
    }

    #[test]
    fn offsets_track_appended_counts() {
        let mut batcher = VertexBatcher::new();
        let target = BufferKind::Geometry;
        let entries = [
            batcher.append_square(target, Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE).unwrap().unwrap(),
            batcher.append_circle(target, Circle::new(Point2::ZERO, 2.0, 12), Color::RED).unwrap().unwrap(),
            batcher.append_line(target, Segment::new(Point2::ZERO, Point2::new(1.0, 1.0)), Color::RED).unwrap().unwrap(),
            batcher.append_point(target, Point2::new(3.0, 3.0), Color::BLUE).unwrap().unwrap(),
            batcher
                .append_triangle(target, Triangle::new(Point2::ZERO, Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)), Color::GREEN)
                .unwrap()
                .unwrap(),
        ];
        assert_eq!(entries.map(|e| e.count), [6, 12, 2, 1, 3]);
        assert_eq!(entries.map(|e| e.offset), [0, 6, 18, 20, 21]);
        assert_eq!(entries.map(|e| e.topology), [
            Topology::Triangles,
            Topology::TriangleFan,
            Topology::Lines,
            Topology::Points,
            Topology::Triangles,
        ]);
        assert_entries_cover_buffer(&entries, &batcher.buffers().geometry);
        batcher.buffers().verify_offsets().unwrap();
    }

    #[test]
    fn targets_are_independent() {
        let mut batcher = VertexBatcher::new();
        let quad = TexturedQuad::new(Rect::new(0.0, 0.0, 2.0, 2.0), TextureId(4));
        let textured = batcher.append_textured_quad(BufferKind::Texture, quad, Color::WHITE).unwrap().unwrap();
        let light = Light::new(LightId(1), Point2::new(5.0, 5.0), 3.0, 1.0);
        let glow = batcher.append_light_quad(BufferKind::Light, &light).unwrap().unwrap();
        assert_eq!(textured.entry.offset, 0);
        assert_eq!(textured.texture, TextureId(4));
        assert_eq!(glow.offset, 0);
        assert!(batcher.buffers().geometry.is_empty());
        assert_eq!(batcher.buffers().texture.len(), 6);
        assert_eq!(batcher.buffers().light.len(), 6);
        let xs: Vec<f32> = batcher.buffers().light.vertices().iter().map(|v| v.position[0]).collect();
        assert!(xs.iter().all(|&x| x == 2.0 || x == 8.0));
    }

    #[test]
    fn degenerate_shapes_append_nothing() {
        let mut batcher = VertexBatcher::new();
        let target = BufferKind::Geometry;
        assert!(batcher.append_circle(target, Circle::new(Point2::ZERO, 0.0, 16), Color::WHITE).unwrap().is_none());
        assert!(batcher.append_circle(target, Circle::new(Point2::ZERO, 1.0, 2), Color::WHITE).unwrap().is_none());
        assert!(batcher.append_line(target, Segment::new(Point2::ZERO, Point2::ZERO), Color::WHITE).unwrap().is_none());
        assert!(batcher.append_square(target, Rect::new(0.0, 0.0, 0.0, 5.0), Color::WHITE).unwrap().is_none());
        assert!(batcher.buffers().geometry.is_empty());
    }

    #[test]
    fn non_finite_input_is_rejected_atomically() {
        let mut batcher = VertexBatcher::new();
        batcher.append_point(BufferKind::Geometry, Point2::new(1.0, 1.0), Color::WHITE).unwrap();
        let err = batcher.append_square(BufferKind::Geometry, Rect::new(f32::NAN, 0.0, 1.0, 1.0), Color::WHITE);
        assert!(matches!(err, Err(BatchError::NonFinite)));
        let err = batcher.append_circle(BufferKind::Geometry, Circle::new(Point2::new(0.0, f32::INFINITY), 1.0, 8), Color::WHITE);
        assert!(matches!(err, Err(BatchError::NonFinite)));
        assert_eq!(batcher.buffers().geometry.len(), 1);
        assert_eq!(batcher.buffers().geometry.offset(), 1);
    }

    #[test]
    fn raw_append_rejects_non_finite_vertex() {
        let mut buffer = VertexBuffer::default();
        let good = Vertex::new([0.0, 0.0], Color::WHITE);
        let bad = Vertex::new([f32::NAN, 0.0], Color::WHITE);
        assert!(buffer.append(Topology::Triangles, &[good, good, bad]).is_err());
        assert!(buffer.is_empty());
        assert_eq!(buffer.offset(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut batcher = VertexBatcher::new();
        batcher.append_point(BufferKind::Geometry, Point2::ZERO, Color::WHITE).unwrap();
        batcher.append_point(BufferKind::Light, Point2::ZERO, Color::WHITE).unwrap();
        batcher.reset();
        for kind in BufferKind::ALL {
            assert!(batcher.buffers().get(kind).is_empty());
            assert_eq!(batcher.buffers().get(kind).offset(), 0);
        }
    }

    #[test]
    fn textured_quad_flips_v_for_world_up() {
        let mut batcher = VertexBatcher::new();
        let quad = TexturedQuad::new(Rect::new(0.0, 0.0, 1.0, 1.0), TextureId(0));
        batcher.append_textured_quad(BufferKind::Texture, quad, Color::WHITE).unwrap();
        let first = batcher.buffers().texture.vertices()[0];
        assert_eq!(first.position, [0.0, 0.0]);
        assert_eq!(first.uv, [0.0, 1.0]);
    }
}
