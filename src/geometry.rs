// src/geometry.rs

use std::ops::{Add, Mul, Sub};

use bytemuck::{Pod, Zeroable};

/// Default tolerance used when deciding whether two world points coincide.
pub const POINT_EPSILON: f32 = 1e-3;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const ZERO: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(&self, other: &Point2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product of `self` and `other`.
    pub fn cross(&self, other: &Point2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        (*other - *self).length()
    }

    pub fn normalized(&self) -> Option<Point2> {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return None;
        }
        Some(Point2::new(self.x / len, self.y / len))
    }

    pub fn rotated(&self, angle_rad: f32) -> Point2 {
        let (sin, cos) = angle_rad.sin_cos();
        Point2::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn approx_eq(&self, other: &Point2, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

impl Add for Point2 {
    type Output = Point2;
    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Point2;
    fn sub(self, rhs: Point2) -> Point2 {
        Point2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Point2 {
    type Output = Point2;
    fn mul(self, rhs: f32) -> Point2 {
        Point2::new(self.x * rhs, self.y * rhs)
    }
}

impl From<glam::Vec2> for Point2 {
    fn from(v: glam::Vec2) -> Self {
        Point2::new(v.x, v.y)
    }
}

impl From<Point2> for glam::Vec2 {
    fn from(p: Point2) -> Self {
        glam::Vec2::new(p.x, p.y)
    }
}

/// Axis-aligned rectangle, `origin` is the minimum corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { origin: Point2::new(x, y), width, height }
    }

    /// Square of side `2 * half_extent` centred on `center`.
    pub fn centered(center: Point2, half_extent: f32) -> Self {
        Self::new(
            center.x - half_extent,
            center.y - half_extent,
            half_extent * 2.0,
            half_extent * 2.0,
        )
    }

    pub fn min(&self) -> Point2 {
        self.origin
    }

    pub fn max(&self) -> Point2 {
        Point2::new(self.origin.x + self.width, self.origin.y + self.height)
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.origin.x + self.width * 0.5, self.origin.y + self.height * 0.5)
    }

    /// Corners in counter-clockwise order starting at the minimum corner.
    pub fn corners(&self) -> [Point2; 4] {
        let min = self.min();
        let max = self.max();
        [min, Point2::new(max.x, min.y), max, Point2::new(min.x, max.y)]
    }

    pub fn contains(&self, p: Point2) -> bool {
        let min = self.min();
        let max = self.max();
        p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
    }

    pub fn is_finite(&self) -> bool {
        self.origin.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point2,
    pub radius: f32,
    pub segments: u32,
}

impl Circle {
    pub const fn new(center: Point2, radius: f32, segments: u32) -> Self {
        Self { center, radius, segments }
    }

    pub fn is_finite(&self) -> bool {
        self.center.is_finite() && self.radius.is_finite()
    }
}

/// Undirected line segment. Occluder edges use this type directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Point2,
    pub b: Point2,
}

pub type Edge = Segment;

impl Segment {
    pub const fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f32 {
        self.a.distance(&self.b)
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() <= f32::EPSILON
    }

    pub fn is_finite(&self) -> bool {
        self.a.is_finite() && self.b.is_finite()
    }

    /// Same segment regardless of endpoint order.
    pub fn same_as(&self, other: &Segment, epsilon: f32) -> bool {
        (self.a.approx_eq(&other.a, epsilon) && self.b.approx_eq(&other.b, epsilon))
            || (self.a.approx_eq(&other.b, epsilon) && self.b.approx_eq(&other.a, epsilon))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub points: [Point2; 3],
}

impl Triangle {
    pub const fn new(p1: Point2, p2: Point2, p3: Point2) -> Self {
        Self { points: [p1, p2, p3] }
    }

    pub fn area(&self) -> f32 {
        polygon_area(&self.points)
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point2::is_finite)
    }
}

/// Texture coordinates of a quad, `min`/`max` in normalized UV space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const FULL: UvRect = UvRect { min: [0.0, 0.0], max: [1.0, 1.0] };
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Opaque handle to a texture owned by the graphics backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TexturedQuad {
    pub rect: Rect,
    pub texture: TextureId,
    pub uv: UvRect,
}

impl TexturedQuad {
    pub fn new(rect: Rect, texture: TextureId) -> Self {
        Self { rect, texture, uv: UvRect::FULL }
    }

    /// Cell `index` of a regular `columns` x `rows` atlas, row-major from the top-left.
    pub fn from_atlas(rect: Rect, texture: TextureId, columns: u32, rows: u32, index: u32) -> Self {
        let columns = columns.max(1);
        let rows = rows.max(1);
        let col = index % columns;
        let row = (index / columns).min(rows - 1);
        let cell_w = 1.0 / columns as f32;
        let cell_h = 1.0 / rows as f32;
        let uv = UvRect {
            min: [col as f32 * cell_w, row as f32 * cell_h],
            max: [(col + 1) as f32 * cell_w, (row + 1) as f32 * cell_h],
        };
        Self { rect, texture, uv }
    }
}

/// Absolute polygon area via the shoelace formula.
pub fn polygon_area(vertices: &[Point2]) -> f32 {
    signed_polygon_area(vertices).abs()
}

/// Positive for counter-clockwise winding.
pub fn signed_polygon_area(vertices: &[Point2]) -> f32 {
    let count = vertices.len();
    if count < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..count {
        let j = (i + 1) % count;
        area += vertices[i].x * vertices[j].y;
        area -= vertices[j].x * vertices[i].y;
    }
    area / 2.0
}

/// Even-odd point-in-polygon test.
pub fn point_in_polygon(p: Point2, vertices: &[Point2]) -> bool {
    let count = vertices.len();
    if count < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = count - 1;
    for i in 0..count {
        let vi = vertices[i];
        let vj = vertices[j];
        if (vi.y > p.y) != (vj.y > p.y) {
            let cross_x = (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x;
            if p.x < cross_x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rect_corners_are_counter_clockwise() {
        let rect = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert!(signed_polygon_area(&rect.corners()) > 0.0);
        assert_relative_eq!(polygon_area(&rect.corners()), 12.0);
    }

    #[test]
    fn rotated_quarter_turn() {
        let p = Point2::new(1.0, 0.0).rotated(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn normalized_zero_vector_is_none() {
        assert!(Point2::ZERO.normalized().is_none());
    }

    #[test]
    fn point_in_square() {
        let square = Rect::new(0.0, 0.0, 10.0, 10.0).corners();
        assert!(point_in_polygon(Point2::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point2::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(Point2::new(5.0, -0.5), &square));
    }

    #[test]
    fn segment_equality_ignores_direction() {
        let s = Segment::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0));
        let r = Segment::new(Point2::new(1.0, 0.0), Point2::new(0.0, 0.0));
        assert!(s.same_as(&r, POINT_EPSILON));
    }

    #[test]
    fn atlas_cell_uv() {
        let quad = TexturedQuad::from_atlas(Rect::new(0.0, 0.0, 1.0, 1.0), TextureId(0), 4, 2, 5);
        assert_relative_eq!(quad.uv.min[0], 0.25);
        assert_relative_eq!(quad.uv.min[1], 0.5);
        assert_relative_eq!(quad.uv.max[0], 0.5);
        assert_relative_eq!(quad.uv.max[1], 1.0);
    }
}
