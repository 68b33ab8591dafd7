// src/engine_lib/light.rs

use crate::geometry::{Point2, Rect};
use crate::rendering_lib::vertex::Color;

/// Stable key joining a caller-owned light to its renderer bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(pub u32);

impl std::fmt::Display for LightId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "light#{}", self.0)
    }
}

/// A point light. Owned by the simulation layer; the renderer only keeps its id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub id: LightId,
    pub position: Point2,
    pub radius: f32,
    pub intensity: f32,
    pub color: Color,
    pub bounds: Option<Rect>,
}

impl Light {
    pub fn new(id: LightId, position: Point2, radius: f32, intensity: f32) -> Self {
        Self {
            id,
            position,
            radius,
            intensity,
            color: Color::WHITE,
            bounds: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Square covered by the light's glow: the explicit bounds if set,
    /// otherwise the square circumscribing its radius.
    pub fn bounding_square(&self) -> Rect {
        self.bounds.unwrap_or_else(|| Rect::centered(self.position, self.radius))
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.radius.is_finite() && self.intensity.is_finite()
    }
}

/// Looks up a light by id in a caller-owned table.
pub fn find_light(lights: &[Light], id: LightId) -> Option<&Light> {
    lights.iter().find(|light| light.id == id)
}
