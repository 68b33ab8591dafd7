// src/engine_lib/camera.rs

use glam::Vec2;

use crate::geometry::{Point2, Rect};

/// Orthographic 2D camera over a world with +Y up.
#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub center: Vec2,
    /// Screen pixels per world unit.
    pub zoom: f32,
    pub screen_width: f32,
    pub screen_height: f32,
}

impl Camera2D {
    pub fn new(center: Vec2, zoom: f32, screen_width: f32, screen_height: f32) -> Self {
        Self {
            center,
            zoom,
            screen_width,
            screen_height,
        }
    }

    pub fn resize(&mut self, screen_width: f32, screen_height: f32) {
        self.screen_width = screen_width.max(1.0);
        self.screen_height = screen_height.max(1.0);
    }

    /// World-space rectangle currently on screen.
    pub fn view_rect(&self) -> Rect {
        let zoom = self.zoom.max(f32::EPSILON);
        let half = Vec2::new(self.screen_width, self.screen_height) / (2.0 * zoom);
        let min = self.center - half;
        Rect::new(min.x, min.y, half.x * 2.0, half.y * 2.0)
    }

    // Screen coordinates have their origin top-left with +Y down.
    pub fn screen_to_world(&self, screen_x: f32, screen_y: f32) -> Point2 {
        let zoom = self.zoom.max(f32::EPSILON);
        let offset = Vec2::new(
            screen_x - self.screen_width * 0.5,
            self.screen_height * 0.5 - screen_y,
        );
        (self.center + offset / zoom).into()
    }

    pub fn world_to_screen(&self, p: Point2) -> Vec2 {
        let offset = (Vec2::from(p) - self.center) * self.zoom;
        Vec2::new(
            offset.x + self.screen_width * 0.5,
            self.screen_height * 0.5 - offset.y,
        )
    }

    pub fn pan(&mut self, delta_world: Vec2) {
        self.center += delta_world;
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(0.05, 50.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn screen_center_maps_to_camera_center() {
        let camera = Camera2D::new(Vec2::new(100.0, 50.0), 2.0, 800.0, 600.0);
        let p = camera.screen_to_world(400.0, 300.0);
        assert_relative_eq!(p.x, 100.0);
        assert_relative_eq!(p.y, 50.0);
    }

    #[test]
    fn screen_top_left_is_view_top_left() {
        let camera = Camera2D::new(Vec2::ZERO, 1.0, 200.0, 100.0);
        let view = camera.view_rect();
        let p = camera.screen_to_world(0.0, 0.0);
        assert_relative_eq!(p.x, view.min().x);
        assert_relative_eq!(p.y, view.max().y);
    }

    #[test]
    fn world_screen_round_trip() {
        let camera = Camera2D::new(Vec2::new(-3.0, 7.0), 4.0, 640.0, 480.0);
        let world = camera.screen_to_world(123.0, 45.0);
        let screen = camera.world_to_screen(world);
        assert_relative_eq!(screen.x, 123.0, epsilon = 1e-3);
        assert_relative_eq!(screen.y, 45.0, epsilon = 1e-3);
    }
}
