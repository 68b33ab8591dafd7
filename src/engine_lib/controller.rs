// src/engine_lib/controller.rs

use glam::Vec2;
use winit::{
    event::{ElementState, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::engine_lib::camera::Camera2D;
use crate::geometry::Point2;

/// Keyboard panning plus a mouse-driven vision origin.
pub struct CameraController {
    pub pan_direction: Vec2,
    pub zoom_steps: f32,
    pub cursor_screen: Option<(f32, f32)>,
    pub pan_speed: f32,
    pub toggle_mode_requested: bool,
}

impl CameraController {
    pub fn new(pan_speed: f32) -> Self {
        Self {
            pan_direction: Vec2::ZERO,
            zoom_steps: 0.0,
            cursor_screen: None,
            pan_speed,
            toggle_mode_requested: false,
        }
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let pressed = key_event.state == ElementState::Pressed;
                match key_event.physical_key {
                    PhysicalKey::Code(KeyCode::KeyW) => { self.pan_direction.y = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyS) => { self.pan_direction.y = if pressed { -1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyA) => { self.pan_direction.x = if pressed { -1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::KeyD) => { self.pan_direction.x = if pressed { 1.0 } else { 0.0 }; true }
                    PhysicalKey::Code(KeyCode::Tab) => {
                        if pressed && !key_event.repeat {
                            self.toggle_mode_requested = true;
                        }
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_screen = Some((position.x as f32, position.y as f32));
                false
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_screen = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.zoom_steps += match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
                };
                true
            }
            _ => false,
        }
    }

    /// Returns and clears a pending render-mode toggle.
    pub fn take_toggle_request(&mut self) -> bool {
        std::mem::take(&mut self.toggle_mode_requested)
    }

    pub fn apply_to_camera(&mut self, camera: &mut Camera2D, dt: f32) {
        let speed = self.pan_speed * dt / camera.zoom.max(f32::EPSILON);
        camera.pan(self.pan_direction * speed);
        if self.zoom_steps != 0.0 {
            camera.zoom_by(1.1f32.powf(self.zoom_steps));
            self.zoom_steps = 0.0;
        }
    }

    /// World position under the cursor, if the cursor is inside the window.
    pub fn cursor_world(&self, camera: &Camera2D) -> Option<Point2> {
        self.cursor_screen.map(|(x, y)| camera.screen_to_world(x, y))
    }
}
