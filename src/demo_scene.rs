// src/demo_scene.rs

use rand::Rng;

use lumen2d::config::EngineConfig;
use lumen2d::engine_lib::edges::{build_edges, EdgeSet, MapMetrics, TileCoord};
use lumen2d::engine_lib::light::{Light, LightId};
use lumen2d::engine_lib::visibility::{compute_visibility, shadow_triangles, VisibilityConfig};
use lumen2d::generator::{carve_clearing, open_cells, random_tiles};
use lumen2d::geometry::{Circle, Point2, Rect, Segment, TextureId, TexturedQuad};
use lumen2d::rendering_lib::backend::GraphicsBackend;
use lumen2d::rendering_lib::error::RenderResult;
use lumen2d::rendering_lib::renderer::Renderer;
use lumen2d::rendering_lib::vertex::Color;

/// The light that follows the mouse; also the origin of the shadow mask.
pub const VIEWER_LIGHT: LightId = LightId(0);

const FLOOR_COLOR: Color = Color::rgb(90, 90, 110);
const WALL_TINT: Color = Color::rgb(200, 190, 170);
const LIGHT_COLORS: [Color; 4] = [
    Color::rgb(255, 220, 160),
    Color::rgb(160, 200, 255),
    Color::rgb(255, 140, 120),
    Color::rgb(170, 255, 170),
];

pub struct DemoScene {
    pub metrics: MapMetrics,
    pub width: i32,
    pub tiles: Vec<TileCoord>,
    pub floor: Vec<TileCoord>,
    pub edges: EdgeSet,
    pub lights: Vec<Light>,
    pub wall_texture: TextureId,
    pub visibility: VisibilityConfig,
}

fn inflate(rect: Rect, amount: f32) -> Rect {
    Rect::new(rect.origin.x - amount, rect.origin.y - amount, rect.width + 2.0 * amount, rect.height + 2.0 * amount)
}

/// 16x16 RGBA brick pattern for the walls.
pub fn brick_texture() -> (u32, u32, Vec<u8>) {
    let size = 16u32;
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let shifted = if (y / 4) % 2 == 0 { x } else { x + 4 };
            let mortar = y % 4 == 0 || shifted % 8 == 0;
            let texel = if mortar { [70, 65, 60, 255] } else { [150, 80, 60, 255] };
            rgba.extend_from_slice(&texel);
        }
    }
    (size, size, rgba)
}

impl DemoScene {
    pub fn generate<R: Rng + ?Sized>(config: &EngineConfig, wall_texture: TextureId, light_count: usize, rng: &mut R) -> Self {
        let map = &config.map;
        let mut tiles = random_tiles(map.width, map.height, map.density, rng);
        let center = TileCoord::new(map.width / 2, map.height / 2);
        carve_clearing(&mut tiles, center, 2);

        let metrics = MapMetrics::new(map.height, map.unit_width, map.unit_height);
        let edges = build_edges(&tiles, &metrics);

        let radius = 8.0 * map.unit_width.max(map.unit_height);
        let mut lights = vec![Light::new(VIEWER_LIGHT, metrics.tile_rect(center).center(), radius, 1.0)];
        for (i, cell) in open_cells(&tiles, map.width, map.height, light_count, rng).into_iter().enumerate() {
            let id = LightId(i as u32 + 1);
            let light = Light::new(id, metrics.tile_rect(cell).center(), radius * 0.75, 0.8)
                .with_color(LIGHT_COLORS[i % LIGHT_COLORS.len()]);
            lights.push(light);
        }

        let solid: std::collections::HashSet<TileCoord> = tiles.iter().copied().collect();
        let floor = (0..map.height)
            .flat_map(|row| (0..map.width).map(move |col| TileCoord::new(col, row)))
            .filter(|t| !solid.contains(t))
            .collect();

        log::info!(
            "generated {}x{} map: {} walls, {} edges, {} lights",
            map.width,
            map.height,
            tiles.len(),
            edges.edges.len(),
            lights.len()
        );

        Self {
            metrics,
            width: map.width,
            tiles,
            floor,
            edges,
            lights,
            wall_texture,
            visibility: config.visibility,
        }
    }

    pub fn world_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            self.width as f32 * self.metrics.unit_width,
            self.metrics.map_height as f32 * self.metrics.unit_height,
        )
    }

    pub fn move_viewer(&mut self, position: Point2) {
        if let Some(viewer) = self.lights.iter_mut().find(|l| l.id == VIEWER_LIGHT) {
            viewer.position = position;
        }
    }

    pub fn viewer(&self) -> Option<&Light> {
        self.lights.iter().find(|l| l.id == VIEWER_LIGHT)
    }

    /// Accumulates one frame. In shadow mode each tile is recorded against
    /// every light whose visibility polygon reaches it.
    pub fn draw<B: GraphicsBackend>(&self, renderer: &mut Renderer<B>) -> RenderResult<usize> {
        let mut visible_points = 0;
        let slack = 0.01 * self.metrics.unit_width.min(self.metrics.unit_height);

        for light in &self.lights {
            let polygon = compute_visibility(&self.edges.edges, &self.edges.points, light.position, &self.visibility);
            visible_points += polygon.len();
            let reach = light.radius + self.metrics.unit_width.max(self.metrics.unit_height);

            for tile in &self.floor {
                let rect = self.metrics.tile_rect(*tile);
                if rect.center().distance(&light.position) <= reach && polygon.overlaps_rect(&inflate(rect, -slack)) {
                    renderer.draw_square(rect, FLOOR_COLOR, Some(light.id))?;
                }
            }
            for tile in &self.tiles {
                let rect = self.metrics.tile_rect(*tile);
                if rect.center().distance(&light.position) <= reach && polygon.overlaps_rect(&inflate(rect, slack)) {
                    renderer.draw_texture(TexturedQuad::new(rect, self.wall_texture), WALL_TINT, Some(light.id))?;
                }
            }
            renderer.draw_light(light)?;
        }

        if let Some(viewer) = self.viewer() {
            let extent = self.world_rect().width + self.world_rect().height;
            for triangle in shadow_triangles(&self.edges.edges, viewer.position, extent) {
                renderer.draw_light_mask(triangle)?;
            }
            // Unlit overlay: the viewer marker and a crosshair.
            renderer.draw_circle(Circle::new(viewer.position, 4.0, 0), Color::WHITE, None)?;
            let arm = Point2::new(8.0, 0.0);
            renderer.draw_line(Segment::new(viewer.position - arm, viewer.position + arm), Color::WHITE, None)?;
        }
        Ok(visible_points)
    }

    /// Everything unlit, for default mode.
    pub fn draw_unlit<B: GraphicsBackend>(&self, renderer: &mut Renderer<B>) -> RenderResult<()> {
        for tile in &self.floor {
            renderer.draw_square(self.metrics.tile_rect(*tile), FLOOR_COLOR, None)?;
        }
        for tile in &self.tiles {
            renderer.draw_texture(TexturedQuad::new(self.metrics.tile_rect(*tile), self.wall_texture), WALL_TINT, None)?;
        }
        for light in &self.lights {
            renderer.draw_point(light.position, light.color, None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen2d::rendering_lib::backend::BlendMode;
    use lumen2d::rendering_lib::recording::RecordingBackend;
    use lumen2d::rendering_lib::renderer::RenderMode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.map.width = 12;
        config.map.height = 10;
        config.map.density = 0.1;
        config
    }

    fn renderer(mode: RenderMode) -> Renderer<RecordingBackend> {
        let mut backend = RecordingBackend::new();
        backend.register_texture(TextureId(0));
        let mut renderer = Renderer::new(backend, mode);
        renderer.init().unwrap();
        renderer
    }

    #[test]
    fn brick_texture_is_rgba8() {
        let (w, h, rgba) = brick_texture();
        assert_eq!(rgba.len(), (w * h * 4) as usize);
    }

    #[test]
    fn viewer_starts_in_clearing() {
        let scene = DemoScene::generate(&small_config(), TextureId(0), 2, &mut StdRng::seed_from_u64(5));
        let viewer = scene.viewer().unwrap();
        let tile = scene.metrics.world_to_tile(viewer.position);
        assert!(!scene.tiles.contains(&tile));
        assert!(scene.lights.len() <= 3);
    }

    #[test]
    fn shadow_frame_renders_through_pipeline() {
        let mut scene = DemoScene::generate(&small_config(), TextureId(0), 2, &mut StdRng::seed_from_u64(11));
        let mut renderer = renderer(RenderMode::Shadow);
        renderer.set_lights(&scene.lights);
        let nudged = scene.viewer().unwrap().position + Point2::new(3.0, 2.0);
        scene.move_viewer(nudged);

        renderer.begin();
        let points = scene.draw(&mut renderer).unwrap();
        let stats = renderer.end(&scene.lights).unwrap();

        assert!(points > 0);
        assert!(stats.draw_calls > 0);
        assert!(stats.lights_drawn >= 1);
        assert_eq!(
            renderer.backend().blend_sequence(),
            vec![BlendMode::MASK, BlendMode::VISION_GATE, BlendMode::ADDITIVE, BlendMode::STANDARD_ALPHA]
        );
    }

    #[test]
    fn unlit_frame_draws_every_tile() {
        let scene = DemoScene::generate(&small_config(), TextureId(0), 1, &mut StdRng::seed_from_u64(3));
        let mut renderer = renderer(RenderMode::Default);
        renderer.begin();
        scene.draw_unlit(&mut renderer).unwrap();
        let stats = renderer.end(&scene.lights).unwrap();
        let expected = scene.floor.len() + scene.tiles.len() + scene.lights.len();
        assert_eq!(stats.draw_calls as usize, expected);
    }
}
