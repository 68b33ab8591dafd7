// src/rendering_lib/renderer.rs

use serde::{Deserialize, Serialize};

use crate::engine_lib::light::{find_light, Light, LightId};
use crate::geometry::{Circle, Point2, Rect, Segment, TexturedQuad, Triangle};

use super::backend::{BlendMode, GraphicsBackend, ProgramId, ProgramSource, UniformId, UniformValue, VertexArrayId};
use super::batch::{BufferKind, DrawBatchEntry, TexturedEntry, VertexBatcher};
use super::error::{RegistryError, RenderError, RenderResult};
use super::registry::{VisibleAreaRegistry, VisibleDraw};
use super::shader::{
    GEOMETRY_PROGRAM, LIGHT_PROGRAM, PLAIN_ATTRIBUTES, TEXTURED_ATTRIBUTES, TEXTURE_PROGRAM, UNIFORM_ASSET,
    UNIFORM_LIGHT_CENTER, UNIFORM_LIGHT_INTENSITY, UNIFORM_LIGHT_RADIUS, UNIFORM_VIEW, VISION_PROGRAM,
    VISION_TEXTURE_PROGRAM,
};
use super::vertex::{Color, VertexAttribute};

pub const DEFAULT_CIRCLE_SEGMENTS: u32 = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Everything drawn unlit under standard alpha blending.
    #[default]
    Default,
    /// Output restricted to what the registered lights can see.
    Shadow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Accumulating,
    Flushing,
}

impl FrameState {
    fn name(self) -> &'static str {
        match self {
            FrameState::Idle => "idle",
            FrameState::Accumulating => "accumulating",
            FrameState::Flushing => "flushing",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub geometry_vertices: u32,
    pub texture_vertices: u32,
    pub light_vertices: u32,
    pub lights_drawn: u32,
}

#[derive(Clone, Copy, Debug)]
struct LitProgram {
    id: ProgramId,
    view: UniformId,
    center: UniformId,
    radius: UniformId,
    intensity: UniformId,
}

#[derive(Clone, Copy, Debug)]
struct GpuState {
    geometry_array: VertexArrayId,
    texture_array: VertexArrayId,
    light_array: VertexArrayId,
    geometry: (ProgramId, UniformId),
    texture: (ProgramId, UniformId, UniformId),
    light: (ProgramId, UniformId, UniformId),
    vision: LitProgram,
    vision_texture: (LitProgram, UniformId),
}

impl GpuState {
    fn array(&self, kind: BufferKind) -> VertexArrayId {
        match kind {
            BufferKind::Geometry => self.geometry_array,
            BufferKind::Texture => self.texture_array,
            BufferKind::Light => self.light_array,
        }
    }
}

/// Frame pipeline: `begin()`, any number of draw calls, then `end()`.
///
/// Draw calls only append to CPU-side buffers. `end()` uploads each buffer
/// once and replays the recorded batches in pass order.
pub struct Renderer<B: GraphicsBackend> {
    backend: B,
    gpu: Option<GpuState>,
    mode: RenderMode,
    state: FrameState,
    view: Rect,
    circle_segments: u32,

    batcher: VertexBatcher,
    registry: VisibleAreaRegistry,
    geometry_entries: Vec<DrawBatchEntry>,
    textured_entries: Vec<TexturedEntry>,
    mask_entries: Vec<DrawBatchEntry>,
    glow_entries: Vec<(LightId, DrawBatchEntry)>,
}

impl<B: GraphicsBackend> Renderer<B> {
    pub fn new(backend: B, mode: RenderMode) -> Self {
        Self {
            backend,
            gpu: None,
            mode,
            state: FrameState::Idle,
            view: Rect::new(0.0, 0.0, 1.0, 1.0),
            circle_segments: DEFAULT_CIRCLE_SEGMENTS,
            batcher: VertexBatcher::new(),
            registry: VisibleAreaRegistry::new(),
            geometry_entries: Vec::new(),
            textured_entries: Vec::new(),
            mask_entries: Vec::new(),
            glow_entries: Vec::new(),
        }
    }

    pub fn with_circle_segments(mut self, segments: u32) -> Self {
        self.circle_segments = segments;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn registry(&self) -> &VisibleAreaRegistry {
        &self.registry
    }

    pub fn batcher(&self) -> &VertexBatcher {
        &self.batcher
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// World rectangle mapped onto the render target.
    pub fn set_view(&mut self, view: Rect) {
        self.view = view;
    }

    /// Only between frames.
    pub fn set_mode(&mut self, mode: RenderMode) -> RenderResult<()> {
        if self.state != FrameState::Idle {
            return Err(self.sequence_error("set_mode"));
        }
        self.mode = mode;
        Ok(())
    }

    /// Creates vertex arrays and programs on first call; later calls do nothing.
    pub fn init(&mut self) -> RenderResult<()> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let plain = [VertexAttribute::Position, VertexAttribute::Color];
        let textured = [VertexAttribute::Position, VertexAttribute::Color, VertexAttribute::Uv];
        let geometry_array = self.backend.create_vertex_array(&plain)?;
        let texture_array = self.backend.create_vertex_array(&textured)?;
        let light_array = self.backend.create_vertex_array(&textured)?;

        let geometry = self.program(&GEOMETRY_PROGRAM, PLAIN_ATTRIBUTES)?;
        let geometry_view = self.backend.uniform_location(geometry, UNIFORM_VIEW)?;

        let texture = self.program(&TEXTURE_PROGRAM, TEXTURED_ATTRIBUTES)?;
        let texture_view = self.backend.uniform_location(texture, UNIFORM_VIEW)?;
        let texture_asset = self.backend.uniform_location(texture, UNIFORM_ASSET)?;

        let light = self.program(&LIGHT_PROGRAM, TEXTURED_ATTRIBUTES)?;
        let light_view = self.backend.uniform_location(light, UNIFORM_VIEW)?;
        let light_intensity = self.backend.uniform_location(light, UNIFORM_LIGHT_INTENSITY)?;

        let vision = self.program(&VISION_PROGRAM, PLAIN_ATTRIBUTES)?;
        let vision = self.lit_program(vision)?;

        let vision_texture = self.program(&VISION_TEXTURE_PROGRAM, TEXTURED_ATTRIBUTES)?;
        let vision_texture_asset = self.backend.uniform_location(vision_texture, UNIFORM_ASSET)?;
        let vision_texture = self.lit_program(vision_texture)?;

        self.gpu = Some(GpuState {
            geometry_array,
            texture_array,
            light_array,
            geometry: (geometry, geometry_view),
            texture: (texture, texture_view, texture_asset),
            light: (light, light_view, light_intensity),
            vision,
            vision_texture: (vision_texture, vision_texture_asset),
        });
        log::debug!("renderer initialized in {:?} mode", self.mode);
        Ok(())
    }

    fn program(&mut self, source: &ProgramSource<'_>, attributes: &[&str]) -> RenderResult<ProgramId> {
        let id = self.backend.create_program(source, attributes)?;
        log::debug!("created program '{}' ({:?})", source.label, id);
        Ok(id)
    }

    fn lit_program(&mut self, id: ProgramId) -> RenderResult<LitProgram> {
        Ok(LitProgram {
            id,
            view: self.backend.uniform_location(id, UNIFORM_VIEW)?,
            center: self.backend.uniform_location(id, UNIFORM_LIGHT_CENTER)?,
            radius: self.backend.uniform_location(id, UNIFORM_LIGHT_RADIUS)?,
            intensity: self.backend.uniform_location(id, UNIFORM_LIGHT_INTENSITY)?,
        })
    }

    /// Rebuilds the visible-area keys to exactly this light set.
    pub fn set_lights(&mut self, lights: &[Light]) {
        self.registry.set_lights(lights);
    }

    /// Adds one light to the visible-area keys. Re-registering empties its lists.
    pub fn register_light(&mut self, light: &Light) {
        self.registry.register_light(light);
    }

    /// Later draws for `id` are rejected and its passes are skipped.
    /// Returns `false` if `id` was not registered.
    pub fn unregister_light(&mut self, id: LightId) -> bool {
        let removed = self.registry.unregister_light(id);
        if removed {
            self.glow_entries.retain(|(owner, _)| *owner != id);
        }
        removed
    }

    /// Starts a frame, discarding anything accumulated since the last `begin()`.
    pub fn begin(&mut self) {
        self.backend.discard_pending();
        self.batcher.reset();
        self.registry.clear_entries();
        self.geometry_entries.clear();
        self.textured_entries.clear();
        self.mask_entries.clear();
        self.glow_entries.clear();
        self.state = FrameState::Accumulating;
    }

    fn sequence_error(&self, operation: &'static str) -> RenderError {
        RenderError::Sequence { operation, state: self.state.name() }
    }

    fn check_accumulating(&self, operation: &'static str) -> RenderResult<()> {
        if self.state != FrameState::Accumulating {
            return Err(self.sequence_error(operation));
        }
        Ok(())
    }

    /// The light a shape should be recorded against, or `None` for the default set.
    fn target_light(&self, light: Option<LightId>) -> RenderResult<Option<LightId>> {
        match (self.mode, light) {
            (RenderMode::Shadow, Some(id)) => {
                if !self.registry.contains(id) {
                    log::warn!("draw for unregistered {}", id);
                    return Err(RegistryError::UnknownLight(id).into());
                }
                Ok(Some(id))
            }
            _ => Ok(None),
        }
    }

    fn record_geometry(&mut self, entry: Option<DrawBatchEntry>, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        let Some(entry) = entry else {
            return Ok(None);
        };
        match light {
            Some(id) => self.registry.record_visible(id, VisibleDraw::Opaque(entry))?,
            None => self.geometry_entries.push(entry),
        }
        Ok(Some(entry))
    }

    pub fn draw_square(&mut self, rect: Rect, color: Color, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_square")?;
        let light = self.target_light(light)?;
        let entry = self.batcher.append_square(BufferKind::Geometry, rect, color)?;
        self.record_geometry(entry, light)
    }

    /// A circle with `segments == 0` uses the renderer's configured segment count.
    pub fn draw_circle(&mut self, mut circle: Circle, color: Color, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_circle")?;
        let light = self.target_light(light)?;
        if circle.segments == 0 {
            circle.segments = self.circle_segments;
        }
        let entry = self.batcher.append_circle(BufferKind::Geometry, circle, color)?;
        self.record_geometry(entry, light)
    }

    pub fn draw_line(&mut self, segment: Segment, color: Color, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_line")?;
        let light = self.target_light(light)?;
        let entry = self.batcher.append_line(BufferKind::Geometry, segment, color)?;
        self.record_geometry(entry, light)
    }

    pub fn draw_point(&mut self, point: Point2, color: Color, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_point")?;
        let light = self.target_light(light)?;
        let entry = self.batcher.append_point(BufferKind::Geometry, point, color)?;
        self.record_geometry(entry, light)
    }

    pub fn draw_triangle(&mut self, triangle: Triangle, color: Color, light: Option<LightId>) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_triangle")?;
        let light = self.target_light(light)?;
        let entry = self.batcher.append_triangle(BufferKind::Geometry, triangle, color)?;
        self.record_geometry(entry, light)
    }

    pub fn draw_texture(&mut self, quad: TexturedQuad, color: Color, light: Option<LightId>) -> RenderResult<Option<TexturedEntry>> {
        self.check_accumulating("draw_texture")?;
        let light = self.target_light(light)?;
        let Some(entry) = self.batcher.append_textured_quad(BufferKind::Texture, quad, color)? else {
            return Ok(None);
        };
        match light {
            Some(id) => self.registry.record_visible(id, VisibleDraw::Textured(entry))?,
            None => self.textured_entries.push(entry),
        }
        Ok(Some(entry))
    }

    /// Glow quad for `light`, drawn additively in shadow mode. Ignored in default mode.
    pub fn draw_light(&mut self, light: &Light) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_light")?;
        if self.mode == RenderMode::Default {
            return Ok(None);
        }
        let id = self.target_light(Some(light.id))?;
        let entry = self.batcher.append_light_quad(BufferKind::Light, light)?;
        if let (Some(id), Some(entry)) = (id, entry) {
            self.glow_entries.push((id, entry));
        }
        Ok(entry)
    }

    /// Occluder triangle that hides everything beneath it from the vision pass.
    pub fn draw_light_mask(&mut self, triangle: Triangle) -> RenderResult<Option<DrawBatchEntry>> {
        self.check_accumulating("draw_light_mask")?;
        if self.mode == RenderMode::Default {
            return Ok(None);
        }
        let entry = self.batcher.append_triangle(BufferKind::Geometry, triangle, Color::TRANSPARENT)?;
        if let Some(entry) = entry {
            self.mask_entries.push(entry);
        }
        Ok(entry)
    }

    /// Uploads the frame and issues every pass. `lights` is the caller's light
    /// table, consulted for per-light uniforms.
    pub fn end(&mut self, lights: &[Light]) -> RenderResult<FrameStats> {
        self.check_accumulating("end")?;
        let gpu = self.gpu.ok_or(RenderError::NotInitialized)?;
        if let Err(err) = self.batcher.buffers().verify_offsets() {
            log::error!("{}", err);
            return Err(err);
        }

        self.state = FrameState::Flushing;
        let result = self.flush(&gpu, lights);
        self.state = FrameState::Idle;

        if let Ok(stats) = &result {
            log::debug!(
                "frame flushed: {} draws, {} lights, {}/{}/{} vertices",
                stats.draw_calls,
                stats.lights_drawn,
                stats.geometry_vertices,
                stats.texture_vertices,
                stats.light_vertices
            );
        }
        result
    }

    fn flush(&mut self, gpu: &GpuState, lights: &[Light]) -> RenderResult<FrameStats> {
        let buffers = self.batcher.buffers();
        let mut stats = FrameStats {
            geometry_vertices: buffers.geometry.offset(),
            texture_vertices: buffers.texture.offset(),
            light_vertices: buffers.light.offset(),
            ..FrameStats::default()
        };

        for kind in BufferKind::ALL {
            let buffer = self.batcher.buffers().get(kind);
            if !buffer.is_empty() {
                self.backend.upload_vertices(gpu.array(kind), buffer.vertices())?;
            }
        }

        match self.mode {
            RenderMode::Default => {
                self.backend.set_blend(BlendMode::STANDARD_ALPHA);
                self.draw_default_set(gpu, &mut stats)?;
            }
            RenderMode::Shadow => self.flush_shadow(gpu, lights, &mut stats)?,
        }
        Ok(stats)
    }

    fn view_value(&self) -> UniformValue {
        UniformValue::Vec4([self.view.origin.x, self.view.origin.y, self.view.width, self.view.height])
    }

    fn draw_entries(&mut self, entries: &[DrawBatchEntry], stats: &mut FrameStats) -> RenderResult<()> {
        for entry in entries {
            self.backend.draw(entry.topology, entry.offset, entry.count)?;
            stats.draw_calls += 1;
        }
        Ok(())
    }

    fn draw_textured_entries(&mut self, entries: &[TexturedEntry], stats: &mut FrameStats) -> RenderResult<()> {
        for textured in entries {
            self.backend.bind_texture(0, textured.texture)?;
            self.backend.draw(textured.entry.topology, textured.entry.offset, textured.entry.count)?;
            stats.draw_calls += 1;
        }
        Ok(())
    }

    fn set_light_uniforms(&mut self, program: &LitProgram, light: &Light) -> RenderResult<()> {
        self.backend.set_uniform(program.center, UniformValue::Vec2([light.position.x, light.position.y]))?;
        self.backend.set_uniform(program.radius, UniformValue::Float(light.radius))?;
        self.backend.set_uniform(program.intensity, UniformValue::Float(light.intensity))?;
        Ok(())
    }

    /// Unlit geometry then unlit textures, under whatever blend is current.
    fn draw_default_set(&mut self, gpu: &GpuState, stats: &mut FrameStats) -> RenderResult<()> {
        let view = self.view_value();
        if !self.geometry_entries.is_empty() {
            let (program, view_uniform) = gpu.geometry;
            self.backend.use_program(program)?;
            self.backend.set_uniform(view_uniform, view)?;
            self.backend.bind_vertex_array(gpu.geometry_array)?;
            let entries = std::mem::take(&mut self.geometry_entries);
            let result = self.draw_entries(&entries, stats);
            self.geometry_entries = entries;
            result?;
        }
        if !self.textured_entries.is_empty() {
            let (program, view_uniform, asset) = gpu.texture;
            self.backend.use_program(program)?;
            self.backend.set_uniform(view_uniform, view)?;
            self.backend.set_uniform(asset, UniformValue::Int(0))?;
            self.backend.bind_vertex_array(gpu.texture_array)?;
            let entries = std::mem::take(&mut self.textured_entries);
            let result = self.draw_textured_entries(&entries, stats);
            self.textured_entries = entries;
            result?;
        }
        Ok(())
    }

    fn flush_shadow(&mut self, gpu: &GpuState, lights: &[Light], stats: &mut FrameStats) -> RenderResult<()> {
        let view = self.view_value();
        let keys = self.registry.keys().to_vec();
        let mut lit = Vec::with_capacity(keys.len());
        for id in &keys {
            match find_light(lights, *id) {
                Some(light) => lit.push(*light),
                None => log::warn!("{} is registered but missing from the light table, skipped", id),
            }
        }
        let mut drawn: Vec<LightId> = Vec::new();

        // (i) mask
        self.backend.set_blend(BlendMode::MASK);
        if !self.mask_entries.is_empty() {
            let (program, view_uniform) = gpu.geometry;
            self.backend.use_program(program)?;
            self.backend.set_uniform(view_uniform, view)?;
            self.backend.bind_vertex_array(gpu.geometry_array)?;
            let entries = std::mem::take(&mut self.mask_entries);
            let result = self.draw_entries(&entries, stats);
            self.mask_entries = entries;
            result?;
        }

        // (ii) vision geometry per light
        self.backend.set_blend(BlendMode::VISION_GATE);
        let vision = gpu.vision;
        let mut bound = false;
        for light in &lit {
            let entries = self.registry.opaque(light.id).to_vec();
            if entries.is_empty() {
                continue;
            }
            if !bound {
                self.backend.use_program(vision.id)?;
                self.backend.set_uniform(vision.view, view)?;
                self.backend.bind_vertex_array(gpu.geometry_array)?;
                bound = true;
            }
            self.set_light_uniforms(&vision, light)?;
            self.draw_entries(&entries, stats)?;
            drawn.push(light.id);
        }

        // (iii) glow
        self.backend.set_blend(BlendMode::ADDITIVE);
        if !self.glow_entries.is_empty() {
            let (program, view_uniform, intensity) = gpu.light;
            self.backend.use_program(program)?;
            self.backend.set_uniform(view_uniform, view)?;
            self.backend.bind_vertex_array(gpu.light_array)?;
            let glows = self.glow_entries.clone();
            for (id, entry) in glows {
                let Some(light) = lit.iter().find(|l| l.id == id) else {
                    log::warn!("glow for {} has no light table entry, skipped", id);
                    continue;
                };
                self.backend.set_uniform(intensity, UniformValue::Float(light.intensity))?;
                self.backend.draw(entry.topology, entry.offset, entry.count)?;
                stats.draw_calls += 1;
                drawn.push(id);
            }
        }

        // (iv) visible textures per light, back to standard alpha
        self.backend.set_blend(BlendMode::STANDARD_ALPHA);
        let (vision_texture, asset) = gpu.vision_texture;
        let mut bound = false;
        for light in &lit {
            let entries = self.registry.textured(light.id).to_vec();
            if entries.is_empty() {
                continue;
            }
            if !bound {
                self.backend.use_program(vision_texture.id)?;
                self.backend.set_uniform(vision_texture.view, view)?;
                self.backend.set_uniform(asset, UniformValue::Int(0))?;
                self.backend.bind_vertex_array(gpu.texture_array)?;
                bound = true;
            }
            self.set_light_uniforms(&vision_texture, light)?;
            self.draw_textured_entries(&entries, stats)?;
            drawn.push(light.id);
        }

        // Shapes drawn without a light id stay visible as an unlit overlay.
        self.draw_default_set(gpu, stats)?;

        drawn.sort_unstable();
        drawn.dedup();
        stats.lights_drawn = drawn.len() as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TextureId;
    use crate::rendering_lib::error::BackendError;
    use crate::rendering_lib::recording::{BackendCall, RecordingBackend};

    fn light(id: u32) -> Light {
        Light::new(LightId(id), Point2::new(0.0, 0.0), 10.0, 0.8)
    }

    fn ready(mode: RenderMode) -> Renderer<RecordingBackend> {
        let mut renderer = Renderer::new(RecordingBackend::new(), mode);
        renderer.init().unwrap();
        renderer
    }

    #[test]
    fn init_is_lazy_and_once() {
        let mut renderer = Renderer::new(RecordingBackend::new(), RenderMode::Default);
        assert!(!renderer.is_initialized());
        renderer.init().unwrap();
        let created = renderer.backend().calls().len();
        renderer.init().unwrap();
        assert_eq!(renderer.backend().calls().len(), created);
        let programs = renderer
            .backend()
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateProgram { .. }))
            .count();
        assert_eq!(programs, 5);
    }

    #[test]
    fn failed_program_leaves_renderer_uninitialized() {
        let mut backend = RecordingBackend::new();
        backend.fail_program("vision");
        let mut renderer = Renderer::new(backend, RenderMode::Shadow);
        assert!(matches!(renderer.init(), Err(RenderError::Backend(_))));
        assert!(!renderer.is_initialized());
    }

    #[test]
    fn draw_outside_frame_is_sequence_error() {
        let mut renderer = ready(RenderMode::Default);
        let err = renderer.draw_point(Point2::ZERO, Color::WHITE, None).unwrap_err();
        assert!(matches!(err, RenderError::Sequence { operation: "draw_point", state: "idle" }));
        assert!(matches!(renderer.end(&[]), Err(RenderError::Sequence { operation: "end", .. })));
    }

    #[test]
    fn default_mode_draws_geometry_then_textures() {
        let mut renderer = ready(RenderMode::Default);
        renderer.backend_mut().register_texture(TextureId(1));
        renderer.begin();
        renderer.draw_square(Rect::new(0.0, 0.0, 1.0, 1.0), Color::RED, Some(LightId(9))).unwrap();
        renderer.draw_texture(TexturedQuad::new(Rect::new(2.0, 0.0, 1.0, 1.0), TextureId(1)), Color::WHITE, None).unwrap();
        renderer.draw_circle(Circle::new(Point2::ZERO, 1.0, 0), Color::BLUE, None).unwrap();
        let stats = renderer.end(&[]).unwrap();

        assert_eq!(stats.draw_calls, 3);
        assert_eq!(stats.geometry_vertices, 6 + DEFAULT_CIRCLE_SEGMENTS);
        assert_eq!(renderer.backend().blend_sequence(), vec![BlendMode::STANDARD_ALPHA]);
        assert_eq!(renderer.state(), FrameState::Idle);
        let calls = renderer.backend().calls();
        let asset = calls.iter().position(|c| matches!(c, BackendCall::SetUniform { name, value: UniformValue::Int(0), .. } if name == "asset"));
        let bind = calls.iter().position(|c| matches!(c, BackendCall::BindTexture { .. }));
        assert!(asset.is_some() && bind.is_some() && asset < bind);
    }

    #[test]
    fn unknown_light_appends_nothing() {
        let mut renderer = ready(RenderMode::Shadow);
        renderer.set_lights(&[light(1)]);
        renderer.begin();
        let err = renderer.draw_square(Rect::new(0.0, 0.0, 1.0, 1.0), Color::WHITE, Some(LightId(2))).unwrap_err();
        assert!(matches!(err, RenderError::Registry(RegistryError::UnknownLight(LightId(2)))));
        assert!(renderer.batcher().buffers().geometry.is_empty());
    }

    #[test]
    fn mode_changes_only_between_frames() {
        let mut renderer = ready(RenderMode::Default);
        renderer.begin();
        assert!(renderer.set_mode(RenderMode::Shadow).is_err());
        renderer.end(&[]).unwrap();
        renderer.set_mode(RenderMode::Shadow).unwrap();
        assert_eq!(renderer.mode(), RenderMode::Shadow);
    }

    #[test]
    fn failed_flush_is_discarded_by_next_begin() {
        let mut renderer = ready(RenderMode::Default);
        renderer.begin();
        renderer.draw_square(Rect::new(0.0, 0.0, 1.0, 1.0), Color::RED, None).unwrap();
        renderer.draw_texture(TexturedQuad::new(Rect::new(2.0, 0.0, 1.0, 1.0), TextureId(4)), Color::WHITE, None).unwrap();
        assert!(matches!(renderer.end(&[]), Err(RenderError::Backend(BackendError::InvalidHandle { kind: "texture", id: 4 }))));
        assert_eq!(renderer.state(), FrameState::Idle);
        assert_eq!(renderer.backend().discard_count(), 1);

        renderer.begin();
        assert_eq!(renderer.backend().discard_count(), 2);
        assert!(renderer.batcher().buffers().geometry.is_empty());
    }

    #[test]
    fn unregistered_light_loses_its_glow() {
        let mut renderer = ready(RenderMode::Shadow);
        let lights = [light(1), light(2)];
        renderer.set_lights(&lights);
        renderer.begin();
        renderer.draw_light(&lights[0]).unwrap();
        renderer.draw_light(&lights[1]).unwrap();
        assert!(renderer.unregister_light(LightId(2)));
        assert!(!renderer.unregister_light(LightId(2)));
        let stats = renderer.end(&lights).unwrap();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.lights_drawn, 1);
    }

    #[test]
    fn light_and_mask_are_ignored_in_default_mode() {
        let mut renderer = ready(RenderMode::Default);
        renderer.begin();
        assert!(renderer.draw_light(&light(1)).unwrap().is_none());
        let tri = Triangle::new(Point2::ZERO, Point2::new(1.0, 0.0), Point2::new(0.0, 1.0));
        assert!(renderer.draw_light_mask(tri).unwrap().is_none());
        assert!(renderer.batcher().buffers().light.is_empty());
    }
}
