// src/app.rs

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::{event::WindowEvent, window::Window};

use lumen2d::config::EngineConfig;
use lumen2d::engine_lib::camera::Camera2D;
use lumen2d::engine_lib::controller::CameraController;
use lumen2d::rendering_lib::error::{BackendError, RenderError};
use lumen2d::rendering_lib::renderer::{FrameStats, RenderMode, Renderer};
use lumen2d::rendering_lib::wgpu_backend::WgpuBackend;

use crate::demo_scene::{brick_texture, DemoScene};
use crate::ui::{build_ui, UiState};

const DEMO_LIGHTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("could not open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    SurfaceFrame(#[from] wgpu::SurfaceError),
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Render(err.into())
    }
}

pub struct LightingApp {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    renderer: Renderer<WgpuBackend>,
    scene: DemoScene,
    camera: Camera2D,
    camera_controller: CameraController,
    clear_color: wgpu::Color,
    stats: FrameStats,
    visible_points: usize,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl LightingApp {
    pub async fn new(window: Arc<Window>, engine_config: &EngineConfig) -> Result<Self, AppError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(AppError::NoAdapter)?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(AppError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut backend = WgpuBackend::new(device.clone(), queue.clone(), config.format);
        let (tex_w, tex_h, rgba) = brick_texture();
        let wall_texture = backend.create_texture(tex_w, tex_h, &rgba)?;

        let mut rng = match engine_config.map.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let scene = DemoScene::generate(engine_config, wall_texture, DEMO_LIGHTS, &mut rng);

        let mut renderer = Renderer::new(backend, engine_config.renderer.mode)
            .with_circle_segments(engine_config.renderer.circle_segments);
        renderer.init()?;
        renderer.set_lights(&scene.lights);

        let world = scene.world_rect();
        let zoom = (size.width as f32 / world.width).min(size.height as f32 / world.height).max(0.05);
        let camera = Camera2D::new(world.center().into(), zoom, size.width as f32, size.height as f32);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            renderer,
            scene,
            camera,
            camera_controller: CameraController::new(400.0),
            clear_color: engine_config.clear_color(),
            stats: FrameStats::default(),
            visible_points: 0,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn get_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera.resize(new_size.width as f32, new_size.height as f32);
        }
    }

    fn toggle_mode(&mut self, mode: RenderMode) {
        if mode == self.renderer.mode() {
            return;
        }
        match self.renderer.set_mode(mode) {
            Ok(()) => log::info!("render mode: {:?}", mode),
            Err(err) => log::warn!("{}", err),
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.camera_controller.apply_to_camera(&mut self.camera, dt);
        if let Some(cursor) = self.camera_controller.cursor_world(&self.camera) {
            self.scene.move_viewer(cursor);
        }
        if self.camera_controller.take_toggle_request() {
            let next = match self.renderer.mode() {
                RenderMode::Default => RenderMode::Shadow,
                RenderMode::Shadow => RenderMode::Default,
            };
            self.toggle_mode(next);
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), AppError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        self.renderer.set_view(self.camera.view_rect());
        self.renderer.begin();
        match self.renderer.mode() {
            RenderMode::Default => self.scene.draw_unlit(&mut self.renderer)?,
            RenderMode::Shadow => self.visible_points = self.scene.draw(&mut self.renderer)?,
        }
        self.stats = self.renderer.end(&self.scene.lights)?;
        self.renderer.backend_mut().submit(&mut encoder, &view, self.clear_color)?;

        let ui_state = UiState {
            mode: self.renderer.mode(),
            stats: self.stats,
            visible_points: self.visible_points,
            lights: self.scene.lights.len(),
        };
        let mut picked_mode = ui_state.mode;
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            picked_mode = build_ui(ctx, &ui_state);
        });
        self.egui_state.handle_platform_output(window, full_output.platform_output);
        let tris = self.egui_ctx.tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        self.egui_renderer.update_buffers(&self.device, &self.queue, &mut encoder, &tris, &screen_descriptor);
        {
            let mut gui_render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer.render(&mut gui_render_pass, &tris, &screen_descriptor);
        }
        for tex_id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(tex_id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();

        self.toggle_mode(picked_mode);
        Ok(())
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        if self.egui_state.on_window_event(window, event).consumed {
            return true;
        }
        self.camera_controller.handle_window_event(event)
    }
}
