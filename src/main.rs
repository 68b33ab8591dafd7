// src/main.rs

mod app;
mod demo_scene;
mod ui;

use std::sync::Arc;

use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
    window::WindowBuilder,
};

use app::{AppError, LightingApp};
use lumen2d::config::EngineConfig;
use lumen2d::logging::init_logging;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

const DEFAULT_CONFIG_PATH: &str = "lumen2d.toml";

fn load_config() -> EngineConfig {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    match EngineConfig::load_or_default(&path) {
        Ok(config) => config,
        Err(err) => {
            // Logging is not up yet; the config decides its filter.
            eprintln!("ignoring config {}: {}", path, err);
            EngineConfig::default()
        }
    }
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub async fn run() {
    let config = load_config();
    init_logging(config.logging.filter.as_deref());

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("could not create event loop: {}", err);
            return;
        }
    };
    let window = match WindowBuilder::new()
        .with_title("lumen2d")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 960))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            log::error!("could not create window: {}", err);
            return;
        }
    };

    #[cfg(target_arch = "wasm32")]
    {
        use winit::platform::web::WindowExtWebSys;
        let attached = web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| {
                let dst = doc.get_element_by_id("wasm-viewport")?;
                let canvas = web_sys::Element::from(window.canvas()?);
                dst.append_child(&canvas).ok()?;
                Some(())
            });
        if attached.is_none() {
            log::error!("couldn't append canvas to document body");
            return;
        }
    }

    let mut app_state = match LightingApp::new(window.clone(), &config).await {
        Ok(app) => app,
        Err(err) => {
            log::error!("startup failed: {}", err);
            return;
        }
    };
    let mut last_time = std::time::Instant::now();

    let result = event_loop.run(move |event, target: &EventLoopWindowTarget<()>| {
        target.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                if !app_state.handle_window_event(event, &window) {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::Resized(physical_size) => app_state.resize(*physical_size),
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                let now = std::time::Instant::now();
                let dt = (now - last_time).as_secs_f32();
                last_time = now;

                app_state.update(dt);
                match app_state.render(&window) {
                    Ok(()) => {}
                    Err(AppError::SurfaceFrame(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        app_state.resize(app_state.get_size());
                    }
                    Err(AppError::SurfaceFrame(wgpu::SurfaceError::Timeout)) => log::warn!("surface timeout"),
                    Err(err) => {
                        log::error!("fatal: {}", err);
                        target.exit();
                    }
                }

                if !target.exiting() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    });
    if let Err(err) = result {
        log::error!("event loop error: {}", err);
    }
}

#[tokio::main]
async fn main() {
    run().await;
}
