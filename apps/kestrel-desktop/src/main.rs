mod game;

use anyhow::Result;
use clap::Parser;
use game::SandboxGame;
use kestrel_kernel::{Engine, EngineConfig};
use kestrel_render::FrameRenderer;
use kestrel_render_wgpu::{GpuContext, WgpuRenderer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "kestrel-desktop", about = "Kestrel sandbox")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Window, GPU and UI state created once the event loop resumes.
struct Surface {
    window: Arc<Window>,
    renderer: WgpuRenderer,
    egui_winit: egui_winit::State,
}

struct DesktopApp {
    engine: Engine<SandboxGame>,
    surface: Option<Surface>,
    failure: Option<anyhow::Error>,
}

impl DesktopApp {
    fn new(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config, SandboxGame::new()),
            surface: None,
            failure: None,
        }
    }

    fn create_surface(&self, event_loop: &ActiveEventLoop) -> Result<Surface> {
        let config = &self.engine.context().config;
        let attrs = Window::default_attributes()
            .with_title(config.window.title.clone())
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        let gpu = GpuContext::new(window.clone(), size.width, size.height)?;
        let renderer = WgpuRenderer::new(gpu, config.render.clone())?;

        let egui_winit = egui_winit::State::new(
            renderer.egui_context().clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Ok(Surface {
            window,
            renderer,
            egui_winit,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let raw = surface.egui_winit.take_egui_input(&surface.window);
        surface.renderer.queue_ui_input(raw);

        let report = self.engine.frame_at(
            Instant::now(),
            Some(&mut surface.renderer as &mut dyn FrameRenderer),
        );
        if report.rendered.is_none() {
            tracing::trace!(frame = report.frame, "frame not rendered");
        }
        if let Some(output) = surface.renderer.take_platform_output() {
            surface
                .egui_winit
                .handle_platform_output(&surface.window, output);
        }

        if self.engine.should_quit() {
            event_loop.exit();
        } else {
            surface.window.request_redraw();
        }
    }
}

impl ApplicationHandler for DesktopApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }
        match self.create_surface(event_loop) {
            Ok(surface) => {
                self.engine.init();
                surface.window.request_redraw();
                self.surface = Some(surface);
            }
            Err(e) => {
                tracing::error!("failed to initialize: {e:#}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let response = surface.egui_winit.on_window_event(&surface.window, &event);
        let keyboard = matches!(event, WindowEvent::KeyboardInput { .. });
        if !(response.consumed && keyboard) {
            self.engine.context_mut().input.handle_window_event(&event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => surface.renderer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(surface) = &self.surface {
            surface.window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.engine.shutdown();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    tracing::info!(
        width = config.render.width,
        height = config.render.height,
        "kestrel-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DesktopApp::new(config);
    event_loop.run_app(&mut app)?;

    match app.failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
