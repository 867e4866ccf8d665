//! A minimal viewer: opens a window, imports the given models under the scene
//! root and draws them with the editor overlay until the window is closed.

use std::{path::PathBuf, sync::Arc};

use cgmath::Deg;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    camera::Camera,
    config::RendererConfig,
    context::Context,
    render::{FrameRenderer, FrameTimer},
    resources::{FallbackTextures, Skybox},
    scene::Scene,
};

struct ViewerState {
    ctx: Context,
    scene: Scene,
    renderer: FrameRenderer,
    camera: Camera,
    timer: FrameTimer,
}

impl ViewerState {
    fn new(ctx: Context, config: &RendererConfig, models: &[PathBuf]) -> anyhow::Result<Self> {
        let mut ctx = ctx;
        let fallbacks = FallbackTextures::load(&mut ctx, config)?;
        let mut scene = Scene::new();
        for path in models {
            let path = if path.is_relative() && !path.exists() {
                config.asset_root.join(path)
            } else {
                path.clone()
            };
            if scene.load_model(&mut ctx, &path, None).is_none() {
                log::warn!("{:?} was not loaded", path);
            }
        }
        let mut renderer = FrameRenderer::new(fallbacks, config);
        if let Some(faces) = config.skybox_paths() {
            match Skybox::load(&mut ctx, &faces) {
                Ok(skybox) => renderer = renderer.with_skybox(skybox),
                Err(e) => log::warn!("drawing without a skybox: {}", e),
            }
        }
        Ok(Self {
            ctx,
            scene,
            renderer,
            camera: Camera::new(config.camera_position, Deg(-90.0), Deg(-10.0)),
            timer: FrameTimer::new(),
        })
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.scene.handle_view_events();
        let projection = self.ctx.projection;
        let selected = self.scene.selected();
        let mut frame = self.ctx.begin_frame()?;
        let stats = self
            .renderer
            .render(&self.scene.registry, &self.camera, &projection, &mut frame);
        self.renderer.render_overlay(
            &self.scene.registry,
            &self.camera,
            &projection,
            selected,
            &mut frame,
        );
        frame.finish();
        if stats.skipped > 0 {
            log::debug!("{} draws skipped this frame", stats.skipped);
        }
        self.timer.tick();
        Ok(())
    }
}

pub struct Viewer {
    config: RendererConfig,
    models: Vec<PathBuf>,
    async_runtime: tokio::runtime::Runtime,
    state: Option<ViewerState>,
}

impl Viewer {
    fn new(config: RendererConfig, models: Vec<PathBuf>) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            models,
            async_runtime: tokio::runtime::Runtime::new()?,
            state: None,
        })
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let attributes = Window::default_attributes().with_title("forward-ngin");
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let state = self
            .async_runtime
            .block_on(Context::new(window, &self.config))
            .and_then(|ctx| ViewerState::new(ctx, &self.config, &self.models));
        match state {
            Ok(state) => {
                state.ctx.window().request_redraw();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("renderer initialisation failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(state) = &mut self.state else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.ctx.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                match state.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window().inner_size();
                        state.ctx.resize(size.width, size.height);
                    }
                    Err(e) => log::error!("Unable to render {}", e),
                }
                state.ctx.window().request_redraw();
            }
            _ => {}
        }
    }
}

/// Open a window showing `models` and block until it is closed.
pub fn run(config: RendererConfig, models: Vec<PathBuf>) -> anyhow::Result<()> {
    crate::init_logger();
    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::new(config, models)?;
    event_loop.run_app(&mut viewer)?;
    Ok(())
}
