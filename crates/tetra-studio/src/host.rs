//! Windowed host: one winit window showing the live view.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use parking_lot::Mutex;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use tetra_engine::device::{Gpu, GpuInit};
use tetra_engine::driver::{LiveView, RenderResources};
use tetra_engine::gpu::WgpuAllocator;
use tetra_engine::handle::Handle;
use tetra_engine::render::RenderConfig;
use tetra_engine::scene::{SharedScene, ViewportStatus};

use crate::engine::{self, DemoEngine};

/// Sent from the engine thread when a new viewport state was published.
#[derive(Debug, Clone, Copy)]
pub enum HostEvent {
    SceneChanged,
}

#[derive(Debug, Clone)]
pub struct HostConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub presentation: bool,
    pub texture: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "tetra studio".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            presentation: false,
            texture: None,
        }
    }
}

/// Runs the event loop until the window closes.
pub fn run(config: HostConfig, gpu_init: GpuInit) -> Result<()> {
    let event_loop = EventLoop::<HostEvent>::with_user_event()
        .build()
        .context("failed to create winit EventLoop")?;

    let mut host = Host::new(config, gpu_init, event_loop.create_proxy());

    event_loop
        .run_app(&mut host)
        .context("winit event loop terminated with error")?;

    Ok(())
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

struct Host {
    config: HostConfig,
    gpu_init: GpuInit,
    proxy: Mutex<EventLoopProxy<HostEvent>>,
    scene: SharedScene,

    entry: Option<WindowEntry>,
    live: Option<LiveView>,
    engine: Option<DemoEngine>,
    last_status: Option<ViewportStatus>,
    exit_requested: bool,
}

impl Host {
    fn new(config: HostConfig, gpu_init: GpuInit, proxy: EventLoopProxy<HostEvent>) -> Self {
        let aspect = config.initial_size.width / config.initial_size.height.max(1.0);
        Self {
            config,
            gpu_init,
            proxy: Mutex::new(proxy),
            scene: SharedScene::new(engine::initial_viewport(aspect)),
            entry: None,
            live: None,
            engine: None,
            last_status: None,
            exit_requested: false,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();
        let entry = WindowEntryTryBuilder {
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()?;

        let (resources, mut live) = entry.with_gpu(|gpu| -> Result<_> {
            let allocator = WgpuAllocator::new(gpu.device().clone(), gpu.queue().clone());
            let resources = RenderResources::new(allocator, RenderConfig::default())?;
            let live = LiveView::new(
                resources.clone(),
                self.scene.clone(),
                gpu.adapter(),
                gpu.surface_format(),
            );
            Ok((resources, live))
        })?;

        live.set_point_scale(entry.borrow_window().scale_factor() as f32);
        live.set_presentation(self.config.presentation);

        let texture = match &self.config.texture {
            Some(path) => resources.textures.poll_id(path),
            None => Handle::NONE,
        };
        let buffers = resources.buffers.clone();
        engine::populate(&self.scene, texture, |old| buffers.release_mesh(old));

        let proxy = self.proxy.lock().clone();
        let proxy = Mutex::new(proxy);
        self.scene.viewport.set_waker(move || {
            let _ = proxy.lock().send_event(HostEvent::SceneChanged);
        });

        self.engine = Some(DemoEngine::spawn(self.scene.clone()));
        entry.borrow_window().request_redraw();
        self.entry = Some(entry);
        self.live = Some(live);
        Ok(())
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.scene.viewport.clear_waker();
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }
        self.live = None;
        self.entry = None;
        self.exit_requested = true;
        event_loop.exit();
    }

    fn request_redraw(&self) {
        if let Some(entry) = &self.entry {
            entry.borrow_window().request_redraw();
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(entry), Some(live)) = (self.entry.as_mut(), self.live.as_mut()) else {
            return;
        };

        if let Err(err) = entry.with_gpu_mut(|gpu| live.redraw(gpu)) {
            log::error!("live view failed: {err:#}");
            self.shutdown(event_loop);
            return;
        }

        let Some(status) = live.frame_cache().map(|cache| cache.status) else {
            return;
        };
        if self.last_status != Some(status) {
            self.last_status = Some(status);
            let title = format!("{} [{status:?}]", self.config.title);
            entry.borrow_window().set_title(&title);
        }
    }
}

impl ApplicationHandler<HostEvent> for Host {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("failed to create window: {e:#}");
            self.shutdown(event_loop);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::SceneChanged => {
                let needs = match (&self.entry, &self.live) {
                    (Some(entry), Some(live)) => {
                        let size = entry.borrow_window().inner_size();
                        live.needs_redraw(size.width, size.height)
                    }
                    _ => false,
                };
                if needs {
                    self.request_redraw();
                }
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                }
                self.request_redraw();
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                if let Some(live) = self.live.as_mut() {
                    live.set_point_scale(scale_factor as f32);
                }
                if let Some(entry) = self.entry.as_mut() {
                    let size = entry.borrow_window().inner_size();
                    entry.with_gpu_mut(|gpu| gpu.resize(size));
                }
                self.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => self.shutdown(event_loop),
                    PhysicalKey::Code(KeyCode::KeyP) => {
                        self.config.presentation = !self.config.presentation;
                        if let Some(live) = self.live.as_mut() {
                            live.set_presentation(self.config.presentation);
                        }
                        self.request_redraw();
                    }
                    _ => {}
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }
    }
}
