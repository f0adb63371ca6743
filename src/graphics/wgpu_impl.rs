//! wgpu backing for [`GraphicsContext`](super::GraphicsContext).

use std::sync::Arc;

use winit::window::Window;

use super::{clamp_extent, GraphicsError, PaintTargets};
use crate::logger::{self, STATUS_OK};

/// The acquired back buffer and the view drawn into this frame.
struct RenderTarget {
    texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

/// Device, queue, surface and render target. Fields are declared in reverse
/// creation order so an implicit drop also releases them correctly.
pub(super) struct WgpuDevice {
    render_target: Option<RenderTarget>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: wgpu::SurfaceConfiguration,
    queue: Option<wgpu::Queue>,
    device: Option<wgpu::Device>,
    _adapter: wgpu::Adapter,
    _instance: wgpu::Instance,
}

impl WgpuDevice {
    pub(super) fn initialize(window: Arc<Window>, vsync: bool) -> Result<Self, GraphicsError> {
        pollster::block_on(Self::initialize_async(window, vsync))
    }

    async fn initialize_async(window: Arc<Window>, vsync: bool) -> Result<Self, GraphicsError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| GraphicsError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GraphicsError::AdapterNotFound)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Host Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| GraphicsError::DeviceCreationFailed(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let present_mode = if vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let max_size = device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_extent(size.width, size.height, max_size);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &surface_config);

        Ok(Self {
            render_target: None,
            surface: Some(surface),
            surface_config,
            queue: Some(queue),
            device: Some(device),
            _adapter: adapter,
            _instance: instance,
        })
    }

    pub(super) fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        let surface = self.surface.as_ref().ok_or(GraphicsError::NotInitialized)?;
        let texture = surface.get_current_texture().map_err(map_surface_error)?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.render_target = Some(RenderTarget { texture, view });
        Ok(())
    }

    pub(super) fn release_render_target(&mut self) {
        // Dropping an unpresented SurfaceTexture hands it back to the surface.
        self.render_target = None;
    }

    pub(super) fn has_render_target(&self) -> bool {
        self.render_target.is_some()
    }

    pub(super) fn reconfigure(&mut self, width: u32, height: u32) {
        let (device, surface) = match (self.device.as_ref(), self.surface.as_ref()) {
            (Some(device), Some(surface)) => (device, surface),
            _ => return,
        };
        let max_size = device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_extent(width, height, max_size);
        self.surface_config.width = width;
        self.surface_config.height = height;
        surface.configure(device, &self.surface_config);
    }

    pub(super) fn surface_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    pub(super) fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    pub(super) fn device(&self) -> Option<&wgpu::Device> {
        self.device.as_ref()
    }

    pub(super) fn paint_targets(&self) -> Option<PaintTargets<'_>> {
        let device = self.device.as_ref()?;
        let queue = self.queue.as_ref()?;
        let view = &self.render_target.as_ref()?.view;
        Some(PaintTargets { device, queue, view })
    }

    pub(super) fn present(&mut self) -> Result<(), GraphicsError> {
        let target = self
            .render_target
            .take()
            .ok_or(GraphicsError::NoRenderTarget)?;
        target.texture.present();
        Ok(())
    }

    pub(super) fn teardown(&mut self) {
        if self.render_target.take().is_some() {
            logger::record(STATUS_OK, "render target released");
        }
        if self.surface.take().is_some() {
            logger::record(STATUS_OK, "presentation surface released");
        }
        if self.queue.take().is_some() {
            logger::record(STATUS_OK, "submission queue released");
        }
        if self.device.take().is_some() {
            logger::record(STATUS_OK, "graphics device released");
        }
    }
}

fn map_surface_error(e: wgpu::SurfaceError) -> GraphicsError {
    match e {
        wgpu::SurfaceError::Lost => GraphicsError::SurfaceLost,
        wgpu::SurfaceError::Outdated => GraphicsError::SurfaceOutdated,
        wgpu::SurfaceError::OutOfMemory => GraphicsError::OutOfMemory,
        other => GraphicsError::AcquireFailed(other.to_string()),
    }
}
