//! Device, surface and render-target lifecycle.
//!
//! [`GraphicsContext`] owns the GPU device, the command queue, the
//! presentation surface and the currently acquired render target as a unit.
//! Creation order is device+surface first, render target last; teardown is
//! the exact reverse. The render target is invalidated and recreated on every
//! resize, and presentation consumes it, so it is re-acquired at the top of
//! the next frame.
//!
//! The context delegates to one of two backends: the real wgpu backend, or a
//! recording dummy backend that the test suite uses to verify lifecycle
//! ordering without a GPU or a window.

mod dummy;
mod wgpu_impl;

pub use dummy::{new_event_log, DummyOptions, EventLog, LifecycleEvent};

use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

use crate::logger::{self, STATUS_FAIL, STATUS_OK};
use crate::HostConfig;

/// Graphics lifecycle error type.
#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("graphics context already initialized")]
    AlreadyInitialized,
    #[error("graphics context not initialized")]
    NotInitialized,
    #[error("failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("no suitable adapter found")]
    AdapterNotFound,
    #[error("failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("failed to acquire back buffer: {0}")]
    AcquireFailed(String),
    #[error("no render target to present")]
    NoRenderTarget,
    #[error("surface lost")]
    SurfaceLost,
    #[error("surface outdated")]
    SurfaceOutdated,
    #[error("out of device memory")]
    OutOfMemory,
}

/// Borrowed handles needed to record and submit GUI draw data.
pub struct PaintTargets<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub view: &'a wgpu::TextureView,
}

enum DeviceBackend {
    Wgpu(wgpu_impl::WgpuDevice),
    Dummy(dummy::DummyDevice),
}

/// Owner of the device/surface/render-target unit.
///
/// All handles live inside this object; there is no process-wide graphics
/// state. A context starts empty, is populated by [`initialize`] and emptied
/// again by [`teardown`].
///
/// [`initialize`]: GraphicsContext::initialize
/// [`teardown`]: GraphicsContext::teardown
#[derive(Default)]
pub struct GraphicsContext {
    backend: Option<DeviceBackend>,
}

impl GraphicsContext {
    /// Create an empty, uninitialized context.
    pub fn new() -> Self {
        Self { backend: None }
    }

    /// Construct device, queue and a double-buffered surface targeting the
    /// given window at its current size.
    ///
    /// On failure no partial state is kept; calling [`teardown`] afterwards
    /// is safe and releases nothing.
    ///
    /// [`teardown`]: GraphicsContext::teardown
    pub fn initialize(
        &mut self,
        window: Arc<Window>,
        config: &HostConfig,
    ) -> Result<(), GraphicsError> {
        if self.backend.is_some() {
            return Err(GraphicsError::AlreadyInitialized);
        }
        logger::record(STATUS_OK, "creating graphics device and surface");
        match wgpu_impl::WgpuDevice::initialize(window, config.vsync) {
            Ok(device) => {
                self.backend = Some(DeviceBackend::Wgpu(device));
                logger::record(STATUS_OK, "graphics device and surface created");
                Ok(())
            }
            Err(e) => {
                logger::record(STATUS_FAIL, &format!("failed to create graphics device: {e}"));
                Err(e)
            }
        }
    }

    /// Initialize against the recording dummy backend. Test seam; mirrors
    /// [`initialize`] including the no-partial-state failure contract.
    ///
    /// [`initialize`]: GraphicsContext::initialize
    pub fn initialize_dummy(
        &mut self,
        options: DummyOptions,
        log: EventLog,
    ) -> Result<(), GraphicsError> {
        if self.backend.is_some() {
            return Err(GraphicsError::AlreadyInitialized);
        }
        let device = dummy::DummyDevice::initialize(options, log)?;
        self.backend = Some(DeviceBackend::Dummy(device));
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// Acquire the surface's current back buffer and derive a render-target
    /// view from it. Errors when no surface exists.
    pub fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        match self.backend.as_mut() {
            Some(DeviceBackend::Wgpu(d)) => d.create_render_target(),
            Some(DeviceBackend::Dummy(d)) => d.create_render_target(),
            None => Err(GraphicsError::NotInitialized),
        }
    }

    /// Release the current render target if present. Idempotent.
    pub fn release_render_target(&mut self) {
        match self.backend.as_mut() {
            Some(DeviceBackend::Wgpu(d)) => d.release_render_target(),
            Some(DeviceBackend::Dummy(d)) => d.release_render_target(),
            None => {}
        }
    }

    pub fn has_render_target(&self) -> bool {
        match self.backend.as_ref() {
            Some(DeviceBackend::Wgpu(d)) => d.has_render_target(),
            Some(DeviceBackend::Dummy(d)) => d.has_render_target(),
            None => false,
        }
    }

    /// Release the render target, reconfigure the surface buffers to the new
    /// dimensions and recreate the render target.
    ///
    /// A zero dimension means "keep the current extent". Must only be called
    /// on an initialized context in response to a non-minimized size change.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), GraphicsError> {
        let (current_width, current_height) =
            self.surface_size().ok_or(GraphicsError::NotInitialized)?;
        let width = if width == 0 { current_width } else { width };
        let height = if height == 0 { current_height } else { height };

        self.release_render_target();
        match self.backend.as_mut() {
            Some(DeviceBackend::Wgpu(d)) => d.reconfigure(width, height),
            Some(DeviceBackend::Dummy(d)) => d.reconfigure(width, height),
            None => return Err(GraphicsError::NotInitialized),
        }
        self.create_render_target()?;
        logger::record(STATUS_OK, &format!("surface resized to {width}x{height}"));
        Ok(())
    }

    /// Current surface extent, or `None` before initialization.
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        match self.backend.as_ref() {
            Some(DeviceBackend::Wgpu(d)) => Some(d.surface_size()),
            Some(DeviceBackend::Dummy(d)) => Some(d.surface_size()),
            None => None,
        }
    }

    /// Texture format of the presentation surface (wgpu backend only).
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        match self.backend.as_ref() {
            Some(DeviceBackend::Wgpu(d)) => Some(d.surface_format()),
            _ => None,
        }
    }

    /// The wgpu device, for renderer setup (wgpu backend only).
    pub fn device(&self) -> Option<&wgpu::Device> {
        match self.backend.as_ref() {
            Some(DeviceBackend::Wgpu(d)) => d.device(),
            _ => None,
        }
    }

    /// Device, queue and render-target view for GUI painting. `None` on the
    /// dummy backend or while no render target is held.
    pub fn paint_targets(&self) -> Option<PaintTargets<'_>> {
        match self.backend.as_ref() {
            Some(DeviceBackend::Wgpu(d)) => d.paint_targets(),
            _ => None,
        }
    }

    /// Present the current back buffer, consuming the render target.
    pub fn present(&mut self) -> Result<(), GraphicsError> {
        match self.backend.as_mut() {
            Some(DeviceBackend::Wgpu(d)) => d.present(),
            Some(DeviceBackend::Dummy(d)) => d.present(),
            None => Err(GraphicsError::NotInitialized),
        }
    }

    /// Release render target, surface, queue and device in that order, each
    /// guarded by a presence check. Safe to call multiple times.
    pub fn teardown(&mut self) {
        match self.backend.take() {
            Some(DeviceBackend::Wgpu(mut d)) => d.teardown(),
            Some(DeviceBackend::Dummy(mut d)) => d.teardown(),
            None => {}
        }
    }
}

/// Clamp an extent to the device's maximum texture dimension while keeping
/// the aspect ratio.
pub(crate) fn clamp_extent(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width > max_size || height > max_size {
        let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
        let clamped_width = ((width as f32 * scale) as u32).max(1);
        let clamped_height = ((height as f32 * scale) as u32).max(1);
        (clamped_width, clamped_height)
    } else {
        (width.max(1), height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::within_limit(1280, 720, 4096, (1280, 720))]
    #[case::width_over(8192, 2048, 4096, (4096, 1024))]
    #[case::height_over(2048, 8192, 4096, (1024, 4096))]
    #[case::zero_becomes_one(0, 0, 4096, (1, 1))]
    fn clamp_extent_preserves_aspect(
        #[case] width: u32,
        #[case] height: u32,
        #[case] max_size: u32,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(clamp_extent(width, height, max_size), expected);
    }

    #[test]
    fn uninitialized_context_has_no_resources() {
        let ctx = GraphicsContext::new();
        assert!(!ctx.is_initialized());
        assert!(!ctx.has_render_target());
        assert!(ctx.surface_size().is_none());
        assert!(ctx.surface_format().is_none());
        assert!(ctx.paint_targets().is_none());
    }

    #[test]
    fn render_target_requires_a_surface() {
        let mut ctx = GraphicsContext::new();
        assert!(matches!(
            ctx.create_render_target(),
            Err(GraphicsError::NotInitialized)
        ));
    }
}
