//! Recording dummy backing for [`GraphicsContext`](super::GraphicsContext).
//!
//! Stands in for the wgpu backend in tests: every lifecycle operation is
//! appended to a shared [`EventLog`], so ordering and idempotence invariants
//! can be asserted on machines without a GPU or a display.

use std::sync::Arc;

use parking_lot::Mutex;

use super::GraphicsError;

/// One recorded lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    DeviceCreated,
    SurfaceCreated,
    RenderTargetCreated,
    RenderTargetReleased,
    SurfaceReconfigured { width: u32, height: u32 },
    Presented,
    SurfaceReleased,
    QueueReleased,
    DeviceReleased,
}

/// Shared trace of lifecycle operations, held by the test alongside the
/// context so it survives initialization failures and teardown.
pub type EventLog = Arc<Mutex<Vec<LifecycleEvent>>>;

/// Create an empty event log.
pub fn new_event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Behavior knobs for the dummy backend.
#[derive(Debug, Clone, Copy)]
pub struct DummyOptions {
    pub width: u32,
    pub height: u32,
    /// Reject device creation, leaving no partial state behind.
    pub fail_device_creation: bool,
}

impl Default for DummyOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fail_device_creation: false,
        }
    }
}

pub(super) struct DummyDevice {
    log: EventLog,
    width: u32,
    height: u32,
    render_target: bool,
    surface: bool,
    queue: bool,
    device: bool,
}

impl DummyDevice {
    pub(super) fn initialize(options: DummyOptions, log: EventLog) -> Result<Self, GraphicsError> {
        if options.fail_device_creation {
            return Err(GraphicsError::DeviceCreationFailed(
                "device creation rejected".into(),
            ));
        }
        log.lock().push(LifecycleEvent::DeviceCreated);
        log.lock().push(LifecycleEvent::SurfaceCreated);
        Ok(Self {
            log,
            width: options.width,
            height: options.height,
            render_target: false,
            surface: true,
            queue: true,
            device: true,
        })
    }

    pub(super) fn create_render_target(&mut self) -> Result<(), GraphicsError> {
        if !self.surface {
            return Err(GraphicsError::NotInitialized);
        }
        self.render_target = true;
        self.log.lock().push(LifecycleEvent::RenderTargetCreated);
        Ok(())
    }

    pub(super) fn release_render_target(&mut self) {
        if self.render_target {
            self.render_target = false;
            self.log.lock().push(LifecycleEvent::RenderTargetReleased);
        }
    }

    pub(super) fn has_render_target(&self) -> bool {
        self.render_target
    }

    pub(super) fn reconfigure(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.log
            .lock()
            .push(LifecycleEvent::SurfaceReconfigured { width, height });
    }

    pub(super) fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(super) fn present(&mut self) -> Result<(), GraphicsError> {
        if !self.render_target {
            return Err(GraphicsError::NoRenderTarget);
        }
        self.render_target = false;
        self.log.lock().push(LifecycleEvent::Presented);
        Ok(())
    }

    pub(super) fn teardown(&mut self) {
        if self.render_target {
            self.render_target = false;
            self.log.lock().push(LifecycleEvent::RenderTargetReleased);
        }
        if self.surface {
            self.surface = false;
            self.log.lock().push(LifecycleEvent::SurfaceReleased);
        }
        if self.queue {
            self.queue = false;
            self.log.lock().push(LifecycleEvent::QueueReleased);
        }
        if self.device {
            self.device = false;
            self.log.lock().push(LifecycleEvent::DeviceReleased);
        }
    }
}
