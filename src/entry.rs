//! Process and module entry points.
//!
//! Standalone mode runs the frame loop synchronously on the calling thread.
//! Host-embedded mode spawns the loop on a background thread and shuts it
//! down cooperatively: [`HostHandle::stop`] raises a [`ShutdownSignal`] the
//! worker polls between frames, waits (bounded) for the worker to acknowledge
//! that teardown finished, then joins the thread. The worker is never
//! terminated forcibly.
//!
//! The C ABI exports at the bottom are for loaders that embed this crate as
//! a module; they manage a single process-wide host instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use winit::event_loop::{EventLoop, EventLoopBuilder};

use crate::drawing::{DemoPanel, Drawing};
use crate::frame_loop;
use crate::graphics::GraphicsError;
use crate::logger::{self, STATUS_FAIL, STATUS_OK};
use crate::HostConfig;

/// Host lifecycle error type.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("failed to create event loop: {0}")]
    EventLoopFailed(String),
    #[error("failed to create window: {0}")]
    WindowCreationFailed(String),
    #[error(transparent)]
    Graphics(#[from] GraphicsError),
    #[error("embedded mode is not supported on this platform")]
    UnsupportedPlatform,
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawnFailed(String),
    #[error("worker did not acknowledge shutdown within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("worker thread panicked")]
    WorkerPanicked,
}

/// Cooperative shutdown handshake between the embedding host and the worker.
///
/// The host raises the request; the worker observes it at a safe point
/// (between frames), tears down, and acknowledges. Both sides are idempotent.
pub struct ShutdownSignal {
    requested: AtomicBool,
    acknowledged: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            acknowledged: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Ask the worker to exit at its next safe point.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// The worker finished teardown.
    pub fn acknowledge(&self) {
        let mut acknowledged = self.acknowledged.lock();
        *acknowledged = true;
        self.condvar.notify_all();
    }

    /// Block until the worker acknowledges or `timeout` elapses. Returns
    /// whether the acknowledgement arrived.
    pub fn wait_acknowledged(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut acknowledged = self.acknowledged.lock();
        while !*acknowledged {
            if self.condvar.wait_until(&mut acknowledged, deadline).timed_out() {
                break;
            }
        }
        *acknowledged
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the frame loop on the calling thread until it terminates.
pub fn run(drawing: impl Drawing + 'static, config: HostConfig) -> Result<(), HostError> {
    logger::record(STATUS_OK, "starting host frame loop");
    let event_loop = build_event_loop(false)?;
    frame_loop::drive(event_loop, Box::new(drawing), config, None)
}

/// A frame loop running on a background thread.
pub struct HostHandle {
    shutdown: Arc<ShutdownSignal>,
    thread: Option<JoinHandle<Result<(), HostError>>>,
}

impl HostHandle {
    /// Spawn the frame loop on a dedicated worker thread.
    pub fn spawn(
        drawing: Box<dyn Drawing + Send>,
        config: HostConfig,
    ) -> Result<Self, HostError> {
        if cfg!(target_os = "macos") {
            // The event loop must live on the main thread there.
            return Err(HostError::UnsupportedPlatform);
        }

        let shutdown = Arc::new(ShutdownSignal::new());
        let signal = Arc::clone(&shutdown);
        let thread = thread::Builder::new()
            .name("overlay-host".into())
            .spawn(move || {
                let result = build_event_loop(true).and_then(|event_loop| {
                    frame_loop::drive(event_loop, drawing, config, Some(Arc::clone(&signal)))
                });
                if let Err(e) = &result {
                    logger::record(STATUS_FAIL, &format!("host worker failed: {e}"));
                }
                // Unblocks a pending stop() even when the loop never started.
                signal.acknowledge();
                result
            })
            .map_err(|e| HostError::ThreadSpawnFailed(e.to_string()))?;

        logger::record(STATUS_OK, "host rendering thread created");
        Ok(Self {
            shutdown,
            thread: Some(thread),
        })
    }

    /// Request a cooperative shutdown and wait for the worker to finish.
    ///
    /// On timeout the worker is left running detached and a typed error is
    /// returned; it is never terminated forcibly.
    pub fn stop(mut self, timeout: Duration) -> Result<(), HostError> {
        logger::record(STATUS_OK, "requesting host shutdown");
        self.shutdown.request();
        if !self.shutdown.wait_acknowledged(timeout) {
            logger::record(STATUS_FAIL, "host worker did not acknowledge shutdown");
            return Err(HostError::ShutdownTimeout(timeout));
        }
        match self.thread.take() {
            Some(thread) => match thread.join() {
                Ok(result) => result,
                Err(_) => Err(HostError::WorkerPanicked),
            },
            None => Ok(()),
        }
    }
}

fn build_event_loop(any_thread: bool) -> Result<EventLoop<()>, HostError> {
    let mut builder = EventLoopBuilder::new();
    if any_thread {
        #[cfg(target_os = "windows")]
        {
            use winit::platform::windows::EventLoopBuilderExtWindows;
            builder.with_any_thread(true);
        }
        #[cfg(target_os = "linux")]
        {
            // Sets the shared any-thread attribute for both X11 and Wayland.
            use winit::platform::x11::EventLoopBuilderExtX11;
            builder.with_any_thread(true);
        }
    }
    builder
        .build()
        .map_err(|e| HostError::EventLoopFailed(e.to_string()))
}

/// How long a detach waits for the worker before giving up.
pub const DETACH_TIMEOUT: Duration = Duration::from_secs(5);

static EMBEDDED_HOST: Mutex<Option<HostHandle>> = parking_lot::const_mutex(None);

/// Module load notification: spawn the host on a background thread.
/// Returns 1 on success, 0 on failure.
#[no_mangle]
pub extern "C" fn overlay_host_attach() -> i32 {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();

    let mut slot = EMBEDDED_HOST.lock();
    if slot.is_some() {
        logger::record(STATUS_FAIL, "host already attached");
        return 0;
    }
    match HostHandle::spawn(Box::new(DemoPanel::new()), HostConfig::default()) {
        Ok(handle) => {
            *slot = Some(handle);
            1
        }
        Err(e) => {
            logger::record(STATUS_FAIL, &format!("failed to attach host: {e}"));
            0
        }
    }
}

/// Module unload notification: cooperative shutdown of the host thread.
/// Returns 1 on success, 0 on failure.
#[no_mangle]
pub extern "C" fn overlay_host_detach() -> i32 {
    let handle = EMBEDDED_HOST.lock().take();
    match handle {
        Some(handle) => match handle.stop(DETACH_TIMEOUT) {
            Ok(()) => {
                logger::record(STATUS_OK, "host rendering thread stopped");
                1
            }
            Err(e) => {
                logger::record(STATUS_FAIL, &format!("failed to detach host: {e}"));
                0
            }
        },
        None => {
            logger::record(STATUS_FAIL, "host not attached");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_signal_starts_idle() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_requested());
        assert!(!signal.wait_acknowledged(Duration::from_millis(10)));
    }

    #[test]
    fn request_is_observable() {
        let signal = ShutdownSignal::new();
        signal.request();
        assert!(signal.is_requested());
    }

    #[test]
    fn acknowledge_before_wait_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.acknowledge();
        assert!(signal.wait_acknowledged(Duration::from_secs(0)));
    }

    #[test]
    fn acknowledge_wakes_a_waiting_host() {
        let signal = Arc::new(ShutdownSignal::new());
        let worker_signal = Arc::clone(&signal);
        let worker = std::thread::spawn(move || {
            while !worker_signal.is_requested() {
                std::thread::sleep(Duration::from_millis(1));
            }
            worker_signal.acknowledge();
        });

        signal.request();
        assert!(signal.wait_acknowledged(Duration::from_secs(5)));
        worker.join().unwrap();
    }

    #[test]
    fn unacknowledged_wait_times_out() {
        let signal = ShutdownSignal::new();
        signal.request();
        let start = Instant::now();
        assert!(!signal.wait_acknowledged(Duration::from_millis(50)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn acknowledge_is_idempotent() {
        let signal = ShutdownSignal::new();
        signal.acknowledge();
        signal.acknowledge();
        assert!(signal.wait_acknowledged(Duration::from_secs(0)));
    }
}
