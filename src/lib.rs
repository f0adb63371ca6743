//! Overlay Host - a minimal host for an egui frame loop over a wgpu surface
//!
//! The host creates a window, brings up a GPU device and presentation
//! surface, and drives the immediate-mode GUI frame cycle: pump window
//! messages, build the GUI frame through an external [`Drawing`]
//! collaborator, submit the draw data and present. Diagnostic events are
//! appended to a log file throughout.
//!
//! # Entry modes
//! - **Standalone**: [`run`] drives the loop on the calling thread until it
//!   terminates (used by the `overlay-host` binary).
//! - **Host-embedded**: [`HostHandle::spawn`] runs the loop on a background
//!   thread when the crate is loaded as a module into another process;
//!   [`HostHandle::stop`] shuts it down cooperatively. The C ABI exports
//!   `overlay_host_attach` / `overlay_host_detach` wrap this for loaders.

pub mod drawing;
pub mod entry;
pub mod frame_loop;
pub mod graphics;
pub mod gui;
pub mod logger;

pub use drawing::{DemoPanel, Drawing};
pub use entry::{run, HostError, HostHandle, ShutdownSignal};
pub use frame_loop::{ExitReason, LoopState};
pub use graphics::{GraphicsContext, GraphicsError};

use winit::keyboard::KeyCode;

/// Configuration for the host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Present with vertical sync.
    pub vsync: bool,
    /// Whether the host window is shown.
    pub visible: bool,
    /// Color the render target is cleared to each frame (straight alpha).
    pub clear_color: [f32; 4],
    /// Hotkey that exits the frame loop, if any.
    pub exit_key: Option<KeyCode>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            title: "Overlay Host".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            visible: true,
            clear_color: [0.45, 0.55, 0.60, 1.0],
            exit_key: Some(KeyCode::End),
        }
    }
}
