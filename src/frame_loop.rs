//! Frame loop: message pump, per-frame render cycle and teardown.
//!
//! The loop is a state machine `Uninitialized -> Running -> Exiting ->
//! Terminated`. winit drains pending window messages between `AboutToWait`
//! events under `ControlFlow::Poll`; each `AboutToWait` re-checks the exit
//! conditions and, while still running, builds one egui frame, invokes the
//! drawing collaborator exactly once, clears the render target to the
//! configured color, submits the draw data and presents.
//!
//! Exit conditions are a logical OR: an OS quit notification, the configured
//! hotkey, the drawing collaborator reporting inactivity (embedded mode), a
//! cooperative shutdown request (embedded mode), or fatal device loss. The
//! first observed reason wins.

use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowBuilder};

use crate::drawing::Drawing;
use crate::entry::{HostError, ShutdownSignal};
use crate::graphics::{GraphicsContext, GraphicsError};
use crate::gui::GuiIntegration;
use crate::logger::{self, STATUS_FAIL, STATUS_OK};
use crate::HostConfig;

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Uninitialized,
    Running,
    Exiting,
    Terminated,
}

/// Why the loop left the running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// OS quit notification (window close or destroy).
    QuitRequested,
    /// The configured exit hotkey was pressed.
    ExitHotkey,
    /// The drawing collaborator reported it is no longer active.
    DrawingInactive,
    /// A cooperative shutdown was requested by the embedding host.
    ShutdownRequested,
    /// The device failed in a way the loop cannot recover from.
    DeviceFailure,
}

/// Tracks the loop's state transitions.
///
/// `request_exit` only acts while running, so the first exit reason observed
/// is the one reported.
#[derive(Debug)]
pub struct LoopController {
    state: LoopState,
    exit_reason: Option<ExitReason>,
}

impl LoopController {
    pub fn new() -> Self {
        Self {
            state: LoopState::Uninitialized,
            exit_reason: None,
        }
    }

    /// Window and graphics initialization succeeded.
    pub fn start(&mut self) {
        debug_assert_eq!(self.state, LoopState::Uninitialized);
        self.state = LoopState::Running;
    }

    /// Startup failed; the loop never ran.
    pub fn fail_startup(&mut self) {
        self.state = LoopState::Terminated;
    }

    /// Leave the running state. No-op outside of it.
    pub fn request_exit(&mut self, reason: ExitReason) {
        if self.state == LoopState::Running {
            self.state = LoopState::Exiting;
            self.exit_reason = Some(reason);
        }
    }

    /// Teardown finished.
    pub fn finish(&mut self) {
        if self.state != LoopState::Terminated {
            self.state = LoopState::Terminated;
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }
}

impl Default for LoopController {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the frame loop to completion on the current thread.
///
/// `shutdown` is present in embedded mode; the loop polls it between frames
/// and acknowledges it once teardown has finished.
pub(crate) fn drive(
    event_loop: EventLoop<()>,
    mut drawing: Box<dyn Drawing>,
    config: HostConfig,
    shutdown: Option<Arc<ShutdownSignal>>,
) -> Result<(), HostError> {
    let mut controller = LoopController::new();

    let window = WindowBuilder::new()
        .with_title(&config.title)
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_visible(config.visible)
        .build(&event_loop)
        .map_err(|e| {
            logger::record(STATUS_FAIL, &format!("failed to create window: {e}"));
            controller.fail_startup();
            HostError::WindowCreationFailed(e.to_string())
        })?;
    let window = Arc::new(window);
    logger::record(STATUS_OK, "window created");

    let mut graphics = GraphicsContext::new();
    if let Err(e) = graphics.initialize(window.clone(), &config) {
        // Defensive teardown: initialization leaves no partial state, so
        // this releases nothing, but the shutdown sequence stays uniform.
        graphics.teardown();
        controller.fail_startup();
        if let Some(signal) = &shutdown {
            signal.acknowledge();
        }
        return Err(e.into());
    }

    let gui = match (graphics.device(), graphics.surface_format()) {
        (Some(device), Some(format)) => GuiIntegration::new(device, format, &window),
        _ => {
            graphics.teardown();
            controller.fail_startup();
            if let Some(signal) = &shutdown {
                signal.acknowledge();
            }
            return Err(HostError::Graphics(GraphicsError::NotInitialized));
        }
    };
    let mut gui = Some(gui);
    logger::record(STATUS_OK, "GUI integration initialized");

    controller.start();
    let embedded = shutdown.is_some();

    let clear_color = premultiplied_clear_color(config.clear_color);
    let exit_key = config.exit_key;

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { event, .. } => {
                    if let Some(gui) = gui.as_mut() {
                        if gui.on_window_event(&window, &event) {
                            return;
                        }
                    }
                    match event {
                        WindowEvent::Resized(size) => {
                            // A zero dimension means the window is minimized;
                            // the surface keeps its current extent.
                            if size.width > 0 && size.height > 0 && graphics.is_initialized() {
                                if let Err(e) = graphics.resize(size.width, size.height) {
                                    logger::record(
                                        STATUS_FAIL,
                                        &format!("resize to {}x{} failed: {e}", size.width, size.height),
                                    );
                                }
                            }
                        }
                        WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                            logger::record(STATUS_OK, "quit requested by window");
                            controller.request_exit(ExitReason::QuitRequested);
                        }
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.state == ElementState::Pressed && !event.repeat {
                                if let PhysicalKey::Code(code) = event.physical_key {
                                    if Some(code) == exit_key {
                                        logger::record(STATUS_OK, "exit hotkey pressed");
                                        controller.request_exit(ExitReason::ExitHotkey);
                                    }
                                }
                            }
                        }
                        WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                            logger::record(
                                STATUS_OK,
                                &format!("scale factor changed to {scale_factor}"),
                            );
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    if let Some(signal) = &shutdown {
                        if signal.is_requested() {
                            logger::record(STATUS_OK, "shutdown requested by host");
                            controller.request_exit(ExitReason::ShutdownRequested);
                        }
                    }
                    if embedded && !drawing.is_active() {
                        logger::record(STATUS_OK, "drawing collaborator inactive");
                        controller.request_exit(ExitReason::DrawingInactive);
                    }

                    if !controller.is_running() {
                        elwt.exit();
                        return;
                    }

                    if let Some(gui) = gui.as_mut() {
                        render_frame(
                            &mut graphics,
                            gui,
                            drawing.as_mut(),
                            &window,
                            clear_color,
                            &mut controller,
                        );
                    }
                }
                Event::LoopExiting => {
                    logger::record(
                        STATUS_OK,
                        &format!("frame loop exiting: {:?}", controller.exit_reason()),
                    );
                    // GUI shutdown first, then the graphics unit, reverse of
                    // creation order. The window is dropped with the closure.
                    gui = None;
                    graphics.teardown();
                    controller.finish();
                    logger::record(STATUS_OK, "host cleanup completed");
                    if let Some(signal) = &shutdown {
                        signal.acknowledge();
                    }
                }
                _ => {}
            }
        })
        .map_err(|e| HostError::EventLoopFailed(e.to_string()))?;

    Ok(())
}

/// One render-submit-present cycle.
fn render_frame(
    graphics: &mut GraphicsContext,
    gui: &mut GuiIntegration,
    drawing: &mut dyn Drawing,
    window: &Window,
    clear_color: wgpu::Color,
    controller: &mut LoopController,
) {
    if !graphics.has_render_target() {
        match graphics.create_render_target() {
            Ok(()) => {}
            Err(e @ (GraphicsError::SurfaceLost | GraphicsError::SurfaceOutdated)) => {
                logger::record(STATUS_FAIL, &format!("back buffer unavailable: {e}"));
                let size = window.inner_size();
                if size.width > 0 && size.height > 0 {
                    if let Err(e) = graphics.resize(size.width, size.height) {
                        logger::record(STATUS_FAIL, &format!("surface recovery failed: {e}"));
                    }
                }
                return;
            }
            Err(GraphicsError::OutOfMemory) => {
                logger::record(STATUS_FAIL, "out of device memory");
                controller.request_exit(ExitReason::DeviceFailure);
                return;
            }
            Err(e) => {
                // Logged only; the loop keeps running and retries next frame.
                logger::record(STATUS_FAIL, &format!("failed to acquire back buffer: {e}"));
                return;
            }
        }
    }

    gui.begin_frame(window);
    drawing.draw(gui.context());
    gui.end_frame(window);

    if let (Some(size), Some(targets)) = (graphics.surface_size(), graphics.paint_targets()) {
        gui.paint(targets.device, targets.queue, targets.view, size, clear_color);
    }

    if let Err(e) = graphics.present() {
        logger::record(STATUS_FAIL, &format!("present failed: {e}"));
    }
}

fn premultiplied_clear_color(color: [f32; 4]) -> wgpu::Color {
    let [r, g, b, a] = color;
    wgpu::Color {
        r: (r * a) as f64,
        g: (g * a) as f64,
        b: (b * a) as f64,
        a: a as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn startup_success_reaches_running() {
        let mut controller = LoopController::new();
        assert_eq!(controller.state(), LoopState::Uninitialized);
        controller.start();
        assert_eq!(controller.state(), LoopState::Running);
        assert!(controller.is_running());
        assert_eq!(controller.exit_reason(), None);
    }

    #[test]
    fn startup_failure_goes_straight_to_terminated() {
        let mut controller = LoopController::new();
        controller.fail_startup();
        assert_eq!(controller.state(), LoopState::Terminated);
        assert_eq!(controller.exit_reason(), None);
    }

    #[rstest]
    #[case::quit(ExitReason::QuitRequested)]
    #[case::hotkey(ExitReason::ExitHotkey)]
    #[case::inactive(ExitReason::DrawingInactive)]
    #[case::shutdown(ExitReason::ShutdownRequested)]
    fn each_exit_condition_suffices(#[case] reason: ExitReason) {
        let mut controller = LoopController::new();
        controller.start();
        controller.request_exit(reason);
        assert_eq!(controller.state(), LoopState::Exiting);
        assert_eq!(controller.exit_reason(), Some(reason));
    }

    #[test]
    fn first_exit_reason_wins() {
        let mut controller = LoopController::new();
        controller.start();
        controller.request_exit(ExitReason::ExitHotkey);
        controller.request_exit(ExitReason::QuitRequested);
        assert_eq!(controller.exit_reason(), Some(ExitReason::ExitHotkey));
        assert_eq!(controller.state(), LoopState::Exiting);
    }

    #[test]
    fn exit_request_before_start_is_ignored() {
        let mut controller = LoopController::new();
        controller.request_exit(ExitReason::QuitRequested);
        assert_eq!(controller.state(), LoopState::Uninitialized);
        assert_eq!(controller.exit_reason(), None);
    }

    #[test]
    fn finish_completes_the_lifecycle() {
        let mut controller = LoopController::new();
        controller.start();
        controller.request_exit(ExitReason::QuitRequested);
        controller.finish();
        assert_eq!(controller.state(), LoopState::Terminated);
        // The reason survives for reporting after termination.
        assert_eq!(controller.exit_reason(), Some(ExitReason::QuitRequested));
    }

    #[test]
    fn clear_color_is_premultiplied() {
        let color = premultiplied_clear_color([0.45, 0.55, 0.60, 1.0]);
        assert!((color.r - 0.45).abs() < 1e-6);
        assert!((color.g - 0.55).abs() < 1e-6);
        assert!((color.b - 0.60).abs() < 1e-6);
        assert!((color.a - 1.0).abs() < 1e-6);

        let half = premultiplied_clear_color([1.0, 1.0, 1.0, 0.5]);
        assert!((half.r - 0.5).abs() < 1e-6);
        assert!((half.a - 0.5).abs() < 1e-6);
    }
}
