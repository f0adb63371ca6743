//! The external drawing collaborator.

/// Populates the GUI frame. Invoked exactly once per frame-loop iteration.
///
/// In embedded mode the loop additionally polls [`is_active`](Self::is_active)
/// each iteration and exits once the collaborator reports it is done.
pub trait Drawing {
    /// Build this frame's GUI content.
    fn draw(&mut self, ctx: &egui::Context);

    /// Whether the collaborator still wants frames. Defaults to always active.
    fn is_active(&self) -> bool {
        true
    }
}

/// Placeholder panel used by the standalone binary and the default embedded
/// entry point.
pub struct DemoPanel {
    clicks: u32,
    active: bool,
}

impl DemoPanel {
    pub fn new() -> Self {
        Self {
            clicks: 0,
            active: true,
        }
    }
}

impl Default for DemoPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Drawing for DemoPanel {
    fn draw(&mut self, ctx: &egui::Context) {
        egui::Window::new("Overlay Host").show(ctx, |ui| {
            ui.label("Host is running.");
            if ui.button("Click me").clicked() {
                self.clicks += 1;
            }
            ui.label(format!("Clicks: {}", self.clicks));
            if ui.button("Close").clicked() {
                self.active = false;
            }
        });
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
