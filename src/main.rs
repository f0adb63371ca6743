//! Standalone entry point: run the frame loop on the main thread.

use std::process::ExitCode;

use overlay_host::{run, DemoPanel, HostConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(DemoPanel::new(), HostConfig::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("host failed: {e}");
            ExitCode::FAILURE
        }
    }
}
