//! Render-target lifecycle integration tests.
//!
//! These run against the recording dummy backend, so they need neither a GPU
//! nor a display. Each test drives [`GraphicsContext`] through the public
//! lifecycle operations and asserts on the recorded event trace.

use rstest::rstest;

use overlay_host::graphics::{
    new_event_log, DummyOptions, GraphicsContext, GraphicsError, LifecycleEvent,
};

fn initialized_context() -> (GraphicsContext, overlay_host::graphics::EventLog) {
    let log = new_event_log();
    let mut ctx = GraphicsContext::new();
    ctx.initialize_dummy(DummyOptions::default(), log.clone())
        .expect("dummy initialization cannot fail");
    (ctx, log)
}

#[test]
fn creation_order_is_device_then_surface_then_render_target() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();

    let events = log.lock().clone();
    assert_eq!(
        events,
        vec![
            LifecycleEvent::DeviceCreated,
            LifecycleEvent::SurfaceCreated,
            LifecycleEvent::RenderTargetCreated,
        ]
    );
}

#[test]
fn resize_releases_reconfigures_and_recreates_in_one_step() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();
    assert!(ctx.has_render_target());

    ctx.resize(800, 600).unwrap();

    assert!(ctx.has_render_target());
    assert_eq!(ctx.surface_size(), Some((800, 600)));

    let events = log.lock().clone();
    assert_eq!(
        &events[2..],
        &[
            LifecycleEvent::RenderTargetCreated,
            LifecycleEvent::RenderTargetReleased,
            LifecycleEvent::SurfaceReconfigured {
                width: 800,
                height: 600
            },
            LifecycleEvent::RenderTargetCreated,
        ]
    );
}

#[rstest]
#[case::keep_width(0, 600, (1280, 600))]
#[case::keep_height(800, 0, (800, 720))]
#[case::keep_both(0, 0, (1280, 720))]
fn resize_with_zero_dimension_keeps_current_extent(
    #[case] width: u32,
    #[case] height: u32,
    #[case] expected: (u32, u32),
) {
    let (mut ctx, _log) = initialized_context();
    ctx.create_render_target().unwrap();
    ctx.resize(width, height).unwrap();
    assert_eq!(ctx.surface_size(), Some(expected));
}

#[test]
fn release_render_target_is_idempotent() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();
    ctx.release_render_target();
    ctx.release_render_target();

    let releases = log
        .lock()
        .iter()
        .filter(|e| **e == LifecycleEvent::RenderTargetReleased)
        .count();
    assert_eq!(releases, 1);
    assert!(!ctx.has_render_target());
}

#[test]
fn teardown_releases_in_reverse_creation_order() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();
    ctx.teardown();

    let events = log.lock().clone();
    assert_eq!(
        &events[3..],
        &[
            LifecycleEvent::RenderTargetReleased,
            LifecycleEvent::SurfaceReleased,
            LifecycleEvent::QueueReleased,
            LifecycleEvent::DeviceReleased,
        ]
    );
    assert!(!ctx.is_initialized());
}

#[test]
fn teardown_is_idempotent() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();
    ctx.teardown();
    let after_first = log.lock().len();

    ctx.teardown();
    assert_eq!(log.lock().len(), after_first);
}

#[test]
fn failed_device_creation_leaves_no_partial_state() {
    let log = new_event_log();
    let mut ctx = GraphicsContext::new();
    let options = DummyOptions {
        fail_device_creation: true,
        ..DummyOptions::default()
    };

    let result = ctx.initialize_dummy(options, log.clone());
    assert!(matches!(result, Err(GraphicsError::DeviceCreationFailed(_))));
    assert!(!ctx.is_initialized());

    // Defensive teardown after the failure attempts no release.
    ctx.teardown();
    assert!(log.lock().is_empty());
}

#[test]
fn present_consumes_the_render_target() {
    let (mut ctx, log) = initialized_context();
    ctx.create_render_target().unwrap();
    ctx.present().unwrap();
    assert!(!ctx.has_render_target());
    assert_eq!(log.lock().last(), Some(&LifecycleEvent::Presented));

    // A second present without re-acquiring is a typed error, not a panic.
    assert!(matches!(ctx.present(), Err(GraphicsError::NoRenderTarget)));
}

#[test]
fn double_initialization_is_rejected() {
    let (mut ctx, log) = initialized_context();
    let result = ctx.initialize_dummy(DummyOptions::default(), log.clone());
    assert!(matches!(result, Err(GraphicsError::AlreadyInitialized)));
    // The rejected attempt recorded nothing.
    assert_eq!(log.lock().len(), 2);
}

#[test]
fn resize_after_teardown_is_a_typed_error() {
    let (mut ctx, _log) = initialized_context();
    ctx.teardown();
    assert!(matches!(
        ctx.resize(800, 600),
        Err(GraphicsError::NotInitialized)
    ));
}
