//! Still-image target behaviour against fake transports and encoders.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{Call, FakeRenderer, FakeTransport, IdentityEncoder, device, snapshot};
use forestview_cast::{CastError, ImageTarget};
use forestview_core::{Target, TargetError};

struct Fixture {
    target: ImageTarget,
    renderer: Arc<FakeRenderer>,
    transport: Arc<FakeTransport>,
    encoder: Arc<IdentityEncoder>,
}

fn fixture_with(renderer: FakeRenderer) -> Fixture {
    let renderer = Arc::new(renderer);
    let transport = Arc::new(FakeTransport::default());
    let encoder = Arc::new(IdentityEncoder::default());
    let target = ImageTarget::new(
        device(),
        renderer.clone(),
        transport.clone(),
        encoder.clone(),
    );
    Fixture {
        target,
        renderer,
        transport,
        encoder,
    }
}

fn fixture() -> Fixture {
    fixture_with(FakeRenderer::new(64, 48))
}

#[tokio::test]
async fn identical_snapshots_push_once() {
    let f = fixture();

    for _ in 0..3 {
        f.target.update(snapshot(0.5)).await.unwrap();
    }

    assert_eq!(f.transport.pushes(), 1);
    assert_eq!(f.renderer.renders(), 3);
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn changed_progress_pushes_again() {
    let f = fixture();

    f.target.update(snapshot(0.2)).await.unwrap();
    f.target.update(snapshot(0.9)).await.unwrap();
    f.target.update(snapshot(0.9)).await.unwrap();

    assert_eq!(f.transport.pushes(), 2);
}

#[tokio::test]
async fn missing_frame_is_a_render_error() {
    let mut renderer = FakeRenderer::new(64, 48);
    renderer.produce_nothing = true;
    let f = fixture_with(renderer);

    let err = f.target.show(&snapshot(0.5)).await.unwrap_err();

    assert!(matches!(err, CastError::Render(_)));
    assert_eq!(f.transport.pushes(), 0);
    assert_eq!(f.encoder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn zero_sized_renderer_fails_update() {
    let f = fixture_with(FakeRenderer::new(0, 0));

    let err = f.target.update(snapshot(0.5)).await.unwrap_err();

    assert!(matches!(err, TargetError::Render(_)), "got {err:?}");
    assert_eq!(f.transport.pushes(), 0);
}

#[tokio::test]
async fn failed_push_is_retried_on_next_update() {
    let f = fixture();

    *f.transport.fail_push.lock().unwrap() = true;
    assert!(f.target.update(snapshot(0.5)).await.is_err());
    assert_eq!(f.transport.pushes(), 0);

    *f.transport.fail_push.lock().unwrap() = false;
    f.target.update(snapshot(0.5)).await.unwrap();
    assert_eq!(f.transport.pushes(), 1);
}

#[tokio::test]
async fn stop_and_close_reach_the_transport() {
    let f = fixture();

    f.target.stop().await.unwrap();
    Target::close(&f.target).await.unwrap();

    assert_eq!(f.transport.calls(), vec![Call::Stop, Call::Close]);
    assert_eq!(f.renderer.closes(), 1);
}

#[tokio::test]
async fn close_reports_transport_failure_after_releasing_renderer() {
    let renderer = Arc::new(FakeRenderer::new(64, 48));
    let transport = Arc::new(FakeTransport {
        fail_close: true,
        ..FakeTransport::default()
    });
    let target = ImageTarget::new(
        device(),
        renderer.clone(),
        transport.clone(),
        Arc::new(IdentityEncoder::default()),
    );

    let err = target.shutdown().await.unwrap_err();

    assert!(matches!(err, CastError::Transport(_)));
    assert_eq!(renderer.closes(), 1);
}

#[test]
fn name_includes_device() {
    let f = fixture();
    assert_eq!(f.target.name(), "SmartTV(Living Room)");
}
