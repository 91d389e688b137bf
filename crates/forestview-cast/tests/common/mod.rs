//! Test doubles shared by the display target tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use forestview_cast::{
    CastError, CastTransport, Device, EncodeError, Frame, FrameRenderer, StillEncoder,
    TileRenderer, TransportError,
};
use forestview_core::Scene;
use forestview_types::{LandView, ProcessKind, ProcessView, SummaryView, ViewState};
use tokio_util::sync::CancellationToken;

pub fn device() -> Device {
    Device {
        name: "Living Room".to_owned(),
        location: "http://192.0.2.10:1400/desc.xml".to_owned(),
    }
}

pub fn snapshot(progress: f64) -> Arc<ViewState> {
    Arc::new(ViewState {
        lands: vec![LandView {
            id: "land-1".to_owned(),
            hostname: "alpha".to_owned(),
            trees: vec![ProcessView {
                id: "tree-1".to_owned(),
                name: "indexer".to_owned(),
                kind: ProcessKind::Tree,
                ram_allocated: 1_000,
                progress,
            }],
            ..LandView::default()
        }],
        summary: SummaryView {
            total_lands: 1,
            total_trees: 1,
            ..SummaryView::default()
        },
    })
}

/// Calls recorded by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Discover,
    Push(usize),
    Stream { url: String, title: String },
    Stop,
    Close,
}

#[derive(Default)]
pub struct FakeTransport {
    pub calls: Mutex<Vec<Call>>,
    pub fail_push: Mutex<bool>,
    pub fail_close: bool,
    pub no_devices: bool,
    pub fail_discover: bool,
}

impl FakeTransport {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Push(_)))
            .count()
    }

    pub fn streams(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Stream { url, title } => Some((url, title)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CastTransport for FakeTransport {
    async fn discover(&self, _timeout: Duration) -> Result<Vec<Device>, TransportError> {
        self.calls.lock().unwrap().push(Call::Discover);
        if self.fail_discover {
            return Err(TransportError::Discovery("multicast unavailable".to_owned()));
        }
        if self.no_devices {
            return Ok(Vec::new());
        }
        Ok(vec![
            device(),
            Device {
                name: "Kitchen".to_owned(),
                location: "http://192.0.2.11:1400/desc.xml".to_owned(),
            },
        ])
    }

    async fn push_image(&self, device: &Device, jpeg: &[u8]) -> Result<(), TransportError> {
        if *self.fail_push.lock().unwrap() {
            return Err(TransportError::Device {
                device: device.name.clone(),
                message: "connection refused".to_owned(),
            });
        }
        self.calls.lock().unwrap().push(Call::Push(jpeg.len()));
        Ok(())
    }

    async fn stream_video(
        &self,
        _device: &Device,
        url: &str,
        title: &str,
    ) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Stream {
            url: url.to_owned(),
            title: title.to_owned(),
        });
        Ok(())
    }

    async fn stop(&self, _device: &Device) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Stop);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(Call::Close);
        if self.fail_close {
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

/// Wraps [`TileRenderer`], counting calls and optionally dropping frames
/// or cancelling a token after a number of renders.
pub struct FakeRenderer {
    inner: TileRenderer,
    pub renders: AtomicU32,
    pub closes: AtomicU32,
    pub drop_every: Option<u32>,
    pub produce_nothing: bool,
    pub cancel_after: Option<(u32, CancellationToken)>,
}

impl FakeRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner: TileRenderer::new(width, height),
            renders: AtomicU32::new(0),
            closes: AtomicU32::new(0),
            drop_every: None,
            produce_nothing: false,
            cancel_after: None,
        }
    }

    pub fn renders(&self) -> u32 {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

impl FrameRenderer for FakeRenderer {
    fn render(&self, scene: &Scene) -> Option<Frame> {
        let n = self.renders.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if n >= *after {
                token.cancel();
            }
        }
        if self.produce_nothing {
            return None;
        }
        if self.drop_every.is_some_and(|every| n % every == 0) {
            return None;
        }
        self.inner.render(scene)
    }

    fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    fn close(&self) -> Result<(), CastError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Encoder returning the raw pixels, so equal frames give equal bytes.
#[derive(Default)]
pub struct IdentityEncoder {
    pub calls: AtomicU32,
}

#[async_trait]
impl StillEncoder for IdentityEncoder {
    async fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(frame.pixels.clone())
    }
}
