//! Video stream display target.
//!
//! Streaming is not driven by the periodic refresh: [`update`] only stores
//! the latest snapshot, and [`VideoTarget::start`] runs the pipeline on
//! demand.
//!
//! # Pipeline
//!
//! 1. **Rendering** -- the stored snapshot is projected once and rendered
//!    `duration * frame_rate` times. Every frame is written into the
//!    encoder's stdin before the next one is rendered, so a slow encoder
//!    throttles the renderer through the pipe. Missing or mis-sized
//!    frames are skipped.
//! 2. **Encoding** -- stdin is closed and the encoder's exit awaited. A
//!    non-zero exit fails the run and removes the partial file.
//! 3. **Serving** -- the finished file replaces the previous one behind
//!    `GET /stream.mp4`. The listener is bound on the first run and kept
//!    for the target's lifetime.
//! 4. **Casting** -- the display is pointed at the stream URL, built from
//!    the outbound-route address of this machine.
//!
//! Cancellation is checked before every frame and raced against every
//! pipe write and the encoder exit. A cancelled run kills the encoder,
//! waits for it, and deletes the partial file before returning.
//!
//! The current [`PipelineStage`] is published on a watch channel.
//!
//! [`update`]: forestview_core::Target::update

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use forestview_core::config::VideoConfig;
use forestview_core::{Scene, Target, TargetError};
use forestview_types::ViewState;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::process::{Child, ChildStderr};
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, info, warn};

use crate::encode::{EncoderCommand, Placeholders};
use crate::error::{CastError, EncodeError};
use crate::net;
use crate::render::{Frame, FrameRenderer};
use crate::transport::{CastTransport, Device};

/// Path the encoded video is served under.
pub const STREAM_PATH: &str = "/stream.mp4";

/// Bytes of encoder stderr kept for error reports.
const STDERR_TAIL: usize = 2048;

/// Time the stream listener gets to finish in-flight responses on close.
const SERVER_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Where the video pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// No pipeline is running.
    Idle,
    /// Frames are being rendered and fed to the encoder.
    Rendering,
    /// All frames are written; waiting for the encoder to finish.
    Encoding,
    /// Publishing the file on the stream listener.
    Serving,
    /// Asking the display to play the stream.
    Casting,
    /// The last run failed.
    Failed,
}

impl PipelineStage {
    /// Lowercase stage name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Rendering => "rendering",
            Self::Encoding => "encoding",
            Self::Serving => "serving",
            Self::Casting => "casting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Video generation and serving settings.
#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// Frames per second.
    pub frame_rate: u32,
    /// Video length in seconds.
    pub duration_secs: u32,
    /// Port of the stream listener. `0` picks a free port.
    pub stream_port: u16,
    /// Title shown on the display.
    pub title: String,
    /// Directory encoded files are written to.
    pub output_dir: PathBuf,
    /// Encoder invocation.
    pub encoder: EncoderCommand,
    /// Address put into stream URLs. Discovered from the outbound route
    /// when unset.
    pub advertise_ip: Option<IpAddr>,
}

impl VideoOptions {
    /// Options from the `video` configuration section.
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            frame_rate: config.frame_rate,
            duration_secs: config.duration_secs,
            stream_port: config.stream_port,
            title: config.title.clone(),
            ..Self::default()
        }
    }

    /// Number of frames one run renders.
    pub fn total_frames(&self) -> u64 {
        u64::from(self.duration_secs).saturating_mul(u64::from(self.frame_rate))
    }
}

impl Default for VideoOptions {
    fn default() -> Self {
        let config = VideoConfig::default();
        Self {
            frame_rate: config.frame_rate,
            duration_secs: config.duration_secs,
            stream_port: config.stream_port,
            title: config.title,
            output_dir: std::env::temp_dir(),
            encoder: EncoderCommand::h264(),
            advertise_ip: None,
        }
    }
}

type SharedPath = Arc<RwLock<Option<PathBuf>>>;

/// The stream listener.
struct StreamServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

/// Clears the in-flight flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Streams an encoded video of the current snapshot to one display.
pub struct VideoTarget {
    device: Device,
    renderer: Arc<dyn FrameRenderer>,
    transport: Arc<dyn CastTransport>,
    options: VideoOptions,
    latest: RwLock<Option<Arc<ViewState>>>,
    running: AtomicBool,
    stage: watch::Sender<PipelineStage>,
    video_file: SharedPath,
    server: Mutex<Option<StreamServer>>,
}

impl VideoTarget {
    /// Create a target for `device`.
    pub fn new(
        device: Device,
        renderer: Arc<dyn FrameRenderer>,
        transport: Arc<dyn CastTransport>,
        options: VideoOptions,
    ) -> Self {
        let (stage, _) = watch::channel(PipelineStage::Idle);
        Self {
            device,
            renderer,
            transport,
            options,
            latest: RwLock::new(None),
            running: AtomicBool::new(false),
            stage,
            video_file: Arc::new(RwLock::new(None)),
            server: Mutex::new(None),
        }
    }

    /// Create a target from the `video` configuration section.
    pub fn from_config(
        device: Device,
        renderer: Arc<dyn FrameRenderer>,
        transport: Arc<dyn CastTransport>,
        video: &VideoConfig,
    ) -> Self {
        Self::new(device, renderer, transport, VideoOptions::from_config(video))
    }

    /// The current pipeline stage.
    pub fn stage(&self) -> PipelineStage {
        *self.stage.borrow()
    }

    /// Watch stage transitions.
    pub fn subscribe(&self) -> watch::Receiver<PipelineStage> {
        self.stage.subscribe()
    }

    /// The file currently served, if any.
    pub async fn video_file(&self) -> Option<PathBuf> {
        self.video_file.read().await.clone()
    }

    /// The stream listener's bound address, once started.
    pub async fn stream_addr(&self) -> Option<SocketAddr> {
        self.server.lock().await.as_ref().map(|s| s.addr)
    }

    fn set_stage(&self, stage: PipelineStage) {
        let previous = self.stage.send_replace(stage);
        if previous != stage {
            debug!(from = %previous, to = %stage, "video stage");
        }
    }

    /// Generate, serve, and cast a video of the stored snapshot.
    ///
    /// Returns the URL the display was pointed at.
    ///
    /// # Errors
    ///
    /// - [`CastError::NoStateAvailable`] before the first update.
    /// - [`CastError::AlreadyRunning`] while another run is in flight.
    /// - [`CastError::Cancelled`] when `token` fires; no encoder is left
    ///   running and no partial file is left on disk.
    /// - Encoder, listener, or transport failures.
    pub async fn start(&self, token: &CancellationToken) -> Result<String, CastError> {
        let state = self
            .latest
            .read()
            .await
            .clone()
            .ok_or(CastError::NoStateAvailable)?;
        let _guard = RunGuard::acquire(&self.running).ok_or(CastError::AlreadyRunning)?;

        match self.run_pipeline(&state, token).await {
            Ok(url) => {
                self.set_stage(PipelineStage::Idle);
                Ok(url)
            }
            Err(CastError::Cancelled) => {
                info!(device = %self.device.name, "video pipeline cancelled");
                self.set_stage(PipelineStage::Idle);
                Err(CastError::Cancelled)
            }
            Err(e) => {
                warn!(device = %self.device.name, error = %e, "video pipeline failed");
                self.set_stage(PipelineStage::Failed);
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        state: &ViewState,
        token: &CancellationToken,
    ) -> Result<String, CastError> {
        let path = self.options.output_dir.join(format!(
            "forestview_{}.mp4",
            uuid::Uuid::new_v4().simple()
        ));
        self.generate(state, &path, token).await?;

        self.set_stage(PipelineStage::Serving);
        self.publish_file(path).await;
        let addr = self.ensure_server().await?;

        self.set_stage(PipelineStage::Casting);
        let ip = match self.options.advertise_ip {
            Some(ip) => ip,
            None => net::local_ip().await,
        };
        let url = format!("http://{}{STREAM_PATH}", SocketAddr::new(ip, addr.port()));
        self.transport
            .stream_video(&self.device, &url, &self.options.title)
            .await?;

        info!(device = %self.device.name, url = %url, "video casting");
        Ok(url)
    }

    /// Render every frame into the encoder and wait for it to finish.
    async fn generate(
        &self,
        state: &ViewState,
        path: &Path,
        token: &CancellationToken,
    ) -> Result<(), CastError> {
        let (width, height) = self.renderer.dimensions();
        let total_frames = self.options.total_frames();
        let scene = Arc::new(Scene::from_view(state));

        let encoder = &self.options.encoder;
        let values = Placeholders {
            width,
            height,
            fps: self.options.frame_rate,
            input: None,
            output: Some(path),
        };
        let mut child = encoder
            .command(&values)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: encoder.program().to_owned(),
                source,
            })?;
        // Drained concurrently so a chatty encoder never blocks on a full pipe.
        let stderr = child.stderr.take().map(collect_stderr);
        let Some(mut stdin) = child.stdin.take() else {
            abort(&mut child, path).await;
            return Err(EncodeError::Io(std::io::Error::other("encoder stdin unavailable")).into());
        };

        self.set_stage(PipelineStage::Rendering);
        let mut written: u64 = 0;
        let mut skipped: u64 = 0;
        for index in 0..total_frames {
            if token.is_cancelled() {
                drop(stdin);
                abort(&mut child, path).await;
                return Err(CastError::Cancelled);
            }

            let Some(frame) = self.render_frame(&scene, width, height).await else {
                debug!(frame = index, "skipping frame");
                skipped = skipped.saturating_add(1);
                continue;
            };

            let write = tokio::select! {
                biased;
                () = token.cancelled() => None,
                result = stdin.write_all(&frame.pixels) => Some(result),
            };
            match write {
                Some(Ok(())) => written = written.saturating_add(1),
                Some(Err(source)) => {
                    drop(stdin);
                    abort(&mut child, path).await;
                    return Err(EncodeError::Write {
                        program: encoder.program().to_owned(),
                        source,
                    }
                    .into());
                }
                None => {
                    drop(stdin);
                    abort(&mut child, path).await;
                    return Err(CastError::Cancelled);
                }
            }
        }

        drop(stdin);
        self.set_stage(PipelineStage::Encoding);
        let exit = tokio::select! {
            biased;
            () = token.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let status = match exit {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                abort(&mut child, path).await;
                return Err(EncodeError::Io(e).into());
            }
            None => {
                abort(&mut child, path).await;
                return Err(CastError::Cancelled);
            }
        };
        if !status.success() {
            remove_quietly(path).await;
            let stderr = match stderr {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };
            return Err(EncodeError::Exit {
                program: encoder.program().to_owned(),
                status,
                stderr,
            }
            .into());
        }

        info!(
            frames = written,
            skipped,
            path = %path.display(),
            "video encoded"
        );
        Ok(())
    }

    /// Render one frame on a blocking worker. `None` for missing,
    /// mis-sized, or panicked renders.
    async fn render_frame(&self, scene: &Arc<Scene>, width: u32, height: u32) -> Option<Frame> {
        let renderer = Arc::clone(&self.renderer);
        let scene = Arc::clone(scene);
        match tokio::task::spawn_blocking(move || renderer.render(&scene)).await {
            Ok(Some(frame)) if frame.has_size(width, height) => Some(frame),
            Ok(Some(frame)) => {
                debug!(
                    got_width = frame.width,
                    got_height = frame.height,
                    "frame has wrong size"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "render task failed");
                None
            }
        }
    }

    /// Make `path` the served file, deleting the one it replaces.
    async fn publish_file(&self, path: PathBuf) {
        let previous = self.video_file.write().await.replace(path);
        if let Some(old) = previous {
            remove_quietly(&old).await;
        }
    }

    /// Bind the stream listener unless it is already running.
    async fn ensure_server(&self) -> Result<SocketAddr, CastError> {
        let mut server = self.server.lock().await;
        if let Some(running) = server.as_ref() {
            return Ok(running.addr);
        }

        let bind = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.options.stream_port));
        let listener = TcpListener::bind(bind)
            .await
            .map_err(|e| CastError::Serve(format!("bind failed on {bind}: {e}")))?;
        let addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let router = stream_router(Arc::clone(&self.video_file));
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
        });

        info!(addr = %addr, "stream server listening");
        *server = Some(StreamServer {
            addr,
            shutdown,
            handle,
        });
        Ok(addr)
    }

    async fn shutdown_server(&self) -> Result<(), CastError> {
        let Some(server) = self.server.lock().await.take() else {
            return Ok(());
        };
        server.shutdown.cancel();
        let mut handle = server.handle;
        match tokio::time::timeout(SERVER_SHUTDOWN_GRACE, &mut handle).await {
            Ok(Ok(result)) => result.map_err(|e| CastError::Serve(format!("serve error: {e}"))),
            Ok(Err(e)) => Err(CastError::Serve(format!("server task failed: {e}"))),
            Err(_) => {
                warn!(addr = %server.addr, "stream server did not stop in time, aborting");
                handle.abort();
                Ok(())
            }
        }
    }

    async fn remove_video_file(&self) -> Result<(), CastError> {
        let Some(path) = self.video_file.write().await.take() else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Halt playback on the display.
    pub async fn stop(&self) -> Result<(), CastError> {
        self.transport.stop(&self.device).await?;
        Ok(())
    }

    /// Shut down the stream listener, release the renderer and the
    /// transport, and delete the served file.
    ///
    /// Every step is attempted. The first failure is returned and the
    /// others are logged.
    pub async fn shutdown(&self) -> Result<(), CastError> {
        let mut first: Option<CastError> = None;
        let mut record = |step: &'static str, result: Result<(), CastError>| {
            if let Err(e) = result {
                warn!(step, error = %e, "video target cleanup failed");
                first.get_or_insert(e);
            }
        };

        record("stream server", self.shutdown_server().await);
        record("renderer", self.renderer.close());
        record(
            "transport",
            self.transport.close().await.map_err(CastError::from),
        );
        record("video file", self.remove_video_file().await);

        first.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl Target for VideoTarget {
    async fn update(&self, state: Arc<ViewState>) -> Result<(), TargetError> {
        *self.latest.write().await = Some(state);
        Ok(())
    }

    async fn close(&self) -> Result<(), TargetError> {
        self.shutdown().await.map_err(TargetError::from)
    }

    fn name(&self) -> String {
        format!("VideoTarget({})", self.device.name)
    }
}

/// Router serving the current file at [`STREAM_PATH`].
fn stream_router(current: SharedPath) -> Router {
    Router::new()
        .route(STREAM_PATH, get(serve_stream))
        .with_state(current)
}

/// Serve the current file with range support, or 404 before the first run.
async fn serve_stream(State(current): State<SharedPath>, request: Request) -> Response {
    let Some(path) = current.read().await.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Read the encoder's stderr to the end, keeping the last
/// [`STDERR_TAIL`] bytes.
fn collect_stderr(mut pipe: ChildStderr) -> JoinHandle<String> {
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = pipe.read_to_end(&mut buf).await {
            debug!(error = %e, "encoder stderr read failed");
        }
        let start = buf.len().saturating_sub(STDERR_TAIL);
        buf.get(start..)
            .map(|tail| String::from_utf8_lossy(tail).trim().to_owned())
            .unwrap_or_default()
    })
}

/// Kill the encoder, reap it, and delete its partial output.
async fn abort(child: &mut Child, path: &Path) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "encoder already exited");
    }
    if let Err(e) = child.wait().await {
        warn!(error = %e, "failed to reap encoder");
    }
    remove_quietly(path).await;
}

/// Delete a file, ignoring "not found" and logging anything else.
async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "removed video file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove video file"),
    }
}
