//! External encoder processes.
//!
//! All encoding is done by external programs (`ffmpeg`, and optionally
//! ImageMagick's `magick`) invoked with fixed argument templates. An
//! [`EncoderCommand`] holds one template; placeholders such as `{width}`
//! or `{output}` are filled in per invocation.
//!
//! Two still-image encoders implement [`StillEncoder`]:
//!
//! - [`DirectJpegEncoder`] -- one `ffmpeg` pass, raw RGBA on stdin, JPEG
//!   on stdout.
//! - [`CompatibleJpegEncoder`] -- `ffmpeg` writes a JPEG to a scratch
//!   file, then `magick` rewrites it as baseline JFIF, which more
//!   displays accept. If `magick` is missing or fails, the first stage's
//!   output is used instead.

use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::EncodeError;
use crate::render::Frame;

/// Values substituted into an [`EncoderCommand`] template.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholders<'a> {
    /// `{width}`: frame width in pixels.
    pub width: u32,
    /// `{height}`: frame height in pixels.
    pub height: u32,
    /// `{fps}`: frame rate.
    pub fps: u32,
    /// `{input}`: input file path.
    pub input: Option<&'a Path>,
    /// `{output}`: output file path.
    pub output: Option<&'a Path>,
}

impl Placeholders<'_> {
    fn expand(&self, arg: &str) -> String {
        let path = |p: Option<&Path>| p.map(|p| p.display().to_string()).unwrap_or_default();
        arg.replace("{width}", &self.width.to_string())
            .replace("{height}", &self.height.to_string())
            .replace("{fps}", &self.fps.to_string())
            .replace("{input}", &path(self.input))
            .replace("{output}", &path(self.output))
    }
}

/// A program and its argument template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCommand {
    program: String,
    args: Vec<String>,
}

impl EncoderCommand {
    /// Create a command from a program and argument template.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Raw RGBA on stdin to H.264 baseline MP4 at `{output}`.
    #[rustfmt::skip]
    pub fn h264() -> Self {
        Self::new(
            "ffmpeg",
            [
                "-y", "-loglevel", "error",
                "-f", "rawvideo",
                "-pix_fmt", "rgba",
                "-s", "{width}x{height}",
                "-r", "{fps}",
                "-i", "pipe:0",
                "-c:v", "libx264",
                "-preset", "ultrafast",
                "-profile:v", "baseline",
                "-level", "3.0",
                "-pix_fmt", "yuv420p",
                "-movflags", "+faststart",
                "{output}",
            ],
        )
    }

    /// One raw RGBA frame on stdin to a JPEG on stdout.
    #[rustfmt::skip]
    pub fn jpeg_pipe() -> Self {
        Self::new(
            "ffmpeg",
            [
                "-loglevel", "error",
                "-f", "rawvideo",
                "-pix_fmt", "rgba",
                "-s", "{width}x{height}",
                "-i", "pipe:0",
                "-frames:v", "1",
                "-f", "image2pipe",
                "-c:v", "mjpeg",
                "-q:v", "2",
                "pipe:1",
            ],
        )
    }

    /// One raw RGBA frame on stdin to a full-range JPEG at `{output}`.
    #[rustfmt::skip]
    pub fn jpeg_file() -> Self {
        Self::new(
            "ffmpeg",
            [
                "-y", "-loglevel", "error",
                "-f", "rawvideo",
                "-pix_fmt", "rgba",
                "-s", "{width}x{height}",
                "-i", "pipe:0",
                "-vframes", "1",
                "-pix_fmt", "yuvj420p",
                "-q:v", "2",
                "{output}",
            ],
        )
    }

    /// Rewrite the JPEG at `{input}` as JFIF at `{output}`.
    pub fn jfif() -> Self {
        Self::new("magick", ["{input}", "{output}"])
    }

    /// The program this command runs.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Build a process for this template. Stdio is left to the caller.
    pub fn command(&self, values: &Placeholders<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(self.args.iter().map(|arg| values.expand(arg)))
            .kill_on_drop(true);
        command
    }

    /// Run to completion with `input` on stdin, capturing stdout and stderr.
    ///
    /// A non-zero exit is reported as [`EncodeError::Exit`], even when the
    /// process also stopped reading its input early.
    pub async fn run(&self, values: &Placeholders<'_>, input: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut child = self
            .command(values)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take();
        let feed = async move {
            match stdin.as_mut() {
                Some(pipe) => pipe.write_all(input).await,
                None => Ok(()),
            }
            // stdin drops here, closing the pipe.
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let Output {
            status,
            stdout,
            stderr,
        } = output?;

        if !status.success() {
            return Err(EncodeError::Exit {
                program: self.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_owned(),
            });
        }
        fed.map_err(|source| EncodeError::Write {
            program: self.program.clone(),
            source,
        })?;
        Ok(stdout)
    }
}

/// Converts a rendered frame into a still image for a display.
#[async_trait]
pub trait StillEncoder: Send + Sync {
    /// Encode `frame`.
    async fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError>;
}

/// Single-pass `ffmpeg` JPEG encoder.
#[derive(Debug, Clone)]
pub struct DirectJpegEncoder {
    command: EncoderCommand,
}

impl DirectJpegEncoder {
    /// Encoder using [`EncoderCommand::jpeg_pipe`].
    pub fn new() -> Self {
        Self::with_command(EncoderCommand::jpeg_pipe())
    }

    /// Encoder using a custom command that reads RGBA on stdin and writes
    /// the image to stdout.
    pub const fn with_command(command: EncoderCommand) -> Self {
        Self { command }
    }
}

impl Default for DirectJpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StillEncoder for DirectJpegEncoder {
    async fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        let values = Placeholders {
            width: frame.width,
            height: frame.height,
            ..Placeholders::default()
        };
        self.command.run(&values, &frame.pixels).await
    }
}

/// Two-stage `ffmpeg` + `magick` encoder with first-stage fallback.
#[derive(Debug, Clone)]
pub struct CompatibleJpegEncoder {
    first: EncoderCommand,
    second: EncoderCommand,
}

impl CompatibleJpegEncoder {
    /// Encoder using [`EncoderCommand::jpeg_file`] then [`EncoderCommand::jfif`].
    pub fn new() -> Self {
        Self::with_commands(EncoderCommand::jpeg_file(), EncoderCommand::jfif())
    }

    /// Encoder with custom stages. `first` reads RGBA on stdin and writes
    /// `{output}`; `second` converts `{input}` to `{output}`.
    pub const fn with_commands(first: EncoderCommand, second: EncoderCommand) -> Self {
        Self { first, second }
    }
}

impl Default for CompatibleJpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StillEncoder for CompatibleJpegEncoder {
    async fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
        let scratch = tempfile::Builder::new().prefix("forestview-").tempdir()?;
        let jpeg = scratch.path().join("frame.jpg");
        let jfif = scratch.path().join("frame_jfif.jpg");

        let first = Placeholders {
            width: frame.width,
            height: frame.height,
            output: Some(&jpeg),
            ..Placeholders::default()
        };
        self.first.run(&first, &frame.pixels).await?;

        let second = Placeholders {
            width: frame.width,
            height: frame.height,
            input: Some(&jpeg),
            output: Some(&jfif),
            ..Placeholders::default()
        };
        let bytes = match self.second.run(&second, &[]).await {
            Ok(_) => tokio::fs::read(&jfif).await?,
            Err(e) => {
                warn!(error = %e, "JFIF conversion failed, using ffmpeg output");
                tokio::fs::read(&jpeg).await?
            }
        };

        debug!(bytes = bytes.len(), "still image encoded");
        Ok(bytes)
    }
}
