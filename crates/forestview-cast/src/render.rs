//! The frame renderer seam and a small software renderer.
//!
//! Display targets never draw pixels themselves. They hand a [`Scene`] to
//! a [`FrameRenderer`] and get back a [`Frame`] of tightly packed RGBA
//! bytes, or nothing when the renderer could not produce one.
//!
//! [`TileRenderer`] is a deterministic renderer that draws every land as
//! a coloured tile and every process as a progress bar inside its land.
//! Equal scenes always yield byte-identical frames.

use std::collections::HashMap;

use forestview_core::{LandKind, Scene};
use forestview_types::ProcessKind;

use crate::error::CastError;

/// Bytes per RGBA pixel.
const BYTES_PER_PIXEL: usize = 4;

/// One rendered image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long.
    pub pixels: Vec<u8>,
}

impl Frame {
    /// Build a frame, rejecting a pixel buffer of the wrong length.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (Some(pixels.len()) == buffer_len(width, height)).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Whether this frame has the given dimensions and a matching buffer.
    pub fn has_size(&self, width: u32, height: u32) -> bool {
        self.width == width
            && self.height == height
            && Some(self.pixels.len()) == buffer_len(width, height)
    }
}

/// Length of an RGBA buffer for the given dimensions.
fn buffer_len(width: u32, height: u32) -> Option<usize> {
    usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Turns scene descriptions into frames.
///
/// Calls are made from a blocking worker thread, so implementations may
/// do CPU-heavy work directly.
pub trait FrameRenderer: Send + Sync {
    /// Render one frame of `scene`. `None` means no frame was produced.
    fn render(&self, scene: &Scene) -> Option<Frame>;

    /// The dimensions of the frames this renderer produces.
    fn dimensions(&self) -> (u32, u32);

    /// Release renderer resources.
    fn close(&self) -> Result<(), CastError> {
        Ok(())
    }
}

type Rgba = [u8; 4];

const BACKGROUND: Rgba = [0x1a, 0x1a, 0x2e, 0xff];
const LAND_NORMAL: Rgba = [0x2d, 0x6a, 0x4f, 0xff];
const LAND_MANA: Rgba = [0x5b, 0x3f, 0x8c, 0xff];
const BAR_TRACK: Rgba = [0x0f, 0x17, 0x2a, 0xff];

const fn process_color(kind: ProcessKind) -> Rgba {
    match kind {
        ProcessKind::Tree => [0x4a, 0xde, 0x80, 0xff],
        ProcessKind::Treehouse => [0xfb, 0xbf, 0x24, 0xff],
        ProcessKind::Nim => [0x60, 0xa5, 0xfa, 0xff],
    }
}

/// Software renderer drawing lands as tiles and processes as bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRenderer {
    width: u32,
    height: u32,
}

impl TileRenderer {
    /// Create a renderer producing `width` x `height` frames.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameRenderer for TileRenderer {
    fn render(&self, scene: &Scene) -> Option<Frame> {
        let mut canvas = Canvas::new(self.width, self.height)?;

        let columns = scene
            .lands
            .iter()
            .map(|land| cell(land.x))
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let rows = scene
            .lands
            .iter()
            .map(|land| cell(land.y))
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let tile_w = self.width.checked_div(columns).unwrap_or(0);
        let tile_h = self.height.checked_div(rows).unwrap_or(0);
        let pad = (tile_w.min(tile_h) / 16).max(1);

        for land in &scene.lands {
            let color = match land.kind {
                LandKind::Normal => LAND_NORMAL,
                LandKind::Mana => LAND_MANA,
            };
            canvas.fill(
                cell(land.x).saturating_mul(tile_w).saturating_add(pad),
                cell(land.y).saturating_mul(tile_h).saturating_add(pad),
                tile_w.saturating_sub(pad.saturating_mul(2)),
                tile_h.saturating_sub(pad.saturating_mul(2)),
                color,
            );
        }

        // Bars fill each tile left to right in scene order.
        let bar_w = (tile_w / 12).max(1);
        let bar_h = tile_h / 2;
        let mut slots: HashMap<&str, u32> = HashMap::new();
        for process in &scene.processes {
            let slot = slots.entry(process.land_id.as_str()).or_insert(0);
            let left = cell(process.x)
                .saturating_mul(tile_w)
                .saturating_add(pad.saturating_mul(2))
                .saturating_add(slot.saturating_mul(bar_w.saturating_add(pad)));
            let bottom = cell(process.y)
                .saturating_add(1)
                .saturating_mul(tile_h)
                .saturating_sub(pad.saturating_mul(2));
            *slot = slot.saturating_add(1);

            let filled = scaled(bar_h, process.progress);
            canvas.fill(left, bottom.saturating_sub(bar_h), bar_w, bar_h, BAR_TRACK);
            canvas.fill(
                left,
                bottom.saturating_sub(filled),
                bar_w,
                filled,
                process_color(process.kind),
            );
        }

        Some(canvas.into_frame())
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Grid coordinate to cell index. Negative and non-finite values map to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to [0, u32::MAX] first.
fn cell(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// `length * progress`, with progress clamped to [0, 1] for drawing only.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Result lies in [0, length].
fn scaled(length: u32, progress: f64) -> u32 {
    let progress = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    (f64::from(length) * progress).round() as u32
}

/// A mutable RGBA pixel buffer.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let len = buffer_len(width, height)?;
        let pixels = BACKGROUND.iter().copied().cycle().take(len).collect();
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Fill a rectangle, clipped to the canvas.
    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgba) {
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        if x >= x_end || y >= y_end {
            return;
        }
        let (Ok(x), Ok(x_end), Ok(stride)) = (
            usize::try_from(x),
            usize::try_from(x_end),
            usize::try_from(self.width),
        ) else {
            return;
        };

        for row in y..y_end {
            let Ok(row) = usize::try_from(row) else {
                return;
            };
            let base = row.saturating_mul(stride);
            let start = base.saturating_add(x).saturating_mul(BYTES_PER_PIXEL);
            let end = base.saturating_add(x_end).saturating_mul(BYTES_PER_PIXEL);
            if let Some(span) = self.pixels.get_mut(start..end) {
                for pixel in span.chunks_exact_mut(BYTES_PER_PIXEL) {
                    pixel.copy_from_slice(&color);
                }
            }
        }
    }

    fn into_frame(self) -> Frame {
        Frame {
            width: self.width,
            height: self.height,
            pixels: self.pixels,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use forestview_types::{LandView, ProcessView, SummaryView, ViewState};

    use super::*;

    fn scene(progress: f64) -> Scene {
        Scene::from_view(&ViewState {
            lands: vec![
                LandView {
                    id: "a".to_owned(),
                    hostname: "alpha".to_owned(),
                    trees: vec![ProcessView {
                        id: "t".to_owned(),
                        name: "t".to_owned(),
                        kind: ProcessKind::Tree,
                        ram_allocated: 0,
                        progress,
                    }],
                    ..LandView::default()
                },
                LandView {
                    id: "b".to_owned(),
                    hostname: "beta".to_owned(),
                    grid_x: 1,
                    is_manaland: true,
                    ..LandView::default()
                },
            ],
            summary: SummaryView::default(),
        })
    }

    #[test]
    fn frame_rejects_wrong_buffer_length() {
        assert!(Frame::new(2, 2, vec![0; 16]).is_some());
        assert!(Frame::new(2, 2, vec![0; 15]).is_none());
        let frame = Frame::new(2, 1, vec![0; 8]).unwrap();
        assert!(frame.has_size(2, 1));
        assert!(!frame.has_size(1, 2));
    }

    #[test]
    fn renders_frames_of_configured_size() {
        let renderer = TileRenderer::new(64, 36);
        let frame = renderer.render(&scene(0.5)).unwrap();
        assert!(frame.has_size(64, 36));
        assert_eq!(renderer.dimensions(), (64, 36));
    }

    #[test]
    fn empty_scene_is_background() {
        let frame = TileRenderer::new(4, 4).render(&Scene::default()).unwrap();
        assert!(frame.pixels.chunks_exact(4).all(|px| px == BACKGROUND));
    }

    #[test]
    fn zero_size_renders_nothing() {
        assert!(TileRenderer::new(0, 10).render(&scene(0.5)).is_none());
    }

    #[test]
    fn rendering_is_deterministic_and_tracks_progress() {
        let renderer = TileRenderer::new(96, 48);
        let a = renderer.render(&scene(0.1)).unwrap();
        let b = renderer.render(&scene(0.1)).unwrap();
        let c = renderer.render(&scene(0.9)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn out_of_range_progress_is_clamped_for_drawing() {
        let renderer = TileRenderer::new(96, 48);
        assert_eq!(
            renderer.render(&scene(7.5)).unwrap(),
            renderer.render(&scene(1.0)).unwrap()
        );
        assert_eq!(
            renderer.render(&scene(-2.0)).unwrap(),
            renderer.render(&scene(0.0)).unwrap()
        );
    }

    #[test]
    fn mana_and_normal_tiles_differ() {
        let frame = TileRenderer::new(96, 48).render(&scene(0.0)).unwrap();
        // Centre pixel of each tile.
        let pixel = |x: usize, y: usize| frame.pixels[(y * 96 + x) * 4..(y * 96 + x) * 4 + 4].to_vec();
        assert_eq!(pixel(24, 10), LAND_NORMAL.to_vec());
        assert_eq!(pixel(72, 10), LAND_MANA.to_vec());
    }
}
