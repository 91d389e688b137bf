//! JSON projection of a [`ViewState`] for the browser client.
//!
//! The wire shape differs from the in-memory model in three ways:
//!
//! - every process object carries a `type` tag injected from the list it
//!   came from rather than stored per object,
//! - lands that sit at the grid origin (other than the first) are spread
//!   over a computed square grid,
//! - the summary occupancy is recomputed as `allocated / total`, and is
//!   `0` when the total is zero.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::view::{LandView, ProcessKind, ProcessView, ViewState};

/// The document served at `GET /api/viewmodel`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldJson {
    /// Lands in layout order.
    pub lands: Vec<LandJson>,
    /// Aggregate statistics.
    pub summary: SummaryJson,
}

/// JSON representation of a land tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LandJson {
    /// Land identifier.
    pub id: String,
    /// Host name.
    pub hostname: String,
    /// Total memory in bytes.
    pub ram_total: u64,
    /// Allocated memory in bytes.
    pub ram_allocated: u64,
    /// Fractional occupancy as supplied by the provider.
    pub occupancy: f64,
    /// Whether the land is a manaland.
    pub is_manaland: bool,
    /// Grid column (computed when the stored position is the origin).
    pub grid_x: i32,
    /// Grid row (computed when the stored position is the origin).
    pub grid_y: i32,
    /// Tree processes.
    pub trees: Vec<ProcessJson>,
    /// Treehouse processes.
    pub treehouses: Vec<ProcessJson>,
    /// Nim processes.
    pub nims: Vec<ProcessJson>,
}

/// JSON representation of a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ProcessJson {
    /// Process identifier.
    pub id: String,
    /// Process name.
    pub name: String,
    /// Allocated memory in bytes.
    pub ram_allocated: u64,
    /// Kind tag of the list the process was found in.
    #[serde(rename = "type")]
    pub process_type: String,
    /// Fractional progress, passed through unclamped.
    pub progress: f64,
}

/// JSON representation of the world summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SummaryJson {
    /// Number of lands.
    pub land_count: u32,
    /// Number of manalands.
    pub manaland_count: u32,
    /// Number of trees.
    pub tree_count: u32,
    /// Number of treehouses.
    pub treehouse_count: u32,
    /// Number of nims.
    pub nim_count: u32,
    /// Total memory in bytes.
    pub total_ram: u64,
    /// Allocated memory in bytes.
    pub ram_allocated: u64,
    /// `ram_allocated / total_ram`, or `0` when `total_ram` is zero.
    pub occupancy: f64,
}

impl WorldJson {
    /// Project a snapshot into its wire form.
    ///
    /// An absent snapshot yields an empty but valid document.
    pub fn from_view(state: Option<&ViewState>) -> Self {
        let Some(state) = state else {
            return Self::default();
        };

        let grid_size = grid_size(state.lands.len());
        let lands = state
            .lands
            .iter()
            .enumerate()
            .map(|(index, land)| land_json(index, land, grid_size))
            .collect();

        let summary = &state.summary;
        Self {
            lands,
            summary: SummaryJson {
                land_count: summary.total_lands,
                manaland_count: summary.total_manalands,
                tree_count: summary.total_trees,
                treehouse_count: summary.total_treehouses,
                nim_count: summary.total_nims,
                total_ram: summary.total_ram,
                ram_allocated: summary.allocated_ram,
                occupancy: occupancy(summary.allocated_ram, summary.total_ram),
            },
        }
    }

    /// Serialize the projection of a snapshot to JSON bytes.
    pub fn to_bytes(state: Option<&ViewState>) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&Self::from_view(state))
    }
}

/// Fraction of allocated memory, degrading to `0` on an empty total.
#[allow(clippy::cast_precision_loss)] // Byte counts far below 2^52 in practice.
pub fn occupancy(allocated: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    allocated as f64 / total as f64
}

/// Side length of the smallest square grid holding `count` lands.
fn grid_size(count: usize) -> usize {
    let mut size = 1_usize;
    while size.saturating_mul(size) < count {
        size = size.saturating_add(1);
    }
    size
}

fn land_json(index: usize, land: &LandView, grid_size: usize) -> LandJson {
    let (mut grid_x, mut grid_y) = (land.grid_x, land.grid_y);
    if grid_x == 0 && grid_y == 0 && index > 0 {
        grid_x = index
            .checked_rem(grid_size)
            .and_then(|x| i32::try_from(x).ok())
            .unwrap_or_default();
        grid_y = index
            .checked_div(grid_size)
            .and_then(|y| i32::try_from(y).ok())
            .unwrap_or_default();
    }

    LandJson {
        id: land.id.clone(),
        hostname: land.hostname.clone(),
        ram_total: land.ram_total,
        ram_allocated: land.ram_allocated,
        occupancy: land.occupancy,
        is_manaland: land.is_manaland,
        grid_x,
        grid_y,
        trees: processes_json(&land.trees, ProcessKind::Tree),
        treehouses: processes_json(&land.treehouses, ProcessKind::Treehouse),
        nims: processes_json(&land.nims, ProcessKind::Nim),
    }
}

fn processes_json(processes: &[ProcessView], kind: ProcessKind) -> Vec<ProcessJson> {
    processes
        .iter()
        .map(|p| ProcessJson {
            id: p.id.clone(),
            name: p.name.clone(),
            ram_allocated: p.ram_allocated,
            process_type: kind.as_str().to_owned(),
            progress: p.progress,
        })
        .collect()
}
