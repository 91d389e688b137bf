//! The visualization snapshot consumed by every output target.
//!
//! A [`ViewState`] is one consistent point-in-time picture of the
//! forest: the lands (hosts) laid out on a grid, the processes running
//! on each land, and a caller-supplied summary. Snapshots are built by a
//! state provider and shared read-only with all targets of one refresh
//! cycle.
//!
//! Values are deliberately permissive. `progress` is not clamped to
//! `[0, 1]` and `ram_allocated <= ram_total` is not enforced; consumers
//! must tolerate out-of-range input.

use serde::{Deserialize, Serialize};

/// The kind of a process running on a land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// A long-running worker process.
    Tree,
    /// A scripted process hosted inside a tree.
    Treehouse,
    /// An agent process.
    Nim,
}

impl ProcessKind {
    /// All kinds in canonical (display and projection) order.
    pub const ALL: [Self; 3] = [Self::Tree, Self::Treehouse, Self::Nim];

    /// The lowercase tag used on the wire and by renderers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Treehouse => "treehouse",
            Self::Nim => "nim",
        }
    }
}

impl std::fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A process running on a land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessView {
    /// Stable process identifier.
    pub id: String,
    /// Human-readable process name.
    pub name: String,
    /// The process kind.
    pub kind: ProcessKind,
    /// Memory allocated to the process, in bytes.
    #[serde(default)]
    pub ram_allocated: u64,
    /// Fractional progress, nominally in `[0, 1]` but never clamped.
    #[serde(default)]
    pub progress: f64,
}

/// A single land (host node) in the visualization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LandView {
    /// Stable land identifier.
    pub id: String,
    /// Host name shown as the land's label.
    pub hostname: String,
    /// Column on the layout grid.
    #[serde(default)]
    pub grid_x: i32,
    /// Row on the layout grid.
    #[serde(default)]
    pub grid_y: i32,
    /// Whether this land is a manaland (GPU-capable category).
    #[serde(default)]
    pub is_manaland: bool,
    /// Fractional occupancy, nominally in `[0, 1]`.
    #[serde(default)]
    pub occupancy: f64,
    /// Total memory capacity, in bytes.
    #[serde(default)]
    pub ram_total: u64,
    /// Allocated memory, in bytes. Not required to be `<= ram_total`.
    #[serde(default)]
    pub ram_allocated: u64,
    /// Tree processes, in display order.
    #[serde(default)]
    pub trees: Vec<ProcessView>,
    /// Treehouse processes, in display order.
    #[serde(default)]
    pub treehouses: Vec<ProcessView>,
    /// Nim processes, in display order.
    #[serde(default)]
    pub nims: Vec<ProcessView>,
}

impl LandView {
    /// The process list for one kind.
    pub fn processes(&self, kind: ProcessKind) -> &[ProcessView] {
        match kind {
            ProcessKind::Tree => &self.trees,
            ProcessKind::Treehouse => &self.treehouses,
            ProcessKind::Nim => &self.nims,
        }
    }

    /// All processes on this land: trees, then treehouses, then nims.
    pub fn all_processes(&self) -> Vec<ProcessView> {
        ProcessKind::ALL
            .iter()
            .flat_map(|kind| self.processes(*kind).iter().cloned())
            .collect()
    }
}

/// Aggregate statistics for the whole forest.
///
/// Supplied by the caller and never derived from the land records, so it
/// may disagree with them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryView {
    /// Number of lands.
    #[serde(default)]
    pub total_lands: u32,
    /// Number of manalands.
    #[serde(default)]
    pub total_manalands: u32,
    /// Number of tree processes.
    #[serde(default)]
    pub total_trees: u32,
    /// Number of treehouse processes.
    #[serde(default)]
    pub total_treehouses: u32,
    /// Number of nim processes.
    #[serde(default)]
    pub total_nims: u32,
    /// Total memory capacity, in bytes.
    #[serde(default)]
    pub total_ram: u64,
    /// Allocated memory, in bytes.
    #[serde(default)]
    pub allocated_ram: u64,
}

/// One immutable snapshot of the world to visualize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// Lands in layout order.
    #[serde(default)]
    pub lands: Vec<LandView>,
    /// Caller-supplied aggregate statistics.
    #[serde(default)]
    pub summary: SummaryView,
}

impl ViewState {
    /// Total number of processes across all lands.
    pub fn process_count(&self) -> usize {
        self.lands
            .iter()
            .map(|land| {
                land.trees
                    .len()
                    .saturating_add(land.treehouses.len())
                    .saturating_add(land.nims.len())
            })
            .fold(0_usize, usize::saturating_add)
    }
}
