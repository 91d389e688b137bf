//! Animated demo snapshots, used when no state file is configured.
//!
//! Four lands on a 2x2 grid. Every fetch advances process progress and
//! land occupancy, wrapping back once they pass 1.0, so every target sees
//! a changing picture.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use forestview_core::{ProviderError, StateProvider};
use forestview_types::{LandView, ProcessKind, ProcessView, SummaryView, ViewState};
use rand::Rng;

const TREE_STEP: f64 = 0.1;
const NIM_STEP: f64 = 0.15;
const OCCUPANCY_STEP: f64 = 0.05;
const OCCUPANCY_RESET: f64 = 0.2;

/// Provider whose snapshot drifts on every fetch.
#[derive(Debug)]
pub struct DemoStateProvider {
    state: Mutex<ViewState>,
}

impl DemoStateProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(initial_state()),
        }
    }
}

impl Default for DemoStateProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateProvider for DemoStateProvider {
    async fn view_state(&self) -> Result<Arc<ViewState>, ProviderError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| ProviderError::new(format_args!("demo state poisoned: {e}")))?;
        advance(&mut state, &mut rand::rng());
        Ok(Arc::new(state.clone()))
    }
}

/// Step every progress and occupancy value. Treehouses are left alone.
fn advance(state: &mut ViewState, rng: &mut impl Rng) {
    for land in &mut state.lands {
        for tree in &mut land.trees {
            tree.progress = wrap(tree.progress + TREE_STEP, 0.0);
        }
        for nim in &mut land.nims {
            nim.progress = wrap(nim.progress + NIM_STEP, 0.0);
        }
        let jitter = rng.random_range(-0.02..=0.02);
        land.occupancy = wrap(land.occupancy + OCCUPANCY_STEP + jitter, OCCUPANCY_RESET);
    }
}

fn wrap(value: f64, reset: f64) -> f64 {
    if value > 1.0 { reset } else { value }
}

fn process(id: &str, name: &str, kind: ProcessKind, progress: f64) -> ProcessView {
    ProcessView {
        id: id.to_owned(),
        name: name.to_owned(),
        kind,
        ram_allocated: 0,
        progress,
    }
}

fn initial_state() -> ViewState {
    const GB: u64 = 1_000_000_000;
    ViewState {
        lands: vec![
            LandView {
                id: "land-1".to_owned(),
                hostname: "node-alpha".to_owned(),
                occupancy: 0.6,
                ram_total: 16 * GB,
                ram_allocated: 10 * GB,
                trees: vec![process("tree-1", "data-parser", ProcessKind::Tree, 0.8)],
                nims: vec![process("nim-1", "ai-handler", ProcessKind::Nim, 0.5)],
                ..LandView::default()
            },
            LandView {
                id: "land-2".to_owned(),
                hostname: "node-beta".to_owned(),
                grid_x: 1,
                is_manaland: true,
                occupancy: 0.3,
                ram_total: 32 * GB,
                ram_allocated: 10 * GB,
                trees: vec![process("tree-2", "gpu-worker", ProcessKind::Tree, 0.9)],
                ..LandView::default()
            },
            LandView {
                id: "land-3".to_owned(),
                hostname: "node-gamma".to_owned(),
                grid_y: 1,
                occupancy: 0.4,
                ram_total: 8 * GB,
                ram_allocated: 3 * GB,
                treehouses: vec![process(
                    "th-1",
                    "lua-script",
                    ProcessKind::Treehouse,
                    1.0,
                )],
                ..LandView::default()
            },
            LandView {
                id: "land-4".to_owned(),
                hostname: "node-delta".to_owned(),
                grid_x: 1,
                grid_y: 1,
                occupancy: 0.2,
                ram_total: 16 * GB,
                ram_allocated: 3 * GB,
                ..LandView::default()
            },
        ],
        summary: SummaryView {
            total_lands: 4,
            total_manalands: 1,
            total_trees: 2,
            total_treehouses: 1,
            total_nims: 1,
            total_ram: 72 * GB,
            allocated_ram: 26 * GB,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn each_fetch_advances_progress() {
        let provider = DemoStateProvider::new();

        let first = provider.view_state().await.unwrap();
        let second = provider.view_state().await.unwrap();

        let step = second.lands[0].trees[0].progress - first.lands[0].trees[0].progress;
        assert!(step.abs() > f64::EPSILON);
        assert_eq!(first.summary.total_lands, 4);
    }

    #[test]
    fn progress_wraps_to_zero() {
        let mut state = initial_state();
        state.lands[1].trees[0].progress = 0.95;

        advance(&mut state, &mut rand::rng());

        assert!(state.lands[1].trees[0].progress.abs() < f64::EPSILON);
    }

    #[test]
    fn treehouses_do_not_move() {
        let mut state = initial_state();

        advance(&mut state, &mut rand::rng());

        assert!((state.lands[2].treehouses[0].progress - 1.0).abs() < f64::EPSILON);
    }
}
