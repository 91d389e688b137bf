//! Projection of a [`ViewState`] into renderer scene descriptors.
//!
//! Renderers do not see the view model directly. They receive a [`Scene`]:
//! a flat list of land tiles and a flat list of process sprites, each
//! sprite positioned on its owning land. The projection is pure and
//! deterministic, so equal snapshots always yield equal scenes.

use forestview_types::{ProcessKind, ViewState};

/// Visual category of a land tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LandKind {
    /// An ordinary land.
    Normal,
    /// A manaland.
    Mana,
}

impl LandKind {
    /// The tag used by sprite renderers.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Mana => "mana",
        }
    }
}

/// A land tile in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLand {
    /// Land identifier.
    pub id: String,
    /// Display name (the host name).
    pub name: String,
    /// Grid column.
    pub x: f64,
    /// Grid row.
    pub y: f64,
    /// Tile category.
    pub kind: LandKind,
}

/// A process sprite in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneProcess {
    /// Process identifier.
    pub id: String,
    /// Identifier of the owning land.
    pub land_id: String,
    /// Process kind.
    pub kind: ProcessKind,
    /// Progress, passed through unclamped.
    pub progress: f64,
    /// Grid column, inherited from the owning land.
    pub x: f64,
    /// Grid row, inherited from the owning land.
    pub y: f64,
}

/// Everything a renderer needs to draw one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    /// Land tiles in snapshot order.
    pub lands: Vec<SceneLand>,
    /// Process sprites: per land, trees then treehouses then nims.
    pub processes: Vec<SceneProcess>,
}

impl Scene {
    /// Project a snapshot into a scene.
    pub fn from_view(state: &ViewState) -> Self {
        let lands = state
            .lands
            .iter()
            .map(|land| SceneLand {
                id: land.id.clone(),
                name: land.hostname.clone(),
                x: f64::from(land.grid_x),
                y: f64::from(land.grid_y),
                kind: if land.is_manaland {
                    LandKind::Mana
                } else {
                    LandKind::Normal
                },
            })
            .collect();

        let processes = state
            .lands
            .iter()
            .flat_map(|land| {
                ProcessKind::ALL.iter().flat_map(move |kind| {
                    land.processes(*kind).iter().map(move |proc| SceneProcess {
                        id: proc.id.clone(),
                        land_id: land.id.clone(),
                        // The list a process sits in decides its kind.
                        kind: *kind,
                        progress: proc.progress,
                        x: f64::from(land.grid_x),
                        y: f64::from(land.grid_y),
                    })
                })
            })
            .collect();

        Self { lands, processes }
    }

    /// Whether the scene contains nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.lands.is_empty() && self.processes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use forestview_types::{LandView, ProcessView, SummaryView};

    use super::*;

    fn proc(id: &str, kind: ProcessKind, progress: f64) -> ProcessView {
        ProcessView {
            id: id.to_owned(),
            name: id.to_owned(),
            kind,
            ram_allocated: 0,
            progress,
        }
    }

    fn sample() -> ViewState {
        ViewState {
            lands: vec![
                LandView {
                    id: "land-1".to_owned(),
                    hostname: "alpha".to_owned(),
                    grid_x: 0,
                    grid_y: 0,
                    nims: vec![proc("nim-1", ProcessKind::Nim, 0.5)],
                    trees: vec![proc("tree-1", ProcessKind::Tree, 0.8)],
                    ..LandView::default()
                },
                LandView {
                    id: "land-2".to_owned(),
                    hostname: "beta".to_owned(),
                    grid_x: 1,
                    grid_y: 2,
                    is_manaland: true,
                    treehouses: vec![proc("th-1", ProcessKind::Treehouse, 1.7)],
                    ..LandView::default()
                },
            ],
            summary: SummaryView::default(),
        }
    }

    #[test]
    fn lands_carry_position_and_kind() {
        let scene = Scene::from_view(&sample());
        assert_eq!(scene.lands.len(), 2);
        assert_eq!(scene.lands[0].name, "alpha");
        assert_eq!(scene.lands[0].kind, LandKind::Normal);
        assert_eq!(scene.lands[1].kind, LandKind::Mana);
        assert!((scene.lands[1].y - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn processes_inherit_land_position_in_kind_order() {
        let scene = Scene::from_view(&sample());
        let ids: Vec<&str> = scene.processes.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["tree-1", "nim-1", "th-1"]);

        let th = &scene.processes[2];
        assert_eq!(th.land_id, "land-2");
        assert!((th.x - 1.0).abs() < f64::EPSILON);
        // Out-of-range progress passes through.
        assert!((th.progress - 1.7).abs() < f64::EPSILON);
    }

    #[test]
    fn projection_is_deterministic() {
        let state = sample();
        assert_eq!(Scene::from_view(&state), Scene::from_view(&state));
        assert!(Scene::from_view(&ViewState::default()).is_empty());
    }
}
