use std::time::Duration;

use glam::Vec3;
use habitat_scene::{CameraPose, NodeId};

use crate::config::{PoiConfig, ViewerConfig};
use crate::context::FrameContext;
use crate::scene_state::SceneState;
use crate::schedule::{ScheduledTask, secs};
use crate::spatial_index::SpatialIndex;

/// A tour stop with its resolved eye position and look-at point.
#[derive(Debug, Clone, PartialEq)]
pub struct TourPoint {
    pub name: String,
    pub position: Vec3,
    pub look_at: Vec3,
}

/// Ordered guided tour over the configured points of interest.
pub struct TourManager {
    points: Vec<TourPoint>,
    index: usize,
    transition_duration: f32,
    auto_advance: ScheduledTask,
    auto_enabled: bool,
}

impl Default for TourManager {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl TourManager {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            points: Vec::new(),
            index: 0,
            transition_duration: cfg.transition.duration,
            auto_advance: ScheduledTask::repeating(secs(cfg.tour.auto_advance_interval)),
            auto_enabled: false,
        }
    }

    pub fn points(&self) -> &[TourPoint] {
        &self.points
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&TourPoint> {
        self.points.get(self.index)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.auto_enabled
    }

    /// Replace the tour and jump straight to its first stop.
    pub fn set_points(&mut self, pois: &[PoiConfig], ctx: &mut FrameContext<'_>) {
        let eye = ctx.camera.eye_height();
        self.points = pois
            .iter()
            .map(|poi| {
                let y = ctx.scene.safe_ground_height(poi.x, poi.z) + eye;
                let position = Vec3::new(poi.x, y, poi.z);
                let look_at = resolve_look_at(ctx.scene, &poi.name, position);
                TourPoint {
                    name: poi.name.clone(),
                    position,
                    look_at,
                }
            })
            .collect();
        self.index = 0;

        tracing::info!("tour set with {} points", self.points.len());
        if !self.points.is_empty() {
            self.go_to(0, true, ctx);
        }
    }

    /// Move to stop `index`, wrapping in both directions.
    pub fn go_to(&mut self, index: isize, instant: bool, ctx: &mut FrameContext<'_>) {
        if self.points.is_empty() {
            return;
        }
        self.index = index.rem_euclid(self.points.len() as isize) as usize;
        let point = &mut self.points[self.index];

        let ground = ctx.scene.safe_ground_height(point.position.x, point.position.z);
        point.position.y = ground + ctx.camera.eye_height();

        let (yaw, pitch) = ctx.camera.compute_look_angles(point.position, point.look_at);
        if instant {
            ctx.camera.cancel_transition();
            ctx.camera.set_pose(CameraPose {
                position: point.position,
                yaw,
                pitch,
            });
            let height = ctx.scene.height_at(point.position.x, point.position.z);
            ctx.camera.adjust_to_ground(height);
        } else {
            ctx.camera
                .start_transition(point.position, yaw, pitch, self.transition_duration);
        }

        tracing::info!("heading to '{}' ({})", point.name, self.index);
        ctx.ui.show_destination(&point.name);
        let look_at = point.look_at;
        select_nearest(ctx, look_at);
    }

    pub fn next(&mut self, ctx: &mut FrameContext<'_>) {
        self.go_to(self.index as isize + 1, false, ctx);
    }

    pub fn previous(&mut self, ctx: &mut FrameContext<'_>) {
        self.go_to(self.index as isize - 1, false, ctx);
    }

    /// Start or stop automatic advancing. Does nothing without stops.
    pub fn toggle_auto_advance(&mut self, now: Duration) -> bool {
        if self.points.is_empty() {
            return false;
        }
        self.auto_enabled = !self.auto_enabled;
        if self.auto_enabled {
            self.auto_advance.schedule(now);
            tracing::info!(
                "auto tour started, every {:?}",
                self.auto_advance.delay()
            );
        } else {
            self.auto_advance.cancel();
            tracing::info!("auto tour stopped");
        }
        true
    }

    /// Fire the auto-advance timer if it is due.
    pub fn poll(&mut self, now: Duration, ctx: &mut FrameContext<'_>) {
        if self.auto_enabled && self.auto_advance.poll(now) {
            self.next(ctx);
        }
    }
}

/// Registry name match, else nearest interactive object, else nearest
/// drawable, else a point just ahead of the stop.
fn resolve_look_at(scene: &mut SceneState, name: &str, position: Vec3) -> Vec3 {
    let interactive = scene.interactive().to_vec();

    if let Some(hit) = SpatialIndex::find_by_name_in(&scene.graph, name, &interactive) {
        return scene.object_center(hit);
    }

    let nearest = SpatialIndex::find_nearest(position, &interactive, |id| {
        scene.classifier.object_center(&scene.graph, id, true)
    });
    if let Some(id) = nearest {
        return scene.object_center(id);
    }

    let graph = &scene.graph;
    let center = |id: NodeId| graph.subtree_bounds(id).center();
    if let Some(id) = SpatialIndex::find_nearest(position, scene.classifier.mesh_entries(), center) {
        return center(id);
    }

    position - Vec3::Z * 2.0
}

/// Outline whatever sits closest to `look_at`. Returns the selected target.
pub fn select_nearest(ctx: &mut FrameContext<'_>, look_at: Vec3) -> Option<NodeId> {
    let scene = &mut *ctx.scene;
    let interactive = scene.interactive().to_vec();

    let target = SpatialIndex::find_nearest(look_at, &interactive, |id| {
        scene.classifier.object_center(&scene.graph, id, true)
    })
    .or_else(|| {
        let graph = &scene.graph;
        SpatialIndex::find_nearest(look_at, scene.classifier.mesh_entries(), |id| {
            graph.subtree_bounds(id).center()
        })
        .map(|d| scene.classifier.find_highlight_target(graph, d))
    });

    let meshes = target
        .map(|t| scene.highlight_meshes(t))
        .unwrap_or_default();
    ctx.surface.set_outline(&meshes);
    target
}
