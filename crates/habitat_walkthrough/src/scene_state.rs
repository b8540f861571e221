use std::sync::Arc;

use glam::Vec3;
use habitat_scene::{LoadedScene, NodeId, Ray, RayHit, Raycaster, SceneGraph};

use crate::classify::SceneClassifier;
use crate::config::ViewerConfig;
use crate::spatial_index::SpatialIndex;
use crate::terrain::{DEFAULT_HEIGHT_CACHE_CAPACITY, TerrainRegistry};

/// A loaded, classified and indexed scene.
///
/// Fields are public so callers can borrow the graph immutably while
/// mutating the classifier or terrain caches.
pub struct SceneState {
    pub graph: SceneGraph,
    pub root: NodeId,
    pub classifier: SceneClassifier,
    pub index: SpatialIndex,
    pub terrain: TerrainRegistry,
    pub raycaster: Arc<dyn Raycaster>,
    pub raycast_height: f32,
}

impl SceneState {
    /// Classify and index a freshly loaded scene.
    pub fn prepare(scene: LoadedScene, cfg: &ViewerConfig, raycaster: Arc<dyn Raycaster>) -> Self {
        let LoadedScene { graph, root } = scene;

        let mut classifier = SceneClassifier::from_config(cfg);
        let mut terrain = TerrainRegistry::new(DEFAULT_HEIGHT_CACHE_CAPACITY);
        classifier.process(&graph, root, &mut terrain);

        let mut index = SpatialIndex::new();
        index.build(&graph, root);

        Self {
            graph,
            root,
            classifier,
            index,
            terrain,
            raycaster,
            raycast_height: cfg.terrain.raycast_height,
        }
    }

    pub fn height_at(&mut self, x: f32, z: f32) -> Option<f32> {
        self.terrain.height_at(
            &self.graph,
            self.raycaster.as_ref(),
            self.raycast_height,
            x,
            z,
        )
    }

    pub fn safe_ground_height(&mut self, x: f32, z: f32) -> f32 {
        self.terrain.safe_ground_height(
            &self.graph,
            self.raycaster.as_ref(),
            self.raycast_height,
            x,
            z,
        )
    }

    pub fn cast(&self, ray: &Ray, candidates: &[NodeId], max_distance: f32) -> Vec<RayHit> {
        self.raycaster
            .cast(&self.graph, ray, candidates, max_distance)
    }

    pub fn interactive(&self) -> &[NodeId] {
        self.classifier.interactive().as_slice()
    }

    pub fn highlight_meshes(&mut self, target: NodeId) -> Vec<NodeId> {
        self.classifier.highlight_meshes(&self.graph, target)
    }

    pub fn highlight_target(&mut self, drawable: NodeId) -> NodeId {
        self.classifier.find_highlight_target(&self.graph, drawable)
    }

    pub fn object_center(&mut self, target: NodeId) -> Vec3 {
        self.classifier.object_center(&self.graph, target, true)
    }

    /// Label for a target: classifier display name, else its own name.
    pub fn label(&self, target: NodeId) -> &str {
        self.classifier
            .display_name(target)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.graph.name(target))
    }
}

impl std::fmt::Debug for SceneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneState")
            .field("nodes", &self.graph.len())
            .field("root", &self.root)
            .field("interactive", &self.classifier.interactive().len())
            .field("terrain", &self.terrain.meshes().len())
            .finish()
    }
}
