use std::collections::{HashMap, VecDeque};

use habitat_scene::{NodeId, Ray, Raycaster, SceneGraph};

pub const DEFAULT_HEIGHT_CACHE_CAPACITY: usize = 1000;

type CacheKey = (i64, i64);

fn cache_key(x: f32, z: f32) -> CacheKey {
    ((x * 100.0).round() as i64, (z * 100.0).round() as i64)
}

/// Bounded memo of ground-height probes, keyed by (x, z) rounded to 0.01.
/// When full, the oldest inserted entry is evicted.
#[derive(Debug, Clone)]
pub struct HeightCache {
    capacity: usize,
    order: VecDeque<CacheKey>,
    heights: HashMap<CacheKey, Option<f32>>,
}

impl Default for HeightCache {
    fn default() -> Self {
        Self::new(DEFAULT_HEIGHT_CACHE_CAPACITY)
    }
}

impl HeightCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            heights: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Outer `None` is a miss; inner `None` is a cached "no ground here".
    pub fn get(&self, x: f32, z: f32) -> Option<Option<f32>> {
        self.heights.get(&cache_key(x, z)).copied()
    }

    pub fn insert(&mut self, x: f32, z: f32, height: Option<f32>) {
        let key = cache_key(x, z);
        if self.heights.insert(key, height).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.heights.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.heights.remove(&oldest);
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.heights.clear();
    }
}

/// Drawables classified as ground, plus the lowest point seen across them.
#[derive(Debug, Clone, Default)]
pub struct TerrainRegistry {
    meshes: Vec<NodeId>,
    base_height: Option<f32>,
    cache: HeightCache,
}

impl TerrainRegistry {
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            meshes: Vec::new(),
            base_height: None,
            cache: HeightCache::new(cache_capacity),
        }
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
        self.base_height = None;
        self.cache.clear();
    }

    pub fn register(&mut self, graph: &SceneGraph, id: NodeId) {
        if self.meshes.contains(&id) {
            return;
        }
        self.meshes.push(id);
        let bounds = graph.subtree_bounds(id);
        if !bounds.is_empty() && bounds.min.y.is_finite() {
            let min_y = bounds.min.y;
            self.base_height = Some(self.base_height.map_or(min_y, |h| h.min(min_y)));
        }
        // new ground invalidates earlier misses
        self.cache.clear();
    }

    pub fn remove(&mut self, id: NodeId) {
        self.meshes.retain(|m| *m != id);
        self.cache.clear();
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.meshes.contains(&id)
    }

    pub fn meshes(&self) -> &[NodeId] {
        &self.meshes
    }

    pub fn base_height(&self) -> Option<f32> {
        self.base_height
    }

    pub fn cache(&self) -> &HeightCache {
        &self.cache
    }

    /// Height of the first terrain surface below `raycast_height` at (x, z).
    pub fn height_at(
        &mut self,
        graph: &SceneGraph,
        raycaster: &dyn Raycaster,
        raycast_height: f32,
        x: f32,
        z: f32,
    ) -> Option<f32> {
        if let Some(cached) = self.cache.get(x, z) {
            return cached;
        }
        let ray = Ray::down_from(x, raycast_height, z);
        let height = raycaster
            .cast(graph, &ray, &self.meshes, f32::MAX)
            .first()
            .map(|hit| hit.point.y);
        self.cache.insert(x, z, height);
        height
    }

    /// Terrain height, else the lowest registered terrain point, else 0.
    pub fn safe_ground_height(
        &mut self,
        graph: &SceneGraph,
        raycaster: &dyn Raycaster,
        raycast_height: f32,
        x: f32,
        z: f32,
    ) -> f32 {
        self.height_at(graph, raycaster, raycast_height, x, z)
            .or(self.base_height)
            .unwrap_or(0.0)
    }
}
