use std::collections::HashMap;
use std::time::Instant;

use glam::Vec3;
use habitat_scene::{NodeId, SceneGraph};
use indexmap::IndexMap;

use crate::name_match::{NameClass, NameMatcher, normalize};

/// Counts describing the current index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub built: bool,
    pub nodes: usize,
    pub drawables: usize,
    pub groups: usize,
    pub unique_names: usize,
    pub exact_names: usize,
}

/// Name and kind lookups over one loaded scene, built in a single pass.
#[derive(Debug, Default, Clone)]
pub struct SpatialIndex {
    all: Vec<NodeId>,
    drawables: Vec<NodeId>,
    groups: Vec<NodeId>,
    /// normalized name -> nodes sharing it, in traversal order
    by_name: IndexMap<String, Vec<NodeId>>,
    /// exact name -> first node seen
    by_exact_name: HashMap<String, NodeId>,
    built: bool,
}

fn is_unnamed_query(key: &str) -> bool {
    key.is_empty() || key == "none"
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every node under `root`. Replaces any previous index.
    pub fn build(&mut self, graph: &SceneGraph, root: NodeId) {
        let start = Instant::now();
        let mut next = SpatialIndex {
            built: true,
            ..Default::default()
        };

        for id in graph.traverse(root) {
            let Some(node) = graph.get(id) else {
                continue;
            };
            next.all.push(id);

            if node.is_drawable() {
                next.drawables.push(id);
            } else if !node.children().is_empty() {
                next.groups.push(id);
            }

            if !node.name.is_empty() {
                let key = normalize(&node.name);
                if !key.is_empty() {
                    next.by_name.entry(key).or_default().push(id);
                }
                next.by_exact_name.entry(node.name.clone()).or_insert(id);
            }
        }

        *self = next;

        let stats = self.stats();
        tracing::info!(
            "built spatial index in {:?}: {} nodes, {} drawables, {} groups, {} unique names",
            start.elapsed(),
            stats.nodes,
            stats.drawables,
            stats.groups,
            stats.unique_names
        );
    }

    pub fn clear(&mut self) {
        *self = SpatialIndex::default();
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn all(&self) -> &[NodeId] {
        &self.all
    }

    pub fn drawables(&self) -> &[NodeId] {
        &self.drawables
    }

    pub fn groups(&self) -> &[NodeId] {
        &self.groups
    }

    /// First node carrying exactly this authored name.
    pub fn find_by_exact_name(&self, name: &str) -> Option<NodeId> {
        self.by_exact_name.get(name).copied()
    }

    /// Exact normalized match, else the first name bucket that contains or
    /// is contained by the query.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let key = normalize(name);
        if !self.built || is_unnamed_query(&key) {
            return None;
        }
        if let Some(first) = self.by_name.get(&key).and_then(|v| v.first()) {
            return Some(*first);
        }
        self.by_name
            .iter()
            .find(|(indexed, _)| indexed.contains(key.as_str()) || key.contains(indexed.as_str()))
            .and_then(|(_, nodes)| nodes.first().copied())
    }

    /// Every node whose normalized name equals the query.
    pub fn find_all_by_name(&self, name: &str) -> &[NodeId] {
        self.by_name
            .get(&normalize(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Linear search over an explicit list: exact normalized match first,
    /// then the first name containing the query.
    pub fn find_by_name_in(graph: &SceneGraph, name: &str, list: &[NodeId]) -> Option<NodeId> {
        let key = normalize(name);
        if is_unnamed_query(&key) {
            return None;
        }
        list.iter()
            .copied()
            .find(|id| normalize(graph.name(*id)) == key)
            .or_else(|| {
                list.iter()
                    .copied()
                    .find(|id| normalize(graph.name(*id)).contains(key.as_str()))
            })
    }

    /// Candidate closest to `position`. `locate` gives each candidate's
    /// reference point. Ties go to the earlier candidate.
    pub fn find_nearest(
        position: Vec3,
        candidates: &[NodeId],
        mut locate: impl FnMut(NodeId) -> Vec3,
    ) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for &id in candidates {
            let d = locate(id).distance_squared(position);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((id, d));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Name lookup within `list`, falling back to the nearest member.
    pub fn find_by_name_or_nearest(
        graph: &SceneGraph,
        name: &str,
        position: Vec3,
        list: &[NodeId],
        locate: impl FnMut(NodeId) -> Vec3,
    ) -> Option<NodeId> {
        Self::find_by_name_in(graph, name, list)
            .or_else(|| Self::find_nearest(position, list, locate))
    }

    pub fn filter(&self, mut pred: impl FnMut(NodeId) -> bool) -> Vec<NodeId> {
        self.all.iter().copied().filter(|id| pred(*id)).collect()
    }

    /// Named nodes whose highest-priority class is `class`.
    pub fn find_by_class(
        &self,
        graph: &SceneGraph,
        matcher: &NameMatcher,
        class: NameClass,
    ) -> Vec<NodeId> {
        self.filter(|id| {
            let name = graph.name(id);
            !name.is_empty() && matcher.classify(name) == Some(class)
        })
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            built: self.built,
            nodes: self.all.len(),
            drawables: self.drawables.len(),
            groups: self.groups.len(),
            unique_names: self.by_name.len(),
            exact_names: self.by_exact_name.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitat_scene::{Aabb, Transform};
    use pretty_assertions::assert_eq;

    fn small_box() -> Aabb {
        Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))
    }

    fn scene() -> (SceneGraph, NodeId, Vec<NodeId>) {
        let mut g = SceneGraph::new();
        let root = g.create_group("Scene", Transform::default(), None);
        let hab = g.create_group("The Hab", Transform::default(), Some(root));
        let wall = g.create_drawable("Wall", small_box(), Transform::default(), Some(hab));
        let wall2 = g.create_drawable("wall", small_box(), Transform::default(), Some(hab));
        let obs = g.create_drawable(
            "TheMuskObservatory_",
            small_box(),
            Transform::default(),
            Some(root),
        );
        let anon = g.create_drawable("", small_box(), Transform::default(), Some(root));
        (g, root, vec![hab, wall, wall2, obs, anon])
    }

    #[test]
    fn build_buckets_by_kind_and_name() {
        let (g, root, ids) = scene();
        let mut index = SpatialIndex::new();
        index.build(&g, root);

        let stats = index.stats();
        assert!(stats.built);
        assert_eq!(stats.nodes, 6);
        assert_eq!(stats.drawables, 4);
        assert_eq!(stats.groups, 2);
        // "scene", "thehab", "wall", "themuskobservatory_"
        assert_eq!(stats.unique_names, 4);
        assert_eq!(stats.exact_names, 5);

        assert_eq!(index.find_all_by_name("WALL"), &[ids[1], ids[2]]);
        assert_eq!(index.find_by_exact_name("wall"), Some(ids[2]));
    }

    #[test]
    fn find_by_name_exact_then_partial() {
        let (g, root, ids) = scene();
        let mut index = SpatialIndex::new();
        index.build(&g, root);

        assert_eq!(index.find_by_name("thehab"), Some(ids[0]));
        assert_eq!(index.find_by_name("wall"), Some(ids[1]));
        // query contained in an indexed name
        assert_eq!(index.find_by_name("MuskObservatory"), Some(ids[3]));
        // indexed name contained in the query
        assert_eq!(index.find_by_name("TheHab Annex"), Some(ids[0]));
        assert_eq!(index.find_by_name("rover"), None);
        assert_eq!(index.find_by_name("None"), None);
    }

    #[test]
    fn blank_names_never_resolve() {
        let (mut g, root, ids) = scene();
        g.create_drawable("   ", small_box(), Transform::default(), Some(root));
        let mut index = SpatialIndex::new();
        index.build(&g, root);

        assert_eq!(index.stats().unique_names, 4);
        assert_eq!(index.find_by_name("   "), None);
        assert_eq!(index.find_by_name(" none "), None);
        assert_eq!(SpatialIndex::find_by_name_in(&g, " \t", &ids), None);
    }

    #[test]
    fn unbuilt_index_finds_nothing() {
        let index = SpatialIndex::new();
        assert_eq!(index.find_by_name("wall"), None);
        assert!(!index.stats().built);
    }

    #[test]
    fn rebuild_replaces_previous_index() {
        let (g, root, _) = scene();
        let mut index = SpatialIndex::new();
        index.build(&g, root);

        let mut other = SceneGraph::new();
        let r = other.create_group("Other", Transform::default(), None);
        index.build(&other, r);
        assert_eq!(index.stats().nodes, 1);
        assert_eq!(index.find_by_name("wall"), None);
    }

    #[test]
    fn nearest_prefers_closest_then_first() {
        let mut g = SceneGraph::new();
        let at = |g: &mut SceneGraph, name: &str, p: Vec3| {
            g.create_drawable(name, small_box(), Transform::from_translation(p), None)
        };
        let a = at(&mut g, "a", Vec3::new(5.0, 0.0, 0.0));
        let b = at(&mut g, "b", Vec3::new(0.0, 2.0, 0.0));
        let c = at(&mut g, "c", Vec3::new(0.0, -2.0, 0.0));
        let locate = |id: NodeId| g.world_position(id);

        assert_eq!(SpatialIndex::find_nearest(Vec3::ZERO, &[], locate), None);
        assert_eq!(SpatialIndex::find_nearest(Vec3::ZERO, &[a, b], locate), Some(b));
        assert_eq!(SpatialIndex::find_nearest(Vec3::ZERO, &[a, c, b], locate), Some(c));
    }

    #[test]
    fn linear_search_and_fallback() {
        let (g, _, ids) = scene();
        let list = [ids[1], ids[3]];
        assert_eq!(SpatialIndex::find_by_name_in(&g, "musk", &list), Some(ids[3]));
        assert_eq!(SpatialIndex::find_by_name_in(&g, "rover", &list), None);

        let found = SpatialIndex::find_by_name_or_nearest(&g, "rover", Vec3::ZERO, &list, |id| {
            if id == ids[3] { Vec3::ZERO } else { Vec3::splat(9.0) }
        });
        assert_eq!(found, Some(ids[3]));
    }

    #[test]
    fn class_and_predicate_filters() {
        let (g, root, ids) = scene();
        let mut index = SpatialIndex::new();
        index.build(&g, root);
        let m = NameMatcher::default();

        assert_eq!(index.find_by_class(&g, &m, NameClass::Forced), vec![ids[0], ids[3]]);
        assert_eq!(index.find_by_class(&g, &m, NameClass::Generic), vec![root]);
        assert_eq!(index.filter(|id| g.name(id).is_empty()), vec![ids[4]]);
    }
}
