use std::collections::{HashMap, HashSet};

use glam::Vec3;
use habitat_scene::{Aabb, NodeId, SceneGraph};
use regex::Regex;

use crate::config::ViewerConfig;
use crate::name_match::{NameMatcher, normalize};
use crate::terrain::TerrainRegistry;

/// How a drawable takes part in shadowing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShadowTier {
    /// Neither casts nor receives.
    None,
    ReceiveOnly,
    /// Casts and receives.
    Full,
}

impl ShadowTier {
    pub fn casts(self) -> bool {
        matches!(self, ShadowTier::Full)
    }

    pub fn receives(self) -> bool {
        !matches!(self, ShadowTier::None)
    }
}

/// Classification data attached to a scene node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    pub is_terrain: bool,
    /// Non-terrain drawables at or below this node.
    pub mesh_count: usize,
    pub highlight_target: Option<NodeId>,
    /// Drawables registered against this node as their highlight target.
    pub highlight_meshes: Vec<NodeId>,
    /// Human readable label for targets with generic names.
    pub display_name: Option<String>,
    /// Set for drawables only.
    pub shadow: Option<ShadowTier>,
    pub frustum_culled: bool,
}

/// Insertion-ordered set of interactive targets.
#[derive(Debug, Clone, Default)]
pub struct InteractiveRegistry {
    list: Vec<NodeId>,
    members: HashSet<NodeId>,
}

impl InteractiveRegistry {
    /// Returns false if the target was already registered.
    pub fn insert(&mut self, id: NodeId) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.list.push(id);
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains(&id)
    }

    pub fn as_slice(&self) -> &[NodeId] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.members.clear();
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub min_interactive_size: f32,
    pub min_group_mesh_count: usize,
    pub terrain_footprint: f32,
    pub terrain_pattern: Regex,
    pub no_shadow_below: f32,
    pub receive_only_below: f32,
    pub subgroup_marker: String,
    pub subgroup_no_shadow_below: f32,
    pub subgroup_min_interactive: f32,
    pub ensure_interactive: Vec<String>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl ClassifierSettings {
    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self {
            min_interactive_size: cfg.interaction.min_interactive_size,
            min_group_mesh_count: cfg.interaction.min_group_mesh_count,
            terrain_footprint: cfg.interaction.terrain_footprint,
            terrain_pattern: cfg.terrain.regex(),
            no_shadow_below: cfg.classifier.no_shadow_below,
            receive_only_below: cfg.classifier.receive_only_below,
            subgroup_marker: normalize(&cfg.classifier.subgroup_marker),
            subgroup_no_shadow_below: cfg.classifier.subgroup_no_shadow_below,
            subgroup_min_interactive: cfg.classifier.subgroup_min_interactive,
            ensure_interactive: cfg.classifier.ensure_interactive.clone(),
        }
    }
}

/// Counters from the last classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    pub no_shadow: usize,
    pub receive_only: usize,
    pub full_shadow: usize,
    pub subgroup_optimized: usize,
    pub terrain: usize,
    pub interactive: usize,
}

/// Turns a freshly loaded scene into terrain, shadow tiers and interactive
/// highlight targets. Never changes the graph itself; everything it derives
/// lives in its own side tables.
#[derive(Debug, Clone)]
pub struct SceneClassifier {
    settings: ClassifierSettings,
    matcher: NameMatcher,
    root: Option<NodeId>,
    meta: HashMap<NodeId, NodeMeta>,
    mesh_entries: Vec<NodeId>,
    interactive: InteractiveRegistry,
    stats: ClassificationStats,

    // memo tables, dropped on every process() run
    max_dim_memo: HashMap<NodeId, f32>,
    mesh_memo: HashMap<NodeId, Vec<NodeId>>,
    center_memo: HashMap<(NodeId, bool), Vec3>,
}

impl Default for SceneClassifier {
    fn default() -> Self {
        Self::new(ClassifierSettings::default(), NameMatcher::default())
    }
}

impl SceneClassifier {
    pub fn new(settings: ClassifierSettings, matcher: NameMatcher) -> Self {
        Self {
            settings,
            matcher,
            root: None,
            meta: HashMap::new(),
            mesh_entries: Vec::new(),
            interactive: InteractiveRegistry::default(),
            stats: ClassificationStats::default(),
            max_dim_memo: HashMap::new(),
            mesh_memo: HashMap::new(),
            center_memo: HashMap::new(),
        }
    }

    pub fn from_config(cfg: &ViewerConfig) -> Self {
        Self::new(
            ClassifierSettings::from_config(cfg),
            NameMatcher::new(cfg.generic_names.clone()),
        )
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut NameMatcher {
        &mut self.matcher
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn meta(&self, id: NodeId) -> Option<&NodeMeta> {
        self.meta.get(&id)
    }

    fn meta_mut(&mut self, id: NodeId) -> &mut NodeMeta {
        self.meta.entry(id).or_default()
    }

    pub fn is_terrain(&self, id: NodeId) -> bool {
        self.meta(id).is_some_and(|m| m.is_terrain)
    }

    pub fn mesh_count(&self, id: NodeId) -> usize {
        self.meta(id).map_or(0, |m| m.mesh_count)
    }

    pub fn shadow_tier(&self, id: NodeId) -> Option<ShadowTier> {
        self.meta(id).and_then(|m| m.shadow)
    }

    pub fn display_name(&self, id: NodeId) -> Option<&str> {
        self.meta(id).and_then(|m| m.display_name.as_deref())
    }

    /// Non-terrain drawables, in traversal order.
    pub fn mesh_entries(&self) -> &[NodeId] {
        &self.mesh_entries
    }

    pub fn interactive(&self) -> &InteractiveRegistry {
        &self.interactive
    }

    pub fn stats(&self) -> ClassificationStats {
        self.stats
    }

    pub fn is_generic(&self, graph: &SceneGraph, id: NodeId) -> bool {
        self.matcher.is_generic_name(graph.name(id))
    }

    fn below_root(&self, id: NodeId) -> bool {
        Some(id) != self.root
    }

    /// `id` and its ancestors, stopping before the scene root.
    fn chain_to_root(&self, graph: &SceneGraph, id: NodeId) -> Vec<NodeId> {
        std::iter::once(id)
            .chain(graph.ancestors(id))
            .take_while(|n| self.below_root(*n))
            .collect()
    }

    /// First node on the chain from `id` to the root whose name carries the
    /// subgroup marker.
    fn marked_subgroup(&self, graph: &SceneGraph, id: NodeId) -> Option<NodeId> {
        let marker = self.settings.subgroup_marker.as_str();
        if marker.is_empty() {
            return None;
        }
        self.chain_to_root(graph, id)
            .into_iter()
            .find(|n| normalize(graph.name(*n)).contains(marker))
    }

    // ── Classification ───────────────────────────────────────────

    fn reset(&mut self, terrain: &mut TerrainRegistry) {
        self.root = None;
        self.meta.clear();
        self.mesh_entries.clear();
        self.interactive.clear();
        self.stats = ClassificationStats::default();
        self.max_dim_memo.clear();
        self.mesh_memo.clear();
        self.center_memo.clear();
        terrain.clear();
    }

    fn shadow_tier_for(&mut self, max_dim: f32, in_subgroup: bool) -> ShadowTier {
        let s = &self.settings;
        if in_subgroup && max_dim < s.subgroup_no_shadow_below {
            self.stats.subgroup_optimized += 1;
            self.stats.no_shadow += 1;
            ShadowTier::None
        } else if max_dim < s.no_shadow_below {
            self.stats.no_shadow += 1;
            ShadowTier::None
        } else if max_dim < s.receive_only_below {
            self.stats.receive_only += 1;
            ShadowTier::ReceiveOnly
        } else {
            self.stats.full_shadow += 1;
            ShadowTier::Full
        }
    }

    /// Classify every visible drawable under `root`. Resets all state derived
    /// from a previous run first, so running twice on the same scene gives
    /// the same result.
    pub fn process(&mut self, graph: &SceneGraph, root: NodeId, terrain: &mut TerrainRegistry) {
        self.reset(terrain);
        self.root = Some(root);

        for id in graph.traverse(root) {
            let Some(node) = graph.get(id) else {
                continue;
            };
            if !node.visible || !node.is_drawable() {
                continue;
            }

            let in_subgroup = self.marked_subgroup(graph, id).is_some();
            let bounds = graph.world_bounds(id);
            let shadow = self.shadow_tier_for(bounds.max_dimension(), in_subgroup);

            let is_terrain = self.settings.terrain_pattern.is_match(&node.name)
                || bounds.footprint() > self.settings.terrain_footprint;

            let meta = self.meta_mut(id);
            meta.shadow = Some(shadow);
            meta.frustum_culled = true;
            meta.is_terrain = is_terrain;

            if is_terrain {
                terrain.register(graph, id);
                self.stats.terrain += 1;
            } else {
                self.mesh_entries.push(id);
            }
        }

        let entries = self.mesh_entries.clone();
        for &mesh in &entries {
            for n in std::iter::once(mesh).chain(graph.ancestors(mesh)) {
                self.meta_mut(n).mesh_count += 1;
            }
        }

        for &mesh in &entries {
            let target = self.find_highlight_target(graph, mesh);
            if target == root {
                continue;
            }
            if self.object_max_dimension(graph, target) < self.settings.min_interactive_size {
                continue;
            }
            if self.is_excluded_subgroup_part(graph, target) {
                continue;
            }
            self.register_highlight_mesh(target, mesh);
            self.interactive.insert(target);
        }

        let names = self.settings.ensure_interactive.clone();
        self.ensure_interactive_by_names(graph, &names);

        self.stats.interactive = self.interactive.len();
        let s = self.stats;
        tracing::info!(
            "classified scene: {} without shadows, {} receive only, {} full shadows, {} subgroup optimized",
            s.no_shadow,
            s.receive_only,
            s.full_shadow,
            s.subgroup_optimized
        );
        tracing::info!(
            "{} terrain drawables, {} interactive targets",
            s.terrain,
            s.interactive
        );
    }

    /// Small parts of the marked structure stay out of interaction; only the
    /// main structure is interactive.
    fn is_excluded_subgroup_part(&mut self, graph: &SceneGraph, target: NodeId) -> bool {
        if self.marked_subgroup(graph, target).is_none() {
            return false;
        }
        self.object_max_dimension(graph, target) < self.settings.subgroup_min_interactive
    }

    /// Name-driven group for `id`: an exact panel on the chain wins, then a
    /// forced group (shallowest of each), then the first preferred group met
    /// walking up from `id`.
    pub fn preferred_group_ancestor(&self, graph: &SceneGraph, id: NodeId) -> Option<NodeId> {
        let root = self.root?;
        let mut panel: Option<(NodeId, usize)> = None;
        let mut forced: Option<(NodeId, usize)> = None;
        let mut preferred: Option<NodeId> = None;

        for n in self.chain_to_root(graph, id) {
            let name = graph.name(n);
            if normalize(name).is_empty() {
                continue;
            }
            let depth = graph.depth_below(n, root);
            if self.matcher.is_exact_panel(name) {
                if panel.is_none_or(|(_, d)| depth < d) {
                    panel = Some((n, depth));
                }
            } else if self.matcher.matches_forced_group(name) {
                if forced.is_none_or(|(_, d)| depth < d) {
                    forced = Some((n, depth));
                }
            } else if preferred.is_none() && self.matcher.matches_preferred_group(name) {
                preferred = Some(n);
            }
        }

        panel.or(forced).map(|(n, _)| n).or(preferred)
    }

    /// The node that represents `id` for outlining and labeling: a cached
    /// target, a named group, or the first sizeable non-generic ancestor.
    pub fn find_highlight_target(&mut self, graph: &SceneGraph, id: NodeId) -> NodeId {
        if let Some(target) = self.meta(id).and_then(|m| m.highlight_target) {
            return target;
        }
        if let Some(group) = self.preferred_group_ancestor(graph, id) {
            return group;
        }

        let mut fallback = None;
        for n in self.chain_to_root(graph, id) {
            let size = self.object_max_dimension(graph, n);
            let count = self.mesh_count(n);
            if size >= self.settings.min_interactive_size
                && count >= self.settings.min_group_mesh_count
            {
                if !self.is_generic(graph, n) {
                    return n;
                }
                fallback.get_or_insert(n);
            }
        }
        fallback.unwrap_or(id)
    }

    fn invalidate(&mut self, target: NodeId) {
        self.mesh_memo.remove(&target);
        self.center_memo.remove(&(target, true));
        self.center_memo.remove(&(target, false));
    }

    fn register_highlight_mesh(&mut self, target: NodeId, mesh: NodeId) {
        self.meta_mut(mesh).highlight_target = Some(target);
        let list = &mut self.meta_mut(target).highlight_meshes;
        if !list.contains(&mesh) {
            list.push(mesh);
        }
        self.invalidate(target);
    }

    /// Make sure structures whose normalized names contain one of `names`
    /// are interactive, even if size heuristics skipped them.
    pub fn ensure_interactive_by_names(&mut self, graph: &SceneGraph, names: &[String]) {
        let Some(root) = self.root else {
            return;
        };
        let wants: Vec<String> = names
            .iter()
            .map(|n| normalize(n))
            .filter(|n| !n.is_empty())
            .collect();
        if wants.is_empty() {
            return;
        }

        let candidates: Vec<NodeId> = graph
            .traverse(root)
            .into_iter()
            .filter(|id| *id != root)
            .filter(|id| {
                let n = normalize(graph.name(*id));
                !n.is_empty() && wants.iter().any(|w| n.contains(w.as_str()))
            })
            .collect();

        let mut visited = HashSet::new();
        for c in candidates {
            // an already registered target is taken as is; a mesh list only
            // exists once something was registered against it
            let has_meshes = self
                .meta(c)
                .is_some_and(|m| !m.highlight_meshes.is_empty());
            let target = if has_meshes {
                c
            } else {
                self.find_highlight_target(graph, c)
            };
            if target == root || !visited.insert(target) {
                continue;
            }

            let meshes = self.highlight_meshes(graph, target);
            if meshes.is_empty() {
                for m in graph.drawables_under(target) {
                    self.meta_mut(m).is_terrain = false;
                    self.register_highlight_mesh(target, m);
                }
            } else {
                for m in meshes {
                    self.meta_mut(m).is_terrain = false;
                }
            }

            if self.interactive.insert(target) {
                tracing::debug!("forced interactive target '{}'", graph.name(target));
            }

            if self.is_generic(graph, target) {
                let label = [graph.name(c), graph.name(target)]
                    .into_iter()
                    .find(|s| !s.is_empty())
                    .unwrap_or("Object")
                    .to_owned();
                self.meta_mut(target).display_name = Some(label);
            }
        }
    }

    // ── Memoized geometry queries ────────────────────────────────

    /// Drawables to outline for `target`: the target itself when drawable,
    /// plus its registered meshes, or every non-terrain drawable below it.
    pub fn highlight_meshes(&mut self, graph: &SceneGraph, target: NodeId) -> Vec<NodeId> {
        if let Some(cached) = self.mesh_memo.get(&target) {
            return cached.clone();
        }

        let mut meshes = Vec::new();
        if graph.is_drawable(target) {
            meshes.push(target);
        }
        let registered = self
            .meta(target)
            .map(|m| m.highlight_meshes.clone())
            .unwrap_or_default();
        if registered.is_empty() {
            meshes.extend(
                graph
                    .drawables_under(target)
                    .into_iter()
                    .filter(|m| !self.is_terrain(*m)),
            );
        } else {
            meshes.extend(registered);
        }

        let mut seen = HashSet::new();
        meshes.retain(|m| seen.insert(*m));

        self.mesh_memo.insert(target, meshes.clone());
        meshes
    }

    /// Largest extent of everything under `id`.
    pub fn object_max_dimension(&mut self, graph: &SceneGraph, id: NodeId) -> f32 {
        if let Some(d) = self.max_dim_memo.get(&id) {
            return *d;
        }
        let d = graph.subtree_bounds(id).max_dimension();
        self.max_dim_memo.insert(id, d);
        d
    }

    /// Bounds center of the target's highlight meshes, or of its whole
    /// subtree when there are none or `use_highlight_meshes` is false.
    pub fn object_center(
        &mut self,
        graph: &SceneGraph,
        target: NodeId,
        use_highlight_meshes: bool,
    ) -> Vec3 {
        let key = (target, use_highlight_meshes);
        if let Some(c) = self.center_memo.get(&key) {
            return *c;
        }

        let meshes = if use_highlight_meshes {
            self.highlight_meshes(graph, target)
        } else {
            Vec::new()
        };
        let bounds = if meshes.is_empty() {
            graph.subtree_bounds(target)
        } else {
            meshes
                .iter()
                .fold(Aabb::empty(), |acc, m| acc.union(&graph.subtree_bounds(*m)))
        };

        let center = if bounds.is_empty() {
            graph.world_position(target)
        } else {
            bounds.center()
        };
        self.center_memo.insert(key, center);
        center
    }
}
