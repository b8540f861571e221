use glam::{Mat4, Quat, Vec3};

use crate::bounds::Aabb;

/// A handle for a node in the scene graph: its slot in the arena.
///
/// Nodes are never removed from a loaded graph, so a handle stays valid for
/// as long as the graph that produced it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Local placement of a node as authored: scale, then rotation, then
/// translation, relative to the parent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// From glTF's decomposed arrays: `[x, y, z]`, quaternion `[x, y, z, w]`, `[x, y, z]`.
    pub fn from_gltf(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Authored name. May be empty or shared with other nodes.
    pub name: String,

    /// Local transform relative to parent (or world if root).
    pub local: Transform,

    /// Whether the node takes part in rendering and hit tests.
    pub visible: bool,

    /// Local-space geometry bounds. `Some` makes the node drawable.
    pub geometry: Option<Aabb>,

    world_matrix: Mat4,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_drawable(&self) -> bool {
        self.geometry.is_some()
    }

    /// A node with children that is not itself drawable.
    pub fn is_group(&self) -> bool {
        self.geometry.is_none() && !self.children.is_empty()
    }
}

/// Arena-backed scene tree. The graph owns every node; other components
/// refer to nodes through [`NodeId`] and keep their own side tables.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Construction ─────────────────────────────────────────────

    fn push_node(
        &mut self,
        name: &str,
        local: Transform,
        geometry: Option<Aabb>,
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = parent.filter(|p| self.is_valid(*p));

        let parent_world = parent
            .map(|p| self.nodes[p.index()].world_matrix)
            .unwrap_or(Mat4::IDENTITY);
        let world_matrix = parent_world * local.local_matrix();

        self.nodes.push(SceneNode {
            name: name.to_owned(),
            local,
            visible: true,
            geometry,
            world_matrix,
            parent,
            children: Vec::new(),
        });

        match parent {
            Some(p) => self.nodes[p.index()].children.push(id),
            None => self.roots.push(id),
        }

        id
    }

    /// Create a grouping (transform-only) node.
    pub fn create_group(&mut self, name: &str, local: Transform, parent: Option<NodeId>) -> NodeId {
        self.push_node(name, local, None, parent)
    }

    /// Create a drawable node with local-space geometry bounds.
    pub fn create_drawable(
        &mut self,
        name: &str,
        geometry: Aabb,
        local: Transform,
        parent: Option<NodeId>,
    ) -> NodeId {
        self.push_node(name, local, Some(geometry), parent)
    }

    /// Replace a node's local transform and refresh world matrices below it.
    pub fn set_local_transform(&mut self, id: NodeId, local: Transform) -> bool {
        if !self.is_valid(id) {
            return false;
        }
        self.nodes[id.index()].local = local;

        let mut stack = vec![id];
        while let Some(nid) = stack.pop() {
            let parent_world = self.nodes[nid.index()]
                .parent
                .map(|p| self.nodes[p.index()].world_matrix)
                .unwrap_or(Mat4::IDENTITY);
            let node = &mut self.nodes[nid.index()];
            node.world_matrix = parent_world * node.local.local_matrix();
            stack.extend(node.children.iter().copied());
        }
        true
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        match self.nodes.get_mut(id.index()) {
            Some(node) => {
                node.visible = visible;
                true
            }
            None => false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn is_valid(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.index())
    }

    /// Node name, or the empty string for an unknown handle.
    pub fn name(&self, id: NodeId) -> &str {
        self.get(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn is_drawable(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_drawable())
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.get(id).map(|n| n.world_matrix)
    }

    /// World-space origin of a node.
    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_matrix(id)
            .map(|m| m.w_axis.truncate())
            .unwrap_or(Vec3::ZERO)
    }

    /// Iterate the strict ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.parent(id),
        }
    }

    /// True when `ancestor` is `node` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Number of nodes on the chain from `node` up to, but excluding, `root`.
    /// A direct child of `root` has depth 1.
    pub fn depth_below(&self, node: NodeId, root: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = Some(node);
        while let Some(c) = cur {
            if c == root {
                break;
            }
            depth += 1;
            cur = self.parent(c);
        }
        depth
    }

    /// Pre-order traversal of the subtree rooted at `root`, children in
    /// authored order.
    pub fn traverse(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.is_valid(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.index()].children.iter().rev().copied());
        }
        out
    }

    /// Drawable nodes in the subtree rooted at `root`, pre-order.
    pub fn drawables_under(&self, root: NodeId) -> Vec<NodeId> {
        self.traverse(root)
            .into_iter()
            .filter(|id| self.is_drawable(*id))
            .collect()
    }

    /// World-space bounds of a single node's own geometry.
    pub fn world_bounds(&self, id: NodeId) -> Aabb {
        match self.get(id) {
            Some(SceneNode {
                geometry: Some(g),
                world_matrix,
                ..
            }) => g.transformed(world_matrix),
            _ => Aabb::empty(),
        }
    }

    /// World-space bounds of all geometry in the subtree rooted at `id`.
    pub fn subtree_bounds(&self, id: NodeId) -> Aabb {
        self.traverse(id)
            .into_iter()
            .fold(Aabb::empty(), |acc, n| acc.union(&self.world_bounds(n)))
    }
}

/// Iterator over a node's parent chain.
pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let cur = self.next?;
        self.next = self.graph.parent(cur);
        Some(cur)
    }
}
