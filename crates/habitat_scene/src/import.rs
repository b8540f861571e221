use std::path::Path;

use glam::Vec3;

use crate::bounds::Aabb;
use crate::error::Error;
use crate::world::{NodeId, SceneGraph, Transform};

/// A freshly imported scene: the graph and its single root group.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub graph: SceneGraph,
    pub root: NodeId,
}

/// Asset-load capability. Implementations turn a scene URL into a graph.
///
/// Called off the frame thread, so implementations must be shareable.
pub trait SceneLoader: Send + Sync {
    fn load_scene(&self, url: &str) -> Result<LoadedScene, Error>;
}

/// Loads `.gltf`/`.glb` files from disk.
///
/// Only the node hierarchy, names, transforms and accessor bounds are kept;
/// vertex data is never decoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfSceneLoader;

impl GltfSceneLoader {
    fn is_remote(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    /// Build a graph from an in-memory glTF or GLB document.
    pub fn load_slice(&self, bytes: &[u8]) -> Result<LoadedScene, Error> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        let scene = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .ok_or(Error::NoScene)?;

        let mut graph = SceneGraph::new();
        let root = graph.create_group(scene.name().unwrap_or("Scene"), Transform::default(), None);

        let mut stack: Vec<(gltf::Node<'_>, NodeId)> =
            scene.nodes().map(|n| (n, root)).collect::<Vec<_>>();
        stack.reverse();

        while let Some((node, parent)) = stack.pop() {
            let id = add_node(&mut graph, &node, parent);
            let mut children: Vec<_> = node.children().map(|c| (c, id)).collect();
            children.reverse();
            stack.extend(children);
        }

        tracing::debug!(
            "imported scene '{}' with {} nodes",
            graph.name(root),
            graph.len()
        );

        Ok(LoadedScene { graph, root })
    }
}

fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (t, r, s) = node.transform().decomposed();
    Transform::from_gltf(t, r, s)
}

fn primitive_bounds(prim: &gltf::Primitive<'_>) -> Aabb {
    let bb = prim.bounding_box();
    Aabb::new(Vec3::from_array(bb.min), Vec3::from_array(bb.max))
}

/// Add one glTF node. A single-primitive mesh makes the node drawable; a
/// multi-primitive mesh becomes a group with one drawable per primitive.
fn add_node(graph: &mut SceneGraph, node: &gltf::Node<'_>, parent: NodeId) -> NodeId {
    let name = node.name().unwrap_or("");
    let local = node_transform(node);

    let Some(mesh) = node.mesh() else {
        return graph.create_group(name, local, Some(parent));
    };

    let prims: Vec<_> = mesh.primitives().collect();
    match prims.as_slice() {
        [single] => graph.create_drawable(name, primitive_bounds(single), local, Some(parent)),
        many => {
            let group = graph.create_group(name, local, Some(parent));
            for (i, prim) in many.iter().enumerate() {
                let child_name = format!("{name}_{i}");
                graph.create_drawable(
                    &child_name,
                    primitive_bounds(prim),
                    Transform::default(),
                    Some(group),
                );
            }
            group
        }
    }
}

impl SceneLoader for GltfSceneLoader {
    fn load_scene(&self, url: &str) -> Result<LoadedScene, Error> {
        if Self::is_remote(url) {
            return Err(Error::Unsupported(url.to_owned()));
        }
        let path = Path::new(url);
        tracing::info!("loading scene from {}", path.display());
        let bytes = std::fs::read(path)?;
        self.load_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HABITAT_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "name": "Habitat", "nodes": [0] } ],
        "nodes": [
            { "name": "TheHab", "children": [1, 2] },
            { "name": "Wall", "mesh": 0, "translation": [2.0, 0.0, 0.0] },
            { "name": "Dome", "mesh": 1 }
        ],
        "meshes": [
            { "primitives": [ { "attributes": { "POSITION": 0 } } ] },
            { "primitives": [
                { "attributes": { "POSITION": 0 } },
                { "attributes": { "POSITION": 1 } }
            ] }
        ],
        "accessors": [
            { "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [-1.0, 0.0, -1.0], "max": [1.0, 2.0, 1.0] },
            { "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [4.0, 1.0, 4.0] }
        ]
    }"#;

    #[test]
    fn imports_hierarchy_and_bounds() {
        let scene = GltfSceneLoader
            .load_slice(HABITAT_GLTF.as_bytes())
            .expect("valid gltf");
        let g = &scene.graph;

        let names: Vec<&str> = g.traverse(scene.root).into_iter().map(|id| g.name(id)).collect();
        assert_eq!(
            names,
            vec!["Habitat", "TheHab", "Wall", "Dome", "Dome_0", "Dome_1"]
        );

        let wall = g.traverse(scene.root)[2];
        assert!(g.is_drawable(wall));
        let b = g.world_bounds(wall);
        assert_eq!(b.min, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(b.max, Vec3::new(3.0, 2.0, 1.0));

        let dome = g.traverse(scene.root)[3];
        assert!(!g.is_drawable(dome));
        assert_eq!(g.children(dome).len(), 2);
    }

    #[test]
    fn remote_urls_are_rejected() {
        let res = GltfSceneLoader.load_scene("https://example.com/scene.glb");
        assert!(matches!(res, Err(Error::Unsupported(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let res = GltfSceneLoader.load_scene("/definitely/not/here.glb");
        assert!(matches!(res, Err(Error::Io(_))));
    }
}
