use glam::{Mat4, Vec3};

use crate::bounds::Aabb;
use crate::world::{NodeId, SceneGraph};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize_or_zero(),
        }
    }

    /// Ray pointing straight down from `height` above (x, z).
    pub fn down_from(x: f32, height: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, height, z), Vec3::NEG_Y)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// One intersection reported by a [`Raycaster`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayHit {
    /// The drawable that was hit.
    pub node: NodeId,
    pub point: Vec3,
    pub distance: f32,
}

/// Hit-testing capability.
///
/// `candidates` are subtree roots: every visible drawable at or below each
/// candidate is tested. Hits come back nearest first, at most one per
/// drawable, and none further than `max_distance`.
pub trait Raycaster: Send + Sync {
    fn cast(
        &self,
        graph: &SceneGraph,
        ray: &Ray,
        candidates: &[NodeId],
        max_distance: f32,
    ) -> Vec<RayHit>;
}

/// Ray vs. axis-aligned box, tested in the box's local space.
/// Returns the entry distance along the world-space ray.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb, world: &Mat4) -> Option<f32> {
    let inv = world.inverse();
    let lo = inv.transform_point3(ray.origin);
    let ld = inv.transform_vector3(ray.dir);
    let t1 = (aabb.min - lo) / ld;
    let t2 = (aabb.max - lo) / ld;
    let tmin = t1.min(t2);
    let tmax = t1.max(t2);
    let enter = tmin.x.max(tmin.y).max(tmin.z);
    let exit = tmax.x.min(tmax.y).min(tmax.z);
    if exit >= enter.max(0.0) {
        // local t maps back to world distance through the direction scale
        let t = enter.max(0.0);
        let world_point = world.transform_point3(lo + ld * t);
        Some((world_point - ray.origin).length())
    } else {
        None
    }
}

/// Raycaster that tests each drawable's geometry bounds.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundsRaycaster;

impl Raycaster for BoundsRaycaster {
    fn cast(
        &self,
        graph: &SceneGraph,
        ray: &Ray,
        candidates: &[NodeId],
        max_distance: f32,
    ) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for &candidate in candidates {
            for id in graph.traverse(candidate) {
                let Some(node) = graph.get(id) else {
                    continue;
                };
                let Some(geometry) = node.geometry else {
                    continue;
                };
                if !node.visible || !seen.insert(id) {
                    continue;
                }
                let world = node.world_matrix();
                if let Some(distance) = ray_aabb(ray, &geometry, &world)
                    && distance <= max_distance
                {
                    hits.push(RayHit {
                        node: id,
                        point: ray.at(distance),
                        distance,
                    });
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Transform;

    fn boxed(g: &mut SceneGraph, name: &str, at: Vec3, parent: Option<NodeId>) -> NodeId {
        g.create_drawable(
            name,
            Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
            Transform::from_translation(at),
            parent,
        )
    }

    #[test]
    fn ray_hits_box_in_front() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let t = ray_aabb(&ray, &aabb, &Mat4::IDENTITY);
        assert!(t.is_some_and(|t| (t - 9.0).abs() < 1e-5));
    }

    #[test]
    fn ray_misses_box_behind() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
        assert!(ray_aabb(&ray, &aabb, &Mat4::IDENTITY).is_none());
    }

    #[test]
    fn scaled_box_reports_world_distance() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let world = Mat4::from_scale(Vec3::splat(2.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let t = ray_aabb(&ray, &aabb, &world);
        assert!(t.is_some_and(|t| (t - 8.0).abs() < 1e-4));
    }

    #[test]
    fn cast_sorts_nearest_first_and_recurses() {
        let mut g = SceneGraph::new();
        let group = g.create_group("group", Transform::default(), None);
        let far = boxed(&mut g, "far", Vec3::new(0.0, 0.0, -10.0), Some(group));
        let near = boxed(&mut g, "near", Vec3::new(0.0, 0.0, -3.0), Some(group));

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hits = BoundsRaycaster.cast(&g, &ray, &[group], 100.0);
        let order: Vec<NodeId> = hits.iter().map(|h| h.node).collect();
        assert_eq!(order, vec![near, far]);
        assert!((hits[0].point.z + 2.5).abs() < 1e-5);
    }

    #[test]
    fn cast_respects_max_distance_and_dedupes() {
        let mut g = SceneGraph::new();
        let group = g.create_group("group", Transform::default(), None);
        let near = boxed(&mut g, "near", Vec3::new(0.0, 0.0, -3.0), Some(group));
        boxed(&mut g, "far", Vec3::new(0.0, 0.0, -60.0), Some(group));

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hits = BoundsRaycaster.cast(&g, &ray, &[group, near], 50.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, near);
    }

    #[test]
    fn hidden_drawables_are_skipped() {
        let mut g = SceneGraph::new();
        let d = boxed(&mut g, "d", Vec3::new(0.0, 0.0, -3.0), None);
        g.set_visible(d, false);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(BoundsRaycaster.cast(&g, &ray, &[d], 50.0).is_empty());
    }
}
