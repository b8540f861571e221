//! Scene substrate for the habitat walkthrough: an arena scene graph with
//! world-space bounds, glTF import, bounds-based raycasting and the
//! first-person camera controller.

mod bounds;
mod camera;
mod error;
mod import;
mod ray;
mod world;

pub use bounds::Aabb;
pub use camera::{
    CameraController, CameraPose, CameraSettings, Easing, Transition, normalize_angle,
};
pub use error::Error;
pub use import::{GltfSceneLoader, LoadedScene, SceneLoader};
pub use ray::{BoundsRaycaster, Ray, RayHit, Raycaster, ray_aabb};
pub use world::{Ancestors, NodeId, SceneGraph, SceneNode, Transform};
