use habitat_scene::CameraController;

use crate::scene_state::SceneState;
use crate::ui::{RenderSurface, UiBridge};

/// Everything a tour step or an input handler may touch during one frame.
pub struct FrameContext<'a> {
    pub scene: &'a mut SceneState,
    pub camera: &'a mut CameraController,
    pub ui: &'a mut UiBridge,
    pub surface: &'a mut dyn RenderSurface,
}
