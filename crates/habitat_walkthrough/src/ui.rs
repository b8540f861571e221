//! Display capabilities the walkthrough drives, and the bridge that keeps
//! redundant updates from reaching them.
//!
//! The core never draws anything itself. Hosts implement [`ViewerUi`] for
//! overlays and [`RenderSurface`] for the 3D view; both are optional in the
//! sense that the no-op implementations here are always valid.

use glam::{Vec2, Vec3};
use habitat_scene::{CameraController, NodeId};
use indexmap::IndexMap;

use crate::config::ObjectInfo;
use crate::scene_state::SceneState;

/// What the tooltip shows and where.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TooltipView {
    pub title: String,
    pub description: String,
    /// Screen position in viewport pixels.
    pub position: Vec2,
}

/// Text and visibility setters for the viewer's overlays.
pub trait ViewerUi {
    /// Loading overlay. `message` replaces the default text when given.
    fn set_loading(&mut self, visible: bool, message: Option<&str>);

    fn set_position(&mut self, position: Vec3);

    fn set_mode(&mut self, mode: &str);

    /// `None` hides the tooltip.
    fn set_tooltip(&mut self, tooltip: Option<&TooltipView>);

    /// Destination panel, shown when the tour arrives somewhere.
    fn show_destination(&mut self, title: &str);
}

/// Frame rendering and outline selection.
pub trait RenderSurface {
    /// Replace the set of outlined drawables. Empty clears the outline.
    fn set_outline(&mut self, meshes: &[NodeId]);

    fn render_frame(&mut self, camera: &CameraController, scene: Option<&SceneState>);
}

/// Accepts every update and does nothing.
pub struct NoopUi;

impl ViewerUi for NoopUi {
    fn set_loading(&mut self, _visible: bool, _message: Option<&str>) {}
    fn set_position(&mut self, _position: Vec3) {}
    fn set_mode(&mut self, _mode: &str) {}
    fn set_tooltip(&mut self, _tooltip: Option<&TooltipView>) {}
    fn show_destination(&mut self, _title: &str) {}
}

/// Logs every update. Useful for headless runs.
pub struct LoggingUi;

impl ViewerUi for LoggingUi {
    fn set_loading(&mut self, visible: bool, message: Option<&str>) {
        tracing::info!("loading overlay visible={visible} message={message:?}");
    }

    fn set_position(&mut self, p: Vec3) {
        tracing::debug!("position: X: {:.1}, Y: {:.1}, Z: {:.1}", p.x, p.y, p.z);
    }

    fn set_mode(&mut self, mode: &str) {
        tracing::info!("{mode}");
    }

    fn set_tooltip(&mut self, tooltip: Option<&TooltipView>) {
        match tooltip {
            Some(t) => tracing::info!(
                "tooltip '{}' at ({:.0}, {:.0})",
                t.title,
                t.position.x,
                t.position.y
            ),
            None => tracing::debug!("tooltip hidden"),
        }
    }

    fn show_destination(&mut self, title: &str) {
        tracing::info!("destination: {title}");
    }
}

pub struct NoopSurface;

impl RenderSurface for NoopSurface {
    fn set_outline(&mut self, _meshes: &[NodeId]) {}
    fn render_frame(&mut self, _camera: &CameraController, _scene: Option<&SceneState>) {}
}

/// Logs outline changes and counts frames.
#[derive(Default)]
pub struct LoggingSurface {
    pub frames: u64,
}

impl RenderSurface for LoggingSurface {
    fn set_outline(&mut self, meshes: &[NodeId]) {
        tracing::debug!("outline {} meshes", meshes.len());
    }

    fn render_frame(&mut self, camera: &CameraController, _scene: Option<&SceneState>) {
        self.frames += 1;
        let p = camera.position();
        tracing::trace!(
            "frame {} at ({:.2}, {:.2}, {:.2}) yaw {:.3}",
            self.frames,
            p.x,
            p.y,
            p.z,
            camera.pose().yaw
        );
    }
}

/// HUD mode line for the current flags.
pub fn mode_text(auto: bool, locked: bool) -> String {
    format!(
        "Mode: {} | {}",
        if auto { "Auto tour" } else { "Manual" },
        if locked {
            "Cursor locked"
        } else {
            "Click to look around"
        }
    )
}

#[derive(Debug, Clone, PartialEq)]
struct TooltipKey {
    title: String,
    x: f32,
    y: f32,
}

/// Sits between the core and an optional [`ViewerUi`], dropping updates
/// that would not change what is displayed.
pub struct UiBridge {
    ui: Option<Box<dyn ViewerUi>>,
    object_info: IndexMap<String, ObjectInfo>,
    default_description: String,

    tooltip: Option<TooltipKey>,
    last_position: Option<Vec3>,
    last_mode: Option<(bool, bool)>,
}

/// HUD position changes smaller than this are not pushed.
pub const POSITION_EPSILON: f32 = 0.1;

impl UiBridge {
    pub fn new(
        ui: Option<Box<dyn ViewerUi>>,
        object_info: IndexMap<String, ObjectInfo>,
        default_description: impl Into<String>,
    ) -> Self {
        Self {
            ui,
            object_info,
            default_description: default_description.into(),
            tooltip: None,
            last_position: None,
            last_mode: None,
        }
    }

    /// A bridge with nothing attached. Every call is a no-op.
    pub fn detached() -> Self {
        Self::new(None, IndexMap::new(), "")
    }

    pub fn is_attached(&self) -> bool {
        self.ui.is_some()
    }

    pub fn info_for(&self, name: &str) -> Option<&ObjectInfo> {
        self.object_info.get(name)
    }

    pub fn set_loading(&mut self, visible: bool, message: Option<&str>) {
        if let Some(ui) = self.ui.as_mut() {
            ui.set_loading(visible, message);
        }
    }

    /// Push the camera position if it moved more than [`POSITION_EPSILON`]
    /// on any axis since the last push.
    pub fn update_position(&mut self, position: Vec3) -> bool {
        let changed = self.last_position.is_none_or(|last| {
            (position - last).abs().max_element() > POSITION_EPSILON
        });
        if !changed {
            return false;
        }
        self.last_position = Some(position);
        if let Some(ui) = self.ui.as_mut() {
            ui.set_position(position);
        }
        true
    }

    /// Push the mode line if either flag flipped since the last push.
    pub fn update_mode(&mut self, auto: bool, locked: bool) -> bool {
        if self.last_mode == Some((auto, locked)) {
            return false;
        }
        self.last_mode = Some((auto, locked));
        if let Some(ui) = self.ui.as_mut() {
            ui.set_mode(&mode_text(auto, locked));
        }
        true
    }

    /// Show the tooltip for `name`. An info entry for the exact name
    /// replaces both title and description.
    pub fn show_tooltip(&mut self, name: &str, title: &str, position: Vec2) -> bool {
        let key = TooltipKey {
            title: title.to_owned(),
            x: position.x,
            y: position.y,
        };
        if self.tooltip.as_ref() == Some(&key) {
            return false;
        }
        self.tooltip = Some(key);

        let view = match self.object_info.get(name) {
            Some(info) => TooltipView {
                title: info.title.clone(),
                description: info.description.clone(),
                position,
            },
            None => TooltipView {
                title: title.to_owned(),
                description: self.default_description.clone(),
                position,
            },
        };
        if let Some(ui) = self.ui.as_mut() {
            ui.set_tooltip(Some(&view));
        }
        true
    }

    pub fn hide_tooltip(&mut self) -> bool {
        if self.tooltip.take().is_none() {
            return false;
        }
        if let Some(ui) = self.ui.as_mut() {
            ui.set_tooltip(None);
        }
        true
    }

    pub fn tooltip_visible(&self) -> bool {
        self.tooltip.is_some()
    }

    /// Destination panel: the info title for `name` when one exists.
    pub fn show_destination(&mut self, name: &str) {
        let title = self
            .object_info
            .get(name)
            .map(|i| i.title.as_str())
            .unwrap_or(name)
            .to_owned();
        if let Some(ui) = self.ui.as_mut() {
            ui.show_destination(&title);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
        fn push(&self, s: String) {
            self.0.lock().unwrap().push(s);
        }
    }

    impl ViewerUi for Recorder {
        fn set_loading(&mut self, visible: bool, message: Option<&str>) {
            self.push(format!("loading {visible} {message:?}"));
        }
        fn set_position(&mut self, p: Vec3) {
            self.push(format!("pos {:.1} {:.1} {:.1}", p.x, p.y, p.z));
        }
        fn set_mode(&mut self, mode: &str) {
            self.push(mode.to_owned());
        }
        fn set_tooltip(&mut self, t: Option<&TooltipView>) {
            self.push(match t {
                Some(t) => format!("tip {} / {}", t.title, t.description),
                None => "tip hidden".to_owned(),
            });
        }
        fn show_destination(&mut self, title: &str) {
            self.push(format!("dest {title}"));
        }
    }

    fn bridge() -> (UiBridge, Recorder) {
        let rec = Recorder::default();
        let mut info = IndexMap::new();
        info.insert(
            "TheHab".to_owned(),
            ObjectInfo {
                title: "Main Habitat".to_owned(),
                description: "Living quarters".to_owned(),
            },
        );
        let bridge = UiBridge::new(Some(Box::new(rec.clone())), info, "Click to select");
        (bridge, rec)
    }

    #[test]
    fn position_updates_need_real_movement() {
        let (mut b, rec) = bridge();
        assert!(b.update_position(Vec3::ZERO));
        assert!(!b.update_position(Vec3::new(0.05, 0.0, 0.05)));
        assert!(b.update_position(Vec3::new(0.0, 0.2, 0.0)));
        assert_eq!(rec.take(), vec!["pos 0.0 0.0 0.0", "pos 0.0 0.2 0.0"]);
    }

    #[test]
    fn mode_updates_only_on_flip() {
        let (mut b, rec) = bridge();
        assert!(b.update_mode(false, false));
        assert!(!b.update_mode(false, false));
        assert!(b.update_mode(true, false));
        assert!(b.update_mode(true, true));
        assert_eq!(
            rec.take(),
            vec![
                "Mode: Manual | Click to look around",
                "Mode: Auto tour | Click to look around",
                "Mode: Auto tour | Cursor locked",
            ]
        );
    }

    #[test]
    fn tooltip_suppresses_repeats_and_uses_info() {
        let (mut b, rec) = bridge();
        let at = Vec2::new(10.0, 20.0);
        assert!(b.show_tooltip("Tank", "Tank", at));
        assert!(!b.show_tooltip("Tank", "Tank", at));
        assert!(b.show_tooltip("TheHab", "TheHab", at));
        assert!(b.hide_tooltip());
        assert!(!b.hide_tooltip());
        assert_eq!(
            rec.take(),
            vec![
                "tip Tank / Click to select",
                "tip Main Habitat / Living quarters",
                "tip hidden",
            ]
        );
    }

    #[test]
    fn destination_prefers_info_title() {
        let (mut b, rec) = bridge();
        b.show_destination("TheHab");
        b.show_destination("Ram2");
        assert_eq!(rec.take(), vec!["dest Main Habitat", "dest Ram2"]);
    }

    #[test]
    fn detached_bridge_still_tracks_state() {
        let mut b = UiBridge::detached();
        assert!(!b.is_attached());
        assert!(b.show_tooltip("a", "a", Vec2::ZERO));
        assert!(b.tooltip_visible());
        assert!(b.hide_tooltip());
    }
}
