use std::time::Duration;

use glam::Vec2;
use habitat_scene::NodeId;

use crate::config::{HoverConfig, ViewerConfig};
use crate::context::FrameContext;
use crate::schedule::{ScheduledTask, Throttle, secs};
use crate::tour::TourManager;

/// Discrete actions bound to keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Next,
    Previous,
    ToggleAutoAdvance,
}

impl KeyAction {
    /// Map a DOM-style key name to an action.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" => Some(KeyAction::Next),
            "ArrowLeft" => Some(KeyAction::Previous),
            " " | "Space" | "Spacebar" => Some(KeyAction::ToggleAutoAdvance),
            _ => None,
        }
    }
}

/// Input delivered by the host between frames.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerLockChanged(bool),
    /// Raw pointer deltas in pixels.
    MouseMove { dx: f32, dy: f32 },
    Key(String),
}

/// Routes input to the camera and tour, and keeps hover selection in sync
/// with what the center of the screen is pointing at.
pub struct InteractionRouter {
    cfg: HoverConfig,
    pointer_locked: bool,
    moving: bool,
    movement_timeout: ScheduledTask,
    hover_throttle: Throttle,
    hovered: Option<NodeId>,
}

impl Default for InteractionRouter {
    fn default() -> Self {
        Self::new(&ViewerConfig::default())
    }
}

impl InteractionRouter {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            cfg: cfg.hover.clone(),
            pointer_locked: false,
            moving: false,
            movement_timeout: ScheduledTask::once(secs(cfg.hover.movement_timeout)),
            hover_throttle: Throttle::new(secs(cfg.hover.check_interval)),
            hovered: None,
        }
    }

    pub fn is_pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    /// True while the camera was rotated within the movement timeout.
    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    fn viewport(&self) -> Vec2 {
        Vec2::from(self.cfg.viewport)
    }

    pub fn handle_event(
        &mut self,
        event: &InputEvent,
        now: Duration,
        tour: &mut TourManager,
        ctx: &mut FrameContext<'_>,
    ) {
        match event {
            InputEvent::PointerLockChanged(locked) => {
                self.pointer_locked = *locked;
                ctx.ui.update_mode(tour.is_auto_advancing(), self.pointer_locked);
            }
            InputEvent::MouseMove { dx, dy } => {
                if !self.pointer_locked {
                    return;
                }
                ctx.camera.on_mouse_look(*dx, *dy);
                self.moving = true;
                self.movement_timeout.schedule(now);
            }
            InputEvent::Key(key) => {
                let Some(action) = KeyAction::from_key(key) else {
                    return;
                };
                tracing::debug!("key '{key}' -> {action:?}");
                match action {
                    KeyAction::Next => tour.next(ctx),
                    KeyAction::Previous => tour.previous(ctx),
                    KeyAction::ToggleAutoAdvance => {
                        tour.toggle_auto_advance(now);
                    }
                }
            }
        }
    }

    /// Expire the movement flag once the pointer has been still long enough.
    pub fn poll_timers(&mut self, now: Duration) {
        if self.movement_timeout.poll(now) {
            self.moving = false;
        }
    }

    pub fn clear_hover(&mut self, ctx: &mut FrameContext<'_>) {
        if self.hovered.take().is_some() {
            ctx.surface.set_outline(&[]);
        }
        ctx.ui.hide_tooltip();
    }

    /// Throttled hover check from the center of the screen. Returns the
    /// hovered target after the check.
    pub fn update_hover(&mut self, now: Duration, ctx: &mut FrameContext<'_>) -> Option<NodeId> {
        if !self.hover_throttle.try_act(now) {
            return self.hovered;
        }

        if ctx.camera.is_transitioning() || self.moving {
            self.clear_hover(ctx);
            return None;
        }

        let scene = &mut *ctx.scene;
        if scene.interactive().is_empty() {
            return self.hovered;
        }

        let eye = ctx.camera.position();
        let max_distance = self.cfg.max_distance;
        let candidates: Vec<NodeId> = scene
            .interactive()
            .iter()
            .copied()
            .filter(|id| scene.graph.world_position(*id).distance(eye) < max_distance)
            .take(self.cfg.max_candidates)
            .collect();

        let ray = ctx.camera.center_ray();
        let hit = scene
            .cast(&ray, &candidates, max_distance)
            .into_iter()
            .find(|h| !scene.classifier.is_terrain(h.node));

        let Some(hit) = hit else {
            self.clear_hover(ctx);
            return None;
        };

        let target = scene.highlight_target(hit.node);
        let name = scene.graph.name(target).to_owned();
        // a cluster whose target reads as ground (e.g. "TerrainKiosk") is never hovered,
        // even when its own meshes escaped terrain classification
        if scene.classifier.matcher().is_terrain_name(&name) {
            self.clear_hover(ctx);
            return None;
        }

        if self.hovered != Some(target) {
            let meshes = scene.highlight_meshes(target);
            ctx.surface.set_outline(&meshes);
            self.hovered = Some(target);
            tracing::debug!("hovering '{name}'");
        }

        let display_name = scene.classifier.display_name(target).map(str::to_owned);
        let showable = !scene.classifier.is_terrain(target)
            && (display_name.is_some() || !scene.classifier.matcher().is_generic_name(&name));
        let title = display_name
            .or_else(|| (!name.is_empty()).then(|| name.clone()))
            .unwrap_or_else(|| "Object".to_owned());

        match ctx.camera.project_to_screen(hit.point, self.viewport()) {
            Some(at) if showable => {
                ctx.ui.show_tooltip(&name, &title, at);
            }
            _ => {
                ctx.ui.hide_tooltip();
            }
        }

        self.hovered
    }
}
