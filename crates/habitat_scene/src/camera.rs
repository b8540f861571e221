use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::ray::Ray;

/// Wrap an angle into (-PI, PI].
pub fn normalize_angle(a: f32) -> f32 {
    let n = (a + PI).rem_euclid(TAU) - PI;
    if n <= -PI { n + TAU } else { n }
}

/// Progress curve applied to camera transitions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    /// Piecewise quadratic ease-in-out.
    #[default]
    QuadInOut,
    CubicInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let f = 2.0 * t - 2.0;
                    0.5 * f * f * f + 1.0
                }
            }
        }
    }
}

/// First-person camera pose. Yaw turns around +Y with yaw 0 looking down -Z;
/// positive pitch looks up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraPose {
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(-sy * cp, sp, -cy * cp)
    }
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub start_position: Vec3,
    pub eye_height: f32,
    pub mouse_sensitivity: f32,
    pub pitch_min: f32,
    pub pitch_max: f32,
    pub fov_y_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    pub easing: Easing,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let limit = FRAC_PI_2 - 0.01;
        Self {
            start_position: Vec3::new(-20.0, 1.8, -5.0),
            eye_height: 1.8,
            mouse_sensitivity: 0.0025,
            pitch_min: -limit,
            pitch_max: limit,
            fov_y_degrees: 75.0,
            znear: 0.1,
            zfar: 1000.0,
            easing: Easing::QuadInOut,
        }
    }
}

/// An in-flight eased move between two poses.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: CameraPose,
    pub to: CameraPose,
    /// Raw progress in [0, 1].
    pub t: f32,
    pub duration: f32,
}

/// Owns the live camera pose and the transition state machine.
///
/// With no transition the pose only changes through direct calls. A call to
/// [`CameraController::start_transition`] replaces whatever was in flight.
#[derive(Debug, Clone)]
pub struct CameraController {
    pose: CameraPose,
    pub settings: CameraSettings,
    transition: Option<Transition>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl CameraController {
    pub fn new(settings: CameraSettings) -> Self {
        Self {
            pose: CameraPose {
                position: settings.start_position,
                yaw: 0.0,
                pitch: 0.0,
            },
            settings,
            transition: None,
        }
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn position(&self) -> Vec3 {
        self.pose.position
    }

    pub fn eye_height(&self) -> f32 {
        self.settings.eye_height
    }

    /// Apply a pose directly. Any transition keeps running and will
    /// overwrite it on the next advance; cancel it first if that matters.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.pose = CameraPose {
            position: pose.position,
            yaw: normalize_angle(pose.yaw),
            pitch: self.clamp_pitch(pose.pitch),
        };
    }

    pub fn clamp_pitch(&self, pitch: f32) -> f32 {
        pitch.clamp(self.settings.pitch_min, self.settings.pitch_max)
    }

    // ── Transitions ──────────────────────────────────────────────

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    pub fn cancel_transition(&mut self) {
        self.transition = None;
    }

    /// Begin an eased move from the current pose. Overwrites any transition
    /// already in progress.
    pub fn start_transition(&mut self, position: Vec3, yaw: f32, pitch: f32, duration: f32) {
        self.transition = Some(Transition {
            from: self.pose,
            to: CameraPose {
                position,
                yaw,
                pitch,
            },
            t: 0.0,
            duration,
        });
    }

    /// Step the active transition by `dt` seconds. Returns true if the pose
    /// moved this frame.
    pub fn advance(&mut self, dt: f32) -> bool {
        let Some(tr) = self.transition.as_mut() else {
            return false;
        };

        if tr.duration > 0.0 {
            tr.t += dt / tr.duration;
        } else {
            tr.t = 1.0;
        }
        tr.t = tr.t.min(1.0);

        let (from, to, t) = (tr.from, tr.to, tr.t);

        if t >= 1.0 {
            self.transition = None;
            self.pose = CameraPose {
                position: to.position,
                yaw: normalize_angle(to.yaw),
                pitch: self.clamp_pitch(to.pitch),
            };
            return true;
        }

        let e = self.settings.easing.apply(t);
        let diff = normalize_angle(to.yaw - from.yaw);
        self.pose = CameraPose {
            position: from.position.lerp(to.position, e),
            yaw: normalize_angle(from.yaw + diff * e),
            pitch: self.clamp_pitch(from.pitch + (to.pitch - from.pitch) * e),
        };
        true
    }

    // ── Manual control ───────────────────────────────────────────

    /// Mouse-look from raw pointer deltas (pixels).
    pub fn on_mouse_look(&mut self, delta_x: f32, delta_y: f32) {
        let s = self.settings.mouse_sensitivity;
        self.pose.yaw = normalize_angle(self.pose.yaw - delta_x * s);
        self.pose.pitch = self.clamp_pitch(self.pose.pitch - delta_y * s);
    }

    pub fn rotate_yaw(&mut self, delta: f32) {
        self.pose.yaw = normalize_angle(self.pose.yaw + delta);
    }

    /// Place the eye at `ground + eye_height`. Without a ground height the
    /// current elevation is kept.
    pub fn adjust_to_ground(&mut self, ground: Option<f32>) {
        if let Some(h) = ground {
            self.pose.position.y = h + self.settings.eye_height;
        }
    }

    /// Yaw/pitch that face `to` from `from`, with pitch softened for distant
    /// targets and kept within a small band.
    pub fn compute_look_angles(&self, from: Vec3, to: Vec3) -> (f32, f32) {
        let d = to - from;
        let yaw = normalize_angle(d.x.atan2(d.z) + PI);
        let horizontal = d.x.hypot(d.z).max(1e-6);
        let mut pitch = d.y.atan2(horizontal);

        if horizontal > 5.0 {
            pitch *= 0.3;
        } else if horizontal > 2.0 {
            pitch *= 0.5;
        }

        pitch = pitch.clamp(-0.2, 0.2);
        (yaw, self.clamp_pitch(pitch))
    }

    // ── Projection ───────────────────────────────────────────────

    pub fn forward(&self) -> Vec3 {
        self.pose.forward()
    }

    /// Ray from the center of the screen.
    pub fn center_ray(&self) -> Ray {
        Ray::new(self.pose.position, self.forward())
    }

    fn view(&self) -> Mat4 {
        let eye = self.pose.position;
        Mat4::look_at_rh(eye, eye + self.forward(), Vec3::Y)
    }

    fn proj(&self, width: f32, height: f32) -> Mat4 {
        let aspect = width / height.max(1.0);
        Mat4::perspective_rh(
            self.settings.fov_y_degrees.to_radians(),
            aspect,
            self.settings.znear,
            self.settings.zfar,
        )
    }

    pub fn view_proj(&self, width: f32, height: f32) -> Mat4 {
        self.proj(width, height) * self.view()
    }

    /// Project a world point to viewport pixels (0,0 = top-left). None when
    /// the point is behind the camera.
    pub fn project_to_screen(&self, point: Vec3, viewport: Vec2) -> Option<Vec2> {
        let clip = self.view_proj(viewport.x, viewport.y) * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * viewport.x,
            (-ndc.y * 0.5 + 0.5) * viewport.y,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_at(pos: Vec3, yaw: f32) -> CameraController {
        let mut c = CameraController::default();
        c.set_pose(CameraPose {
            position: pos,
            yaw,
            pitch: 0.0,
        });
        c
    }

    // ── Angles ────────────────────────────────────────────────────

    #[test]
    fn normalize_angle_range() {
        assert!((normalize_angle(PI + 0.5) - (0.5 - PI)).abs() < 1e-5);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((normalize_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn quad_easing_is_symmetric() {
        let e = Easing::QuadInOut;
        assert_eq!(e.apply(0.0), 0.0);
        assert_eq!(e.apply(1.0), 1.0);
        assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((e.apply(0.25) - 0.125).abs() < 1e-6);
        assert!((e.apply(0.75) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn look_angles_face_target() {
        let c = CameraController::default();
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(3.0, 0.0, -4.0);
        let (yaw, pitch) = c.compute_look_angles(from, to);
        let pose = CameraPose {
            position: from,
            yaw,
            pitch,
        };
        let f = pose.forward();
        assert!((f - (to - from).normalize()).length() < 1e-4);
    }

    #[test]
    fn look_pitch_damped_and_clamped() {
        let c = CameraController::default();
        // close, steep target: full magnitude then clamp
        let (_, p) = c.compute_look_angles(Vec3::ZERO, Vec3::new(0.0, 10.0, -1.0));
        assert!((p - 0.2).abs() < 1e-6);
        // mid range: half of atan2(1, 4)
        let (_, p) = c.compute_look_angles(Vec3::ZERO, Vec3::new(0.0, 1.0, -4.0));
        assert!((p - 0.5 * 1f32.atan2(4.0)).abs() < 1e-6);
        // far and below: 30% then clamp to the band
        let (_, p) = c.compute_look_angles(Vec3::ZERO, Vec3::new(0.0, -10.0, -10.0));
        assert!((p + 0.2).abs() < 1e-6);
    }

    // ── Transitions ───────────────────────────────────────────────

    #[test]
    fn idle_advance_does_not_move() {
        let mut c = CameraController::default();
        assert!(!c.advance(0.016));
        assert!(!c.is_transitioning());
    }

    #[test]
    fn transition_reaches_target_exactly() {
        let mut c = controller_at(Vec3::ZERO, 0.0);
        let to = Vec3::new(10.0, 2.0, -4.0);
        c.start_transition(to, 1.0, 0.1, 1.0);

        assert!(c.advance(0.4));
        assert!(c.advance(0.4));
        assert!(c.is_transitioning());
        assert!(c.advance(0.4));
        assert!(!c.is_transitioning());
        assert_eq!(c.pose().position, to);
        assert!((c.pose().yaw - 1.0).abs() < 1e-6);
        assert_eq!(c.pose().pitch, 0.1);

        assert!(!c.advance(0.4));
        assert_eq!(c.pose().position, to);
    }

    #[test]
    fn transition_midpoint_is_eased() {
        let mut c = controller_at(Vec3::ZERO, 0.0);
        c.start_transition(Vec3::new(8.0, 0.0, 0.0), 0.0, 0.0, 1.0);
        c.advance(0.25);
        assert!((c.pose().position.x - 1.0).abs() < 1e-5);
        c.advance(0.25);
        assert!((c.pose().position.x - 4.0).abs() < 1e-5);
    }

    #[test]
    fn yaw_takes_shortest_arc() {
        let mut c = controller_at(Vec3::ZERO, 3.0);
        c.start_transition(Vec3::ZERO, -3.0, 0.0, 1.0);
        c.advance(0.5);
        let yaw = c.pose().yaw;
        // halfway through the wrap: near +/-PI, never near 0
        assert!(yaw.abs() > 3.0, "yaw went the long way: {yaw}");
    }

    #[test]
    fn new_transition_overwrites_old() {
        let mut c = controller_at(Vec3::ZERO, 0.0);
        c.start_transition(Vec3::new(10.0, 0.0, 0.0), 0.0, 0.0, 1.0);
        c.advance(0.5);
        let mid = c.pose().position;
        c.start_transition(Vec3::new(0.0, 0.0, 10.0), 0.0, 0.0, 1.0);
        let tr = c.transition().expect("transition");
        assert_eq!(tr.from.position, mid);
        assert_eq!(tr.t, 0.0);
        c.advance(1.0);
        assert_eq!(c.pose().position, Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut c = controller_at(Vec3::ZERO, 0.0);
        c.start_transition(Vec3::ONE, 0.0, 0.0, 0.0);
        assert!(c.advance(0.0));
        assert_eq!(c.pose().position, Vec3::ONE);
        assert!(!c.is_transitioning());
    }

    // ── Manual control ────────────────────────────────────────────

    #[test]
    fn mouse_look_clamps_pitch() {
        let mut c = CameraController::default();
        c.on_mouse_look(0.0, -100_000.0);
        assert_eq!(c.pose().pitch, c.settings.pitch_max);
        c.on_mouse_look(100.0, 0.0);
        assert!((c.pose().yaw + 0.25).abs() < 1e-6);
    }

    #[test]
    fn adjust_to_ground_keeps_height_without_ground() {
        let mut c = controller_at(Vec3::new(0.0, 7.0, 0.0), 0.0);
        c.adjust_to_ground(None);
        assert_eq!(c.position().y, 7.0);
        c.adjust_to_ground(Some(2.0));
        assert!((c.position().y - 3.8).abs() < 1e-6);
    }

    #[test]
    fn project_center_point() {
        let c = controller_at(Vec3::ZERO, 0.0);
        let viewport = Vec2::new(800.0, 600.0);
        let p = c
            .project_to_screen(Vec3::new(0.0, 0.0, -5.0), viewport)
            .expect("in front");
        assert!((p - Vec2::new(400.0, 300.0)).length() < 1e-3);
        assert!(c.project_to_screen(Vec3::new(0.0, 0.0, 5.0), viewport).is_none());
    }
}
