use std::sync::Arc;
use std::time::Duration;

use habitat_scene::{BoundsRaycaster, CameraController, LoadedScene, Raycaster, SceneLoader};
use poll_promise::Promise;
use tracing::{error, info, warn};

use crate::config::ViewerConfig;
use crate::context::FrameContext;
use crate::error::Error;
use crate::interaction::{InputEvent, InteractionRouter};
use crate::scene_state::SceneState;
use crate::schedule::{Throttle, secs};
use crate::tour::TourManager;
use crate::ui::{RenderSurface, UiBridge, ViewerUi};

pub const LOADING_MESSAGE: &str = "Loading habitat...";
pub const LOAD_ERROR_MESSAGE: &str = "Error loading the habitat. Please retry.";

type LoadResult = Result<LoadedScene, habitat_scene::Error>;

enum LoadState {
    Idle,
    Loading(Promise<Option<LoadResult>>),
    Ready,
    Failed(String),
}

/// Where the one-shot scene load currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// The frame-driven walkthrough: owns the camera, the loaded scene, the tour
/// and the input router, and talks to the host through the UI and render
/// capabilities.
pub struct Walkthrough {
    cfg: ViewerConfig,
    loader: Arc<dyn SceneLoader>,
    raycaster: Arc<dyn Raycaster>,

    camera: CameraController,
    scene: Option<SceneState>,
    tour: TourManager,
    router: InteractionRouter,
    ui: UiBridge,
    surface: Box<dyn RenderSurface>,

    load: LoadState,
    last_tick: Option<Duration>,
    hud: Throttle,
}

impl Walkthrough {
    pub fn new(
        cfg: ViewerConfig,
        loader: Arc<dyn SceneLoader>,
        ui: Option<Box<dyn ViewerUi>>,
        surface: Box<dyn RenderSurface>,
    ) -> Self {
        let ui = UiBridge::new(ui, cfg.object_info.clone(), cfg.tooltip.description.clone());
        Self {
            camera: CameraController::new(cfg.camera_settings()),
            tour: TourManager::new(&cfg),
            router: InteractionRouter::new(&cfg),
            hud: Throttle::new(secs(cfg.general.hud_refresh_interval)),
            loader,
            raycaster: Arc::new(BoundsRaycaster),
            scene: None,
            ui,
            surface,
            load: LoadState::Idle,
            last_tick: None,
            cfg,
        }
    }

    /// Use a different hit-testing backend for scenes installed from now on.
    pub fn with_raycaster(mut self, raycaster: Arc<dyn Raycaster>) -> Self {
        self.raycaster = raycaster;
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.cfg
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn scene(&self) -> Option<&SceneState> {
        self.scene.as_ref()
    }

    pub fn tour(&self) -> &TourManager {
        &self.tour
    }

    pub fn router(&self) -> &InteractionRouter {
        &self.router
    }

    pub fn load_status(&self) -> LoadStatus {
        match &self.load {
            LoadState::Idle => LoadStatus::Idle,
            LoadState::Loading(_) => LoadStatus::Loading,
            LoadState::Ready => LoadStatus::Ready,
            LoadState::Failed(err) => LoadStatus::Failed(err.clone()),
        }
    }

    fn parts(&mut self) -> Option<(FrameContext<'_>, &mut TourManager, &mut InteractionRouter)> {
        let scene = self.scene.as_mut()?;
        let ctx = FrameContext {
            scene,
            camera: &mut self.camera,
            ui: &mut self.ui,
            surface: &mut *self.surface,
        };
        Some((ctx, &mut self.tour, &mut self.router))
    }

    // ── Loading ──────────────────────────────────────────────────

    /// Start loading `url` (or the configured scene) on a background thread.
    /// Returns false if a load is already running.
    pub fn begin_load(&mut self, url: Option<&str>) -> bool {
        if matches!(self.load, LoadState::Loading(_)) {
            warn!("scene load already in progress");
            return false;
        }

        let url = url.unwrap_or(&self.cfg.general.scene_url).to_owned();
        info!("loading scene from {url}");
        self.ui.set_loading(true, Some(LOADING_MESSAGE));

        let loader = self.loader.clone();
        let promise = Promise::spawn_thread("habitat-scene-loader", move || {
            Some(loader.load_scene(&url))
        });
        self.load = LoadState::Loading(promise);
        true
    }

    /// Install the scene if the background load finished. Returns true on
    /// the frame the scene becomes ready.
    pub fn poll_load(&mut self) -> bool {
        let LoadState::Loading(promise) = &mut self.load else {
            return false;
        };
        let Some(res) = promise.ready_mut() else {
            return false;
        };
        let Some(outcome) = res.take() else {
            self.fail_load("scene promise already taken".to_owned());
            return false;
        };
        self.finish_load(outcome)
    }

    /// Block until the pending load completes, then install it.
    pub fn wait_for_load(&mut self) -> Result<(), Error> {
        let outcome = match &mut self.load {
            LoadState::Loading(promise) => promise.block_until_ready_mut().take(),
            LoadState::Ready => return Ok(()),
            LoadState::Failed(err) => return Err(Error::Generic(err.clone())),
            LoadState::Idle => return Err(Error::Generic("no scene load started".to_owned())),
        };
        let Some(outcome) = outcome else {
            let msg = "scene promise already taken".to_owned();
            self.fail_load(msg.clone());
            return Err(Error::Generic(msg));
        };
        match outcome {
            Ok(scene) => {
                self.install_scene(scene);
                Ok(())
            }
            Err(err) => {
                self.fail_load(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Load synchronously on the calling thread.
    pub fn load_now(&mut self, url: Option<&str>) -> Result<(), Error> {
        let url = url.unwrap_or(&self.cfg.general.scene_url).to_owned();
        info!("loading scene from {url}");
        self.ui.set_loading(true, Some(LOADING_MESSAGE));
        match self.loader.load_scene(&url) {
            Ok(scene) => {
                self.install_scene(scene);
                Ok(())
            }
            Err(err) => {
                self.fail_load(err.to_string());
                Err(err.into())
            }
        }
    }

    fn finish_load(&mut self, outcome: LoadResult) -> bool {
        match outcome {
            Ok(scene) => {
                self.install_scene(scene);
                true
            }
            Err(err) => {
                self.fail_load(err.to_string());
                false
            }
        }
    }

    fn fail_load(&mut self, err: String) {
        error!("failed to load scene: {err}");
        self.ui.set_loading(true, Some(LOAD_ERROR_MESSAGE));
        self.scene = None;
        self.load = LoadState::Failed(err);
    }

    /// Classify, index and enter a loaded scene, then start the tour or
    /// settle the camera on the ground.
    pub fn install_scene(&mut self, loaded: LoadedScene) {
        let scene = SceneState::prepare(loaded, &self.cfg, self.raycaster.clone());
        info!(
            "scene ready: {} nodes, {} interactive, {} terrain",
            scene.graph.len(),
            scene.classifier.interactive().len(),
            scene.terrain.meshes().len()
        );
        self.scene = Some(scene);
        self.router = InteractionRouter::new(&self.cfg);
        self.tour = TourManager::new(&self.cfg);

        let pois = self.cfg.points_of_interest.clone();
        if let Some((mut ctx, tour, _)) = self.parts() {
            if pois.is_empty() {
                let p = ctx.camera.position();
                let ground = ctx.scene.height_at(p.x, p.z);
                ctx.camera.adjust_to_ground(ground);
            } else {
                tour.set_points(&pois, &mut ctx);
            }
        }

        self.ui.set_loading(false, None);
        self.ui
            .update_mode(self.tour.is_auto_advancing(), self.router.is_pointer_locked());
        self.load = LoadState::Ready;
    }

    // ── Tour shortcuts ───────────────────────────────────────────

    pub fn go_to(&mut self, index: isize, instant: bool) {
        if let Some((mut ctx, tour, _)) = self.parts() {
            tour.go_to(index, instant, &mut ctx);
        }
    }

    pub fn next(&mut self) {
        if let Some((mut ctx, tour, _)) = self.parts() {
            tour.next(&mut ctx);
        }
    }

    pub fn previous(&mut self) {
        if let Some((mut ctx, tour, _)) = self.parts() {
            tour.previous(&mut ctx);
        }
    }

    pub fn toggle_auto_advance(&mut self, now: Duration) -> bool {
        self.tour.toggle_auto_advance(now)
    }

    // ── Frame loop ───────────────────────────────────────────────

    /// Route one input event. Input is ignored until a scene is installed.
    pub fn handle_event(&mut self, event: &InputEvent, now: Duration) {
        match self.parts() {
            Some((mut ctx, tour, router)) => router.handle_event(event, now, tour, &mut ctx),
            None => tracing::trace!("ignoring {event:?} before the scene is ready"),
        }
    }

    /// Advance one frame at host time `now`.
    pub fn tick(&mut self, now: Duration) {
        self.poll_load();

        let dt = self
            .last_tick
            .map(|last| now.saturating_sub(last).as_secs_f32())
            .unwrap_or(0.0)
            .min(self.cfg.general.max_frame_dt);
        self.last_tick = Some(now);
        let rotation_speed = self.cfg.movement.auto_rotation_speed;

        if let Some((mut ctx, tour, router)) = self.parts() {
            let moved = ctx.camera.advance(dt);
            if !moved && tour.is_auto_advancing() {
                ctx.camera.rotate_yaw(dt * rotation_speed);
            }

            tour.poll(now, &mut ctx);
            router.poll_timers(now);
            router.update_hover(now, &mut ctx);
        }

        if self.hud.try_act(now) {
            self.ui.update_position(self.camera.position());
            self.ui
                .update_mode(self.tour.is_auto_advancing(), self.router.is_pointer_locked());
        }

        self.surface.render_frame(&self.camera, self.scene.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::NoopSurface;
    use habitat_scene::{Aabb, SceneGraph, Transform};

    struct Failing;

    impl SceneLoader for Failing {
        fn load_scene(&self, url: &str) -> Result<LoadedScene, habitat_scene::Error> {
            Err(habitat_scene::Error::Unsupported(url.to_owned()))
        }
    }

    struct Flat;

    impl SceneLoader for Flat {
        fn load_scene(&self, _url: &str) -> Result<LoadedScene, habitat_scene::Error> {
            let mut graph = SceneGraph::new();
            let root = graph.create_group("Scene", Transform::default(), None);
            graph.create_drawable(
                "Floor",
                Aabb::new(glam::Vec3::new(-50.0, -1.0, -50.0), glam::Vec3::new(50.0, 2.0, 50.0)),
                Transform::default(),
                Some(root),
            );
            Ok(LoadedScene { graph, root })
        }
    }

    fn viewer(loader: Arc<dyn SceneLoader>, pois: bool) -> Walkthrough {
        let mut cfg = ViewerConfig::default();
        if !pois {
            cfg.points_of_interest.clear();
        }
        Walkthrough::new(cfg, loader, None, Box::new(NoopSurface))
    }

    #[test]
    fn failed_load_is_retryable() {
        let mut w = viewer(Arc::new(Failing), true);
        assert!(w.begin_load(Some("https://example.com/hab.glb")));
        assert!(w.wait_for_load().is_err());
        assert!(matches!(w.load_status(), LoadStatus::Failed(_)));
        assert!(w.scene().is_none());

        // ticking a failed viewer is harmless
        w.tick(Duration::from_millis(16));
        assert!(w.begin_load(None));
    }

    #[test]
    fn background_load_installs_scene() {
        let mut w = viewer(Arc::new(Flat), false);
        assert!(w.begin_load(None));
        assert!(w.wait_for_load().is_ok());
        assert_eq!(w.load_status(), LoadStatus::Ready);
        // no tour: camera settles on the floor
        assert!((w.camera().position().y - 3.8).abs() < 1e-4);
    }

    #[test]
    fn input_before_load_is_ignored() {
        let mut w = viewer(Arc::new(Flat), true);
        w.handle_event(&InputEvent::Key("ArrowRight".to_owned()), Duration::ZERO);
        assert_eq!(w.tour().index(), 0);
        assert_eq!(w.load_status(), LoadStatus::Idle);
    }

    #[test]
    fn frame_dt_is_clamped() {
        let mut w = viewer(Arc::new(Flat), true);
        w.load_now(None).ok();
        w.go_to(1, false);
        assert!(w.camera().is_transitioning());

        w.tick(Duration::ZERO);
        // a one second hitch only advances 0.05 s of a 0.9 s transition
        w.tick(Duration::from_secs(1));
        assert!(w.camera().is_transitioning());
    }
}
