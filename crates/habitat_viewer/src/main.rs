use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use habitat_scene::GltfSceneLoader;
use habitat_walkthrough::{LoadStatus, LoggingSurface, LoggingUi, ViewerConfig, Walkthrough};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const FRAME_STEP: Duration = Duration::from_millis(16);

struct Args {
    scene: Option<String>,
    config: Option<PathBuf>,
    frames: u32,
    log_dir: Option<PathBuf>,
    auto: bool,
}

impl Args {
    // parse arguments, return set of unrecognized args
    fn parse(args: &[String]) -> (Self, BTreeSet<String>) {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args {
            scene: None,
            config: None,
            frames: 600,
            log_dir: None,
            auto: false,
        };

        let mut i = 0;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            if arg == "--auto" {
                res.auto = true;
            } else if arg == "--scene" {
                i += 1;
                let Some(scene) = args.get(i) else {
                    error!("scene argument missing?");
                    continue;
                };
                res.scene = Some(scene.clone());
            } else if arg == "--config" {
                i += 1;
                let Some(path) = args.get(i) else {
                    error!("config argument missing?");
                    continue;
                };
                res.config = Some(PathBuf::from(path));
            } else if arg == "--log-dir" {
                i += 1;
                let Some(path) = args.get(i) else {
                    error!("log-dir argument missing?");
                    continue;
                };
                res.log_dir = Some(PathBuf::from(path));
            } else if arg == "--frames" {
                i += 1;
                let Some(frames) = args.get(i) else {
                    error!("frames argument missing?");
                    continue;
                };
                match frames.parse() {
                    Ok(n) => res.frames = n,
                    Err(err) => error!("failed to parse --frames '{frames}': {err}"),
                }
            } else {
                unrecognized_args.insert(arg.clone());
            }

            i += 1;
        }

        (res, unrecognized_args)
    }
}

fn setup_logging(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("habitat_viewer=info,habitat_walkthrough=info,habitat_scene=info")
        })
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stdout)
        .with_filter(filter());

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    };

    if let Err(err) = std::fs::create_dir_all(dir) {
        tracing_subscriber::registry().with(console_layer).init();
        warn!("could not create log dir {}: {err}", dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(dir, "habitat_viewer.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    Some(guard)
}

fn load_config(path: Option<&PathBuf>) -> ViewerConfig {
    let Some(path) = path else {
        return ViewerConfig::default();
    };

    match ViewerConfig::load(path) {
        Ok(cfg) => {
            info!("loaded config from {}", path.display());
            cfg
        }
        Err(err) => {
            warn!("failed to load config {}: {err}, using defaults", path.display());
            ViewerConfig::default()
        }
    }
}

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let (args, unrecognized) = Args::parse(&raw);

    // keep the guard alive so buffered log lines get flushed on exit
    let _guard = setup_logging(args.log_dir.as_ref());

    for arg in &unrecognized {
        warn!("unrecognized argument '{arg}'");
    }

    let cfg = load_config(args.config.as_ref());
    let mut viewer = Walkthrough::new(
        cfg,
        Arc::new(GltfSceneLoader),
        Some(Box::new(LoggingUi)),
        Box::new(LoggingSurface::default()),
    );

    viewer.begin_load(args.scene.as_deref());
    if let Err(err) = viewer.wait_for_load() {
        error!("scene failed to load: {err}");
        std::process::exit(1);
    }

    if args.auto {
        viewer.toggle_auto_advance(Duration::ZERO);
    }

    let mut now = Duration::ZERO;
    for _ in 0..args.frames {
        viewer.tick(now);
        now += FRAME_STEP;
    }

    let pos = viewer.camera().position();
    match viewer.load_status() {
        LoadStatus::Ready => info!(
            "ran {} frames, stop {} of {}, camera at ({:.2}, {:.2}, {:.2})",
            args.frames,
            viewer.tour().index() + 1,
            viewer.tour().points().len(),
            pos.x,
            pos.y,
            pos.z
        ),
        status => warn!("finished with scene status {status:?}"),
    }
}
