//! Walkthrough core for the habitat viewer.
//!
//! A loaded scene is classified into terrain, shadow tiers and interactive
//! highlight targets ([`SceneClassifier`]), indexed by name
//! ([`SpatialIndex`]), and then explored either by hand or through a guided
//! tour ([`TourManager`]). [`Walkthrough`] ties it together into a
//! frame-driven app; the host supplies time, input, and the display
//! capabilities in [`ui`].

pub mod classify;
pub mod config;
mod context;
mod error;
pub mod interaction;
pub mod name_match;
mod scene_state;
pub mod schedule;
pub mod spatial_index;
pub mod terrain;
pub mod tour;
pub mod ui;
mod viewer;

pub use classify::{
    ClassificationStats, ClassifierSettings, InteractiveRegistry, NodeMeta, SceneClassifier,
    ShadowTier,
};
pub use config::{ObjectInfo, PoiConfig, ViewerConfig};
pub use context::FrameContext;
pub use error::Error;
pub use interaction::{InputEvent, InteractionRouter, KeyAction};
pub use name_match::{NameClass, NameDebugInfo, NameMatcher, normalize};
pub use scene_state::SceneState;
pub use schedule::{ScheduledTask, Throttle};
pub use spatial_index::{IndexStats, SpatialIndex};
pub use terrain::{HeightCache, TerrainRegistry};
pub use tour::{TourManager, TourPoint};
pub use ui::{
    LoggingSurface, LoggingUi, NoopSurface, NoopUi, RenderSurface, TooltipView, UiBridge,
    ViewerUi,
};
pub use viewer::{LOAD_ERROR_MESSAGE, LOADING_MESSAGE, LoadStatus, Walkthrough};

pub type Result<T> = std::result::Result<T, Error>;
