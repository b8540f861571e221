use std::path::Path;

use glam::Vec3;
use habitat_scene::{CameraSettings, Easing};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::Error;

/// Terrain names recognized when no custom pattern is configured.
pub const DEFAULT_TERRAIN_PATTERN: &str = "terrain|ground|floor|mapa";

/// Top-level sections a configuration file is expected to carry. Missing
/// ones fall back to defaults, but are reported.
pub const REQUIRED_SECTIONS: &[&str] = &[
    "general",
    "render",
    "highlight",
    "interaction",
    "movement",
    "transition",
    "terrain",
    "tooltip",
    "lights",
    "base_floor",
    "camera",
    "points_of_interest",
    "object_info",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Scene asset loaded when none is given explicitly.
    pub scene_url: String,
    /// Upper bound for a single frame step, in seconds.
    pub max_frame_dt: f32,
    /// Seconds between HUD refreshes.
    pub hud_refresh_interval: f32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            scene_url: "/static/utah/gltfmodel/SampleScene.glb".to_owned(),
            max_frame_dt: 0.05,
            hud_refresh_interval: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background: u32,
    pub exposure: f32,
    pub shadow_type: String,
    pub max_pixel_ratio: f32,
    pub antialias: bool,
    pub color_space: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: 0x000000,
            exposure: 1.0,
            shadow_type: "pcf_soft".to_owned(),
            max_pixel_ratio: 2.0,
            antialias: true,
            color_space: "srgb".to_owned(),
        }
    }
}

/// Outline appearance for hovered and selected targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub edge_strength: f32,
    pub edge_glow: f32,
    pub edge_thickness: f32,
    pub pulse_period: f32,
    pub visible_color: u32,
    pub hidden_color: u32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            edge_strength: 2.5,
            edge_glow: 0.4,
            edge_thickness: 1.5,
            pulse_period: 0.0,
            visible_color: 0xffa500,
            hidden_color: 0xff6600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub min_interactive_size: f32,
    pub min_group_mesh_count: usize,
    pub hover_cooldown: f32,
    /// X/Z extent above which a drawable counts as terrain.
    pub terrain_footprint: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_interactive_size: 1.0,
            min_group_mesh_count: 3,
            hover_cooldown: 0.1,
            terrain_footprint: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub base_speed: f32,
    pub mouse_sensitivity: f32,
    pub eye_height: f32,
    /// Radians per second applied while the auto tour idles between stops.
    pub auto_rotation_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 3.0,
            mouse_sensitivity: 0.0025,
            eye_height: 1.8,
            auto_rotation_speed: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub duration: f32,
    pub easing: Easing,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            duration: 0.9,
            easing: Easing::QuadInOut,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Case-insensitive regex matched against drawable names.
    pub pattern: String,
    /// Height the downward terrain probe starts from.
    pub raycast_height: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_TERRAIN_PATTERN.to_owned(),
            raycast_height: 100.0,
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, Error> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

impl TerrainConfig {
    /// Compile the terrain pattern. An invalid pattern is logged and the
    /// built-in one is used instead.
    pub fn regex(&self) -> Regex {
        match case_insensitive(&self.pattern) {
            Ok(re) => re,
            Err(err) => {
                tracing::error!(
                    "invalid terrain pattern '{}': {err}, using default",
                    self.pattern
                );
                case_insensitive(DEFAULT_TERRAIN_PATTERN).expect("default terrain pattern")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    pub min_distance: f32,
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub max_width: String,
    pub shift_y_percent: f32,
    /// Description shown under the title when no object info exists.
    pub description: String,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            min_distance: 2.0,
            opacity: 0.95,
            offset_x: 15.0,
            offset_y: -30.0,
            max_width: "250px".to_owned(),
            shift_y_percent: -100.0,
            description: "Click to select".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowCameraConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub area: f32,
}

impl Default for ShadowCameraConfig {
    fn default() -> Self {
        Self {
            map_size: 512,
            near: 0.5,
            far: 500.0,
            area: 80.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub position: [f32; 3],
    pub shadow: ShadowCameraConfig,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.2,
            position: [50.0, 100.0, 50.0],
            shadow: ShadowCameraConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLightConfig {
    pub color: u32,
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: 0x404040,
            intensity: 0.4,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub directional: DirectionalLightConfig,
    pub ambient: AmbientLightConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseFloorConfig {
    pub color: u32,
    pub metalness: f32,
    pub roughness: f32,
    pub size: f32,
}

impl Default for BaseFloorConfig {
    fn default() -> Self {
        Self {
            color: 0x4a2a1a,
            metalness: 0.1,
            roughness: 0.95,
            size: 500.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub pitch_min: f32,
    pub pitch_max: f32,
    pub start_position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            pitch_min: -limit,
            pitch_max: limit,
            start_position: [-20.0, 1.8, -5.0],
        }
    }
}

/// Size-driven shadow tiers and the named-structure rules of the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Below this size a drawable neither casts nor receives shadows.
    pub no_shadow_below: f32,
    /// Below this size a drawable only receives shadows.
    pub receive_only_below: f32,
    /// Token marking the specially optimized named structure.
    pub subgroup_marker: String,
    /// Drawables of the marked structure below this size get no shadows.
    pub subgroup_no_shadow_below: f32,
    /// Targets of the marked structure below this size are not interactive.
    pub subgroup_min_interactive: f32,
    /// Structures guaranteed to be interactive, matched by normalized name.
    pub ensure_interactive: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            no_shadow_below: 0.5,
            receive_only_below: 2.0,
            subgroup_marker: "musk".to_owned(),
            subgroup_no_shadow_below: 1.5,
            subgroup_min_interactive: 3.0,
            ensure_interactive: [
                "TheMuskObservatory",
                "TRO",
                "PTO",
                "Panel",
                "Tunel",
                "TheHab",
                "Green Hab2",
                "Ram2",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoverConfig {
    /// Seconds between hover checks.
    pub check_interval: f32,
    /// Only interactive objects closer than this are raycast.
    pub max_distance: f32,
    /// At most this many nearby objects are tested, in registration order.
    pub max_candidates: usize,
    /// Seconds after the last mouse-look before hover resumes.
    pub movement_timeout: f32,
    /// Screen size used to place the tooltip.
    pub viewport: [f32; 2],
}

impl Default for HoverConfig {
    fn default() -> Self {
        Self {
            check_interval: 0.1,
            max_distance: 50.0,
            max_candidates: 30,
            movement_timeout: 0.1,
            viewport: [1280.0, 720.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TourConfig {
    /// Seconds between automatic advances.
    pub auto_advance_interval: f32,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            auto_advance_interval: 6.0,
        }
    }
}

/// An authored tour stop on the ground plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiConfig {
    pub name: String,
    pub x: f32,
    pub z: f32,
}

impl PoiConfig {
    pub fn new(name: &str, x: f32, z: f32) -> Self {
        Self {
            name: name.to_owned(),
            x,
            z,
        }
    }
}

/// Descriptive text for a named object or tour stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub title: String,
    pub description: String,
}

fn default_generic_names() -> Vec<String> {
    [
        "mesh",
        "object",
        "group",
        "scene",
        "node",
        "root",
        "model",
        "primitive",
        "geometry",
        "cube",
        "sphere",
        "cylinder",
        "plane",
        "empty",
        "transform",
        "collider",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect()
}

fn default_points_of_interest() -> Vec<PoiConfig> {
    vec![
        PoiConfig::new("PTO", -20.000, -5.000),
        PoiConfig::new("Green Hab2", -31.743, 9.794),
        PoiConfig::new("TheHab", -36.994, 30.481),
        PoiConfig::new("Ram2", -43.576, 53.796),
        PoiConfig::new("Tunel", -73.239, 7.819),
        PoiConfig::new("TheMuskObservatory", -58.599, -39.469),
        PoiConfig::new("TRO", -43.998, -54.893),
        PoiConfig::new("Panel", -30.820, -38.256),
    ]
}

fn default_object_info() -> IndexMap<String, ObjectInfo> {
    let entries = [
        (
            "PTO",
            "First Observation Point",
            "Panoramic view of the habitat and starting point of the tour.",
        ),
        (
            "Green_Hab2",
            "Greenhouse",
            "Hydroponic growing module producing fresh food and oxygen.",
        ),
        (
            "TheHab",
            "Main Habitat",
            "Residential module with living, research and communications areas.",
        ),
        (
            "Ram2",
            "RAM",
            "A refitted Chinook helicopter, the Repair and Assembly Module houses an ATV/rover for repairs and engineering research.",
        ),
        (
            "Tunel",
            "Connecting Tunnel",
            "Pressurized corridor safely linking the habitat modules.",
        ),
        (
            "TheMuskObservatory_",
            "Musk Observatory",
            "Astronomy facility equipped with high precision optical telescopes.",
        ),
        (
            "TRO",
            "Radio Observation Telescope",
            "Radio telescope for detecting electromagnetic signals from space.",
        ),
        (
            "Panel",
            "Solar Panel",
            "Photovoltaic array generating power for the whole base.",
        ),
    ];

    entries
        .into_iter()
        .map(|(key, title, description)| {
            (
                key.to_owned(),
                ObjectInfo {
                    title: title.to_owned(),
                    description: description.to_owned(),
                },
            )
        })
        .collect()
}

/// Every recognized option of the walkthrough viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub general: GeneralConfig,
    pub render: RenderConfig,
    pub highlight: HighlightConfig,
    pub interaction: InteractionConfig,
    pub movement: MovementConfig,
    pub transition: TransitionConfig,
    pub terrain: TerrainConfig,
    pub tooltip: TooltipConfig,
    pub lights: LightsConfig,
    pub base_floor: BaseFloorConfig,
    pub camera: CameraConfig,
    pub classifier: ClassifierConfig,
    pub hover: HoverConfig,
    pub tour: TourConfig,
    pub generic_names: Vec<String>,
    pub points_of_interest: Vec<PoiConfig>,
    pub object_info: IndexMap<String, ObjectInfo>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            render: RenderConfig::default(),
            highlight: HighlightConfig::default(),
            interaction: InteractionConfig::default(),
            movement: MovementConfig::default(),
            transition: TransitionConfig::default(),
            terrain: TerrainConfig::default(),
            tooltip: TooltipConfig::default(),
            lights: LightsConfig::default(),
            base_floor: BaseFloorConfig::default(),
            camera: CameraConfig::default(),
            classifier: ClassifierConfig::default(),
            hover: HoverConfig::default(),
            tour: TourConfig::default(),
            generic_names: default_generic_names(),
            points_of_interest: default_points_of_interest(),
            object_info: default_object_info(),
        }
    }
}

/// Required sections absent from a raw configuration document.
pub fn missing_sections(value: &serde_json::Value) -> Vec<&'static str> {
    let Some(obj) = value.as_object() else {
        return REQUIRED_SECTIONS.to_vec();
    };
    REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|key| obj.get(*key).is_none_or(|v| v.is_null()))
        .collect()
}

impl ViewerConfig {
    /// Parse a JSON configuration. Missing sections are logged and filled
    /// with defaults so the viewer can still start.
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let mut value: serde_json::Value = serde_json::from_str(json)?;

        let missing = missing_sections(&value);
        if !missing.is_empty() {
            tracing::error!("configuration is missing sections: {:?}", missing);
        }

        // a null section counts as missing; serde only defaults absent keys
        if let Some(obj) = value.as_object_mut() {
            obj.retain(|_, v| !v.is_null());
        }

        Ok(serde_json::from_value(value)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::info!("loading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            start_position: Vec3::from_array(self.camera.start_position),
            eye_height: self.movement.eye_height,
            mouse_sensitivity: self.movement.mouse_sensitivity,
            pitch_min: self.camera.pitch_min,
            pitch_max: self.camera.pitch_max,
            fov_y_degrees: self.camera.fov,
            znear: self.camera.near,
            zfar: self.camera.far,
            easing: self.transition.easing,
        }
    }

    /// Descriptive info keyed by exact authored name.
    pub fn info_for(&self, name: &str) -> Option<&ObjectInfo> {
        self.object_info.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults_carry_authored_tour() {
        let cfg = ViewerConfig::default();
        assert_eq!(cfg.points_of_interest.len(), 8);
        assert_eq!(cfg.points_of_interest[0], PoiConfig::new("PTO", -20.0, -5.0));
        assert_eq!(cfg.info_for("Panel").map(|i| i.title.as_str()), Some("Solar Panel"));
        assert_eq!(cfg.tour.auto_advance_interval, 6.0);
        assert_eq!(cfg.hover.max_candidates, 30);
    }

    #[test]
    fn missing_sections_are_reported_and_defaulted() {
        let json = r#"{ "interaction": { "min_interactive_size": 2.5 } }"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        let missing = missing_sections(&value);
        assert!(missing.contains(&"camera"));
        assert!(!missing.contains(&"interaction"));

        let cfg = ViewerConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.interaction.min_interactive_size, 2.5);
        assert_eq!(cfg.interaction.min_group_mesh_count, 3);
        assert_eq!(cfg.transition.duration, 0.9);
    }

    #[test]
    fn null_sections_are_defaulted_and_the_rest_applies() {
        let json = r#"{ "camera": null, "interaction": { "min_interactive_size": 2.5 } }"#;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert!(missing_sections(&value).contains(&"camera"));

        let cfg = ViewerConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.interaction.min_interactive_size, 2.5);
        assert_eq!(cfg.camera.fov, CameraConfig::default().fov);
    }

    #[test]
    fn easing_is_named() {
        let cfg =
            ViewerConfig::from_json_str(r#"{ "transition": { "easing": "linear" } }"#).unwrap();
        assert_eq!(cfg.transition.easing, Easing::Linear);
        assert_eq!(cfg.camera_settings().easing, Easing::Linear);
    }

    #[test]
    fn invalid_terrain_pattern_falls_back() {
        let terrain = TerrainConfig {
            pattern: "(unclosed".to_owned(),
            ..Default::default()
        };
        let re = terrain.regex();
        assert!(re.is_match("Big_GROUND_01"));
    }

    #[test]
    fn terrain_pattern_is_case_insensitive() {
        let re = TerrainConfig::default().regex();
        assert!(re.is_match("TerrainPlatform"));
        assert!(re.is_match("MAPA"));
        assert!(!re.is_match("TheHab"));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "points_of_interest": [ {{ "name": "Dock", "x": 1.0, "z": 2.0 }} ] }}"#
        )
        .unwrap();
        let cfg = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(cfg.points_of_interest, vec![PoiConfig::new("Dock", 1.0, 2.0)]);
        assert_eq!(cfg.object_info.len(), 8);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ViewerConfig::from_json_str("{ not json"),
            Err(Error::Json(_))
        ));
    }
}
