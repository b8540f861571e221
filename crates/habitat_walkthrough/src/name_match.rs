/// Canonical comparison key for object names: lowercase, trimmed, with all
/// whitespace removed.
pub fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Semantic category of an object name, in priority order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NameClass {
    Terrain,
    Panel,
    Forced,
    Preferred,
    Generic,
}

/// Everything the matcher knows about a single name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameDebugInfo {
    pub original: String,
    pub normalized: String,
    pub class: Option<NameClass>,
    pub is_generic: bool,
    pub is_terrain: bool,
    pub is_panel: bool,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

/// Substring/equality rules over normalized names. Pattern lists are
/// mutable at runtime.
#[derive(Debug, Clone)]
pub struct NameMatcher {
    forced: Vec<String>,
    preferred: Vec<String>,
    panel: Vec<String>,
    terrain: Vec<String>,
    generic: Vec<String>,
}

impl Default for NameMatcher {
    fn default() -> Self {
        Self::new(owned(&[
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
        ]))
    }
}

impl NameMatcher {
    /// Matcher with the built-in group patterns and the given generic names.
    pub fn new(generic_names: Vec<String>) -> Self {
        Self {
            forced: owned(&[
                "themuskobservatory",
                "tro",
                "pto",
                "tunel",
                "thehab",
                "greenhab",
                "panel",
                "ram2",
            ]),
            preferred: owned(&[
                "themuskobservatory",
                "muskobservatory",
                "observatory",
                "observatorio",
                "cartel",
                "info",
                "informacion",
                "sign",
                "poster",
                "board",
                "thehab",
                "greenhab",
                "hab2",
                "ram2",
                "tunel",
                "tunnel",
                "tro",
                "pto",
            ]),
            panel: owned(&["panel"]),
            terrain: owned(&["mapa", "terrain"]),
            generic: generic_names.iter().map(|g| normalize(g)).collect(),
        }
    }

    fn contains_any(patterns: &[String], name: &str) -> bool {
        let n = normalize(name);
        patterns.iter().any(|p| n.contains(p.as_str()))
    }

    pub fn is_generic_name(&self, name: &str) -> bool {
        let n = normalize(name);
        n.is_empty() || self.generic.iter().any(|g| n.contains(g.as_str()))
    }

    pub fn is_terrain_name(&self, name: &str) -> bool {
        Self::contains_any(&self.terrain, name)
    }

    pub fn is_exact_panel(&self, name: &str) -> bool {
        let n = normalize(name);
        self.panel.iter().any(|p| *p == n)
    }

    pub fn matches_forced_group(&self, name: &str) -> bool {
        Self::contains_any(&self.forced, name)
    }

    pub fn matches_preferred_group(&self, name: &str) -> bool {
        Self::contains_any(&self.preferred, name)
    }

    /// Highest-priority class that applies:
    /// terrain > panel > forced > preferred > generic.
    pub fn classify(&self, name: &str) -> Option<NameClass> {
        if self.is_terrain_name(name) {
            Some(NameClass::Terrain)
        } else if self.is_exact_panel(name) {
            Some(NameClass::Panel)
        } else if self.matches_forced_group(name) {
            Some(NameClass::Forced)
        } else if self.matches_preferred_group(name) {
            Some(NameClass::Preferred)
        } else if self.is_generic_name(name) {
            Some(NameClass::Generic)
        } else {
            None
        }
    }

    fn add_pattern(list: &mut Vec<String>, pattern: &str) {
        // patterns are compared against normalized names
        let p = normalize(pattern);
        if !p.is_empty() && !list.contains(&p) {
            list.push(p);
        }
    }

    pub fn add_forced_pattern(&mut self, pattern: &str) {
        Self::add_pattern(&mut self.forced, pattern);
    }

    pub fn add_preferred_pattern(&mut self, pattern: &str) {
        Self::add_pattern(&mut self.preferred, pattern);
    }

    pub fn describe(&self, name: &str) -> NameDebugInfo {
        NameDebugInfo {
            original: name.to_owned(),
            normalized: normalize(name),
            class: self.classify(name),
            is_generic: self.is_generic_name(name),
            is_terrain: self.is_terrain_name(name),
            is_panel: self.is_exact_panel(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_strips_and_lowers() {
        assert_eq!(normalize("  Green Hab2 "), "greenhab2");
        assert_eq!(normalize("The\tMusk\nObservatory"), "themuskobservatory");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["  Green Hab2 ", "TheHab_Wall", "ÄBC d", "", " \t "] {
            let once = normalize(name);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn terrain_beats_panel() {
        let m = NameMatcher::default();
        assert_eq!(m.classify("TerrainPanel"), Some(NameClass::Terrain));
        assert_eq!(m.classify("Mapa"), Some(NameClass::Terrain));
    }

    #[test]
    fn panel_needs_exact_match() {
        let m = NameMatcher::default();
        assert_eq!(m.classify(" Panel "), Some(NameClass::Panel));
        // substring still hits the forced list
        assert_eq!(m.classify("Panel_07"), Some(NameClass::Forced));
    }

    #[test]
    fn priority_order() {
        let m = NameMatcher::default();
        assert_eq!(m.classify("TheHab"), Some(NameClass::Forced));
        assert_eq!(m.classify("InfoBoard"), Some(NameClass::Preferred));
        assert_eq!(m.classify("Cube.001"), Some(NameClass::Generic));
        assert_eq!(m.classify(""), Some(NameClass::Generic));
        assert_eq!(m.classify("Antenna"), None);
    }

    #[test]
    fn runtime_patterns_dedupe() {
        let mut m = NameMatcher::default();
        m.add_forced_pattern("Antenna");
        m.add_forced_pattern("antenna");
        assert_eq!(m.forced.iter().filter(|p| *p == "antenna").count(), 1);
        assert_eq!(m.classify("Big Antenna"), Some(NameClass::Forced));

        m.add_preferred_pattern("Dish");
        assert_eq!(m.classify("dish_01"), Some(NameClass::Preferred));
    }

    #[test]
    fn runtime_patterns_are_normalized() {
        let mut m = NameMatcher::default();
        m.add_forced_pattern(" Solar Array ");
        m.add_forced_pattern("   ");
        assert!(m.forced.contains(&"solararray".to_owned()));
        assert!(!m.forced.iter().any(String::is_empty));
        assert_eq!(m.classify("Solar Array North"), Some(NameClass::Forced));
        assert_eq!(m.classify("rover"), None);
    }

    #[test]
    fn describe_reports_flags() {
        let m = NameMatcher::default();
        let info = m.describe("Terrain Mesh");
        assert_eq!(info.normalized, "terrainmesh");
        assert_eq!(info.class, Some(NameClass::Terrain));
        assert!(info.is_generic);
        assert!(info.is_terrain);
        assert!(!info.is_panel);
    }
}
