//! Geographic regions and scene-to-region resolution.
//!
//! Scenes are mapped to regions through area families: each family owns a
//! list of keywords, and the first keyword contained in a scene name decides
//! the family. Results are memoized per scene, including misses.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

/// World region targeted by region constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[allow(missing_docs)]
    Abrassar,
    #[allow(missing_docs)]
    AntiquePlateau,
    #[allow(missing_docs)]
    Caldera,
    #[allow(missing_docs)]
    Chersonese,
    #[allow(missing_docs)]
    EnmerkarForest,
    #[allow(missing_docs)]
    HallowedMarsh,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Abrassar => "Abrassar",
            Self::AntiquePlateau => "AntiquePlateau",
            Self::Caldera => "Caldera",
            Self::Chersonese => "Chersonese",
            Self::EnmerkarForest => "EnmerkarForest",
            Self::HallowedMarsh => "HallowedMarsh",
        };
        f.write_str(name)
    }
}

/// A family of scenes sharing a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaFamily {
    /// Family name (usually the region's main town).
    pub name: String,
    /// Substrings identifying scenes of this family.
    pub keywords: Vec<String>,
    /// Region the family belongs to, if any.
    pub region: Option<Region>,
}

impl AreaFamily {
    fn new(name: &str, keywords: &[&str], region: Region) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            region: Some(region),
        }
    }
}

/// The built-in family table.
#[must_use]
pub fn default_area_families() -> Vec<AreaFamily> {
    vec![
        AreaFamily::new("Cierzo", &["Cierzo", "Chersonese", "Vendavel"], Region::Chersonese),
        AreaFamily::new("Berg", &["Berg", "Emercar", "Enmerkar"], Region::EnmerkarForest),
        AreaFamily::new(
            "Monsoon",
            &["Monsoon", "HallowedMarsh", "Hallowed"],
            Region::HallowedMarsh,
        ),
        AreaFamily::new("Levant", &["Levant", "Abrassar"], Region::Abrassar),
        AreaFamily::new("Harmattan", &["Harmattan", "AntiqueField"], Region::AntiquePlateau),
        AreaFamily::new("Sirocco", &["Sirocco", "Caldera"], Region::Caldera),
    ]
}

/// Memoizing scene-to-region resolver.
#[derive(Debug)]
pub struct RegionResolver {
    families: Vec<AreaFamily>,
    cache: RwLock<HashMap<String, Option<Region>>>,
}

impl Default for RegionResolver {
    fn default() -> Self {
        Self::new(default_area_families())
    }
}

impl RegionResolver {
    /// Creates a resolver over a custom family table.
    #[must_use]
    pub fn new(families: Vec<AreaFamily>) -> Self {
        Self {
            families,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the region of `scene`, or `None` when no family claims it.
    pub fn region_of(&self, scene: &str) -> Option<Region> {
        if let Ok(cache) = self.cache.read() {
            if let Some(region) = cache.get(scene) {
                return *region;
            }
        }

        let region = self.scan(scene);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(scene.to_string(), region);
        }
        region
    }

    /// Number of memoized scenes.
    #[must_use]
    pub fn cached_scenes(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Forgets all memoized scenes.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    fn scan(&self, scene: &str) -> Option<Region> {
        // Region-less families are skipped so a later family can still claim the scene.
        self.families
            .iter()
            .filter(|family| family.keywords.iter().any(|k| scene.contains(k.as_str())))
            .find_map(|family| family.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_scene_by_keyword() {
        let resolver = RegionResolver::default();
        assert_eq!(resolver.region_of("CierzoNewTerrain"), Some(Region::Chersonese));
        assert_eq!(resolver.region_of("Abrassar"), Some(Region::Abrassar));
        assert_eq!(resolver.region_of("NewSirocco"), Some(Region::Caldera));
    }

    #[test]
    fn misses_are_cached() {
        let resolver = RegionResolver::default();
        assert_eq!(resolver.region_of("MainMenu"), None);
        assert_eq!(resolver.region_of("MainMenu"), None);
        assert_eq!(resolver.cached_scenes(), 1);

        resolver.clear();
        assert_eq!(resolver.cached_scenes(), 0);
    }

    #[test]
    fn family_without_region_falls_through_to_later_family() {
        let resolver = RegionResolver::new(vec![
            AreaFamily {
                name: "Tutorial".to_string(),
                keywords: vec!["Tutorial".to_string()],
                region: None,
            },
            AreaFamily::new("Cierzo", &["Cierzo"], Region::Chersonese),
        ]);
        assert_eq!(resolver.region_of("CierzoTutorial"), Some(Region::Chersonese));
        assert_eq!(resolver.region_of("Tutorial"), None);
    }
}
