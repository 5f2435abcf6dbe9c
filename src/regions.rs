//! Region registry for the Phoenix flood-hazard map.
//!
//! Defines the named extents the tooling works with. This is the single
//! source of truth for bounding boxes; configuration refers to regions by
//! name rather than repeating coordinates.

use crate::model::BoundingBox;

// ---------------------------------------------------------------------------
// Region metadata
// ---------------------------------------------------------------------------

/// A named geographic extent.
pub struct Region {
    /// Short key used in configuration files and on the command line.
    pub key: &'static str,
    pub bounds: BoundingBox,
}

/// Maricopa County. The DEM is fetched and clipped to this extent, and the
/// map front-end restricts panning to it.
pub const MARICOPA_BOUNDS: BoundingBox = BoundingBox::new(-113.33, 32.55, -111.05, 33.93);

/// Phoenix metro area, matching the extent of the water accumulation layer.
/// Storm events and gauges outside it are not shown as POIs.
pub const PHOENIX_BOUNDS: BoundingBox = BoundingBox::new(-112.35, 33.25, -111.85, 33.75);

pub static REGION_REGISTRY: &[Region] = &[
    Region {
        key: "maricopa",
        bounds: MARICOPA_BOUNDS,
    },
    Region {
        key: "phoenix",
        bounds: PHOENIX_BOUNDS,
    },
];

/// Looks up a region by key, case-insensitively. Returns `None` if not found.
pub fn find_region(key: &str) -> Option<&'static Region> {
    REGION_REGISTRY.iter().find(|r| r.key.eq_ignore_ascii_case(key))
}

pub fn region_keys() -> Vec<&'static str> {
    REGION_REGISTRY.iter().map(|r| r.key).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_registry_bounds_are_valid() {
        for region in REGION_REGISTRY {
            assert!(
                region.bounds.validate().is_ok(),
                "bounds for '{}' should be valid, got {}",
                region.key,
                region.bounds.as_query_param()
            );
        }
    }

    #[test]
    fn test_no_duplicate_region_keys() {
        let mut seen = std::collections::HashSet::new();
        for region in REGION_REGISTRY {
            assert!(seen.insert(region.key), "duplicate region key '{}'", region.key);
        }
    }

    #[test]
    fn test_phoenix_lies_inside_maricopa() {
        // POIs are drawn over the DEM-derived layer, so the POI extent must
        // not reach outside the DEM extent.
        let p = PHOENIX_BOUNDS;
        assert!(MARICOPA_BOUNDS.contains(p.min_lat, p.min_lon));
        assert!(MARICOPA_BOUNDS.contains(p.max_lat, p.max_lon));
    }

    #[test]
    fn test_find_region_is_case_insensitive() {
        let region = find_region("Phoenix").expect("phoenix should be in registry");
        assert_eq!(region.bounds, PHOENIX_BOUNDS);
        assert!(find_region("tucson").is_none());
    }

    #[test]
    fn test_region_keys_match_registry_length() {
        assert_eq!(region_keys().len(), REGION_REGISTRY.len());
    }
}
