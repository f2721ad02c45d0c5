//! Zone mapping and exclusion resolution
//!
//! Zones are opaque location names supplied by the host's zone provider.
//! The mapping table associates a location (or rule-set name) with either
//! a rule-set or the reserved target `"exclude"`; the reserved key
//! `"allzones"` applies to every location without a specific mapping.
//! Exclusion lookups run on a set precompiled at load time.

use ahash::{AHashMap, AHashSet};

use crate::rules::group::EntityGroup;
use crate::rules::ruleset::RuleSet;

/// Reserved mapping target marking a location as excluded from handling.
pub const EXCLUDE: &str = "exclude";
/// Reserved mapping key covering all locations.
pub const ALL_ZONES: &str = "allzones";

/// Result of resolving which rule set governs a pair of location lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneResolution {
    /// Use the engine's current global rule set.
    Current,
    /// Use the deny-everything dud set (asymmetric zoning override).
    Dud,
    /// Use the named rule set.
    Named(String),
}

/// Compiled view of the mapping table.
///
/// Rebuilt whenever mappings or rule sets change; immutable in between.
#[derive(Debug, Clone, Default)]
pub struct ZoneResolver {
    /// Lowercased mapping key -> configured target.
    mappings: AHashMap<String, String>,
    /// Lowercased name -> canonical name of every enabled rule set.
    ruleset_names: AHashMap<String, String>,
    /// Locations whose mapping excludes them from damage handling.
    exclusion_locations: AHashSet<String>,
    exclude_all_zones: bool,
    asymmetric_dud: bool,
}

impl ZoneResolver {
    pub fn build(
        mappings: &AHashMap<String, String>,
        rulesets: &[RuleSet],
        groups: &[EntityGroup],
        asymmetric_dud: bool,
    ) -> Self {
        let lowered: AHashMap<String, String> = mappings
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();

        let ruleset_names: AHashMap<String, String> = rulesets
            .iter()
            .filter(|set| set.enabled)
            .map(|set| (set.name.to_ascii_lowercase(), set.name.clone()))
            .collect();

        let exclude_all_zones = lowered
            .get(ALL_ZONES)
            .is_some_and(|target| target.eq_ignore_ascii_case(EXCLUDE));

        let mut exclusion_locations = AHashSet::new();
        if !exclude_all_zones {
            for (key, target) in &lowered {
                if target.eq_ignore_ascii_case(EXCLUDE) {
                    exclusion_locations.insert(key.clone());
                    continue;
                }
                // A zone mapped to an empty rule set is pass-through.
                let target_lower = target.to_ascii_lowercase();
                if rulesets
                    .iter()
                    .any(|set| set.name.to_ascii_lowercase() == target_lower && set.is_empty())
                {
                    exclusion_locations.insert(key.clone());
                }
            }
            for group in groups {
                for tag in group.exclusion_tags() {
                    let trimmed = tag.trim();
                    if !trimmed.is_empty() {
                        exclusion_locations.insert(trimmed.to_ascii_lowercase());
                    }
                }
            }
        }

        Self {
            mappings: lowered,
            ruleset_names,
            exclusion_locations,
            exclude_all_zones,
            asymmetric_dud,
        }
    }

    pub fn mapping(&self, location: &str) -> Option<&str> {
        self.mappings
            .get(&location.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    /// A location is mapped when it has a specific entry or the table
    /// carries an `allzones` fallback.
    pub fn has_mapping(&self, location: &str) -> bool {
        self.mappings.contains_key(&location.to_ascii_lowercase())
            || self.mappings.contains_key(ALL_ZONES)
    }

    pub fn exclude_all_zones(&self) -> bool {
        self.exclude_all_zones
    }

    /// Intersection of both location lists, restricted to mapped
    /// locations, preserving the first list's order.
    pub fn shared_locations(&self, a: &[String], b: &[String]) -> Vec<String> {
        if a.is_empty() || b.is_empty() {
            return Vec::new();
        }
        a.iter()
            .filter(|loc| {
                b.iter().any(|other| other.eq_ignore_ascii_case(loc)) && self.has_mapping(loc)
            })
            .cloned()
            .collect()
    }

    /// Whether a location pair falls in excluded territory: the global
    /// all-zones exclusion, or any shared location in the precompiled
    /// exclusion set.
    pub fn is_excluded(&self, a: &[String], b: &[String]) -> bool {
        if self.exclude_all_zones {
            return true;
        }
        self.shared_locations(a, b)
            .iter()
            .any(|loc| self.exclusion_locations.contains(&loc.to_ascii_lowercase()))
    }

    /// Whether one location list alone touches excluded territory.
    pub fn location_excluded(&self, locations: &[String]) -> bool {
        if self.exclude_all_zones {
            return true;
        }
        locations
            .iter()
            .any(|loc| match self.mapping(loc) {
                Some(target) => target.eq_ignore_ascii_case(EXCLUDE),
                None => false,
            })
    }

    /// Resolve the rule set governing this location pair.
    ///
    /// Either side without locations falls back to the current global
    /// set (or the dud set under the asymmetric override). Shared
    /// locations resolve through the mapping table, with `allzones` as
    /// the fallback; multiple distinct matches log a warning and pick the
    /// lexicographically smallest name so reloads stay deterministic.
    pub fn resolve(&self, victim: &[String], attacker: &[String]) -> ZoneResolution {
        let has_victim = !victim.is_empty();
        let has_attacker = !attacker.is_empty();

        if self.asymmetric_dud && (has_victim ^ has_attacker) {
            return ZoneResolution::Dud;
        }
        if !has_victim || !has_attacker {
            return ZoneResolution::Current;
        }

        let shared = self.shared_locations(victim, attacker);
        if shared.is_empty() {
            return ZoneResolution::Current;
        }

        let mut names: Vec<&String> = Vec::new();
        for location in &shared {
            if let Some(target) = self.mappings.get(&location.to_ascii_lowercase()) {
                if let Some(canonical) = self.ruleset_names.get(&target.to_ascii_lowercase()) {
                    if !names.contains(&canonical) {
                        names.push(canonical);
                    }
                }
            }
        }

        if names.is_empty() {
            if let Some(target) = self.mappings.get(ALL_ZONES) {
                if let Some(canonical) = self.ruleset_names.get(&target.to_ascii_lowercase()) {
                    names.push(canonical);
                }
            }
        }

        if names.len() > 1 {
            names.sort();
            tracing::warn!(
                rulesets = %names.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "),
                "multiple rule sets mapped for shared locations; using first by name"
            );
        }

        match names.first() {
            Some(name) => ZoneResolution::Named((*name).clone()),
            None => ZoneResolution::Current,
        }
    }
}
