//! Load engine configuration from TOML
//!
//! The raw serde shapes mirror the on-disk format; compilation turns them
//! into the immutable lookup tables the engine evaluates against.
//! Malformed items (bad rule lines, unknown flags, unparseable schedule
//! entries) are logged and dropped; a load only fails when the file
//! itself cannot be read or is not TOML.

use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::options::EngineOptions;
use crate::rules::flags::{RuleFlag, RuleFlags};
use crate::rules::group::EntityGroup;
use crate::rules::ruleset::RuleSet;
use crate::schedule::Schedule;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawRuleSet {
    name: String,
    enabled: Option<bool>,
    default_allow_damage: bool,
    flags: Vec<String>,
    rules: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawGroup {
    name: String,
    members: String,
    exclusions: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawSchedule {
    enabled: bool,
    use_realtime: bool,
    broadcast: bool,
    entries: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawConfig {
    default_ruleset: String,
    options: EngineOptions,
    mappings: AHashMap<String, String>,
    schedule: RawSchedule,
    rulesets: Vec<RawRuleSet>,
    groups: Vec<RawGroup>,
}

/// Compiled engine configuration: immutable during steady-state
/// evaluation, replaced wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct WardenConfig {
    pub default_ruleset: String,
    pub options: EngineOptions,
    pub mappings: AHashMap<String, String>,
    pub schedule: Schedule,
    pub rulesets: Vec<RuleSet>,
    pub groups: Vec<EntityGroup>,
}

impl WardenConfig {
    pub fn load(path: &Path) -> Result<WardenConfig> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<WardenConfig> {
        let raw: RawConfig = toml::from_str(content)?;
        Ok(compile(raw))
    }

    /// Look up a rule set by name, case-insensitively.
    pub fn ruleset(&self, name: &str) -> Option<&RuleSet> {
        self.rulesets
            .iter()
            .find(|set| set.name.eq_ignore_ascii_case(name))
    }

    pub fn default_ruleset(&self) -> Option<&RuleSet> {
        self.ruleset(&self.default_ruleset)
    }

    /// The deny-everything set installed when the asymmetric-zoning
    /// override redirects a decision.
    pub fn dud_ruleset() -> RuleSet {
        let mut set = RuleSet::new("override");
        set.flags.set(RuleFlag::HumanNpcDamage);
        set.default_allow_damage = false;
        set
    }

    /// Stock configuration: the classic PVE baseline with one default
    /// rule set and the standard entity groups.
    pub fn default_config() -> WardenConfig {
        let mut raw = RawConfig {
            default_ruleset: "default".to_string(),
            ..RawConfig::default()
        };

        raw.mappings
            .insert("default".to_string(), "default".to_string());

        for (name, members, exclusions) in DEFAULT_GROUPS {
            raw.groups.push(RawGroup {
                name: name.to_string(),
                members: members.to_string(),
                exclusions: exclusions.to_string(),
            });
        }

        raw.rulesets.push(RawRuleSet {
            name: "default".to_string(),
            enabled: Some(true),
            default_allow_damage: false,
            flags: [
                "HumanNpcDamage",
                "LockedBoxesImmortal",
                "LockedDoorsImmortal",
                "PlayerSamSitesIgnorePlayers",
                "TrapsIgnorePlayers",
                "TurretsIgnorePlayers",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rules: DEFAULT_RULES.iter().map(|s| s.to_string()).collect(),
        });

        compile(raw)
    }
}

fn compile(raw: RawConfig) -> WardenConfig {
    let default_ruleset = if raw.default_ruleset.is_empty() {
        tracing::info!("no default rule set configured; using \"default\"");
        "default".to_string()
    } else {
        raw.default_ruleset
    };

    let mut rulesets = Vec::with_capacity(raw.rulesets.len());
    for raw_set in raw.rulesets {
        if raw_set.name.is_empty() {
            tracing::warn!("dropping rule set with empty name");
            continue;
        }
        if rulesets
            .iter()
            .any(|existing: &RuleSet| existing.name.eq_ignore_ascii_case(&raw_set.name))
        {
            tracing::warn!(name = %raw_set.name, "dropping duplicate rule set");
            continue;
        }

        let mut set = RuleSet::new(raw_set.name);
        set.enabled = raw_set.enabled.unwrap_or(true);
        set.default_allow_damage = raw_set.default_allow_damage;

        let (flags, unknown) = RuleFlags::parse_names(raw_set.flags.iter().map(|s| s.as_str()));
        for name in unknown {
            tracing::warn!(ruleset = %set.name, flag = %name, "ignoring unknown flag");
        }
        set.flags = flags;

        for rule_text in &raw_set.rules {
            if !set.add_rule(rule_text) {
                tracing::warn!(ruleset = %set.name, rule = %rule_text, "dropping invalid rule");
            }
        }

        rulesets.push(set);
    }

    let mut groups = Vec::with_capacity(raw.groups.len());
    for (index, raw_group) in raw.groups.into_iter().enumerate() {
        let name = if raw_group.name.is_empty() {
            format!("group{index}")
        } else {
            raw_group.name
        };
        let group = EntityGroup::new(name)
            .with_members(&raw_group.members)
            .with_exclusions(&raw_group.exclusions);
        groups.push(group);
    }

    // Every rule set is reachable through the mapping table so zone
    // mappings can target it by name.
    let mut mappings = raw.mappings;
    for set in &rulesets {
        if !mappings.values().any(|v| v.eq_ignore_ascii_case(&set.name)) {
            mappings.insert(set.name.clone(), set.name.clone());
        }
    }

    let schedule = Schedule::compile(
        raw.schedule.enabled,
        raw.schedule.use_realtime,
        raw.schedule.broadcast,
        &raw.schedule.entries,
    );
    if raw.schedule.enabled && !schedule.valid {
        tracing::warn!("schedule configured but not valid; disabling");
    }

    WardenConfig {
        default_ruleset,
        options: raw.options,
        mappings,
        schedule,
        rulesets,
        groups,
    }
}

/// Stock entity groups: (name, members, exclusions).
const DEFAULT_GROUPS: &[(&str, &str, &str)] = &[
    (
        "barricades",
        "door_barricade_a, door_barricade_a_large, door_barricade_b, door_barricade_dbl_a, \
         door_barricade_dbl_a_large, door_barricade_dbl_b, door_barricade_dbl_b_large",
        "barricade.concrete, barricade.sandbags, barricade.stone",
    ),
    (
        "barricades2",
        "spikes_static, barricade.metal, barricade.wood, barricade.woodwire, spikes.floor, icewall",
        "",
    ),
    (
        "dispensers",
        "BaseCorpse, HelicopterDebris, PlayerCorpse, NPCPlayerCorpse, HorseCorpse",
        "",
    ),
    (
        "fire",
        "FireBall, FlameExplosive, FlameThrower, BaseOven, FlameTurret, rocket_heli_napalm, napalm",
        "",
    ),
    (
        "guards",
        "bandit_guard, scientistpeacekeeper, sentry.scientist.static, sentry.bandit.static",
        "",
    ),
    ("heli", "PatrolHelicopter", ""),
    (
        "highwalls",
        "SimpleBuildingBlock, wall.external.high.ice, gates.external.high.stone, \
         gates.external.high.wood",
        "",
    ),
    ("ridablehorses", "RidableHorse", ""),
    (
        "cars",
        "BasicCar, ModularCar, BaseModularVehicle, BaseVehicleModule, VehicleModuleEngine, \
         VehicleModuleSeating, VehicleModuleStorage, ModularCarSeat",
        "",
    ),
    ("mini", "minicopter.entity", ""),
    ("scrapheli", "ScrapTransportHelicopter", ""),
    ("ch47", "ch47.entity", ""),
    (
        "npcs",
        "ch47scientists.entity, BradleyAPC, CustomScientistNpc, ScarecrowNPC, HumanNPC, \
         NPCPlayer, ScientistNPC, TunnelDweller, UnderwaterDweller, ZombieNPC",
        "",
    ),
    ("players", "BasePlayer, FrankensteinPet", ""),
    (
        "resources",
        "ResourceEntity, TreeEntity, OreResourceEntity, LootContainer",
        "hobobarrel.deployed",
    ),
    ("snowmobiles", "snowmobile, tomahasnowmobile", ""),
    (
        "traps",
        "AutoTurret, BearTrap, FlameTurret, Landmine, GunTrap, ReactiveTarget, TeslaCoil, \
         spikes.floor",
        "",
    ),
    ("junkyard", "magnetcrane.entity, carshredder.entity", ""),
    ("tugboats", "Tugboat", ""),
    ("heliturrets", "turret_attackheli", ""),
    ("siege", "SiegeTower, Catapult, Ballista, BallistaGun, BatteringRam", ""),
    ("farm", "simplechicken.entity, FarmableAnimal, ChickenCoop", ""),
];

/// Stock rule lines for the default rule set.
const DEFAULT_RULES: &[&str] = &[
    "anything can hurt dispensers",
    "anything can hurt resources",
    "anything can hurt barricades",
    "anything can hurt traps",
    "anything can hurt heli",
    "anything can hurt npcs",
    "anything can hurt players",
    "nothing can hurt ch47",
    "nothing can hurt cars",
    "nothing can hurt mini",
    "nothing can hurt snowmobiles",
    "nothing can hurt ridablehorses",
    "cars cannot hurt anything",
    "mini cannot hurt anything",
    "ch47 cannot hurt anything",
    "scrapheli cannot hurt anything",
    "players cannot hurt players",
    "players cannot hurt traps",
    "guards cannot hurt players",
    "fire cannot hurt players",
    "traps cannot hurt players",
    "highwalls cannot hurt players",
    "barricades2 cannot hurt players",
    "mini cannot hurt mini",
    "npcs can hurt players",
    "junkyard cannot hurt anything",
    "junkyard can hurt cars",
    "players cannot hurt tugboats",
    "heliturrets cannot hurt players",
    "siege cannot hurt players",
    "players cannot hurt farm",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::flags::RuleFlag;

    const SAMPLE: &str = r#"
default_ruleset = "default"

[options]
handle_damage = true
use_zones = true

[mappings]
arena_zone = "arena"
quiet_zone = "exclude"

[schedule]
enabled = true
use_realtime = false
broadcast = true
entries = ["00:00 default Quiet hours", "12:00 arena PVP hours"]

[[rulesets]]
name = "default"
default_allow_damage = false
flags = ["SelfDamage", "SamSitesIgnorePlayers", "BogusFlag"]
rules = [
    "anything can hurt players",
    "players cannot hurt players",
    "broken rule",
]

[[rulesets]]
name = "arena"
default_allow_damage = true
rules = ["players can hurt players"]

[[groups]]
name = "players"
members = "BasePlayer"

[[groups]]
name = ""
members = "FireBall"
"#;

    #[test]
    fn test_sample_config_compiles() {
        let config = WardenConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.default_ruleset, "default");
        assert_eq!(config.rulesets.len(), 2);
        assert_eq!(config.groups.len(), 2);
        assert!(config.schedule.valid);
        assert!(config.schedule.enabled);
    }

    #[test]
    fn test_invalid_rule_dropped() {
        let config = WardenConfig::from_toml_str(SAMPLE).unwrap();
        let default = config.ruleset("default").unwrap();
        assert_eq!(default.rule_count(), 2);
    }

    #[test]
    fn test_unknown_flag_dropped_known_kept() {
        let config = WardenConfig::from_toml_str(SAMPLE).unwrap();
        let default = config.ruleset("default").unwrap();
        assert!(default.has_flag(RuleFlag::SelfDamage));
        // Deprecated spelling expanded by the compatibility table.
        assert!(default.has_flag(RuleFlag::PlayerSamSitesIgnorePlayers));
        assert!(default.has_flag(RuleFlag::StaticSamSitesIgnorePlayers));
    }

    #[test]
    fn test_unnamed_group_gets_generated_name() {
        let config = WardenConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.groups[1].name, "group1");
    }

    #[test]
    fn test_identity_mappings_added_for_rulesets() {
        let config = WardenConfig::from_toml_str(SAMPLE).unwrap();
        // "arena" already appears as a mapping value; "default" does not
        // and gets an identity entry.
        assert_eq!(
            config.mappings.get("default").map(|s| s.as_str()),
            Some("default")
        );
        assert!(!config.mappings.contains_key("arena"));
    }

    #[test]
    fn test_reload_is_idempotent() {
        let a = WardenConfig::from_toml_str(SAMPLE).unwrap();
        let b = WardenConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(a.rulesets.len(), b.rulesets.len());
        for (x, y) in a.rulesets.iter().zip(&b.rulesets) {
            assert_eq!(x.name, y.name);
            assert_eq!(x.rule_count(), y.rule_count());
            assert_eq!(x.flags, y.flags);
        }
        assert_eq!(a.mappings, b.mappings);
        assert_eq!(a.schedule.entries, b.schedule.entries);
    }

    #[test]
    fn test_empty_input_compiles_to_empty_config() {
        let config = WardenConfig::from_toml_str("").unwrap();
        assert_eq!(config.default_ruleset, "default");
        assert!(config.rulesets.is_empty());
        assert!(config.ruleset("default").is_none());
    }

    #[test]
    fn test_duplicate_ruleset_names_dropped() {
        let config = WardenConfig::from_toml_str(
            r#"
[[rulesets]]
name = "default"
rules = ["a can hurt b"]

[[rulesets]]
name = "Default"
rules = ["c can hurt d"]
"#,
        )
        .unwrap();
        assert_eq!(config.rulesets.len(), 1);
        assert_eq!(config.rulesets[0].rule_count(), 1);
    }

    #[test]
    fn test_default_config_is_well_formed() {
        let config = WardenConfig::default_config();
        let default = config.default_ruleset().unwrap();
        assert!(default.enabled);
        assert!(!default.is_empty());
        assert!(default.has_flag(RuleFlag::TurretsIgnorePlayers));
        assert!(default.rule("players->players").is_some());
        assert!(config.groups.iter().any(|g| g.name == "players"));
    }

    #[test]
    fn test_dud_ruleset_denies_by_default() {
        let dud = WardenConfig::dud_ruleset();
        assert!(!dud.default_allow_damage);
        assert!(dud.has_flag(RuleFlag::HumanNpcDamage));
        assert!(!dud.evaluate(&["a".to_string()], &["b".to_string()], true));
    }
}
