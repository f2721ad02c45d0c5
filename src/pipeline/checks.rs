//! Ordered policy checks
//!
//! The decision pipeline is a fixed list of independent checks, each
//! taking the engine and the per-event context and returning
//! Allow/Deny/Continue. The first non-Continue verdict is final; when
//! every check falls through, the engine evaluates the selected rule set
//! over both sides' entity groups. Order is load-bearing: absolute
//! exemptions run before zone exclusion, which runs before every
//! flag-gated special case.

use crate::core::types::{DamageKind, Entity, EntityClass, Verdict};
use crate::pipeline::context::DecisionContext;
use crate::pipeline::engine::DamageEngine;
use crate::rules::flags::RuleFlag;
use crate::rules::ruleset::{RuleMatch, RuleSet};

pub type PolicyCheck = for<'a> fn(&'a DamageEngine, &mut DecisionContext<'a>) -> Verdict;

/// The pipeline, in evaluation order.
pub const CHECKS: &[(&str, PolicyCheck)] = &[
    ("sleeper-allowances", check_sleeper_allowances),
    ("decay", check_decay),
    ("fall-radiation", check_fall_radiation),
    ("zero-damage", check_zero_damage),
    ("scrap-heli", check_scrap_heli),
    ("metabolism", check_metabolism),
    ("animal-victim", check_animal_victim),
    ("fixed-prefabs", check_fixed_prefabs),
    ("zone-resolution", check_zone_resolution),
    ("monument-turret-trap", check_monument_turret_trap),
    ("locked-vehicle", check_locked_vehicle),
    ("patrol-heli-victim", check_patrol_heli_victim),
    ("bradley-initiator", check_bradley_initiator),
    ("driverless-collision", check_driverless_collision),
    ("heli-initiator", check_heli_initiator),
    ("mlrs", check_mlrs),
    ("missing-initiator", check_missing_initiator),
    ("immortal-locks", check_immortal_locks),
    ("samsite-initiator", check_samsite_initiator),
    ("npc-initiator", check_npc_initiator),
    ("static-turret", check_static_turret),
    ("suicide", check_suicide),
    ("self-damage", check_self_damage),
    ("mounted-attacker", check_mounted_attacker),
    ("building-grades", check_building_grades),
    ("player-vs-vehicle", check_player_vs_vehicle),
    ("deployables", check_deployables),
    ("player-vs-player", check_player_vs_player),
    ("authorized-damage", check_authorized_damage),
];

/// The rule set governing this decision: the zone-resolved one once the
/// resolution step has run, the global current set before that.
pub fn effective_ruleset<'a>(
    engine: &'a DamageEngine,
    ctx: &DecisionContext<'a>,
) -> &'a RuleSet {
    ctx.ruleset.unwrap_or_else(|| engine.current_ruleset())
}

/// Resolve both sides' groups and evaluate the governing rule set.
pub fn evaluate_entities(
    engine: &DamageEngine,
    ctx: &mut DecisionContext<'_>,
    attacker: Option<&Entity>,
    use_default_on_miss: bool,
) -> bool {
    let ruleset = effective_ruleset(engine, ctx);
    let attacker_groups = attacker
        .map(|entity| engine.resolve_groups(entity))
        .unwrap_or_default();
    let victim_groups = engine.resolve_groups(ctx.victim());

    if ctx.trace.is_active() {
        ctx.trace.log(
            2,
            format!("Initiator group matches: {}", join_or_none(&attacker_groups)),
        );
        ctx.trace.log(
            2,
            format!("Target group matches: {}", join_or_none(&victim_groups)),
        );
    }

    let (allow, matched) =
        ruleset.evaluate_detailed(&attacker_groups, &victim_groups, use_default_on_miss);

    if ctx.trace.is_active() {
        let detail = match matched {
            RuleMatch::Pairwise(key)
            | RuleMatch::AttackerAny(key)
            | RuleMatch::AnyTarget(key) => format!("matched \"{key}\"; allow damage? {allow}"),
            RuleMatch::Default => format!("no match; default value: {allow}"),
            RuleMatch::FallthroughAllow => "no match; allow and return".to_string(),
        };
        ctx.trace.log(3, detail);
    }

    allow
}

fn join_or_none(groups: &[String]) -> String {
    if groups.is_empty() {
        "none".to_string()
    } else {
        groups.join(", ")
    }
}

/// Whether the damage originates from the patrol helicopter (directly or
/// through its napalm/rocket prefabs).
fn heli_source(ctx: &DecisionContext<'_>) -> bool {
    if let Some(attacker) = ctx.attacker {
        if attacker.class == EntityClass::PatrolHelicopter {
            return true;
        }
        let prefab = attacker.prefab_tag.to_ascii_lowercase();
        if prefab == "oilfireballsmall" || prefab == "napalm" {
            return true;
        }
    }
    if let Some(prefab_entity) = &ctx.event.weapon_prefab {
        let prefab = prefab_entity.prefab_tag.to_ascii_lowercase();
        if prefab == "rocket_heli" || prefab == "rocket_heli_napalm" {
            return true;
        }
    }
    false
}

/// Structures and deployed items that belong to the player economy, as
/// opposed to world loot and NPC gear.
fn is_player_structure(entity: &Entity) -> bool {
    matches!(
        entity.class,
        EntityClass::BuildingBlock
            | EntityClass::Door
            | EntityClass::StorageContainer
            | EntityClass::SleepingBag
            | EntityClass::Campfire
            | EntityClass::Ladder
            | EntityClass::GrowableEntity
            | EntityClass::Mountable
    ) || entity.prefab_tag.to_ascii_lowercase().contains("building")
}

/// Locked-box/door immortality, shared between the helicopter path and
/// the plain check. `None` means no lock applies and checks continue.
fn immortal_lock(ctx: &DecisionContext<'_>) -> Option<Verdict> {
    let flags = ctx.flags();
    let victim = ctx.victim();

    let boxes = flags.contains(RuleFlag::LockedBoxesImmortal)
        && victim.class == EntityClass::StorageContainer;
    let doors =
        flags.contains(RuleFlag::LockedDoorsImmortal) && victim.class == EntityClass::Door;
    if !boxes && !doors {
        return None;
    }

    if flags.contains(RuleFlag::ExcludeVesselFromImmortalFlags)
        && victim.parent_class() == Some(EntityClass::Vessel)
    {
        return Some(Verdict::Allow);
    }

    if !victim.locked {
        return None;
    }

    // A locked target is immortal, unless HeliDamageLocked carves out
    // helicopter damage.
    if !flags.contains(RuleFlag::HeliDamageLocked) || flags.contains(RuleFlag::NoHeliDamage) {
        return Some(Verdict::Deny);
    }
    if heli_source(ctx) {
        Some(Verdict::Allow)
    } else {
        Some(Verdict::Deny)
    }
}

fn check_sleeper_allowances(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let victim = ctx.victim();
    if !victim.is_real_player() || !victim.is_sleeping() {
        return Verdict::Continue;
    }
    let sleepers = &engine.options().sleepers;
    if !sleepers.any() {
        return Verdict::Continue;
    }

    let attacker_id = ctx
        .attacker
        .filter(|a| a.is_real_player())
        .and_then(|a| a.player_id());

    if let Some(attacker_id) = attacker_id {
        if sleepers.authorization_only {
            if let Some(attacker) = ctx.attacker {
                if engine.is_privileged(victim, attacker_id)
                    || engine.is_privileged(attacker, attacker_id)
                {
                    ctx.trace
                        .log(1, "Attacker authorized on sleeper's base; allow and return");
                    return Verdict::Allow;
                }
            }
        }
        if sleepers.allowed_ids.contains(&attacker_id.0) {
            ctx.trace
                .log(1, "Attacker on sleeper-kill allow list; allow and return");
            return Verdict::Allow;
        }
        if sleepers.ally_only {
            if let Some(victim_id) = victim.player_id() {
                if engine.is_ally(victim_id, attacker_id) {
                    ctx.trace
                        .log(1, "Attacker allied with sleeper; allow and return");
                    return Verdict::Allow;
                }
            }
        }
    }

    if sleepers.allow_killing {
        ctx.trace.log(1, "Sleeper killing enabled; allow and return");
        return Verdict::Allow;
    }

    if sleepers.hours_offline > 0.0 {
        if let Some(attacker_id) = attacker_id {
            let (killable, hours_left) = engine.offline_window(victim);
            if killable {
                ctx.trace
                    .log(1, "Sleeper exceeds allowed offline time; allow and return");
                return Verdict::Allow;
            }
            if hours_left > 0.0 && ctx.damage_kind != DamageKind::Heat {
                engine.message_throttled(
                    attacker_id,
                    &format!(
                        "You must wait another {:.2} hours to attack this player.",
                        hours_left
                    ),
                );
            }
        }
    }

    Verdict::Continue
}

fn check_decay(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.damage_kind != DamageKind::Decay {
        return Verdict::Continue;
    }
    if ctx.victim().class.is_vehicle() && engine.options().block_decay_to_vehicles {
        ctx.trace
            .log(1, "Decay damage to vehicle blocked by config; block and return");
        return Verdict::Deny;
    }
    ctx.trace.log(1, "Decay damage; allow and return");
    Verdict::Allow
}

fn check_fall_radiation(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if matches!(ctx.damage_kind, DamageKind::Fall | DamageKind::Radiation) {
        ctx.trace.log(1, "Fall/radiation damage; allow and return");
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_zero_damage(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.damage_amount <= 0.0 {
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_scrap_heli(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !engine.options().block_scrap_heli_damage || !ctx.victim_is_real_player() {
        return Verdict::Continue;
    }
    let from_scrap_heli = ctx.weapon.is_some_and(|weapon| {
        weapon.class == EntityClass::ScrapHelicopter
            || weapon
                .player
                .as_ref()
                .and_then(|p| p.mounted.as_ref())
                .is_some_and(|mounted| mounted.class == EntityClass::ScrapHelicopter)
    }) || ctx
        .event
        .weapon_prefab
        .as_ref()
        .is_some_and(|prefab| prefab.class == EntityClass::ScrapHelicopter);

    if from_scrap_heli {
        ctx.trace
            .log(1, "Scrap heli damage to player suppressed; allow and return");
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_metabolism(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.damage_amount >= 15.0 {
        return Verdict::Continue;
    }
    if !matches!(ctx.damage_kind, DamageKind::Cold | DamageKind::Heat) {
        return Verdict::Continue;
    }
    let Some(player) = ctx.victim().player.as_ref().filter(|p| p.real) else {
        return Verdict::Continue;
    };

    let temperature = player.temperature;
    let (multiplier, normalized) = match ctx.damage_kind {
        DamageKind::Cold => {
            if temperature > 1.0 {
                return Verdict::Continue;
            }
            let multiplier = if temperature < -20.0 {
                1.0
            } else if temperature < -10.0 {
                0.3
            } else {
                0.1
            };
            (multiplier, (temperature - 1.0) / -51.0)
        }
        _ => {
            if temperature < 60.0 {
                return Verdict::Continue;
            }
            (5.0, (temperature - 60.0) / 140.0)
        }
    };

    let normalized = normalized.clamp(0.0, 1.0);
    let threshold = normalized * engine.options().server_tick_interval * multiplier;
    if ctx.damage_amount > threshold {
        return Verdict::Continue;
    }

    let allowed = match ctx.damage_kind {
        DamageKind::Cold => engine.options().allow_cold_metabolism,
        _ => engine.options().allow_heat_metabolism,
    };
    let action = if allowed { "allow" } else { "block" };
    ctx.trace.log(
        1,
        format!("Metabolism {:?} damage below threshold; {action} and return", ctx.damage_kind),
    );
    if allowed {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

fn check_animal_victim(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.victim().class == EntityClass::Animal {
        ctx.trace.log(1, "Target is animal; allow and return");
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_fixed_prefabs(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let victim = ctx.victim();
    let prefab = victim.prefab_tag.to_ascii_lowercase();

    if prefab == "trainbarricade" || prefab == "trainbarricadeheavy" {
        ctx.trace.log(1, "Target is train barricade; allow and return");
        return Verdict::Allow;
    }
    if victim.class == EntityClass::Barricade
        && (prefab.contains("door_barricade") || prefab.contains("cover"))
    {
        ctx.trace
            .log(1, format!("Target is {}; allow and return", victim.prefab_tag));
        return Verdict::Allow;
    }
    if victim.class == EntityClass::LootContainer
        && (prefab == "giftbox_loot" || prefab == "loot_trash" || prefab.contains("barrel"))
    {
        ctx.trace
            .log(1, format!("Target is {}; allow and return", victim.prefab_tag));
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_zone_resolution<'a>(
    engine: &'a DamageEngine,
    ctx: &mut DecisionContext<'a>,
) -> Verdict {
    if engine.options().use_zones {
        ctx.victim_locations = engine.locations(ctx.victim());
        ctx.attacker_locations = ctx
            .weapon
            .map(|weapon| engine.locations(weapon))
            .unwrap_or_default();

        if engine
            .resolver()
            .is_excluded(&ctx.victim_locations, &ctx.attacker_locations)
        {
            ctx.trace.log(1, "Exclusion found; allow and return");
            return Verdict::Allow;
        }

        if let Some(weapon) = ctx.weapon {
            if engine.group_pair_excluded(ctx.victim(), weapon) {
                ctx.trace
                    .log(1, "Entity group exclusion found; allow and return");
                return Verdict::Allow;
            }
        }
        ctx.trace.log(1, "No exclusion found - looking up RuleSet...");
    }

    let resolved = engine.resolve_ruleset(&ctx.victim_locations, &ctx.attacker_locations);
    ctx.ruleset = Some(resolved);
    if ctx.trace.is_active() {
        let name = ctx.ruleset.map(|set| set.name.as_str()).unwrap_or("none");
        ctx.trace.log(1, format!("Using RuleSet \"{name}\""));
    }
    Verdict::Continue
}

fn check_monument_turret_trap(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let options = engine.options();
    let victim = ctx.victim();

    // Players hurting unowned defenses placed in monument topology.
    if ctx.attacker_is_real_player() && victim.owner.is_none() {
        let applies = (options.players_hurt_traps && victim.class == EntityClass::Trap)
            || (options.players_hurt_turrets && victim.class.is_turret());
        if applies && ctx.attacker.is_some_and(|a| a.in_monument) {
            ctx.trace.log(
                1,
                "Target is turret or trap in monument topology; allow and return",
            );
            return Verdict::Allow;
        }
    }

    // Unowned monument defenses hurting players.
    if victim.is_real_player() {
        if let Some(weapon) = ctx.weapon {
            if weapon.owner.is_none() && weapon.in_monument {
                let applies = (options.players_trigger_traps && weapon.class == EntityClass::Trap)
                    || (options.players_trigger_turrets && weapon.class.is_turret());
                if applies {
                    ctx.trace.log(
                        1,
                        "Initiator is turret or trap in monument topology; allow and return",
                    );
                    return Verdict::Allow;
                }
            }
        }
    }

    Verdict::Continue
}

fn check_locked_vehicle(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.has_flag(RuleFlag::LockedVehiclesImmortal) {
        return Verdict::Continue;
    }
    let victim = ctx.victim();
    let car = if victim.class == EntityClass::ModularCar {
        Some(victim)
    } else if victim.parent_class() == Some(EntityClass::ModularCar) {
        victim.parent.as_deref()
    } else {
        None
    };
    if car.is_some_and(|car| car.locked) {
        ctx.trace
            .log(1, "Target is locked vehicle; block and return (LockedVehiclesImmortal)");
        return Verdict::Deny;
    }
    Verdict::Continue
}

fn check_patrol_heli_victim(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.victim().class != EntityClass::PatrolHelicopter {
        return Verdict::Continue;
    }
    let weapon_is_heli = ctx
        .weapon
        .is_some_and(|w| w.class == EntityClass::PatrolHelicopter);
    if ctx.attacker_is_player() || weapon_is_heli {
        let weapon = ctx.weapon;
        let allow = evaluate_entities(engine, ctx, weapon, false);
        let action = if allow { "allow" } else { "block" };
        ctx.trace
            .log(1, format!("Target is PatrolHelicopter; {action} and return"));
        return if allow { Verdict::Allow } else { Verdict::Deny };
    }
    ctx.trace
        .log(1, "Target is PatrolHelicopter, initiator is not a player; allow and return");
    Verdict::Allow
}

fn check_bradley_initiator(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let from_bradley = ctx.weapon.is_some_and(|weapon| {
        weapon.class == EntityClass::BradleyApc
            || weapon.prefab_tag.eq_ignore_ascii_case("maincannonshell")
    });
    if !from_bradley {
        return Verdict::Continue;
    }
    ctx.trace
        .log(1, "Initiator is BradleyAPC; evaluating RuleSet rules...");
    let weapon = ctx.weapon;
    if evaluate_entities(engine, ctx, weapon, true) {
        Verdict::Allow
    } else {
        Verdict::Deny
    }
}

fn check_driverless_collision(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.has_flag(RuleFlag::VehiclesTakeCollisionDamageWithoutDriver) {
        return Verdict::Continue;
    }
    let victim = ctx.victim();
    let self_collision = victim.class.is_vehicle()
        && ctx.weapon.is_some_and(|weapon| weapon.id == victim.id)
        && !victim.occupied;
    if self_collision {
        ctx.trace
            .log(1, "Vehicle collision with no driver; allow and return");
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_heli_initiator(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let is_heli = heli_source(ctx);
    let flags = ctx.flags();

    if engine.options().ignore_firework_damage && ctx.victim().class == EntityClass::Firework {
        let action = if is_heli { "block" } else { "allow" };
        ctx.trace
            .log(1, format!("Target is firework; {action} and return"));
        return if is_heli { Verdict::Deny } else { Verdict::Allow };
    }

    if !is_heli {
        return Verdict::Continue;
    }

    if let Some(verdict) = immortal_lock(ctx) {
        return verdict;
    }

    let victim = ctx.victim();
    if victim.is_real_player() {
        if flags.contains(RuleFlag::NoHeliDamageSleepers) && victim.is_sleeping() {
            ctx.trace
                .log(1, "Initiator is heli, target is sleeping player; block and return");
            return Verdict::Deny;
        }
        let blocked = flags.contains(RuleFlag::NoHeliDamagePlayer);
        let action = if blocked { "block" } else { "allow" };
        ctx.trace
            .log(1, format!("Initiator is heli, target is player; {action} and return"));
        return if blocked { Verdict::Deny } else { Verdict::Allow };
    }

    if victim.class == EntityClass::MiningQuarry {
        let blocked = flags.contains(RuleFlag::NoHeliDamageQuarry);
        return if blocked { Verdict::Deny } else { Verdict::Allow };
    }

    if victim.class == EntityClass::RidableHorse {
        let blocked = flags.contains(RuleFlag::NoHeliDamageRidableHorses);
        return if blocked { Verdict::Deny } else { Verdict::Allow };
    }

    if flags.contains(RuleFlag::NoHeliDamageBuildings) && is_player_structure(victim) {
        if victim.parent.is_none() && !victim.under_privilege {
            ctx.trace
                .log(1, "Initiator is heli, structure outside privilege; allow and return");
            return Verdict::Allow;
        }
        ctx.trace
            .log(1, "Initiator is heli, structure under privilege; block and return");
        return Verdict::Deny;
    }

    let blocked = flags.contains(RuleFlag::NoHeliDamage);
    let action = if blocked { "block" } else { "allow" };
    ctx.trace.log(
        1,
        format!("Initiator is heli, target is {}; {action} and return", victim.prefab_tag),
    );
    if blocked {
        Verdict::Deny
    } else {
        Verdict::Allow
    }
}

fn check_mlrs(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.has_flag(RuleFlag::NoMlrsDamage)
        && ctx
            .event
            .weapon_prefab
            .as_ref()
            .is_some_and(|prefab| prefab.class == EntityClass::MlrsRocket)
    {
        ctx.trace
            .log(1, "Initiator is MLRS rocket with NoMlrsDamage set; block and return");
        return Verdict::Deny;
    }
    Verdict::Continue
}

fn check_missing_initiator(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if ctx.event.initiator.is_some() {
        return Verdict::Continue;
    }

    let from_mlrs = [ctx.event.weapon_prefab.as_ref(), ctx.event.weapon.as_ref()]
        .into_iter()
        .flatten()
        .any(|weapon| weapon.class == EntityClass::MlrsRocket);
    if from_mlrs {
        ctx.trace
            .log(1, "Initiator empty for MLRS rocket; block and return");
        return Verdict::Deny;
    }

    let victim = ctx.victim();

    // Bleed/hypothermia ticks after an environmental hit carry no
    // initiator.
    if matches!(
        ctx.damage_kind,
        DamageKind::Slash | DamageKind::Stab | DamageKind::Cold
    ) && victim.is_player()
    {
        ctx.trace.log(1, "Initiator is hurt trigger; allow and return");
        return Verdict::Allow;
    }

    let type_tag = victim.type_tag.to_ascii_lowercase();
    if type_tag.contains("corpse") && type_tag != "playercorpse" {
        return Verdict::Allow;
    }

    if ctx
        .event
        .damage
        .iter()
        .any(|(kind, _)| kind.counts_when_unattributed())
    {
        let allow = effective_ruleset(engine, ctx).default_allow_damage;
        let action = if allow { "allow" } else { "block" };
        ctx.trace.log(
            1,
            format!("Initiator empty for player damage; default value; {action} and return"),
        );
        return if allow { Verdict::Allow } else { Verdict::Deny };
    }

    ctx.trace.log(1, "Initiator empty; allow and return");
    Verdict::Allow
}

fn check_immortal_locks(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    match immortal_lock(ctx) {
        Some(verdict) => {
            let action = if verdict == Verdict::Allow { "allow" } else { "block" };
            ctx.trace.log(
                1,
                format!("Locked door/container with immortal flag; {action} and return"),
            );
            verdict
        }
        None => Verdict::Continue,
    }
}

fn check_samsite_initiator(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let Some(initiator) = ctx.event.initiator.as_ref() else {
        return Verdict::Continue;
    };
    if initiator.class != EntityClass::SamSite {
        return Verdict::Continue;
    }
    let victim = ctx.victim();
    if !victim.is_player() && victim.class != EntityClass::Mountable {
        return Verdict::Continue;
    }

    if engine.entity_group_excluded(initiator) {
        ctx.trace
            .log(1, "Initiator is samsite with group exclusion; allow and return");
        return Verdict::Allow;
    }

    let is_static = initiator.owner.is_none();
    let blocked = if is_static {
        ctx.has_flag(RuleFlag::StaticSamSitesIgnorePlayers)
    } else {
        ctx.has_flag(RuleFlag::PlayerSamSitesIgnorePlayers)
    };
    let action = if blocked { "flag set; block" } else { "flag not set; allow" };
    ctx.trace.log(
        1,
        format!("Initiator is samsite, target is player; {action} and return"),
    );
    if blocked {
        Verdict::Deny
    } else {
        Verdict::Allow
    }
}

fn check_npc_initiator(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let npc_attacker = ctx
        .attacker
        .is_some_and(|a| a.is_player() && !a.is_real_player())
        || ctx
            .event
            .initiator
            .as_ref()
            .is_some_and(|i| matches!(i.class, EntityClass::Npc | EntityClass::Animal));
    if !npc_attacker {
        return Verdict::Continue;
    }

    let victim = ctx.victim();
    if victim.is_real_player()
        && ctx.has_flag(RuleFlag::ProtectedSleepers)
        && victim.is_sleeping()
    {
        ctx.trace.log(
            1,
            "Target is sleeping player with ProtectedSleepers flag set; block and return",
        );
        return Verdict::Deny;
    }

    if ctx.has_flag(RuleFlag::NpcsCanHurtAnything) {
        ctx.trace
            .log(1, "Initiator is NPC; flag set; allow and return");
        return Verdict::Allow;
    }

    Verdict::Continue
}

fn check_static_turret(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.victim_is_real_player() {
        return Verdict::Continue;
    }
    let Some(initiator) = ctx.event.initiator.as_ref() else {
        return Verdict::Continue;
    };
    if !initiator.class.is_turret() || initiator.owner.is_some() {
        return Verdict::Continue;
    }

    let blocked = if initiator.class == EntityClass::NpcAutoTurret {
        ctx.has_flag(RuleFlag::SafeZoneTurretsIgnorePlayers)
    } else {
        ctx.has_flag(RuleFlag::StaticTurretsIgnorePlayers)
    };
    let action = if blocked { "block" } else { "allow" };
    ctx.trace.log(
        1,
        format!("Initiator is static turret, target is player; {action} and return"),
    );
    if blocked {
        Verdict::Deny
    } else {
        Verdict::Allow
    }
}

fn check_suicide(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.victim_is_real_player() || ctx.damage_kind != DamageKind::Suicide {
        return Verdict::Continue;
    }
    if ctx.has_flag(RuleFlag::SuicideBlocked) {
        ctx.trace.log(1, "DamageType is suicide; block and return");
        if let Some(victim_id) = ctx.victim_player_id() {
            engine.message_throttled(victim_id, "You are not allowed to commit suicide");
        }
        return Verdict::Deny;
    }
    ctx.trace.log(1, "DamageType is suicide; allow and return");
    Verdict::Allow
}

fn check_self_damage(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.has_flag(RuleFlag::SelfDamage) {
        return Verdict::Continue;
    }
    if ctx.victim_is_real_player()
        && ctx.attacker_is_real_player()
        && ctx.victim_player_id() == ctx.attacker_player_id()
    {
        ctx.trace
            .log(1, "SelfDamage flag; player inflicted damage to self; allow and return");
        return Verdict::Allow;
    }
    Verdict::Continue
}

fn check_mounted_attacker(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.attacker_is_real_player() {
        return Verdict::Continue;
    }
    let mounted = ctx
        .attacker
        .and_then(|a| a.player.as_ref())
        .and_then(|p| p.mounted.as_deref());
    let Some(mounted) = mounted else {
        return Verdict::Continue;
    };

    if !evaluate_entities(engine, ctx, Some(mounted), false) {
        ctx.trace
            .log(1, "Player is mounted; evaluation blocks; block and return");
        return Verdict::Deny;
    }
    Verdict::Continue
}

fn check_building_grades(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let victim = ctx.victim();
    if victim.class != EntityClass::BuildingBlock || victim.owner.is_none() {
        return Verdict::Continue;
    }
    if !ctx.attacker_is_real_player() {
        return Verdict::Continue;
    }
    let Some(grade) = victim.grade else {
        return Verdict::Continue;
    };
    let Some(attacker_id) = ctx.attacker_player_id() else {
        return Verdict::Continue;
    };
    let owner = victim.owner.unwrap_or(attacker_id);
    let flags = ctx.flags();

    use crate::core::types::BuildingGrade;

    // Flag-gated twig/wood griefing protection.
    let flagged = match grade {
        BuildingGrade::Twigs if flags.contains(RuleFlag::TwigDamage) => Some(
            !flags.contains(RuleFlag::TwigDamageRequiresOwnership)
                || engine.is_ally(owner, attacker_id)
                || engine.is_privileged(victim, attacker_id),
        ),
        BuildingGrade::Wood if flags.contains(RuleFlag::WoodenDamage) => Some(
            !flags.contains(RuleFlag::WoodenDamageRequiresOwnership)
                || engine.is_ally(owner, attacker_id)
                || engine.is_privileged(victim, attacker_id),
        ),
        _ => None,
    };

    if let Some(allowed) = flagged {
        let action = if allowed { "allow" } else { "block" };
        ctx.trace.log(
            1,
            format!("Target is {grade:?} block with damage flag set; {action} and return"),
        );
        if !allowed {
            engine.grief_side_effects(ctx, attacker_id);
            return Verdict::Deny;
        }
        return Verdict::Allow;
    }

    // Config-selected grade handler: ownership required for listed tiers.
    let protection = &engine.options().block_protection;
    if !protection.any() {
        return Verdict::Continue;
    }
    let handled = match grade {
        BuildingGrade::Twigs => protection.twig,
        BuildingGrade::Wood => protection.wood,
        BuildingGrade::Stone => protection.stone,
        BuildingGrade::Metal => protection.metal,
        BuildingGrade::TopTier => protection.top_tier,
    };
    if handled
        && !engine.is_ally(owner, attacker_id)
        && !engine.is_privileged(victim, attacker_id)
    {
        ctx.trace.log(
            1,
            format!("Target is {grade:?} block owned by another player; block and return"),
        );
        engine.grief_side_effects(ctx, attacker_id);
        return Verdict::Deny;
    }

    Verdict::Continue
}

fn check_player_vs_vehicle(_engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.attacker_is_player() {
        return Verdict::Continue;
    }
    let flags = ctx.flags();
    let victim_class = ctx.victim().class;

    let blocked = (flags.contains(RuleFlag::NoPlayerDamageToMini)
        && victim_class == EntityClass::Minicopter)
        || (flags.contains(RuleFlag::NoPlayerDamageToScrap)
            && victim_class == EntityClass::ScrapHelicopter)
        || (flags.contains(RuleFlag::NoPlayerDamageToCar)
            && victim_class == EntityClass::ModularCar);
    if blocked {
        ctx.trace.log(
            1,
            format!("Initiator is player, target is {victim_class:?} with no-damage flag; block and return"),
        );
        return Verdict::Deny;
    }
    Verdict::Continue
}

fn check_deployables(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.attacker_is_player() {
        return Verdict::Continue;
    }
    let options = engine.options();
    let victim = ctx.victim();

    if victim.class == EntityClass::GrowableEntity {
        let allowed = match (&victim.parent, ctx.attacker_player_id()) {
            (Some(planter), Some(attacker_id)) => match planter.owner {
                Some(owner) => engine.is_ally(owner, attacker_id),
                None => true,
            },
            _ => true,
        };
        let action = if allowed { "allow" } else { "block non-ally" };
        ctx.trace
            .log(1, format!("Target is growable entity; {action} and return"));
        return if allowed { Verdict::Allow } else { Verdict::Deny };
    }

    let always_allowed = (victim.class == EntityClass::SleepingBag
        && options.ignore_sleeping_bag_damage)
        || (victim.class == EntityClass::Campfire && options.ignore_campfire_damage)
        || (victim.class == EntityClass::Ladder && options.ignore_ladder_damage);
    if always_allowed {
        ctx.trace.log(
            1,
            format!("Target is {:?} ignored by config; allow and return", victim.class),
        );
        return Verdict::Allow;
    }

    Verdict::Continue
}

fn check_player_vs_player(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    if !ctx.attacker_is_player() || !ctx.victim().is_player() {
        return Verdict::Continue;
    }
    let flags = ctx.flags();
    let attacker_real = ctx.attacker_is_real_player();
    let victim_real = ctx.victim_is_real_player();

    if attacker_real && victim_real && flags.contains(RuleFlag::FriendlyFire) {
        if let (Some(victim_id), Some(attacker_id)) =
            (ctx.victim_player_id(), ctx.attacker_player_id())
        {
            if victim_id != attacker_id && engine.is_ally(victim_id, attacker_id) {
                ctx.trace.log(
                    1,
                    "Initiator and target are allied players with FriendlyFire flag set; allow and return",
                );
                return Verdict::Allow;
            }
        }
    }

    let attacker_admin = ctx
        .attacker
        .and_then(|a| a.player.as_ref())
        .is_some_and(|p| p.admin);

    if attacker_admin && victim_real && flags.contains(RuleFlag::AdminsHurtPlayers) {
        ctx.trace.log(
            1,
            "Initiator is admin with AdminsHurtPlayers flag set; allow and return",
        );
        return Verdict::Allow;
    }

    if attacker_admin
        && victim_real
        && flags.contains(RuleFlag::AdminsHurtSleepers)
        && ctx.victim().is_sleeping()
    {
        ctx.trace.log(
            1,
            "Initiator is admin, target sleeping, AdminsHurtSleepers flag set; allow and return",
        );
        return Verdict::Allow;
    }

    if flags.contains(RuleFlag::HumanNpcDamage) && (!attacker_real || !victim_real) {
        ctx.trace.log(
            1,
            "Initiator or target is human NPC with HumanNpcDamage flag set; allow and return",
        );
        return Verdict::Allow;
    }

    Verdict::Continue
}

fn check_authorized_damage(engine: &DamageEngine, ctx: &mut DecisionContext<'_>) -> Verdict {
    let victim = ctx.victim();
    if !ctx.has_flag(RuleFlag::AuthorizedDamage)
        || victim.is_player()
        || matches!(victim.class, EntityClass::Npc | EntityClass::Animal)
        || !ctx.attacker_is_real_player()
    {
        return Verdict::Continue;
    }
    let Some(attacker_id) = ctx.attacker_player_id() else {
        return Verdict::Continue;
    };
    let flags = ctx.flags();

    if flags.contains(RuleFlag::AuthorizedDamageCheckPrivilege) {
        let heli_like = matches!(
            victim.class,
            EntityClass::Minicopter | EntityClass::ScrapHelicopter | EntityClass::TransportHelicopter
        );
        let vessel = victim.class == EntityClass::Vessel
            || victim.parent_class() == Some(EntityClass::Vessel);
        if (is_player_structure(victim) || heli_like || vessel)
            && engine.is_privileged(victim, attacker_id)
        {
            ctx.trace.log(
                1,
                "Initiator is player with privilege over target; allow and return",
            );
            return Verdict::Allow;
        }
    }

    if flags.contains(RuleFlag::AuthorizedDamageRequiresOwnership) {
        let owned_by_ally = victim
            .owner
            .is_some_and(|owner| engine.is_ally(owner, attacker_id));
        let ownable = match victim.owner {
            None => victim.class == EntityClass::Minicopter,
            Some(_) => is_player_structure(victim) || victim.class.is_vehicle(),
        };
        if !owned_by_ally && ownable {
            ctx.trace.log(
                1,
                "Initiator is player who does not own the target; block and return",
            );
            return Verdict::Deny;
        }
    }

    let cupboard = flags.contains(RuleFlag::CupboardOwnership);
    let authorized = if cupboard {
        // Entities outside any privilege radius count as unowned;
        // inside, authorization decides.
        !victim.under_privilege || engine.is_privileged(victim, attacker_id)
    } else {
        victim.owner.is_none()
            || victim
                .owner
                .is_some_and(|owner| engine.is_ally(owner, attacker_id))
    };

    if authorized {
        if matches!(
            victim.class,
            EntityClass::SamSite | EntityClass::Mountable | EntityClass::ModularCar
        ) {
            ctx.trace.log(
                1,
                format!("Target is {:?}; evaluate and return", victim.class),
            );
            let attacker = ctx.attacker;
            let allow = evaluate_entities(engine, ctx, attacker, true);
            return if allow { Verdict::Allow } else { Verdict::Deny };
        }
        ctx.trace.log(
            1,
            "Initiator is player with authorization over target; allow and return",
        );
        return Verdict::Allow;
    }

    if cupboard {
        ctx.trace.log(
            1,
            "Initiator is player without authorization over target; block and return",
        );
        return Verdict::Deny;
    }

    Verdict::Continue
}
