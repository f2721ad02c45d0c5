//! The damage authorization engine
//!
//! Owns the compiled configuration, the scheduler-driven current rule
//! set, the collaborator handles and the decision caches. Every damage
//! event runs synchronously through [`DamageEngine::decide`]; the
//! schedule tick and the admin surface are the only other mutators of
//! engine state, all on one logical thread. The pipeline is fail-open:
//! internal inconsistency allows damage rather than stalling the caller.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use ahash::AHashMap;

use crate::cache::TtlCache;
use crate::core::error::{Result, WardenError};
use crate::core::options::EngineOptions;
use crate::core::types::{DamageEvent, DamageKind, Entity, EntityId, PlayerId, Verdict};
use crate::pipeline::checks::{self, CHECKS};
use crate::pipeline::context::DecisionContext;
use crate::pipeline::providers::{
    Authorization, Feedback, NullProvider, OverrideHook, ZoneProvider,
};
use crate::pipeline::trace::TraceFile;
use crate::rules::flags::RuleFlag;
use crate::rules::loader::WardenConfig;
use crate::rules::ruleset::RuleSet;
use crate::schedule::Clock;
use crate::zones::{ZoneResolution, ZoneResolver, EXCLUDE};

const GROUP_CACHE_TTL: Duration = Duration::from_secs(60);
const GROUP_CACHE_CAPACITY: usize = 2048;
const NPC_CACHE_TTL: Duration = Duration::from_secs(60);
const NPC_CACHE_CAPACITY: usize = 500;
const TRACE_FILE: &str = "ruletrace.log";
const TRACE_FILE_MAX_BYTES: u64 = 1 << 20;

/// Central decision engine. See the crate docs for the pipeline order.
pub struct DamageEngine {
    config: WardenConfig,
    resolver: ZoneResolver,
    /// Scheduler-owned current rule set; mutated only by the schedule
    /// tick and admin commands.
    current: RuleSet,
    current_broadcast: String,
    dud: RuleSet,
    /// Master switch flipped by the admin surface.
    master_enabled: bool,
    /// Effective switch: master + handle_damage + a usable current set.
    enabled: bool,
    animals_ignore_sleepers: bool,

    trace_enabled: Cell<bool>,
    trace_expires: Cell<Option<Instant>>,
    trace_file: TraceFile,

    zones: Box<dyn ZoneProvider>,
    auth: Box<dyn Authorization>,
    hook: Box<dyn OverrideHook>,
    feedback: Box<dyn Feedback>,

    group_cache: RefCell<TtlCache<EntityId, Vec<String>>>,
    npc_cache: RefCell<TtlCache<(EntityId, EntityId), bool>>,
    sleeper_since: RefCell<AHashMap<PlayerId, Instant>>,
    throttle: RefCell<AHashMap<PlayerId, Instant>>,
}

impl DamageEngine {
    pub fn new(config: WardenConfig) -> Self {
        let resolver = ZoneResolver::build(
            &config.mappings,
            &config.rulesets,
            &config.groups,
            config.options.asymmetric_zone_dud,
        );
        let current = match config.default_ruleset() {
            Some(set) => set.clone(),
            None => {
                tracing::warn!(name = %config.default_ruleset, "no rule set found for default");
                RuleSet::new(config.default_ruleset.clone())
            }
        };

        let mut engine = Self {
            config,
            resolver,
            current,
            current_broadcast: String::new(),
            dud: WardenConfig::dud_ruleset(),
            master_enabled: true,
            enabled: false,
            animals_ignore_sleepers: false,
            trace_enabled: Cell::new(false),
            trace_expires: Cell::new(None),
            trace_file: TraceFile::new(TRACE_FILE, TRACE_FILE_MAX_BYTES),
            zones: Box::new(NullProvider),
            auth: Box::new(NullProvider),
            hook: Box::new(NullProvider),
            feedback: Box::new(NullProvider),
            group_cache: RefCell::new(TtlCache::new(GROUP_CACHE_TTL, GROUP_CACHE_CAPACITY)),
            npc_cache: RefCell::new(TtlCache::new(NPC_CACHE_TTL, NPC_CACHE_CAPACITY)),
            sleeper_since: RefCell::new(AHashMap::new()),
            throttle: RefCell::new(AHashMap::new()),
        };
        engine.validate_enabled();
        engine
    }

    pub fn with_zone_provider(mut self, provider: impl ZoneProvider + 'static) -> Self {
        self.zones = Box::new(provider);
        self
    }

    pub fn with_authorization(mut self, auth: impl Authorization + 'static) -> Self {
        self.auth = Box::new(auth);
        self
    }

    pub fn with_override_hook(mut self, hook: impl OverrideHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn with_feedback(mut self, feedback: impl Feedback + 'static) -> Self {
        self.feedback = Box::new(feedback);
        self
    }

    // === Decision entry point ===

    /// Decide whether the damage described by `event` is permitted.
    pub fn decide(&self, event: &DamageEvent) -> bool {
        if !self.enabled {
            return true;
        }
        self.expire_trace();

        if let Some(forced) = self.hook.check(event) {
            tracing::debug!(forced, "external override decided damage event");
            return forced;
        }

        let mut ctx = DecisionContext::new(event, self.trace_enabled.get());
        if ctx.trace.is_active() {
            let from = ctx
                .weapon
                .map(|w| format!("{}, {}", w.type_tag, w.prefab_tag))
                .unwrap_or_else(|| "unknown".to_string());
            ctx.trace.log(0, "==== STARTING TRACE ====");
            ctx.trace.log(1, format!("From: {from}"));
            ctx.trace.log(
                1,
                format!("To: {}, {}", event.victim.type_tag, event.victim.prefab_tag),
            );
        }

        let mut verdict = Verdict::Continue;
        for (_, check) in CHECKS {
            verdict = check(self, &mut ctx);
            if verdict != Verdict::Continue {
                break;
            }
        }

        let allow = match verdict {
            Verdict::Allow => true,
            Verdict::Deny => false,
            Verdict::Continue => {
                ctx.trace
                    .log(1, "No match in pre-checks; evaluating RuleSet rules...");
                let weapon = ctx.weapon;
                checks::evaluate_entities(self, &mut ctx, weapon, true)
            }
        };

        self.flush_trace(&mut ctx);
        allow
    }

    // === State consulted by the policy checks ===

    pub fn options(&self) -> &EngineOptions {
        &self.config.options
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    pub fn current_ruleset(&self) -> &RuleSet {
        &self.current
    }

    pub fn current_ruleset_name(&self) -> &str {
        &self.current.name
    }

    pub fn current_broadcast(&self) -> &str {
        &self.current_broadcast
    }

    pub fn resolver(&self) -> &ZoneResolver {
        &self.resolver
    }

    pub fn is_ally(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b || self.auth.is_ally(a, b)
    }

    pub fn is_privileged(&self, entity: &Entity, actor: PlayerId) -> bool {
        self.auth.is_privileged(entity, actor)
    }

    /// Zone names for an entity; empty when zones are disabled or the
    /// provider cannot place it.
    pub fn locations(&self, entity: &Entity) -> Vec<String> {
        if !self.config.options.use_zones {
            return Vec::new();
        }
        self.zones.locations_for(entity)
    }

    /// Groups the entity belongs to, memoized per entity id.
    pub fn resolve_groups(&self, entity: &Entity) -> Vec<String> {
        if entity.id.0 != 0 {
            if let Some(groups) = self.group_cache.borrow_mut().get(&entity.id) {
                return groups.clone();
            }
        }
        let groups: Vec<String> = self
            .config
            .groups
            .iter()
            .filter(|group| group.contains(entity))
            .map(|group| group.name.clone())
            .collect();
        if entity.id.0 != 0 {
            self.group_cache
                .borrow_mut()
                .insert(entity.id, groups.clone());
        }
        groups
    }

    /// Resolve the rule set for a location pair through the mapping
    /// table, falling back to the current global set.
    pub fn resolve_ruleset(&self, victim: &[String], attacker: &[String]) -> &RuleSet {
        match self.resolver.resolve(victim, attacker) {
            ZoneResolution::Current => &self.current,
            ZoneResolution::Dud => &self.dud,
            ZoneResolution::Named(name) => match self.config.ruleset(&name) {
                Some(set) => set,
                None => &self.current,
            },
        }
    }

    fn resolve_for(&self, a: &Entity, b: &Entity) -> &RuleSet {
        let a_locations = self.locations(a);
        let b_locations = self.locations(b);
        self.resolve_ruleset(&a_locations, &b_locations)
    }

    /// Whether the attacker carries an exclusion tag in any group.
    pub fn entity_group_excluded(&self, entity: &Entity) -> bool {
        self.config.groups.iter().any(|group| {
            group.is_exclusion(&entity.prefab_tag) || group.is_exclusion(&entity.type_tag)
        })
    }

    /// Group-declared exclusion pairing: the target sits in some group's
    /// member or exclusion set and the attacker carries an exclusion tag.
    pub fn group_pair_excluded(&self, target: &Entity, attacker: &Entity) -> bool {
        let target_known = self.config.groups.iter().any(|group| {
            group.is_member(&target.prefab_tag)
                || group.is_member(&target.type_tag)
                || group.is_exclusion(&target.prefab_tag)
                || group.is_exclusion(&target.type_tag)
        });
        target_known && self.entity_group_excluded(attacker)
    }

    fn zone_excluded_between(&self, a: &Entity, b: &Entity) -> bool {
        if !self.config.options.use_zones {
            return false;
        }
        let a_locations = self.locations(a);
        let b_locations = self.locations(b);
        self.resolver.is_excluded(&a_locations, &b_locations)
    }

    // === Sleeper offline-window bookkeeping ===

    /// Record that a player has gone to sleep (disconnected).
    pub fn note_sleeper(&self, player: PlayerId) {
        self.sleeper_since
            .borrow_mut()
            .entry(player)
            .or_insert_with(Instant::now);
    }

    /// Record that a player is awake/connected again.
    pub fn note_awake(&self, player: PlayerId) {
        self.sleeper_since.borrow_mut().remove(&player);
    }

    /// `(killable, hours_left)` for the offline-too-long sleeper window.
    pub fn offline_window(&self, victim: &Entity) -> (bool, f64) {
        let hours_allowed = self.config.options.sleepers.hours_offline as f64;
        if hours_allowed <= 0.0 {
            return (false, 0.0);
        }
        let Some(player) = victim.player.as_ref() else {
            return (false, 0.0);
        };
        if player.connected || !player.sleeping {
            self.sleeper_since.borrow_mut().remove(&player.id);
            return (false, 0.0);
        }
        let since = self.sleeper_since.borrow().get(&player.id).copied();
        match since {
            Some(since) => {
                let offline_hours = since.elapsed().as_secs_f64() / 3600.0;
                if offline_hours > hours_allowed {
                    (true, 0.0)
                } else {
                    (false, hours_allowed - offline_hours)
                }
            }
            None => (false, 0.0),
        }
    }

    // === Side effects ===

    /// Send a player feedback, at most once per throttle window.
    pub fn message_throttled(&self, player: PlayerId, text: &str) {
        let window = Duration::from_secs_f32(self.config.options.message_throttle_secs.max(0.0));
        let now = Instant::now();
        let mut throttle = self.throttle.borrow_mut();
        if let Some(last) = throttle.get(&player) {
            if now.duration_since(*last) < window {
                return;
            }
        }
        throttle.insert(player, now);
        self.feedback.message(player, text);
    }

    /// Offender handling for blocked structure griefing: log, notify and
    /// optionally reflect damage back.
    pub fn grief_side_effects(&self, ctx: &DecisionContext<'_>, attacker: PlayerId) {
        let protection = &self.config.options.block_protection;
        if protection.log_offenses {
            tracing::info!(
                attacker = attacker.0,
                owner = ?ctx.victim().owner,
                amount = ctx.damage_amount,
                "blocked structure damage"
            );
        }
        if protection.notify_offenders {
            self.message_throttled(
                attacker,
                "WARNING: It is against server rules to destroy other players' structures.",
            );
        }
        if protection.reflect_multiplier > 0.0 {
            let kind = if ctx.has_flag(RuleFlag::SelfDamage) {
                ctx.damage_kind
            } else {
                DamageKind::Radiation
            };
            self.feedback.reflect_damage(
                attacker,
                ctx.damage_amount * protection.reflect_multiplier,
                kind,
            );
        }
    }

    // === Schedule ===

    /// Re-evaluate the schedule. Returns the broadcast message when the
    /// selection changed and broadcasting is on. The host calls this
    /// every `schedule.tick_secs()` while the schedule is enabled.
    pub fn schedule_tick(&mut self, clock: &dyn Clock) -> Option<String> {
        if !self.config.schedule.enabled {
            return None;
        }
        let selection = self
            .config
            .schedule
            .select(clock)
            .map(|(name, message)| (name.to_string(), message.to_string()));
        let Some((name, message)) = selection else {
            return None;
        };
        if self.current.name.eq_ignore_ascii_case(&name) {
            return None;
        }

        self.install_ruleset(&name);
        self.current_broadcast = message.clone();
        tracing::info!(ruleset = %name, "schedule selected rule set");

        if self.config.schedule.broadcast && !message.is_empty() {
            Some(message)
        } else {
            None
        }
    }

    fn install_ruleset(&mut self, name: &str) {
        self.current = match self.config.ruleset(name) {
            Some(set) => set.clone(),
            None => {
                tracing::warn!(name = %name, "schedule selected unknown rule set");
                // Empty placeholder holds the name; damage handling stays
                // off until the schedule moves on.
                RuleSet::new(name)
            }
        };
        self.validate_enabled();
    }

    fn validate_enabled(&mut self) {
        self.enabled = self.master_enabled
            && self.config.options.handle_damage
            && self.current.enabled
            && !self.current.is_empty();
    }

    // === Administrative surface ===

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.master_enabled = enabled;
        self.validate_enabled();
    }

    pub fn mapping(&self, key: &str) -> Option<&str> {
        self.resolver.mapping(key)
    }

    /// Add or update a zone mapping. The target must be an existing rule
    /// set or the reserved `"exclude"`. Returns the replaced target.
    pub fn set_mapping(&mut self, key: &str, target: &str) -> Result<Option<String>> {
        if key.is_empty()
            || (!target.eq_ignore_ascii_case(EXCLUDE) && self.config.ruleset(target).is_none())
        {
            return Err(WardenError::InvalidMapping(
                key.to_string(),
                target.to_string(),
            ));
        }
        let old = self
            .config
            .mappings
            .insert(key.to_string(), target.to_string());
        self.rebuild_resolver();
        Ok(old)
    }

    /// Remove a zone mapping, returning its former target.
    pub fn remove_mapping(&mut self, key: &str) -> Result<String> {
        let removed = match self.config.mappings.remove(key) {
            Some(value) => Some(value),
            None => {
                let found = self
                    .config
                    .mappings
                    .keys()
                    .find(|k| k.eq_ignore_ascii_case(key))
                    .cloned();
                found.and_then(|k| self.config.mappings.remove(&k))
            }
        };
        match removed {
            Some(value) => {
                self.rebuild_resolver();
                Ok(value)
            }
            None => Err(WardenError::NoSuchMapping(key.to_string())),
        }
    }

    /// Enable or disable the schedule. Fails when the schedule never
    /// compiled to a valid state.
    pub fn set_schedule_enabled(&mut self, enabled: bool) -> Result<()> {
        if !self.config.schedule.valid {
            return Err(WardenError::InvalidSchedule);
        }
        self.config.schedule.enabled = enabled;
        Ok(())
    }

    pub fn schedule(&self) -> &crate::schedule::Schedule {
        &self.config.schedule
    }

    /// Switch the default rule set and install it as current.
    pub fn reset_default_ruleset(&mut self, name: &str) -> Result<()> {
        let canonical = match self.config.ruleset(name) {
            Some(set) => set.name.clone(),
            None => return Err(WardenError::UnknownRuleSet(name.to_string())),
        };
        self.config.default_ruleset = canonical.clone();
        self.install_ruleset(&canonical);
        Ok(())
    }

    /// Flip player-vs-player damage on the current rule set. Returns the
    /// new state (true = players can hurt players).
    pub fn toggle_pvp(&mut self) -> bool {
        let currently_on = self
            .current
            .rule("players->players")
            .map(|rule| rule.hurt)
            .unwrap_or(false);
        if currently_on {
            self.current.add_rule("players cannot hurt players");
        } else {
            self.current.add_rule("players can hurt players");
        }
        tracing::info!(pvp = !currently_on, "pvp toggled on current rule set");
        !currently_on
    }

    /// Toggle animal protection for sleepers independent of rule-set
    /// flags. Returns the new state.
    pub fn toggle_sleeper_protection(&mut self) -> bool {
        self.animals_ignore_sleepers = !self.animals_ignore_sleepers;
        self.animals_ignore_sleepers
    }

    /// Toggle verbose decision tracing; auto-expires after the
    /// configured timeout. Returns the new state.
    pub fn toggle_trace(&self) -> bool {
        let enabled = !self.trace_enabled.get();
        self.trace_enabled.set(enabled);
        self.trace_expires.set(if enabled {
            Some(Instant::now() + Duration::from_secs(self.config.options.trace_timeout_secs))
        } else {
            None
        });
        enabled
    }

    pub fn trace_is_enabled(&self) -> bool {
        self.trace_enabled.get()
    }

    /// The mapping governing a player's current zones, for host
    /// integrations that key behavior on it.
    pub fn player_mapping(&self, player: &Entity) -> String {
        if self.config.options.use_zones {
            for location in self.locations(player) {
                if let Some(mapping) = self.resolver.mapping(&location) {
                    return mapping.to_string();
                }
            }
        }
        if self.current.enabled && !self.current.is_empty() {
            if let Some(mapping) = self.resolver.mapping(&self.current.name) {
                return mapping.to_string();
            }
        }
        "default".to_string()
    }

    /// Replace the whole configuration (reload). Caches are dropped; the
    /// default rule set becomes current again.
    pub fn reload(&mut self, config: WardenConfig) {
        self.config = config;
        self.dud = WardenConfig::dud_ruleset();
        self.rebuild_resolver();
        let name = self.config.default_ruleset.clone();
        self.install_ruleset(&name);
        self.current_broadcast.clear();
        self.group_cache.borrow_mut().clear();
        self.npc_cache.borrow_mut().clear();
        self.throttle.borrow_mut().clear();
    }

    fn rebuild_resolver(&mut self) {
        self.resolver = ZoneResolver::build(
            &self.config.mappings,
            &self.config.rulesets,
            &self.config.groups,
            self.config.options.asymmetric_zone_dud,
        );
    }

    // === Cache upkeep ===

    /// Entity-destroyed notification from the host: drop its cached
    /// classification.
    pub fn evict_entity(&self, id: EntityId) {
        self.group_cache.borrow_mut().remove(&id);
    }

    /// Periodic cache-eviction sweep, on the host's tick.
    pub fn sweep_caches(&self) {
        self.group_cache.borrow_mut().sweep();
        self.npc_cache.borrow_mut().sweep();
        let window = Duration::from_secs_f32(self.config.options.message_throttle_secs.max(0.0));
        let now = Instant::now();
        self.throttle
            .borrow_mut()
            .retain(|_, last| now.duration_since(*last) < window);
    }

    // === Targeting sub-decisions (host hook integrations) ===

    /// May a sam site open fire on this target?
    pub fn can_samsite_target(&self, samsite: &Entity, target: &Entity) -> bool {
        let ruleset = self.resolve_for(target, samsite);

        if target.class == crate::core::types::EntityClass::MlrsRocket {
            if ruleset.has_flag(RuleFlag::SamSitesIgnoreMlrs) {
                return self.targeting_escape(samsite, target);
            }
            return true;
        }

        let is_static = samsite.owner.is_none();
        let blocked = if is_static {
            ruleset.has_flag(RuleFlag::StaticSamSitesIgnorePlayers)
        } else {
            ruleset.has_flag(RuleFlag::PlayerSamSitesIgnorePlayers)
        };
        if blocked {
            return self.targeting_escape(samsite, target);
        }
        true
    }

    /// May an auto turret track this target?
    pub fn can_turret_target(&self, turret: &Entity, target: &Entity) -> bool {
        use crate::core::types::EntityClass;

        if self.config.options.players_trigger_turrets
            && turret.owner.is_none()
            && turret.parent.is_none()
            && target.is_real_player()
        {
            return true;
        }

        let ruleset = self.resolve_for(target, turret);
        let is_static = turret.owner.is_none();

        if !target.is_real_player() {
            let flag = if is_static {
                RuleFlag::StaticTurretsIgnoreScientist
            } else {
                RuleFlag::TurretsIgnoreScientist
            };
            return !ruleset.has_flag(flag);
        }

        if turret.class == EntityClass::NpcAutoTurret && is_static {
            return !ruleset.has_flag(RuleFlag::SafeZoneTurretsIgnorePlayers);
        }

        let flag = if is_static {
            RuleFlag::StaticTurretsIgnorePlayers
        } else {
            RuleFlag::TurretsIgnorePlayers
        };
        if ruleset.has_flag(flag) {
            return self.targeting_escape(turret, target)
                || self.group_pair_excluded(target, turret);
        }
        true
    }

    /// May a trap fire for this entity stepping on it?
    pub fn can_trap_trigger(&self, trap: &Entity, target: &Entity) -> bool {
        let ruleset = self.resolve_for(target, trap);

        if !target.is_real_player() {
            return !ruleset.has_flag(RuleFlag::TrapsIgnoreScientist);
        }

        if ruleset.has_flag(RuleFlag::TrapsIgnorePlayers) {
            if self.targeting_escape(trap, target) {
                return true;
            }
            if self.config.options.players_trigger_traps
                && trap.owner.is_none()
                && trap.parent.is_none()
            {
                return true;
            }
            return false;
        }
        true
    }

    /// May a turret track the bradley?
    pub fn can_turret_target_bradley(&self, turret: &Entity, bradley: &Entity) -> bool {
        let ruleset = self.resolve_for(bradley, turret);
        if !ruleset.has_flag(RuleFlag::TurretsIgnoreBradley) {
            return true;
        }
        if self.zone_excluded_between(bradley, turret) {
            return true;
        }
        if self.group_pair_excluded(bradley, turret) {
            return true;
        }
        false
    }

    /// May a player launch MLRS rockets right now?
    pub fn can_mlrs_fire(&self, player: &Entity, mlrs: &Entity) -> bool {
        let ruleset = self.resolve_for(player, mlrs);
        !ruleset.has_flag(RuleFlag::NoMlrsDamage)
    }

    /// May an animal NPC target this player? Memoized for a minute per
    /// (npc, target) pair since herds re-query constantly.
    pub fn can_npc_target(&self, npc: &Entity, target: &Entity) -> bool {
        let key = (npc.id, target.id);
        if let Some(cached) = self.npc_cache.borrow_mut().get(&key) {
            return *cached;
        }
        let result = self.compute_npc_target(npc, target);
        self.npc_cache.borrow_mut().insert(key, result);
        result
    }

    fn compute_npc_target(&self, npc: &Entity, target: &Entity) -> bool {
        if !target.is_real_player() || !target.is_sleeping() {
            return true;
        }
        let ruleset = self.resolve_for(target, npc);
        let protected =
            self.animals_ignore_sleepers || ruleset.has_flag(RuleFlag::AnimalsIgnoreSleepers);
        if !protected {
            return true;
        }
        if self.zone_excluded_between(target, npc) {
            return true;
        }
        false
    }

    fn targeting_escape(&self, attacker: &Entity, target: &Entity) -> bool {
        if self.zone_excluded_between(target, attacker) {
            return true;
        }
        self.entity_group_excluded(attacker)
    }

    // === Trace plumbing ===

    fn expire_trace(&self) {
        if let Some(expiry) = self.trace_expires.get() {
            if Instant::now() >= expiry {
                self.trace_enabled.set(false);
                self.trace_expires.set(None);
                tracing::info!("trace mode timed out");
            }
        }
    }

    fn flush_trace(&self, ctx: &mut DecisionContext<'_>) {
        let lines = ctx.trace.take();
        if lines.is_empty() {
            return;
        }
        let text = lines.join("\n");
        if self.config.options.trace_to_console {
            tracing::info!(target: "pve_warden::trace", "{text}");
        }
        if self.config.options.trace_to_file {
            self.trace_file.append(&text);
        }
    }
}
