//! Engine tunables consumed at configuration load
//!
//! Everything here is read once when a configuration is compiled; the
//! pipeline never consults the config file at decision time.

use serde::{Deserialize, Serialize};

/// Protection handling for player-built blocks when a griefing attempt is
/// blocked (the twig/wood damage flags and the per-grade handler).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockProtectionOptions {
    /// Apply the ownership handler to twig blocks even without the
    /// TwigDamage flag.
    pub twig: bool,
    pub wood: bool,
    pub stone: bool,
    pub metal: bool,
    pub top_tier: bool,

    /// Only act when the block's owner is online.
    pub require_owner_online: bool,

    /// Log blocked offenses for admin review.
    pub log_offenses: bool,

    /// Send the offender a warning message.
    pub notify_offenders: bool,

    /// Reflect this multiple of the attempted damage back onto the
    /// offender; 0 disables reflection.
    pub reflect_multiplier: f32,
}

impl Default for BlockProtectionOptions {
    fn default() -> Self {
        Self {
            twig: false,
            wood: false,
            stone: false,
            metal: false,
            top_tier: false,
            require_owner_online: true,
            log_offenses: false,
            notify_offenders: false,
            reflect_multiplier: 0.0,
        }
    }
}

impl BlockProtectionOptions {
    /// True when any grade handling or side effect is configured.
    pub fn any(&self) -> bool {
        self.twig
            || self.wood
            || self.stone
            || self.metal
            || self.top_tier
            || self.log_offenses
            || self.notify_offenders
            || self.reflect_multiplier > 0.0
    }
}

/// Sleeper-kill allowances evaluated before everything else in the
/// pipeline (absolute exemptions).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SleeperOptions {
    /// Anyone may kill any sleeping player.
    pub allow_killing: bool,

    /// Only allies of the sleeper may kill them.
    pub ally_only: bool,

    /// Only players authorized on the sleeper's base may kill them.
    pub authorization_only: bool,

    /// Explicit attacker ids that may always kill sleepers.
    pub allowed_ids: Vec<u64>,

    /// Sleepers offline longer than this many hours become killable;
    /// 0 disables the window.
    pub hours_offline: f32,
}

impl SleeperOptions {
    pub fn any(&self) -> bool {
        self.allow_killing
            || self.ally_only
            || self.authorization_only
            || !self.allowed_ids.is_empty()
            || self.hours_offline > 0.0
    }
}

/// Engine options
///
/// Defaults reproduce the stock behavior: damage handling on, zones on,
/// metabolism damage blocked, scrap-heli suppression on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Master switch for damage handling. When false every decision is
    /// an immediate allow.
    pub handle_damage: bool,

    /// Consult the zone provider for per-zone rule-set mapping.
    pub use_zones: bool,

    /// Stream decision traces to the log sink.
    pub trace_to_console: bool,

    /// Append decision traces to the rotating trace file.
    pub trace_to_file: bool,

    /// Trace mode switches itself off after this many seconds.
    pub trace_timeout_secs: u64,

    /// Allow cold metabolism damage below the computed threshold.
    pub allow_cold_metabolism: bool,

    /// Allow heat metabolism damage below the computed threshold.
    pub allow_heat_metabolism: bool,

    /// Host simulation tick interval, part of the metabolism threshold.
    pub server_tick_interval: f32,

    /// Block decay damage to vehicles (decay to everything else is
    /// always allowed).
    pub block_decay_to_vehicles: bool,

    /// Suppress damage dealt by scrap transport helicopters to players.
    pub block_scrap_heli_damage: bool,

    /// Fireworks only take damage from helicopters.
    pub ignore_firework_damage: bool,

    /// Players may always break campfires.
    pub ignore_campfire_damage: bool,

    /// Players may always break ladders.
    pub ignore_ladder_damage: bool,

    /// Players may always break sleeping bags.
    pub ignore_sleeping_bag_damage: bool,

    /// Unowned traps in monument topology may target players.
    pub players_trigger_traps: bool,

    /// Players may hurt unowned traps in monument topology.
    pub players_hurt_traps: bool,

    /// Unowned turrets in monument topology may target players.
    pub players_trigger_turrets: bool,

    /// Players may hurt unowned turrets in monument topology.
    pub players_hurt_turrets: bool,

    /// When exactly one side of an event is inside mapped zones, resolve
    /// to the deny-everything dud rule-set instead of the current one.
    pub asymmetric_zone_dud: bool,

    /// Minimum seconds between feedback messages to one player.
    pub message_throttle_secs: f32,

    pub sleepers: SleeperOptions,

    pub block_protection: BlockProtectionOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            handle_damage: true,
            use_zones: true,
            trace_to_console: true,
            trace_to_file: true,
            trace_timeout_secs: 300,
            allow_cold_metabolism: false,
            allow_heat_metabolism: false,
            server_tick_interval: 0.0625,
            block_decay_to_vehicles: false,
            block_scrap_heli_damage: true,
            ignore_firework_damage: true,
            ignore_campfire_damage: false,
            ignore_ladder_damage: false,
            ignore_sleeping_bag_damage: false,
            players_trigger_traps: true,
            players_hurt_traps: false,
            players_trigger_turrets: true,
            players_hurt_turrets: false,
            asymmetric_zone_dud: false,
            message_throttle_secs: 1.0,
            sleepers: SleeperOptions::default(),
            block_protection: BlockProtectionOptions::default(),
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.server_tick_interval <= 0.0 {
            return Err(format!(
                "server_tick_interval ({}) must be positive",
                self.server_tick_interval
            ));
        }
        if self.block_protection.reflect_multiplier < 0.0 {
            return Err("block_protection.reflect_multiplier must be >= 0".into());
        }
        if self.sleepers.hours_offline < 0.0 {
            return Err("sleepers.hours_offline must be >= 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineOptions::default().validate().is_ok());
    }

    #[test]
    fn test_negative_reflect_multiplier_rejected() {
        let mut options = EngineOptions::default();
        options.block_protection.reflect_multiplier = -1.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_block_protection_any() {
        let mut block = BlockProtectionOptions::default();
        assert!(!block.any());
        block.reflect_multiplier = 2.0;
        assert!(block.any());
    }

    #[test]
    fn test_sleeper_options_any() {
        let mut sleepers = SleeperOptions::default();
        assert!(!sleepers.any());
        sleepers.hours_offline = 24.0;
        assert!(sleepers.any());
    }
}
