//! Schedule-driven rule-set switching, end to end through the engine.

use pve_warden::{
    Clock, DamageEngine, DamageEvent, DamageKind, Entity, EntityClass, PlayerId, PlayerState,
    WardenConfig, WeekTime,
};

const SCHEDULED_CONFIG: &str = r#"
default_ruleset = "day"

[schedule]
enabled = true
use_realtime = false
broadcast = true
entries = [
    "00:00 day Quiet hours have begun",
    "12:00 night PVP is now live",
]

[[rulesets]]
name = "day"
default_allow_damage = false
rules = ["players cannot hurt players", "anything can hurt players"]

[[rulesets]]
name = "night"
default_allow_damage = true
rules = ["players can hurt players"]

[[groups]]
name = "players"
members = "BasePlayer"
"#;

/// Clock pinned to one moment of simulated time.
struct SimClock(u32);

impl Clock for SimClock {
    fn week_now(&self) -> WeekTime {
        WeekTime(self.0)
    }

    fn sim_time_of_day(&self) -> Option<u32> {
        Some(self.0 % WeekTime::DAY_SECS)
    }
}

fn player(id: u64, account: u64) -> Entity {
    Entity::new(id, EntityClass::Player, "BasePlayer", "player")
        .with_player(PlayerState::real(PlayerId(account)))
}

fn pvp_event() -> DamageEvent {
    DamageEvent::new(
        player(1, 100),
        Some(player(2, 200)),
        vec![(DamageKind::Bullet, 20.0)],
    )
}

#[test]
fn schedule_switches_current_ruleset() {
    let mut engine = DamageEngine::new(WardenConfig::from_toml_str(SCHEDULED_CONFIG).unwrap());
    assert_eq!(engine.current_ruleset_name(), "day");
    assert!(!engine.decide(&pvp_event()));

    // Past noon the night set takes over and PVP opens up.
    let broadcast = engine.schedule_tick(&SimClock(13 * 3600));
    assert_eq!(engine.current_ruleset_name(), "night");
    assert_eq!(broadcast.as_deref(), Some("PVP is now live"));
    assert!(engine.decide(&pvp_event()));

    // Just after midnight the day set returns.
    let broadcast = engine.schedule_tick(&SimClock(60));
    assert_eq!(engine.current_ruleset_name(), "day");
    assert_eq!(broadcast.as_deref(), Some("Quiet hours have begun"));
    assert!(!engine.decide(&pvp_event()));
}

#[test]
fn tick_without_change_is_quiet() {
    let mut engine = DamageEngine::new(WardenConfig::from_toml_str(SCHEDULED_CONFIG).unwrap());
    engine.schedule_tick(&SimClock(13 * 3600));
    // Same selection again: no broadcast, no reinstall.
    assert!(engine.schedule_tick(&SimClock(14 * 3600)).is_none());
    assert_eq!(engine.current_ruleset_name(), "night");
}

#[test]
fn deterministic_selection_at_boundaries() {
    let mut engine = DamageEngine::new(WardenConfig::from_toml_str(SCHEDULED_CONFIG).unwrap());
    for (seconds, expected) in [
        (13 * 3600, "night"),
        (23 * 3600, "night"),
        (60, "day"),
        (12 * 3600, "night"),
    ] {
        engine.schedule_tick(&SimClock(seconds));
        assert_eq!(engine.current_ruleset_name(), expected, "at {seconds}s");
    }
}

#[test]
fn invalid_schedule_disables_itself() {
    let single_entry = SCHEDULED_CONFIG.replace("\"12:00 night PVP is now live\",", "");
    let config = WardenConfig::from_toml_str(&single_entry).unwrap();
    assert!(!config.schedule.valid);
    assert!(!config.schedule.enabled);

    let mut engine = DamageEngine::new(config);
    assert!(engine.schedule_tick(&SimClock(13 * 3600)).is_none());
    assert_eq!(engine.current_ruleset_name(), "day");
    assert!(engine.set_schedule_enabled(true).is_err());
}

#[test]
fn single_distinct_ruleset_invalidates_schedule() {
    let config = WardenConfig::from_toml_str(
        r#"
[schedule]
enabled = true
entries = ["00:00 day", "12:00 day"]

[[rulesets]]
name = "day"
rules = ["anything can hurt players"]
"#,
    )
    .unwrap();
    assert!(!config.schedule.valid);
    assert!(!config.schedule.enabled);
}

#[test]
fn schedule_selecting_unknown_ruleset_disables_handling() {
    let config = WardenConfig::from_toml_str(
        r#"
default_ruleset = "day"

[schedule]
enabled = true
entries = ["00:00 day", "12:00 ghost"]

[[rulesets]]
name = "day"
rules = ["players cannot hurt players"]

[[groups]]
name = "players"
members = "BasePlayer"
"#,
    )
    .unwrap();
    let mut engine = DamageEngine::new(config);
    assert!(engine.is_enabled());

    engine.schedule_tick(&SimClock(13 * 3600));
    assert_eq!(engine.current_ruleset_name(), "ghost");
    // Placeholder set is empty; handling turns off and damage passes.
    assert!(!engine.is_enabled());
    assert!(engine.decide(&pvp_event()));

    // The next morning handling comes back.
    engine.schedule_tick(&SimClock(60));
    assert!(engine.is_enabled());
    assert!(!engine.decide(&pvp_event()));
}

#[test]
fn schedule_admin_toggle() {
    let mut engine = DamageEngine::new(WardenConfig::from_toml_str(SCHEDULED_CONFIG).unwrap());
    engine.set_schedule_enabled(false).unwrap();
    assert!(engine.schedule_tick(&SimClock(13 * 3600)).is_none());
    assert_eq!(engine.current_ruleset_name(), "day");

    engine.set_schedule_enabled(true).unwrap();
    engine.schedule_tick(&SimClock(13 * 3600));
    assert_eq!(engine.current_ruleset_name(), "night");
}
