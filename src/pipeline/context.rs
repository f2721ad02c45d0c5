//! Per-event decision context
//!
//! Transient scratch state for one decision: the resolved acting entity,
//! zone locations for both sides, the selected rule set and the trace
//! buffer. Built at the top of `decide` and dropped when it returns.

use crate::core::types::{DamageEvent, DamageKind, Entity, PlayerId};
use crate::pipeline::trace::TraceLog;
use crate::rules::flags::{RuleFlag, RuleFlags};
use crate::rules::ruleset::RuleSet;

/// Scratch state threaded through the ordered policy checks.
pub struct DecisionContext<'a> {
    pub event: &'a DamageEvent,
    /// The entity held responsible for the damage: the player behind a
    /// projectile/deployed sub-entity when one exists, otherwise the raw
    /// initiator.
    pub attacker: Option<&'a Entity>,
    /// Most specific damage-dealing entity for category checks and trace
    /// labels.
    pub weapon: Option<&'a Entity>,
    pub damage_kind: DamageKind,
    pub damage_amount: f32,
    pub victim_locations: Vec<String>,
    pub attacker_locations: Vec<String>,
    /// Rule set selected by schedule + zone mapping; `None` until the
    /// resolution step runs.
    pub ruleset: Option<&'a RuleSet>,
    pub trace: TraceLog,
}

impl<'a> DecisionContext<'a> {
    pub fn new(event: &'a DamageEvent, trace_active: bool) -> Self {
        let attacker = resolve_attacker(event);
        let weapon = attacker
            .or(event.weapon_prefab.as_ref())
            .or(event.weapon.as_ref());

        Self {
            event,
            attacker,
            weapon,
            damage_kind: event.majority_kind(),
            damage_amount: event.total_damage(),
            victim_locations: Vec::new(),
            attacker_locations: Vec::new(),
            ruleset: None,
            trace: TraceLog::new(trace_active),
        }
    }

    pub fn victim(&self) -> &'a Entity {
        &self.event.victim
    }

    pub fn flags(&self) -> RuleFlags {
        self.ruleset.map(|set| set.flags).unwrap_or(RuleFlags::NONE)
    }

    pub fn has_flag(&self, flag: RuleFlag) -> bool {
        self.flags().contains(flag)
    }

    pub fn attacker_is_player(&self) -> bool {
        self.attacker.is_some_and(|a| a.is_player())
    }

    pub fn attacker_is_real_player(&self) -> bool {
        self.attacker.is_some_and(|a| a.is_real_player())
    }

    pub fn attacker_player_id(&self) -> Option<PlayerId> {
        self.attacker.and_then(|a| a.player_id())
    }

    pub fn victim_is_real_player(&self) -> bool {
        self.event.victim.is_real_player()
    }

    pub fn victim_player_id(&self) -> Option<PlayerId> {
        self.event.victim.player_id()
    }
}

/// Unwrap projectile/parent/creator chains to find the responsible
/// entity: the first player found behind the initiator, the weapon
/// prefab, or the held weapon, falling back to the raw initiator.
pub fn resolve_attacker(event: &DamageEvent) -> Option<&Entity> {
    let candidates = [
        event.initiator.as_ref(),
        event.weapon_prefab.as_ref(),
        event.weapon.as_ref(),
    ];
    for candidate in candidates.into_iter().flatten() {
        if let Some(player) = candidate.responsible_player() {
            return Some(player);
        }
    }
    event.initiator.as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{EntityClass, PlayerState};

    #[test]
    fn test_attacker_prefers_initiator_player() {
        let attacker = Entity::new(1, EntityClass::Player, "BasePlayer", "player")
            .with_player(PlayerState::real(PlayerId(10)));
        let victim = Entity::new(2, EntityClass::Player, "BasePlayer", "player")
            .with_player(PlayerState::real(PlayerId(20)));
        let event = DamageEvent::new(victim, Some(attacker), vec![(DamageKind::Bullet, 10.0)]);

        let ctx = DecisionContext::new(&event, false);
        assert_eq!(ctx.attacker_player_id(), Some(PlayerId(10)));
        assert!(ctx.attacker_is_real_player());
    }

    #[test]
    fn test_attacker_unwraps_weapon_prefab_creator() {
        let shooter = Entity::new(1, EntityClass::Player, "BasePlayer", "player")
            .with_player(PlayerState::real(PlayerId(10)));
        let rocket = Entity::new(3, EntityClass::Other, "TimedExplosive", "rocket_basic")
            .with_creator(shooter);
        let victim = Entity::new(2, EntityClass::BuildingBlock, "BuildingBlock", "wall");
        let fire = Entity::new(4, EntityClass::Other, "FireBall", "fireball");
        let event = DamageEvent::new(victim, Some(fire), vec![(DamageKind::Explosion, 50.0)])
            .with_weapon_prefab(rocket);

        let ctx = DecisionContext::new(&event, false);
        assert_eq!(ctx.attacker_player_id(), Some(PlayerId(10)));
    }

    #[test]
    fn test_attacker_falls_back_to_initiator() {
        let fire = Entity::new(4, EntityClass::Other, "FireBall", "fireball");
        let victim = Entity::new(2, EntityClass::BuildingBlock, "BuildingBlock", "wall");
        let event = DamageEvent::new(victim, Some(fire.clone()), vec![(DamageKind::Heat, 5.0)]);

        let ctx = DecisionContext::new(&event, false);
        assert_eq!(ctx.attacker.map(|a| a.id), Some(fire.id));
        assert!(!ctx.attacker_is_player());
    }

    #[test]
    fn test_no_initiator() {
        let victim = Entity::new(2, EntityClass::Player, "BasePlayer", "player")
            .with_player(PlayerState::real(PlayerId(20)));
        let event = DamageEvent::new(victim, None, vec![(DamageKind::Fall, 12.0)]);

        let ctx = DecisionContext::new(&event, false);
        assert!(ctx.attacker.is_none());
        assert!(ctx.weapon.is_none());
        assert_eq!(ctx.damage_kind, DamageKind::Fall);
    }
}
