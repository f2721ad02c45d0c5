//! Collaborator interfaces
//!
//! The engine consumes its surroundings through these narrow traits. Every
//! one of them has a null implementation so a missing collaborator
//! degrades the feature instead of failing the engine: no zones means
//! zoneless entities, no authorization means nobody is privileged and
//! only self-ally holds.

use crate::core::types::{DamageEvent, DamageKind, Entity, PlayerId};

/// Zone membership lookup, backed by the host's zone subsystem.
pub trait ZoneProvider {
    /// Ordered zone names the entity currently occupies; empty when the
    /// provider cannot place it.
    fn locations_for(&self, entity: &Entity) -> Vec<String>;
}

/// Ownership/authorization capability (building privilege, vessel
/// authorization, team/clan allies).
pub trait Authorization {
    /// Whether `actor` holds authorization over `entity` (building
    /// privilege, vessel crew list).
    fn is_privileged(&self, entity: &Entity, actor: PlayerId) -> bool;

    /// Whether two players count as allies (same team/clan/friends).
    /// Self is always an ally.
    fn is_ally(&self, a: PlayerId, b: PlayerId) -> bool {
        a == b
    }
}

/// External override consulted before anything else in the pipeline.
pub trait OverrideHook {
    /// `Some(true)` forces allow, `Some(false)` forces deny, `None`
    /// lets the pipeline run.
    fn check(&self, event: &DamageEvent) -> Option<bool>;
}

/// Outbound side effects: player feedback and reflected damage.
pub trait Feedback {
    fn message(&self, player: PlayerId, text: &str);

    /// Hurt a griefing attacker back. Only invoked when damage
    /// reflection is configured.
    fn reflect_damage(&self, player: PlayerId, amount: f32, kind: DamageKind);
}

/// Null collaborator: no zones, no authorization, no override, silent
/// feedback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

impl ZoneProvider for NullProvider {
    fn locations_for(&self, _entity: &Entity) -> Vec<String> {
        Vec::new()
    }
}

impl Authorization for NullProvider {
    fn is_privileged(&self, _entity: &Entity, _actor: PlayerId) -> bool {
        false
    }
}

impl OverrideHook for NullProvider {
    fn check(&self, _event: &DamageEvent) -> Option<bool> {
        None
    }
}

impl Feedback for NullProvider {
    fn message(&self, _player: PlayerId, _text: &str) {}

    fn reflect_damage(&self, _player: PlayerId, _amount: f32, _kind: DamageKind) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::EntityClass;

    #[test]
    fn test_null_provider_degrades() {
        let provider = NullProvider;
        let entity = Entity::new(1, EntityClass::Player, "BasePlayer", "player");
        assert!(provider.locations_for(&entity).is_empty());
        assert!(!provider.is_privileged(&entity, PlayerId(1)));
        // Self is always an ally, others never are without a backend.
        assert!(provider.is_ally(PlayerId(1), PlayerId(1)));
        assert!(!provider.is_ally(PlayerId(1), PlayerId(2)));
    }
}
