//! Core type definitions used throughout the engine

use serde::{Deserialize, Serialize};

/// Stable identifier for a simulation entity, supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Identifier for a player account.
///
/// Real players and NPC pseudo-players share the id space; the host marks
/// which is which on the [`PlayerState`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

/// Damage classification carried on an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    Decay,
    Fall,
    Radiation,
    Cold,
    Heat,
    Collision,
    Suicide,
    Arrow,
    Blunt,
    Bullet,
    Explosion,
    Generic,
    Slash,
    Stab,
}

impl DamageKind {
    /// Kinds that fall back to the rule-set default when the event has no
    /// initiator (environmental or delayed damage attributed to nobody).
    pub fn counts_when_unattributed(&self) -> bool {
        matches!(
            self,
            DamageKind::Arrow
                | DamageKind::Blunt
                | DamageKind::Bullet
                | DamageKind::Explosion
                | DamageKind::Cold
                | DamageKind::Heat
                | DamageKind::Generic
                | DamageKind::Slash
                | DamageKind::Stab
        )
    }
}

/// The entity categories the decision pipeline branches on.
///
/// Finer-grained classification (group membership) is string-tag based and
/// lives in the rule configuration; this enum only covers the fixed
/// special cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    Player,
    /// Human-model NPC (scientist, dweller, scarecrow).
    Npc,
    Animal,
    PatrolHelicopter,
    BradleyApc,
    MlrsRocket,
    SamSite,
    AutoTurret,
    /// Safe-zone turret owned by the world, not a player.
    NpcAutoTurret,
    Trap,
    MiningQuarry,
    RidableHorse,
    Minicopter,
    ScrapHelicopter,
    TransportHelicopter,
    ModularCar,
    /// Any other drivable vehicle.
    Vehicle,
    /// Seats, lifts and other mountables that are not vehicles themselves.
    Mountable,
    /// Player-crewed vessel that carries its own authorization list.
    Vessel,
    BuildingBlock,
    Door,
    StorageContainer,
    LootContainer,
    Barricade,
    GrowableEntity,
    SleepingBag,
    Campfire,
    Ladder,
    Firework,
    Other,
}

impl EntityClass {
    pub fn is_vehicle(&self) -> bool {
        matches!(
            self,
            EntityClass::RidableHorse
                | EntityClass::Minicopter
                | EntityClass::ScrapHelicopter
                | EntityClass::TransportHelicopter
                | EntityClass::ModularCar
                | EntityClass::Vehicle
                | EntityClass::Vessel
        )
    }

    pub fn is_turret(&self) -> bool {
        matches!(self, EntityClass::AutoTurret | EntityClass::NpcAutoTurret)
    }
}

/// Construction tier of a building block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingGrade {
    Twigs,
    Wood,
    Stone,
    Metal,
    TopTier,
}

/// Player-specific state attached to an [`Entity`] snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: PlayerId,
    /// True for real accounts, false for NPC pseudo-players.
    pub real: bool,
    pub admin: bool,
    pub sleeping: bool,
    pub connected: bool,
    /// Body temperature, used by the metabolism damage threshold.
    pub temperature: f32,
    /// Snapshot of the vehicle/seat the player is mounted on, if any.
    pub mounted: Option<Box<Entity>>,
}

impl PlayerState {
    /// Snapshot for a real, awake, connected player.
    pub fn real(id: PlayerId) -> Self {
        Self {
            id,
            real: true,
            admin: false,
            sleeping: false,
            connected: true,
            temperature: 20.0,
            mounted: None,
        }
    }

    /// Snapshot for a human-model NPC.
    pub fn npc(id: PlayerId) -> Self {
        Self {
            id,
            real: false,
            admin: false,
            sleeping: false,
            connected: false,
            temperature: 20.0,
            mounted: None,
        }
    }

    pub fn sleeping(mut self) -> Self {
        self.sleeping = true;
        self.connected = false;
        self
    }

    pub fn admin(mut self) -> Self {
        self.admin = true;
        self
    }

    pub fn mounted_on(mut self, vehicle: Entity) -> Self {
        self.mounted = Some(Box::new(vehicle));
        self
    }
}

/// Transient snapshot of a simulation entity, supplied by the host per
/// damage event. The engine never retains these across calls; caches key
/// on [`EntityId`] only.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub class: EntityClass,
    /// Semantic type name, e.g. `BasePlayer`. Matched case-insensitively.
    pub type_tag: String,
    /// Short prefab name, e.g. `door_barricade_a`. Matched case-insensitively.
    pub prefab_tag: String,
    pub owner: Option<PlayerId>,
    pub player: Option<PlayerState>,
    /// True when a lock is attached and engaged.
    pub locked: bool,
    pub grade: Option<BuildingGrade>,
    /// True when the entity stands in monument topology.
    pub in_monument: bool,
    /// For vehicles: whether a driver is currently seated.
    pub occupied: bool,
    /// Whether a tower/base privilege currently covers this entity.
    pub under_privilege: bool,
    pub parent: Option<Box<Entity>>,
    pub creator: Option<Box<Entity>>,
}

impl Entity {
    pub fn new(
        id: u64,
        class: EntityClass,
        type_tag: impl Into<String>,
        prefab_tag: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId(id),
            class,
            type_tag: type_tag.into(),
            prefab_tag: prefab_tag.into(),
            owner: None,
            player: None,
            locked: false,
            grade: None,
            in_monument: false,
            occupied: false,
            under_privilege: false,
            parent: None,
            creator: None,
        }
    }

    pub fn with_owner(mut self, owner: PlayerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_player(mut self, player: PlayerState) -> Self {
        self.owner = Some(player.id);
        self.player = Some(player);
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn with_grade(mut self, grade: BuildingGrade) -> Self {
        self.grade = Some(grade);
        self
    }

    pub fn with_parent(mut self, parent: Entity) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn with_creator(mut self, creator: Entity) -> Self {
        self.creator = Some(Box::new(creator));
        self
    }

    pub fn in_monument(mut self) -> Self {
        self.in_monument = true;
        self
    }

    pub fn occupied(mut self) -> Self {
        self.occupied = true;
        self
    }

    pub fn under_privilege(mut self) -> Self {
        self.under_privilege = true;
        self
    }

    pub fn is_player(&self) -> bool {
        self.class == EntityClass::Player && self.player.is_some()
    }

    /// True for players carrying a real account id.
    pub fn is_real_player(&self) -> bool {
        matches!(&self.player, Some(p) if p.real)
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player.as_ref().map(|p| p.id)
    }

    pub fn is_sleeping(&self) -> bool {
        matches!(&self.player, Some(p) if p.sleeping)
    }

    pub fn parent_class(&self) -> Option<EntityClass> {
        self.parent.as_ref().map(|p| p.class)
    }

    /// Walks self, then the creator, then the parent, returning the first
    /// entity that is a player. Used to pin responsibility for projectiles
    /// and deployed sub-entities on the player behind them.
    pub fn responsible_player(&self) -> Option<&Entity> {
        if self.is_player() {
            return Some(self);
        }
        if let Some(creator) = &self.creator {
            if creator.is_player() {
                return Some(creator);
            }
        }
        if let Some(parent) = &self.parent {
            if parent.is_player() {
                return Some(parent);
            }
        }
        None
    }
}

/// A damage notification delivered by the host's event source.
#[derive(Debug, Clone)]
pub struct DamageEvent {
    pub victim: Entity,
    pub initiator: Option<Entity>,
    /// The projectile/explosive prefab that carried the damage, if any.
    pub weapon_prefab: Option<Entity>,
    /// The held weapon entity, if any.
    pub weapon: Option<Entity>,
    pub damage: Vec<(DamageKind, f32)>,
}

impl DamageEvent {
    pub fn new(victim: Entity, initiator: Option<Entity>, damage: Vec<(DamageKind, f32)>) -> Self {
        Self {
            victim,
            initiator,
            weapon_prefab: None,
            weapon: None,
            damage,
        }
    }

    pub fn with_weapon_prefab(mut self, weapon_prefab: Entity) -> Self {
        self.weapon_prefab = Some(weapon_prefab);
        self
    }

    pub fn with_weapon(mut self, weapon: Entity) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn total_damage(&self) -> f32 {
        self.damage.iter().map(|(_, amount)| amount).sum()
    }

    /// The kind carrying the largest single amount; `Generic` when the
    /// event carries no damage at all.
    pub fn majority_kind(&self) -> DamageKind {
        self.damage
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(kind, _)| *kind)
            .unwrap_or(DamageKind::Generic)
    }

    pub fn has_kind(&self, kind: DamageKind) -> bool {
        self.damage.iter().any(|(k, _)| *k == kind)
    }
}

/// Outcome of a single policy check in the decision pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny,
    /// Not applicable; fall through to the next check.
    Continue,
}
