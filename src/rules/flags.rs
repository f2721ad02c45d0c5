//! Special-case override toggles attached to rule sets
//!
//! Flags are parsed from configuration once at load time. Deprecated
//! spellings are normalized through a small compatibility table; at
//! runtime the pipeline only ever tests the bitset.

use std::fmt;
use std::str::FromStr;

/// One independently toggleable special-case override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFlag {
    AdminsHurtSleepers,
    AdminsHurtPlayers,
    AnimalsIgnoreSleepers,
    AuthorizedDamage,
    AuthorizedDamageRequiresOwnership,
    AuthorizedDamageCheckPrivilege,
    CupboardOwnership,
    ExcludeVesselFromImmortalFlags,
    FriendlyFire,
    HeliDamageLocked,
    HumanNpcDamage,
    LockedBoxesImmortal,
    LockedDoorsImmortal,
    LockedVehiclesImmortal,
    NoPlayerDamageToCar,
    NoPlayerDamageToMini,
    NoPlayerDamageToScrap,
    NoHeliDamage,
    NoHeliDamagePlayer,
    NoHeliDamageQuarry,
    NoHeliDamageRidableHorses,
    NoHeliDamageSleepers,
    NoHeliDamageBuildings,
    NoMlrsDamage,
    NpcsCanHurtAnything,
    PlayerSamSitesIgnorePlayers,
    ProtectedSleepers,
    SafeZoneTurretsIgnorePlayers,
    SamSitesIgnoreMlrs,
    SelfDamage,
    StaticSamSitesIgnorePlayers,
    StaticTurretsIgnorePlayers,
    StaticTurretsIgnoreScientist,
    SuicideBlocked,
    TrapsIgnorePlayers,
    TrapsIgnoreScientist,
    TurretsIgnoreBradley,
    TurretsIgnorePlayers,
    TurretsIgnoreScientist,
    TwigDamage,
    TwigDamageRequiresOwnership,
    VehiclesTakeCollisionDamageWithoutDriver,
    WoodenDamage,
    WoodenDamageRequiresOwnership,
}

impl RuleFlag {
    const ALL: [RuleFlag; 44] = [
        RuleFlag::AdminsHurtSleepers,
        RuleFlag::AdminsHurtPlayers,
        RuleFlag::AnimalsIgnoreSleepers,
        RuleFlag::AuthorizedDamage,
        RuleFlag::AuthorizedDamageRequiresOwnership,
        RuleFlag::AuthorizedDamageCheckPrivilege,
        RuleFlag::CupboardOwnership,
        RuleFlag::ExcludeVesselFromImmortalFlags,
        RuleFlag::FriendlyFire,
        RuleFlag::HeliDamageLocked,
        RuleFlag::HumanNpcDamage,
        RuleFlag::LockedBoxesImmortal,
        RuleFlag::LockedDoorsImmortal,
        RuleFlag::LockedVehiclesImmortal,
        RuleFlag::NoPlayerDamageToCar,
        RuleFlag::NoPlayerDamageToMini,
        RuleFlag::NoPlayerDamageToScrap,
        RuleFlag::NoHeliDamage,
        RuleFlag::NoHeliDamagePlayer,
        RuleFlag::NoHeliDamageQuarry,
        RuleFlag::NoHeliDamageRidableHorses,
        RuleFlag::NoHeliDamageSleepers,
        RuleFlag::NoHeliDamageBuildings,
        RuleFlag::NoMlrsDamage,
        RuleFlag::NpcsCanHurtAnything,
        RuleFlag::PlayerSamSitesIgnorePlayers,
        RuleFlag::ProtectedSleepers,
        RuleFlag::SafeZoneTurretsIgnorePlayers,
        RuleFlag::SamSitesIgnoreMlrs,
        RuleFlag::SelfDamage,
        RuleFlag::StaticSamSitesIgnorePlayers,
        RuleFlag::StaticTurretsIgnorePlayers,
        RuleFlag::StaticTurretsIgnoreScientist,
        RuleFlag::SuicideBlocked,
        RuleFlag::TrapsIgnorePlayers,
        RuleFlag::TrapsIgnoreScientist,
        RuleFlag::TurretsIgnoreBradley,
        RuleFlag::TurretsIgnorePlayers,
        RuleFlag::TurretsIgnoreScientist,
        RuleFlag::TwigDamage,
        RuleFlag::TwigDamageRequiresOwnership,
        RuleFlag::VehiclesTakeCollisionDamageWithoutDriver,
        RuleFlag::WoodenDamage,
        RuleFlag::WoodenDamageRequiresOwnership,
    ];

    fn bit(self) -> u64 {
        let index = Self::ALL
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default();
        1u64 << index
    }

    pub fn name(self) -> &'static str {
        match self {
            RuleFlag::AdminsHurtSleepers => "AdminsHurtSleepers",
            RuleFlag::AdminsHurtPlayers => "AdminsHurtPlayers",
            RuleFlag::AnimalsIgnoreSleepers => "AnimalsIgnoreSleepers",
            RuleFlag::AuthorizedDamage => "AuthorizedDamage",
            RuleFlag::AuthorizedDamageRequiresOwnership => "AuthorizedDamageRequiresOwnership",
            RuleFlag::AuthorizedDamageCheckPrivilege => "AuthorizedDamageCheckPrivilege",
            RuleFlag::CupboardOwnership => "CupboardOwnership",
            RuleFlag::ExcludeVesselFromImmortalFlags => "ExcludeVesselFromImmortalFlags",
            RuleFlag::FriendlyFire => "FriendlyFire",
            RuleFlag::HeliDamageLocked => "HeliDamageLocked",
            RuleFlag::HumanNpcDamage => "HumanNpcDamage",
            RuleFlag::LockedBoxesImmortal => "LockedBoxesImmortal",
            RuleFlag::LockedDoorsImmortal => "LockedDoorsImmortal",
            RuleFlag::LockedVehiclesImmortal => "LockedVehiclesImmortal",
            RuleFlag::NoPlayerDamageToCar => "NoPlayerDamageToCar",
            RuleFlag::NoPlayerDamageToMini => "NoPlayerDamageToMini",
            RuleFlag::NoPlayerDamageToScrap => "NoPlayerDamageToScrap",
            RuleFlag::NoHeliDamage => "NoHeliDamage",
            RuleFlag::NoHeliDamagePlayer => "NoHeliDamagePlayer",
            RuleFlag::NoHeliDamageQuarry => "NoHeliDamageQuarry",
            RuleFlag::NoHeliDamageRidableHorses => "NoHeliDamageRidableHorses",
            RuleFlag::NoHeliDamageSleepers => "NoHeliDamageSleepers",
            RuleFlag::NoHeliDamageBuildings => "NoHeliDamageBuildings",
            RuleFlag::NoMlrsDamage => "NoMlrsDamage",
            RuleFlag::NpcsCanHurtAnything => "NpcsCanHurtAnything",
            RuleFlag::PlayerSamSitesIgnorePlayers => "PlayerSamSitesIgnorePlayers",
            RuleFlag::ProtectedSleepers => "ProtectedSleepers",
            RuleFlag::SafeZoneTurretsIgnorePlayers => "SafeZoneTurretsIgnorePlayers",
            RuleFlag::SamSitesIgnoreMlrs => "SamSitesIgnoreMlrs",
            RuleFlag::SelfDamage => "SelfDamage",
            RuleFlag::StaticSamSitesIgnorePlayers => "StaticSamSitesIgnorePlayers",
            RuleFlag::StaticTurretsIgnorePlayers => "StaticTurretsIgnorePlayers",
            RuleFlag::StaticTurretsIgnoreScientist => "StaticTurretsIgnoreScientist",
            RuleFlag::SuicideBlocked => "SuicideBlocked",
            RuleFlag::TrapsIgnorePlayers => "TrapsIgnorePlayers",
            RuleFlag::TrapsIgnoreScientist => "TrapsIgnoreScientist",
            RuleFlag::TurretsIgnoreBradley => "TurretsIgnoreBradley",
            RuleFlag::TurretsIgnorePlayers => "TurretsIgnorePlayers",
            RuleFlag::TurretsIgnoreScientist => "TurretsIgnoreScientist",
            RuleFlag::TwigDamage => "TwigDamage",
            RuleFlag::TwigDamageRequiresOwnership => "TwigDamageRequiresOwnership",
            RuleFlag::VehiclesTakeCollisionDamageWithoutDriver => {
                "VehiclesTakeCollisionDamageWithoutDriver"
            }
            RuleFlag::WoodenDamage => "WoodenDamage",
            RuleFlag::WoodenDamageRequiresOwnership => "WoodenDamageRequiresOwnership",
        }
    }
}

impl fmt::Display for RuleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RuleFlag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleFlag::ALL
            .iter()
            .copied()
            .find(|flag| flag.name().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Bitset of [`RuleFlag`]s carried by a rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFlags(u64);

impl RuleFlags {
    pub const NONE: RuleFlags = RuleFlags(0);

    pub fn contains(&self, flag: RuleFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn set(&mut self, flag: RuleFlag) {
        self.0 |= flag.bit();
    }

    pub fn with(mut self, flag: RuleFlag) -> Self {
        self.set(flag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Compile a list of configured flag names into a bitset.
    ///
    /// Deprecated spellings are mapped to their current flags; names that
    /// resolve to nothing are returned so the caller can log and drop
    /// them.
    pub fn parse_names<'a, I>(names: I) -> (RuleFlags, Vec<String>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut flags = RuleFlags::NONE;
        let mut unknown = Vec::new();

        for raw in names {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            match name.parse::<RuleFlag>() {
                Ok(flag) => flags.set(flag),
                Err(()) => match deprecated_flags(name) {
                    Some(mapped) => {
                        for flag in mapped {
                            flags.set(*flag);
                        }
                    }
                    None => unknown.push(name.to_string()),
                },
            }
        }

        (flags, unknown)
    }

    pub fn iter(&self) -> impl Iterator<Item = RuleFlag> + '_ {
        RuleFlag::ALL
            .iter()
            .copied()
            .filter(move |flag| self.contains(*flag))
    }
}

impl std::ops::BitOr for RuleFlags {
    type Output = RuleFlags;

    fn bitor(self, rhs: RuleFlags) -> RuleFlags {
        RuleFlags(self.0 | rhs.0)
    }
}

impl FromIterator<RuleFlag> for RuleFlags {
    fn from_iter<I: IntoIterator<Item = RuleFlag>>(iter: I) -> Self {
        let mut flags = RuleFlags::NONE;
        for flag in iter {
            flags.set(flag);
        }
        flags
    }
}

/// Compatibility table for flag spellings retired from the configuration
/// format but still found in older files.
fn deprecated_flags(name: &str) -> Option<&'static [RuleFlag]> {
    if name.eq_ignore_ascii_case("SamSitesIgnorePlayers") {
        return Some(&[
            RuleFlag::PlayerSamSitesIgnorePlayers,
            RuleFlag::StaticSamSitesIgnorePlayers,
        ]);
    }
    if name.eq_ignore_ascii_case("TrapsIgnoreScientists") {
        return Some(&[RuleFlag::TrapsIgnoreScientist]);
    }
    if name.eq_ignore_ascii_case("TurretsIgnoreScientists") {
        return Some(&[RuleFlag::TurretsIgnoreScientist]);
    }
    if name.eq_ignore_ascii_case("StaticTurretsIgnoreScientists") {
        return Some(&[RuleFlag::StaticTurretsIgnoreScientist]);
    }
    if name.eq_ignore_ascii_case("ExcludeTugboatFromImmortalFlags") {
        return Some(&[RuleFlag::ExcludeVesselFromImmortalFlags]);
    }
    None
}
