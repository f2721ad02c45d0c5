//! PVE Warden - damage authorization rule engine
//!
//! Decides, for every damage interaction between two entities in a
//! persistent live simulation, whether the damage is permitted. Named
//! rule sets of directional "X can/cannot hurt Y" statements combine
//! with entity groups, a time-driven schedule, zone mappings and a fixed
//! chain of flag-gated special cases into one synchronous boolean
//! decision per event.

pub mod cache;
pub mod core;
pub mod pipeline;
pub mod rules;
pub mod schedule;
pub mod zones;

pub use crate::core::error::{Result, WardenError};
pub use crate::core::options::EngineOptions;
pub use crate::core::types::{
    BuildingGrade, DamageEvent, DamageKind, Entity, EntityClass, EntityId, PlayerId, PlayerState,
    Verdict,
};
pub use crate::pipeline::{
    Authorization, DamageEngine, Feedback, NullProvider, OverrideHook, ZoneProvider,
};
pub use crate::rules::{EntityGroup, RuleFlag, RuleFlags, RuleSet, WardenConfig};
pub use crate::schedule::{Clock, Schedule, ScheduleEntry, SystemClock, WeekTime};
pub use crate::zones::{ZoneResolution, ZoneResolver};
