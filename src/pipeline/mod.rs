//! Damage authorization pipeline: context, ordered checks, engine

pub mod checks;
pub mod context;
pub mod engine;
pub mod providers;
pub mod trace;

pub use checks::{PolicyCheck, CHECKS};
pub use context::DecisionContext;
pub use engine::DamageEngine;
pub use providers::{Authorization, Feedback, NullProvider, OverrideHook, ZoneProvider};
pub use trace::{TraceFile, TraceLog};
