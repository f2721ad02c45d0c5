//! Rule model: directional rules, rule sets, flags, entity groups

pub mod flags;
pub mod group;
pub mod loader;
pub mod rule;
pub mod ruleset;

pub use flags::{RuleFlag, RuleFlags};
pub use group::EntityGroup;
pub use loader::WardenConfig;
pub use rule::{rule_key, Rule, ANY};
pub use ruleset::{RuleMatch, RuleSet};
