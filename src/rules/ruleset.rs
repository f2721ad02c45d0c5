//! Named rule bundles and precedence-ordered evaluation

use ahash::AHashMap;

use crate::rules::flags::{RuleFlag, RuleFlags};
use crate::rules::rule::{rule_key, Rule, ANY};

/// How an evaluation reached its answer, for tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// A direct `attacker->target` rule matched.
    Pairwise(String),
    /// An `attacker->any` rule matched.
    AttackerAny(String),
    /// An `any->target` rule matched.
    AnyTarget(String),
    /// No rule matched; the set default was used.
    Default,
    /// No rule matched and the default was not consulted.
    FallthroughAllow,
}

/// Named bundle of directional rules plus an independent flags bitset.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub name: String,
    pub enabled: bool,
    pub default_allow_damage: bool,
    pub flags: RuleFlags,
    rules: AHashMap<String, Rule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            default_allow_damage: false,
            flags: RuleFlags::NONE,
            rules: AHashMap::new(),
        }
    }

    /// Parse and add one rule line. Later text for the same canonical key
    /// overwrites the earlier rule. Returns false when the line does not
    /// parse (caller logs and drops it).
    pub fn add_rule(&mut self, text: &str) -> bool {
        match Rule::parse(text) {
            Some(rule) => {
                self.rules.insert(rule.key.clone(), rule);
                true
            }
            None => false,
        }
    }

    /// Remove the rule stored under the given text's canonical key.
    pub fn remove_rule(&mut self, text: &str) -> bool {
        match Rule::parse(text) {
            Some(rule) => self.rules.remove(&rule.key).is_some(),
            None => false,
        }
    }

    pub fn has_flag(&self, flag: RuleFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    /// A pass-through set: nothing to evaluate and no overrides. Zones
    /// mapped to an empty set are treated as excluded.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.flags.is_empty()
    }

    /// Evaluate attacker groups against target groups.
    ///
    /// Precedence, first match wins:
    /// 1. every `(a, b)` pair across attacker x target groups, in list order;
    /// 2. `a->any` for every attacker group;
    /// 3. `any->b` for every target group;
    /// 4. the set default when `use_default_on_miss`, otherwise allow.
    ///
    /// A specific pairwise rule therefore overrides a wildcard rule in
    /// either direction, and wildcard rules outrank the set default.
    pub fn evaluate(
        &self,
        attacker_groups: &[String],
        target_groups: &[String],
        use_default_on_miss: bool,
    ) -> bool {
        self.evaluate_detailed(attacker_groups, target_groups, use_default_on_miss)
            .0
    }

    /// As [`evaluate`](Self::evaluate), also reporting which lookup
    /// decided the outcome.
    pub fn evaluate_detailed(
        &self,
        attacker_groups: &[String],
        target_groups: &[String],
        use_default_on_miss: bool,
    ) -> (bool, RuleMatch) {
        if !self.rules.is_empty() {
            for a in attacker_groups {
                for b in target_groups {
                    let key = rule_key(a, b);
                    if let Some(rule) = self.rules.get(&key) {
                        return (rule.hurt, RuleMatch::Pairwise(key));
                    }
                }
            }

            for a in attacker_groups {
                let key = rule_key(a, ANY);
                if let Some(rule) = self.rules.get(&key) {
                    return (rule.hurt, RuleMatch::AttackerAny(key));
                }
            }

            for b in target_groups {
                let key = rule_key(ANY, b);
                if let Some(rule) = self.rules.get(&key) {
                    return (rule.hurt, RuleMatch::AnyTarget(key));
                }
            }
        }

        if use_default_on_miss {
            (self.default_allow_damage, RuleMatch::Default)
        } else {
            (true, RuleMatch::FallthroughAllow)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pairwise_rule_decides() {
        let mut set = RuleSet::new("test");
        set.add_rule("a cannot hurt b");
        assert!(!set.evaluate(&groups(&["a"]), &groups(&["b"]), true));
        // Direction matters.
        assert!(set.evaluate(&groups(&["b"]), &groups(&["a"]), false));
    }

    #[test]
    fn test_pairwise_outranks_wildcard() {
        let mut set = RuleSet::new("test");
        set.add_rule("fire cannot hurt players");
        set.add_rule("anything can hurt players");
        assert!(!set.evaluate(&groups(&["fire"]), &groups(&["players"]), true));
        assert!(set.evaluate(&groups(&["npcs"]), &groups(&["players"]), true));
    }

    #[test]
    fn test_attacker_any_outranks_any_target() {
        let mut set = RuleSet::new("test");
        set.add_rule("cars cannot hurt anything");
        set.add_rule("anything can hurt players");
        let (hurt, matched) =
            set.evaluate_detailed(&groups(&["cars"]), &groups(&["players"]), true);
        assert!(!hurt);
        assert_eq!(matched, RuleMatch::AttackerAny("cars->any".to_string()));
    }

    #[test]
    fn test_group_list_order_wins_ties() {
        let mut set = RuleSet::new("test");
        set.add_rule("guards cannot hurt players");
        set.add_rule("npcs can hurt players");
        // Attacker matches both groups; the first listed group decides.
        let (hurt, _) =
            set.evaluate_detailed(&groups(&["guards", "npcs"]), &groups(&["players"]), true);
        assert!(!hurt);
        let (hurt, _) =
            set.evaluate_detailed(&groups(&["npcs", "guards"]), &groups(&["players"]), true);
        assert!(hurt);
    }

    #[test]
    fn test_default_on_miss() {
        let set = RuleSet::new("empty");
        assert!(!set.evaluate(&groups(&["a"]), &groups(&["b"]), true));

        let mut allow = RuleSet::new("empty-allow");
        allow.default_allow_damage = true;
        assert!(allow.evaluate(&groups(&["a"]), &groups(&["b"]), true));
    }

    #[test]
    fn test_miss_without_default_allows() {
        let set = RuleSet::new("empty");
        let (hurt, matched) = set.evaluate_detailed(&groups(&["a"]), &groups(&["b"]), false);
        assert!(hurt);
        assert_eq!(matched, RuleMatch::FallthroughAllow);
    }

    #[test]
    fn test_last_write_wins_per_key() {
        let mut set = RuleSet::new("test");
        set.add_rule("players cannot hurt players");
        set.add_rule("players can hurt players");
        assert_eq!(set.rule_count(), 1);
        assert!(set.evaluate(&groups(&["players"]), &groups(&["players"]), true));
    }

    #[test]
    fn test_invalid_rule_rejected() {
        let mut set = RuleSet::new("test");
        assert!(!set.add_rule("players hurt"));
        assert_eq!(set.rule_count(), 0);
    }

    #[test]
    fn test_is_empty_requires_no_rules_and_no_flags() {
        let mut set = RuleSet::new("test");
        assert!(set.is_empty());
        set.flags.set(RuleFlag::SelfDamage);
        assert!(!set.is_empty());

        let mut with_rule = RuleSet::new("test2");
        with_rule.add_rule("a can hurt b");
        assert!(!with_rule.is_empty());
    }

    #[test]
    fn test_nothing_rule_denies_through_wildcard() {
        let mut set = RuleSet::new("test");
        set.add_rule("nothing can hurt ch47");
        assert!(!set.evaluate(&groups(&["players"]), &groups(&["ch47"]), true));
        assert!(!set.evaluate(&groups(&["heli"]), &groups(&["ch47"]), true));
    }
}
