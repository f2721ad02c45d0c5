//! Rule model integration tests
//!
//! End-to-end checks of rule parsing, group classification and rule-set
//! precedence through the configuration loader, matching the behavior a
//! live config file produces.

use pve_warden::{Entity, EntityClass, RuleSet, WardenConfig};

fn groups(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn pairwise_deny_wins_regardless_of_flags() {
    let config = WardenConfig::from_toml_str(
        r#"
[[rulesets]]
name = "default"
flags = ["SelfDamage", "FriendlyFire", "NpcsCanHurtAnything"]
rules = ["a cannot hurt b"]
"#,
    )
    .unwrap();
    let set = config.ruleset("default").unwrap();
    assert!(!set.evaluate(&groups(&["a"]), &groups(&["b"]), true));
}

#[test]
fn specific_pairwise_outranks_wildcard() {
    let mut set = RuleSet::new("test");
    set.add_rule("fire cannot hurt players");
    set.add_rule("anything can hurt players");
    assert!(!set.evaluate(&groups(&["fire"]), &groups(&["players"]), true));
    assert!(set.evaluate(&groups(&["guards"]), &groups(&["players"]), true));
}

#[test]
fn synonyms_compile_to_identical_keys() {
    let mut a = RuleSet::new("a");
    let mut b = RuleSet::new("b");
    a.add_rule("anything can hurt players");
    b.add_rule("any can hurt players");
    assert!(a.rule("any->players").is_some());
    assert!(b.rule("any->players").is_some());
    assert_eq!(
        a.rule("any->players").map(|r| r.hurt),
        b.rule("any->players").map(|r| r.hurt)
    );
}

#[test]
fn nothing_can_hurt_denies_arbitrary_attackers() {
    let mut set = RuleSet::new("test");
    set.add_rule("nothing can hurt players");
    for attacker in ["fire", "npcs", "traps", "unheard_of_group"] {
        assert!(
            !set.evaluate(&groups(&[attacker]), &groups(&["players"]), true),
            "attacker {attacker} should be denied"
        );
    }
}

#[test]
fn group_exclusion_takes_precedence_over_membership() {
    let config = WardenConfig::from_toml_str(
        r#"
[[groups]]
name = "resources"
members = "LootContainer, hobobarrel.deployed"
exclusions = "hobobarrel.deployed"
"#,
    )
    .unwrap();
    let group = &config.groups[0];

    let barrel = Entity::new(1, EntityClass::LootContainer, "LootContainer", "hobobarrel.deployed");
    assert!(!group.contains(&barrel));

    let crate_box = Entity::new(2, EntityClass::LootContainer, "LootContainer", "crate_normal");
    assert!(group.contains(&crate_box));
}

#[test]
fn end_to_end_pairwise_overrides_wildcard_allow() {
    // "anything can hurt players" plus "players cannot hurt players"
    // must deny player-vs-player.
    let config = WardenConfig::from_toml_str(
        r#"
[[rulesets]]
name = "default"
rules = ["anything can hurt players", "players cannot hurt players"]

[[groups]]
name = "players"
members = "BasePlayer"
"#,
    )
    .unwrap();
    let set = config.ruleset("default").unwrap();

    assert!(!set.evaluate(&groups(&["players"]), &groups(&["players"]), true));
    // The broad wildcard still lets everything else through.
    assert!(set.evaluate(&groups(&["fire"]), &groups(&["players"]), true));
}

#[test]
fn zero_rules_default_deny() {
    let config = WardenConfig::from_toml_str(
        r#"
[[rulesets]]
name = "default"
default_allow_damage = false
"#,
    )
    .unwrap();
    let set = config.ruleset("default").unwrap();
    assert!(!set.evaluate(&groups(&["anything"]), &groups(&["anything"]), true));
}

#[test]
fn reload_produces_identical_tables() {
    const TEXT: &str = r#"
default_ruleset = "main"

[mappings]
town = "main"

[[rulesets]]
name = "main"
flags = ["SelfDamage"]
rules = ["players cannot hurt players", "anything can hurt resources"]

[[groups]]
name = "players"
members = "BasePlayer"
"#;
    let a = WardenConfig::from_toml_str(TEXT).unwrap();
    let b = WardenConfig::from_toml_str(TEXT).unwrap();

    assert_eq!(a.rulesets.len(), b.rulesets.len());
    let (x, y) = (&a.rulesets[0], &b.rulesets[0]);
    assert_eq!(x.rule_count(), y.rule_count());
    assert_eq!(x.flags, y.flags);
    // No duplicate-rule accumulation across parses.
    assert_eq!(x.rule_count(), 2);
    assert_eq!(a.mappings, b.mappings);
}
