//! Directional damage rule parsing
//!
//! A rule is one policy statement of the form `<left> [cannot|can't] hurt
//! <right>`. The first and last whitespace tokens name the sides; middle
//! tokens are ignored except for the negation markers, which keeps the
//! grammar tolerant of phrasing ("players can really hurt players" still
//! parses).

/// Wildcard side matching any group.
pub const ANY: &str = "any";

/// A compiled directional policy statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Original configured text, kept for diagnostics.
    pub text: String,
    /// Canonical lookup key, `left->right` after synonym normalization.
    pub key: String,
    /// Whether damage is permitted when this rule matches.
    pub hurt: bool,
}

impl Rule {
    /// Parse one rule line. Returns `None` for lines with fewer than three
    /// tokens; callers log and drop those.
    pub fn parse(text: &str) -> Option<Rule> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        if tokens.len() < 3 {
            return None;
        }

        let left = tokens[0];
        let right = tokens[tokens.len() - 1];
        let middle = &tokens[1..tokens.len() - 1];

        let mut hurt = !middle
            .iter()
            .any(|t| t.eq_ignore_ascii_case("cannot") || t.eq_ignore_ascii_case("can't"));

        // "nothing can hurt X" means no group may hurt X: the side
        // normalizes to the wildcard and the outcome inverts. Both sides
        // being "nothing" would invert twice; one inversion is applied at
        // most once by design of the source grammar.
        if is_negating_synonym(left) || is_negating_synonym(right) {
            hurt = !hurt;
        }

        let left = normalize_side(left);
        let right = normalize_side(right);

        Some(Rule {
            text: trimmed.to_string(),
            key: format!("{left}->{right}"),
            hurt,
        })
    }
}

/// Build the canonical lookup key for a group pair.
pub fn rule_key(left: &str, right: &str) -> String {
    format!("{}->{}", left.to_ascii_lowercase(), right.to_ascii_lowercase())
}

fn is_negating_synonym(side: &str) -> bool {
    side.eq_ignore_ascii_case("nothing") || side.eq_ignore_ascii_case("none")
}

fn normalize_side(side: &str) -> String {
    const WILDCARDS: [&str; 6] = ["anything", "nothing", "all", "any", "none", "everything"];
    if WILDCARDS.iter().any(|w| side.eq_ignore_ascii_case(w)) {
        ANY.to_string()
    } else {
        side.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_allow() {
        let rule = Rule::parse("players can hurt players").unwrap();
        assert_eq!(rule.key, "players->players");
        assert!(rule.hurt);
    }

    #[test]
    fn test_parse_negation() {
        let rule = Rule::parse("players cannot hurt players").unwrap();
        assert_eq!(rule.key, "players->players");
        assert!(!rule.hurt);

        let rule = Rule::parse("players can't hurt traps").unwrap();
        assert_eq!(rule.key, "players->traps");
        assert!(!rule.hurt);
    }

    #[test]
    fn test_synonyms_normalize_to_any() {
        let a = Rule::parse("anything can hurt players").unwrap();
        let b = Rule::parse("any can hurt players").unwrap();
        let c = Rule::parse("everything can hurt players").unwrap();
        assert_eq!(a.key, "any->players");
        assert_eq!(a.key, b.key);
        assert_eq!(a.key, c.key);
        assert!(a.hurt && b.hurt && c.hurt);
    }

    #[test]
    fn test_nothing_inverts_outcome() {
        // "nothing can hurt X" compiles to any->X with hurt inverted.
        let rule = Rule::parse("nothing can hurt ch47").unwrap();
        assert_eq!(rule.key, "any->ch47");
        assert!(!rule.hurt);

        let rule = Rule::parse("none can hurt cars").unwrap();
        assert_eq!(rule.key, "any->cars");
        assert!(!rule.hurt);
    }

    #[test]
    fn test_nothing_with_negation_double_inverts() {
        let rule = Rule::parse("nothing cannot hurt players").unwrap();
        assert_eq!(rule.key, "any->players");
        assert!(rule.hurt);
    }

    #[test]
    fn test_middle_tokens_ignored() {
        let rule = Rule::parse("fire can always definitely hurt resources").unwrap();
        assert_eq!(rule.key, "fire->resources");
        assert!(rule.hurt);
    }

    #[test]
    fn test_too_few_tokens_invalid() {
        assert!(Rule::parse("players hurt").is_none());
        assert!(Rule::parse("players").is_none());
        assert!(Rule::parse("").is_none());
        assert!(Rule::parse("   ").is_none());
    }

    #[test]
    fn test_keys_are_lowercase() {
        let rule = Rule::parse("Players CAN hurt Traps").unwrap();
        assert_eq!(rule.key, "players->traps");
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_three_plus_tokens_always_parse(
            left in "[a-z]{1,12}",
            right in "[a-z]{1,12}",
            verb in prop::sample::select(vec!["can", "cannot", "can't"]),
        ) {
            let text = format!("{left} {verb} hurt {right}");
            let rule = Rule::parse(&text);
            prop_assert!(rule.is_some());
        }

        #[test]
        fn prop_key_is_order_sensitive(
            left in "[a-e]{1,6}",
            right in "[f-k]{1,6}",
        ) {
            let forward = Rule::parse(&format!("{left} can hurt {right}")).unwrap();
            let backward = Rule::parse(&format!("{right} can hurt {left}")).unwrap();
            prop_assert_ne!(forward.key, backward.key);
        }

        #[test]
        fn prop_wildcard_synonyms_collapse(
            synonym in prop::sample::select(vec!["anything", "all", "any", "everything"]),
            // Alphabet excludes the negating synonyms ("none", "nothing").
            right in "[a-m]{1,10}",
        ) {
            let rule = Rule::parse(&format!("{synonym} can hurt {right}")).unwrap();
            prop_assert!(rule.key.starts_with("any->"));
            prop_assert!(rule.hurt);
        }
    }
}
