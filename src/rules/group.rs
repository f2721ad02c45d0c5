//! Entity classification groups
//!
//! A group buckets entities by exact type-tag or prefab-tag match.
//! Membership and exclusion sets come from comma-separated configuration
//! strings; assignment fully replaces the set.

use ahash::AHashSet;

use crate::core::types::Entity;

/// Named classification bucket for entities.
#[derive(Debug, Clone, Default)]
pub struct EntityGroup {
    pub name: String,
    members: AHashSet<String>,
    exclusions: AHashSet<String>,
}

impl EntityGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: AHashSet::new(),
            exclusions: AHashSet::new(),
        }
    }

    /// Replace the member set from a comma-separated list.
    pub fn set_members(&mut self, list: &str) {
        self.members = split_tags(list);
    }

    /// Replace the exclusion set from a comma-separated list.
    pub fn set_exclusions(&mut self, list: &str) {
        self.exclusions = split_tags(list);
    }

    pub fn with_members(mut self, list: &str) -> Self {
        self.set_members(list);
        self
    }

    pub fn with_exclusions(mut self, list: &str) -> Self {
        self.set_exclusions(list);
        self
    }

    pub fn is_member(&self, tag: &str) -> bool {
        !tag.is_empty() && self.members.contains(&tag.to_ascii_lowercase())
    }

    pub fn is_exclusion(&self, tag: &str) -> bool {
        !tag.is_empty() && self.exclusions.contains(&tag.to_ascii_lowercase())
    }

    /// Membership requires a tag match in `members` and neither tag in
    /// `exclusions` (exclusions take precedence).
    pub fn contains(&self, entity: &Entity) -> bool {
        let type_tag = entity.type_tag.to_ascii_lowercase();
        let prefab_tag = entity.prefab_tag.to_ascii_lowercase();

        if !self.members.contains(&type_tag) && !self.members.contains(&prefab_tag) {
            return false;
        }

        !self.exclusions.contains(&type_tag) && !self.exclusions.contains(&prefab_tag)
    }

    /// Exclusion tags, used when precompiling the zone exclusion set.
    pub fn exclusion_tags(&self) -> impl Iterator<Item = &str> {
        self.exclusions.iter().map(|s| s.as_str())
    }
}

fn split_tags(list: &str) -> AHashSet<String> {
    list.split(',')
        .map(|tag| tag.trim().to_ascii_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
