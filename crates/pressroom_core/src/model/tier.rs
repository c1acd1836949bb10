//! Tier (membership product) model.
//!
//! # Responsibility
//! - Define the access level record stored in the `products` table.
//!
//! # Invariants
//! - `slug` is URL-safe and unique per site.
//! - Exactly one of the seeded tiers is `free`.

use serde::{Deserialize, Serialize};

/// Whether a tier is free or requires a paid subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierType {
    Free,
    Paid,
}

impl TierType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

/// A named access level gating content visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: TierType,
    pub active: bool,
    /// Where members land after signing up to this tier.
    pub welcome_page_url: Option<String>,
}

impl Tier {
    /// Creates an active tier with a generated id and a slug derived from
    /// `name`.
    pub fn new(name: impl Into<String>, kind: TierType) -> Self {
        let name = name.into();
        Self {
            id: crate::db::new_object_id(),
            slug: slugify(&name),
            name,
            kind,
            active: true,
            welcome_page_url: None,
        }
    }
}

/// Lowercases and joins alphanumeric runs with `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::{slugify, Tier, TierType};

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Default Product"), "default-product");
        assert_eq!(slugify("  Gold -- Plus! "), "gold-plus");
    }

    #[test]
    fn new_tier_is_active_without_welcome_page() {
        let tier = Tier::new("Gold", TierType::Paid);
        assert!(tier.active);
        assert_eq!(tier.slug, "gold");
        assert!(tier.welcome_page_url.is_none());
        assert_eq!(tier.id.len(), 24);
    }
}
