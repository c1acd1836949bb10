//! Domain records shared by repositories, services and serializers.
//!
//! # Responsibility
//! - Define the persisted shapes of settings and tiers.
//! - Own the catalogue of default settings and their keys.
//!
//! # Invariants
//! - A setting value always matches the setting's declared type.
//! - Tier slugs are unique and derived from the name when not supplied.

pub mod setting;
pub mod tier;
