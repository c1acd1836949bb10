//! Output serializer registry.
//!
//! # Responsibility
//! - Map a resource name to the serializer shaping its API output.
//! - Construct each serializer on first lookup and reuse it afterwards.
//!
//! # Invariants
//! - The name table is fixed at construction.
//! - Unknown names are reported as errors, never panics.

mod document;
mod settings;
mod tiers;

pub use document::{wrap_document, DocumentSerializer, PassThroughSerializer};
pub use settings::SettingsSerializer;
pub use tiers::TiersSerializer;

use super::ApiFrame;
use log::debug;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Every resource with an output serializer.
pub const SERIALIZER_NAMES: [&str; 37] = [
    "all",
    "default",
    "authentication",
    "db",
    "pages",
    "redirects",
    "roles",
    "slugs",
    "schedules",
    "webhooks",
    "posts",
    "settings",
    "notifications",
    "mail",
    "members",
    "products",
    "tiers",
    "member_signin_urls",
    "identities",
    "images",
    "media",
    "files",
    "users",
    "preview",
    "email_post",
    "oembed",
    "config",
    "themes",
    "site",
    "email_preview",
    "emails",
    "snippets",
    "custom_theme_settings",
    "slack",
    "session",
    "offers",
    "members_stripe_connect",
];

pub type SerializerResult<T> = Result<T, SerializerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializerError {
    UnknownSerializer(String),
    InvalidPayload {
        serializer: &'static str,
        message: String,
    },
}

impl Display for SerializerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSerializer(name) => write!(f, "unknown output serializer: {name}"),
            Self::InvalidPayload {
                serializer,
                message,
            } => write!(f, "invalid payload for `{serializer}` serializer: {message}"),
        }
    }
}

impl Error for SerializerError {}

/// Shapes one resource's response body.
pub trait OutputSerializer: Send + Sync {
    fn name(&self) -> &'static str;

    fn serialize(&self, response: Value, frame: &ApiFrame) -> SerializerResult<Value>;
}

type Builder = fn(&'static str) -> Arc<dyn OutputSerializer>;

struct Entry {
    build: Builder,
    instance: OnceCell<Arc<dyn OutputSerializer>>,
}

/// Lazily populated name -> serializer table.
pub struct SerializerRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerRegistry {
    pub fn new() -> Self {
        let entries = SERIALIZER_NAMES
            .iter()
            .map(|name| {
                (
                    *name,
                    Entry {
                        build: builder_for(name),
                        instance: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns sorted serializer names.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether `name` has been constructed by an earlier lookup.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|entry| entry.instance.get().is_some())
    }

    /// Returns the serializer for `name`, constructing it on first use.
    pub fn get(&self, name: &str) -> SerializerResult<Arc<dyn OutputSerializer>> {
        let (key, entry) = self
            .entries
            .get_key_value(name)
            .ok_or_else(|| SerializerError::UnknownSerializer(name.to_string()))?;
        let serializer = entry.instance.get_or_init(|| {
            debug!("event=serializer_load module=api name={}", key);
            (entry.build)(*key)
        });
        Ok(Arc::clone(serializer))
    }

    /// Looks up `name` and runs it over `response`.
    pub fn serialize(
        &self,
        name: &str,
        response: Value,
        frame: &ApiFrame,
    ) -> SerializerResult<Value> {
        self.get(name)?.serialize(response, frame)
    }
}

fn builder_for(name: &str) -> Builder {
    match name {
        "all" => build_pass_through,
        "settings" => build_settings,
        "tiers" | "products" => build_tiers,
        _ => build_document,
    }
}

fn build_pass_through(name: &'static str) -> Arc<dyn OutputSerializer> {
    Arc::new(PassThroughSerializer::new(name))
}

fn build_settings(_name: &'static str) -> Arc<dyn OutputSerializer> {
    Arc::new(SettingsSerializer)
}

fn build_tiers(name: &'static str) -> Arc<dyn OutputSerializer> {
    Arc::new(TiersSerializer::new(name))
}

fn build_document(name: &'static str) -> Arc<dyn OutputSerializer> {
    Arc::new(DocumentSerializer::new(name))
}

#[cfg(test)]
mod tests {
    use super::{SerializerError, SerializerRegistry, SERIALIZER_NAMES};
    use std::collections::BTreeSet;

    #[test]
    fn names_are_unique() {
        let unique = SERIALIZER_NAMES.iter().collect::<BTreeSet<_>>();
        assert_eq!(unique.len(), SERIALIZER_NAMES.len());
        assert_eq!(SerializerRegistry::new().len(), 37);
    }

    #[test]
    fn lookup_builds_once_and_reports_unknown_names() {
        let registry = SerializerRegistry::new();
        assert!(!registry.is_loaded("posts"));

        let first = registry.get("posts").expect("posts serializer");
        assert!(registry.is_loaded("posts"));
        let second = registry.get("posts").expect("posts serializer");
        assert!(std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "posts");

        assert_eq!(
            registry.get("nope").err(),
            Some(SerializerError::UnknownSerializer("nope".to_string()))
        );
        assert!(!registry.is_loaded("nope"));
    }
}
