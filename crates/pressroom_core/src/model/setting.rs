//! Setting domain model.
//!
//! # Responsibility
//! - Define the key/value record persisted in the `settings` table.
//! - Convert loosely typed stored text into typed values and back.
//! - Declare the default settings inserted on first boot.
//!
//! # Invariants
//! - `key` is unique across the table.
//! - `value` conforms to `kind`; coercion happens before persistence.
//! - `RO` settings are only writable from internal callers.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Well-known setting keys.
pub mod keys {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const TIMEZONE: &str = "timezone";
    pub const LOCALE: &str = "locale";
    pub const ROUTES_HASH: &str = "routes_hash";
    pub const LABS: &str = "labs";
    pub const THEME_SESSION_SECRET: &str = "theme_session_secret";
    pub const EMAIL_VERIFICATION_REQUIRED: &str = "email_verification_required";
    pub const MEMBERS_SIGNUP_ACCESS: &str = "members_signup_access";
    pub const MEMBERS_FREE_SIGNUP_REDIRECT: &str = "members_free_signup_redirect";
    pub const MEMBERS_PAID_SIGNUP_REDIRECT: &str = "members_paid_signup_redirect";
    pub const STRIPE_SECRET_KEY: &str = "stripe_secret_key";
    pub const STRIPE_PUBLISHABLE_KEY: &str = "stripe_publishable_key";
    pub const STRIPE_CONNECT_SECRET_KEY: &str = "stripe_connect_secret_key";
    pub const STRIPE_CONNECT_PUBLISHABLE_KEY: &str = "stripe_connect_publishable_key";
}

/// Declared storage type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    /// JSON object stored as text.
    Object,
    /// JSON array stored as text.
    Array,
}

impl SettingType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "object" => Some(Self::Object),
            "array" => Some(Self::Array),
            _ => None,
        }
    }
}

/// Typed in-memory setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Null,
    Bool(bool),
    Number(i64),
    Text(String),
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// JS-style truthiness: null, `false`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0,
            Self::Text(value) => !value.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Text representation stored in `settings.value`.
    pub fn to_db(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Number(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
        }
    }

    /// Decodes stored text according to the declared type.
    pub fn from_db(kind: SettingType, raw: Option<String>) -> Result<Self, SettingValueError> {
        match raw {
            None => Ok(Self::Null),
            Some(raw) => Self::Text(raw).coerce(kind),
        }
    }

    /// Coerces an incoming value to `kind`.
    ///
    /// Booleans and numbers may arrive as text (`"true"`, `"42"`); object and
    /// array settings must hold JSON text of the matching shape.
    pub fn coerce(self, kind: SettingType) -> Result<Self, SettingValueError> {
        let mismatch = |value: &SettingValue| SettingValueError {
            expected: kind,
            found: value.describe(),
        };

        match (kind, self) {
            (_, Self::Null) => Ok(Self::Null),
            (SettingType::Boolean, Self::Bool(value)) => Ok(Self::Bool(value)),
            (SettingType::Boolean, Self::Text(text)) => match text.as_str() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(mismatch(&Self::Text(text))),
            },
            (SettingType::Number, Self::Number(value)) => Ok(Self::Number(value)),
            (SettingType::Number, Self::Text(text)) => match text.trim().parse::<i64>() {
                Ok(value) => Ok(Self::Number(value)),
                Err(_) => Err(mismatch(&Self::Text(text))),
            },
            (SettingType::String, Self::Text(text)) => Ok(Self::Text(text)),
            (SettingType::Object, Self::Text(text)) => {
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(serde_json::Value::Object(_)) => Ok(Self::Text(text)),
                    _ => Err(mismatch(&Self::Text(text))),
                }
            }
            (SettingType::Array, Self::Text(text)) => {
                match serde_json::from_str::<serde_json::Value>(&text) {
                    Ok(serde_json::Value::Array(_)) => Ok(Self::Text(text)),
                    _ => Err(mismatch(&Self::Text(text))),
                }
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(value) => format!("boolean `{value}`"),
            Self::Number(value) => format!("number `{value}`"),
            Self::Text(value) => format!("text `{value}`"),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A value does not fit the declared setting type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingValueError {
    pub expected: SettingType,
    pub found: String,
}

impl Display for SettingValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "expected {} value, found {}",
            self.expected.as_str(),
            self.found
        )
    }
}

impl Error for SettingValueError {}

/// Access flags stored in `settings.flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingFlag {
    /// Exposed through public (content) APIs.
    #[serde(rename = "PUBLIC")]
    Public,
    /// Only editable with an internal context.
    #[serde(rename = "RO")]
    ReadOnly,
}

impl SettingFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::ReadOnly => "RO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PUBLIC" => Some(Self::Public),
            "RO" => Some(Self::ReadOnly),
            _ => None,
        }
    }
}

/// Parses a comma separated flag list. Unknown tokens are reported.
pub fn parse_flags(raw: Option<&str>) -> Result<Vec<SettingFlag>, String> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| SettingFlag::parse(token).ok_or_else(|| token.to_string()))
        .collect()
}

/// Inverse of [`parse_flags`]. Empty flag lists are stored as NULL.
pub fn flags_to_db(flags: &[SettingFlag]) -> Option<String> {
    if flags.is_empty() {
        return None;
    }
    Some(
        flags
            .iter()
            .map(|flag| flag.as_str())
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// One persisted setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub id: String,
    pub key: String,
    pub group: String,
    #[serde(rename = "type")]
    pub kind: SettingType,
    pub value: SettingValue,
    pub flags: Vec<SettingFlag>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Setting {
    pub fn is_read_only(&self) -> bool {
        self.flags.contains(&SettingFlag::ReadOnly)
    }

    pub fn is_public(&self) -> bool {
        self.flags.contains(&SettingFlag::Public)
    }
}

/// Requested change to one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingEdit {
    pub key: String,
    pub value: SettingValue,
}

impl SettingEdit {
    pub fn new(key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Initial value of a default setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Fixed(Option<&'static str>),
    /// Fresh random hex secret per installation.
    RandomSecret,
}

/// Catalogue entry used when populating missing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSetting {
    pub key: &'static str,
    pub group: &'static str,
    pub kind: SettingType,
    pub value: DefaultValue,
    pub flags: &'static [SettingFlag],
}

const PUBLIC: &[SettingFlag] = &[SettingFlag::Public];
const READ_ONLY: &[SettingFlag] = &[SettingFlag::ReadOnly];
const NONE: &[SettingFlag] = &[];

pub const DEFAULT_SETTINGS: &[DefaultSetting] = &[
    DefaultSetting {
        key: keys::TITLE,
        group: "site",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("Pressroom")),
        flags: PUBLIC,
    },
    DefaultSetting {
        key: keys::DESCRIPTION,
        group: "site",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("Thoughts, stories and ideas.")),
        flags: PUBLIC,
    },
    DefaultSetting {
        key: keys::TIMEZONE,
        group: "site",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("Etc/UTC")),
        flags: PUBLIC,
    },
    DefaultSetting {
        key: keys::LOCALE,
        group: "site",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("en")),
        flags: PUBLIC,
    },
    DefaultSetting {
        key: keys::ROUTES_HASH,
        group: "core",
        kind: SettingType::String,
        value: DefaultValue::Fixed(None),
        flags: READ_ONLY,
    },
    DefaultSetting {
        key: keys::LABS,
        group: "labs",
        kind: SettingType::Object,
        value: DefaultValue::Fixed(Some("{}")),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::THEME_SESSION_SECRET,
        group: "core",
        kind: SettingType::String,
        value: DefaultValue::RandomSecret,
        flags: NONE,
    },
    DefaultSetting {
        key: keys::EMAIL_VERIFICATION_REQUIRED,
        group: "email",
        kind: SettingType::Boolean,
        value: DefaultValue::Fixed(Some("false")),
        flags: READ_ONLY,
    },
    DefaultSetting {
        key: keys::MEMBERS_SIGNUP_ACCESS,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("all")),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::MEMBERS_FREE_SIGNUP_REDIRECT,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("/")),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::MEMBERS_PAID_SIGNUP_REDIRECT,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(Some("/")),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::STRIPE_SECRET_KEY,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(None),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::STRIPE_PUBLISHABLE_KEY,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(None),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::STRIPE_CONNECT_SECRET_KEY,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(None),
        flags: NONE,
    },
    DefaultSetting {
        key: keys::STRIPE_CONNECT_PUBLISHABLE_KEY,
        group: "members",
        kind: SettingType::String,
        value: DefaultValue::Fixed(None),
        flags: NONE,
    },
];
