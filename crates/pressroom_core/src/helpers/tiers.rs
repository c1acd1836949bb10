//! `{{tiers}}` helper.
//!
//! Usage: `{{tiers}}`, `{{tiers separator=" - " prefix=" : " suffix=""}}`.
//! Lists the tiers with access to the current post, e.g. `Gold and Silver
//! tiers`.
//!
//! # Invariants
//! - Tier names are always escaped; separators, prefix and suffix are not.
//! - An empty list body (no tiers, or one nameless tier) renders nothing,
//!   without prefix or suffix.
//! - Only string option values are honoured; others fall back to defaults.

use super::escape::{escape_expression, SafeString};
use super::HelperResult;
use crate::model::tier::Tier;
use crate::service::labs::{GatedHelper, LabsService, MULTIPLE_PRODUCTS};
use serde_json::{Map, Value};

pub const TIERS_HELPER: GatedHelper = GatedHelper {
    flag_key: MULTIPLE_PRODUCTS,
    flag_name: "Tiers",
    helper_name: "tiers",
    help_url: "https://pressroom.dev/docs/themes/",
};

const DEFAULT_SEPARATOR: &str = ", ";
const DEFAULT_LAST_SEPARATOR: &str = " and ";
const SINGLE_SUFFIX: &str = " tier";
const PLURAL_SUFFIX: &str = " tiers";

/// Named helper options. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TiersOptions {
    pub separator: Option<String>,
    pub last_separator: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl TiersOptions {
    /// Reads options from a template hash such as
    /// `{"separator": " - ", "lastSeparator": " or "}`.
    pub fn from_hash(hash: &Map<String, Value>) -> Self {
        let string = |name: &str| hash.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            separator: string("separator"),
            last_separator: string("lastSeparator"),
            prefix: string("prefix"),
            suffix: string("suffix"),
        }
    }
}

/// Renders the tier list without feature gating.
pub fn render_tiers(tiers: &[Tier], options: &TiersOptions) -> SafeString {
    let names = tiers
        .iter()
        .map(|tier| escape_expression(&tier.name))
        .collect::<Vec<_>>();

    let (body, default_suffix) = match names.as_slice() {
        [] => return SafeString::default(),
        [only] => (only.clone(), SINGLE_SUFFIX),
        [firsts @ .., last] => {
            let separator = options.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
            let last_separator = options
                .last_separator
                .as_deref()
                .unwrap_or(DEFAULT_LAST_SEPARATOR);
            (
                format!("{}{}{}", firsts.join(separator), last_separator, last),
                PLURAL_SUFFIX,
            )
        }
    };

    if body.is_empty() {
        return SafeString::default();
    }

    let prefix = options.prefix.as_deref().unwrap_or("");
    let suffix = options.suffix.as_deref().unwrap_or(default_suffix);
    SafeString::new(format!("{prefix}{body}{suffix}"))
}

/// The `{{tiers}}` helper, available only with the multiple tiers flag.
pub fn tiers_helper(
    labs: &LabsService,
    tiers: &[Tier],
    options: &TiersOptions,
) -> HelperResult<SafeString> {
    Ok(labs.enabled_helper(TIERS_HELPER, || render_tiers(tiers, options))?)
}
