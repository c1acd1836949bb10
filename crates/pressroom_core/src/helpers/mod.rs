//! Theme template helpers.
//!
//! Helpers take named options plus a render context and return escaped
//! [`SafeString`] output ready for the template engine.

use crate::service::labs::FeatureDisabled;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod escape;
pub mod tiers;

pub use escape::{escape_expression, SafeString};

pub type HelperResult<T> = Result<T, HelperError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperError {
    /// The helper's labs flag is off.
    Disabled(FeatureDisabled),
}

impl Display for HelperError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disabled(err) => write!(f, "{err}"),
        }
    }
}

impl Error for HelperError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Disabled(err) => Some(err),
        }
    }
}

impl From<FeatureDisabled> for HelperError {
    fn from(value: FeatureDisabled) -> Self {
        Self::Disabled(value)
    }
}
