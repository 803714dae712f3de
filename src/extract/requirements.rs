//! Required-attribute policy.

use super::{AttributeKey, AttributeMap};
use crate::error::{Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Which attributes a diploma page must carry.
///
/// `familyname`, `firstname`, `gender`, `dateofbirth`, `education`,
/// `achieved`, `institute` and `city` are always required and `prefix`
/// never is. Whether `degree` and `profile` are required differs between
/// deployments; both default to optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeRequirements {
    pub degree_required: bool,
    pub profile_required: bool,
}

impl AttributeRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_degree_required(mut self, required: bool) -> Self {
        self.degree_required = required;
        self
    }

    pub fn with_profile_required(mut self, required: bool) -> Self {
        self.profile_required = required;
        self
    }

    pub fn is_required(&self, key: AttributeKey) -> bool {
        match key {
            AttributeKey::Prefix => false,
            AttributeKey::Degree => self.degree_required,
            AttributeKey::Profile => self.profile_required,
            _ => true,
        }
    }

    /// Every required key must be present with a non-empty value.
    ///
    /// Keys are checked in [`AttributeKey::ALL`] order, so the first missing
    /// key in that order is the one reported.
    pub fn check(&self, attributes: &AttributeMap) -> Result<()> {
        for key in AttributeKey::ALL {
            if !self.is_required(key) {
                continue;
            }
            if attributes.get(&key).map_or(true, |v| v.is_empty()) {
                return Err(Error::new(
                    "check attributes",
                    ErrorKind::MissingAttribute(key.to_string()),
                ));
            }
        }
        Ok(())
    }
}
