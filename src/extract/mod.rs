//! Attribute extraction from rendered diploma register extracts.
//!
//! Each page is walked on its own (see [`walker`]): rows of the form
//! `label : value` are collected, and the page counts as a diploma only when
//! it carries the register marker line. The raw labels are then translated to
//! canonical [`AttributeKey`]s (see [`vocabulary`]) and checked against the
//! [`AttributeRequirements`].
//!
//! Pages without the marker are skipped. A diploma page missing a required
//! attribute aborts the whole batch.

pub mod dates;
mod requirements;
pub mod vocabulary;
pub mod walker;

pub use requirements::AttributeRequirements;

use crate::dom::PageNode;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical attribute names.
///
/// Declaration order is the order of the required-attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKey {
    FamilyName,
    Prefix,
    FirstName,
    Gender,
    DateOfBirth,
    Education,
    Degree,
    Profile,
    Achieved,
    Institute,
    City,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 11] = [
        AttributeKey::FamilyName,
        AttributeKey::Prefix,
        AttributeKey::FirstName,
        AttributeKey::Gender,
        AttributeKey::DateOfBirth,
        AttributeKey::Education,
        AttributeKey::Degree,
        AttributeKey::Profile,
        AttributeKey::Achieved,
        AttributeKey::Institute,
        AttributeKey::City,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeKey::FamilyName => "familyname",
            AttributeKey::Prefix => "prefix",
            AttributeKey::FirstName => "firstname",
            AttributeKey::Gender => "gender",
            AttributeKey::DateOfBirth => "dateofbirth",
            AttributeKey::Education => "education",
            AttributeKey::Degree => "degree",
            AttributeKey::Profile => "profile",
            AttributeKey::Achieved => "achieved",
            AttributeKey::Institute => "institute",
            AttributeKey::City => "city",
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized attributes of one diploma.
pub type AttributeMap = BTreeMap<AttributeKey, String>;

/// One [`AttributeMap`] per diploma page, in page order.
pub type ExtractedAttributeSet = Vec<AttributeMap>;

/// Extract the attributes of every diploma page.
pub fn extract(pages: &[PageNode<'_>], requirements: &AttributeRequirements) -> Result<ExtractedAttributeSet> {
    let mut set = ExtractedAttributeSet::new();
    for page in pages {
        match extract_page(page, requirements)? {
            Some(attributes) => set.push(attributes),
            None => log::debug!("Page {} has no diploma marker, skipping", page.index() + 1),
        }
    }
    log::debug!("Extracted {} diploma(s) from {} page(s)", set.len(), pages.len());
    Ok(set)
}

/// Extract one page. `None` when the page is not a diploma page.
pub fn extract_page(page: &PageNode<'_>, requirements: &AttributeRequirements) -> Result<Option<AttributeMap>> {
    let raw = walker::walk(page.element());
    if !raw.is_diploma {
        return Ok(None);
    }
    let attributes = vocabulary::translate(&raw.fields);
    requirements
        .check(&attributes)
        .map_err(|e| e.context("extract attributes"))?;
    Ok(Some(attributes))
}
