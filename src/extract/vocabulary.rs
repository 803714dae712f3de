//! Register labels and how their values become attributes.

use super::dates::{parse_dutch_date, parse_dutch_date_or_month};
use super::walker::RawAttributeMap;
use super::{AttributeKey, AttributeMap};

/// How a raw value is turned into attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Store the value unchanged.
    Copy(AttributeKey),
    /// `Man` / `Vrouw` to `male` / `female`, anything else `unknown`.
    Gender,
    /// Full Dutch date, empty when unparseable.
    Date(AttributeKey),
    /// Full Dutch date, else month and year, else empty.
    DateOrMonth(AttributeKey),
    /// `<institute> in <CITY>`, split at the last ` in `; dropped when absent.
    InstituteCity,
    /// Known label without an attribute.
    Ignore,
}

/// Label to transform table.
pub static LABELS: &[(&str, Transform)] = &[
    ("Achternaam", Transform::Copy(AttributeKey::FamilyName)),
    ("Tussenvoegsel", Transform::Copy(AttributeKey::Prefix)),
    ("Voorna(a)m(en)", Transform::Copy(AttributeKey::FirstName)),
    ("Voornaam", Transform::Copy(AttributeKey::FirstName)),
    ("Voornamen", Transform::Copy(AttributeKey::FirstName)),
    ("Geslacht", Transform::Gender),
    ("Geboortedatum", Transform::Date(AttributeKey::DateOfBirth)),
    ("Soort waardedocument", Transform::Ignore),
    ("Opleiding", Transform::Copy(AttributeKey::Education)),
    ("Aard van het examen", Transform::Copy(AttributeKey::Degree)),
    ("Profiel", Transform::Copy(AttributeKey::Profile)),
    ("Behaald in", Transform::DateOrMonth(AttributeKey::Achieved)),
    ("Behaald op", Transform::DateOrMonth(AttributeKey::Achieved)),
    ("Instelling", Transform::InstituteCity),
];

pub fn lookup(label: &str) -> Option<Transform> {
    LABELS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, transform)| *transform)
}

impl Transform {
    /// Apply to `value`, writing into `out`.
    pub fn apply(self, value: &str, out: &mut AttributeMap) {
        match self {
            Transform::Copy(key) => {
                out.insert(key, value.to_string());
            },
            Transform::Gender => {
                let gender = match value {
                    "Man" => "male",
                    "Vrouw" => "female",
                    _ => "unknown",
                };
                out.insert(AttributeKey::Gender, gender.to_string());
            },
            Transform::Date(key) => {
                out.insert(key, parse_dutch_date(value));
            },
            Transform::DateOrMonth(key) => {
                let date = parse_dutch_date_or_month(value);
                if date.is_empty() {
                    log::debug!("Cannot parse date: {}", value);
                }
                out.insert(key, date);
            },
            Transform::InstituteCity => match split_institute(value) {
                Some((institute, city)) => {
                    out.insert(AttributeKey::Institute, institute.to_string());
                    out.insert(AttributeKey::City, city.to_string());
                },
                None => log::debug!("Cannot split institute and city: {}", value),
            },
            Transform::Ignore => {},
        }
    }
}

/// Split `Hogeschool X in AMSTERDAM` into institute and city.
pub fn split_institute(value: &str) -> Option<(&str, &str)> {
    let at = value.rfind(" in ")?;
    Some((value[..at].trim(), value[at + 4..].trim()))
}

/// Translate raw labels to attributes, in first-seen label order.
pub fn translate(raw: &RawAttributeMap) -> AttributeMap {
    let mut out = AttributeMap::new();
    for (label, value) in raw {
        match lookup(label) {
            Some(transform) => transform.apply(value, &mut out),
            None if label.is_empty() => {},
            None => log::debug!("Unknown property: {} = {}", label, value),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawAttributeMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_split_institute() {
        assert_eq!(
            split_institute("Hogeschool X in AMSTERDAM"),
            Some(("Hogeschool X", "AMSTERDAM"))
        );
        assert_eq!(
            split_institute("Opleiding in de zorg in  DEN HAAG "),
            Some(("Opleiding in de zorg", "DEN HAAG"))
        );
        assert_eq!(split_institute("Universiteit Utrecht"), None);
        assert_eq!(split_institute("in UTRECHT"), None);
    }

    #[test]
    fn test_gender() {
        for (value, expected) in [("Man", "male"), ("Vrouw", "female"), ("man", "unknown"), ("", "unknown")] {
            let out = translate(&raw(&[("Geslacht", value)]));
            assert_eq!(out[&AttributeKey::Gender], expected);
        }
    }

    #[test]
    fn test_dates() {
        let out = translate(&raw(&[
            ("Geboortedatum", "Augustus 1990"),
            ("Behaald in", "Augustus 2016"),
        ]));
        // Only the achievement date falls back to month precision.
        assert_eq!(out[&AttributeKey::DateOfBirth], "");
        assert_eq!(out[&AttributeKey::Achieved], "01-08-2016");
    }

    #[test]
    fn test_institute_without_city_is_dropped() {
        let out = translate(&raw(&[("Instelling", "Universiteit Utrecht")]));
        assert!(!out.contains_key(&AttributeKey::Institute));
        assert!(!out.contains_key(&AttributeKey::City));
    }

    #[test]
    fn test_unknown_and_ignored_labels() {
        let out = translate(&raw(&[
            ("Soort waardedocument", "Diploma"),
            ("Cijferlijst", "8"),
            ("", "orphan"),
        ]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_later_label_wins() {
        let out = translate(&raw(&[("Behaald in", "juni 2010"), ("Behaald op", "3 juli 2011")]));
        assert_eq!(out[&AttributeKey::Achieved], "03-07-2011");
    }
}
