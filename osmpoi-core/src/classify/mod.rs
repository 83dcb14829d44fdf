//! Rule-based classification of tagged OSM elements.
//!
//! [`classify`] is a pure function over a tag bag and the element kind. The
//! rule tables live in [`rules`] as immutable data.

mod rules;

use std::collections::BTreeMap;

use crate::{ElementKind, PoiLevel, Tags};

use rules::Companions;

/// Outcome of [`classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Tags to store, with name-like keys removed. Empty when rejected.
    pub tags: Tags,
    /// Significance assigned to the element.
    pub level: PoiLevel,
}

impl Classification {
    /// The classification of an uninteresting element.
    #[must_use]
    pub fn rejected() -> Self {
        Self::default()
    }

    /// Whether an element with this classification and `name` should be
    /// retained and indexed.
    #[must_use]
    pub const fn retains(&self, name: &str) -> bool {
        self.level.is_interesting() && !name.is_empty()
    }
}

/// Classify an element from its tags.
///
/// Levels only ever rise while the tags are scanned, so the result does not
/// depend on tag order. Once an element is accepted, every tag except the
/// name-like ones is kept, not only the tags that triggered acceptance.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{classify, ElementKind, PoiLevel, Tags};
///
/// let tags = Tags::from([("amenity".to_owned(), "fountain".to_owned())]);
/// assert_eq!(classify(&tags, ElementKind::Node).level, PoiLevel::None);
/// assert_eq!(classify(&tags, ElementKind::Way).level, PoiLevel::Notable);
/// ```
#[must_use]
pub fn classify(tags: &Tags, kind: ElementKind) -> Classification {
    if is_hard_rejected(tags) {
        return Classification::rejected();
    }

    let mut level = PoiLevel::None;
    let mut accepted: BTreeMap<&str, &str> = BTreeMap::new();
    for (key, value) in tags {
        let (key, value) = (key.as_str(), value.as_str());
        if is_allowed(key, value, kind) {
            accepted.insert(key, value);
            level = level.max(PoiLevel::Notable);
            continue;
        }

        if level == PoiLevel::None && rules::contains_pair(rules::ORDINARY, key, value) {
            level = PoiLevel::Ordinary;
        }

        if let Some(sibling) = rules::lookup_pair(rules::REQUIRES_SIBLING, key, value)
            && tags.contains_key(*sibling)
        {
            accepted.insert(key, value);
            level = level.max(PoiLevel::Notable);
            continue;
        }

        if let Some(options) = rules::lookup_pair(rules::REQUIRES_COMPANIONS, key, value)
            && any_companions_match(options, tags)
        {
            accepted.insert(key, value);
            level = level.max(PoiLevel::Notable);
        }
    }

    let strikes: usize = accepted
        .iter()
        .filter_map(|(key, value)| rules::lookup_pair(rules::UNDESIRABLE_COMPANIONS, key, value))
        .map(|options| {
            options
                .iter()
                .filter(|companions| companions_match(companions, tags))
                .count()
        })
        .sum();

    let all_struck = !accepted.is_empty() && strikes == accepted.len();
    let never_accepted = accepted.is_empty() && level == PoiLevel::None;
    if all_struck || never_accepted {
        return Classification::rejected();
    }

    Classification {
        tags: strip_name_keys(tags),
        level,
    }
}

/// Pick the display name for an element.
///
/// Preference order: `short_name` for universities, then `name:en`, then
/// `name`. Returns the empty string when none of these carry text.
///
/// # Examples
///
/// ```
/// use osmpoi_core::{name_from_tags, Tags};
///
/// let tags = Tags::from([
///     ("name".to_owned(), "native".to_owned()),
///     ("name:en".to_owned(), "english".to_owned()),
/// ]);
/// assert_eq!(name_from_tags(&tags), "english");
/// ```
#[must_use]
pub fn name_from_tags(tags: &Tags) -> &str {
    let non_blank = |key: &str| {
        tags.get(key)
            .map(String::as_str)
            .filter(|name| !name.trim().is_empty())
    };

    let university_short_name = tags
        .get("amenity")
        .filter(|amenity| *amenity == "university")
        .and_then(|_| non_blank("short_name"));

    university_short_name
        .or_else(|| non_blank("name:en"))
        .or_else(|| non_blank("name"))
        .unwrap_or_default()
}

/// Whether `key` names the element rather than describing it.
///
/// Matching ignores case and also covers namespaced variants such as
/// `name:de` or `old_name:en`.
#[must_use]
pub fn is_name_key(key: &str) -> bool {
    let key = key.to_lowercase();
    if rules::NAME_KEYS.contains(&key.as_str()) {
        return true;
    }
    key.rsplit_once(':')
        .is_some_and(|(prefix, _)| !prefix.is_empty() && rules::NAME_KEYS.contains(&prefix))
}

fn strip_name_keys(tags: &Tags) -> Tags {
    tags.iter()
        .filter(|(key, _)| !is_name_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn is_hard_rejected(tags: &Tags) -> bool {
    tags.iter().any(|(key, value)| {
        rules::UNDESIRABLE_KEYS.contains(&key.as_str())
            || rules::contains_pair(rules::UNDESIRABLE_PAIRS, key, value)
    })
}

fn is_allowed(key: &str, value: &str, kind: ElementKind) -> bool {
    if kind == ElementKind::Node && rules::contains_pair(rules::NODE_DISALLOWED, key, value) {
        return false;
    }
    rules::allowed_values(key)
        .is_some_and(|values| values.iter().any(|v| *v == rules::WILDCARD || *v == value))
}

fn any_companions_match(options: &[Companions], tags: &Tags) -> bool {
    options
        .iter()
        .any(|companions| companions_match(companions, tags))
}

fn companions_match(companions: &[(&str, &str)], tags: &Tags) -> bool {
    companions.iter().all(|&(key, expected)| {
        tags.get(key)
            .is_some_and(|actual| expected == rules::WILDCARD || actual == expected)
    })
}
