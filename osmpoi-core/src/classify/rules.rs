//! Static rule tables consulted by [`classify`](super::classify).
//!
//! Every table is keyed by a tag key and value. A companion value of `*`
//! matches any value.

/// Tags whose key alone disqualifies an element.
pub(super) const UNDESIRABLE_KEYS: &[&str] = &["admin_level"];

/// Tag pairs that disqualify an element outright.
pub(super) const UNDESIRABLE_PAIRS: &[(&str, &str)] = &[
    ("amenity", "restaurant"),
    ("bus", "yes"),
    ("tourism", "roller_coaster"),
    ("tourism", "theme_area"),
];

/// Keys with the values that make an element notable on their own.
pub(super) const ALLOWED: &[(&str, &[&str])] = &[
    ("aeroway", &["aerodrome"]),
    (
        "amenity",
        &[
            "college",
            "fountain",
            "grave_yard",
            "library",
            "marketplace",
            "monastery",
            "public_bath",
            "research_institute",
            "university",
        ],
    ),
    ("attraction", &["*"]),
    ("boundary", &["national_park"]),
    ("bridge", &["aqueduct"]),
    ("building", &["train_station"]),
    ("geological", &["palaeontological_site"]),
    (
        "historic",
        &[
            "aqueduct",
            "archaeological_site",
            "battlefield",
            "bunker",
            "castle",
            "cemetery",
            "church",
            "city_gate",
            "folly",
            "fort",
            "fountain",
            "landmark",
            "lighthouse",
            "manor",
            "memorial",
            "monastery",
            "monument",
            "palace",
            "ruins",
            "ship",
            "tomb",
            "tower",
            "windmill",
            "wreck",
        ],
    ),
    ("landuse", &["cemetery"]),
    (
        "leisure",
        &[
            "amusement_arcade",
            "bowling_alley",
            "dog_park",
            "garden",
            "marina",
            "park",
            "sports_centre",
            "stadium",
            "water_park",
        ],
    ),
    ("man_made", &["lighthouse", "obelisk", "windmill"]),
    ("natural", &["volcano"]),
    ("public_transport", &["station", "stop_position"]),
    ("railway", &["station", "stop"]),
    (
        "tourism",
        &[
            "aquarium",
            "historical",
            "museum",
            "theme_park",
            "viewpoint",
            "zoo",
        ],
    ),
];

/// Pairs that are only meaningful as areas, never as bare points.
pub(super) const NODE_DISALLOWED: &[(&str, &str)] = &[("amenity", "fountain")];

/// Pairs that make an element ordinary when nothing better applies.
pub(super) const ORDINARY: &[(&str, &str)] = &[
    ("tourism", "aquarium"),
    ("tourism", "artwork"),
    ("tourism", "attraction"),
    ("tourism", "giant_furniture"),
    ("tourism", "landmark"),
    ("tourism", "memorial"),
    ("tourism", "monument"),
    ("tourism", "museum"),
    ("tourism", "observatory"),
    ("tourism", "park"),
    ("tourism", "ruins"),
    ("tourism", "theme_park"),
    ("tourism", "tower"),
    ("tourism", "viewpoint"),
    ("tourism", "winery"),
    ("tourism", "zoo"),
];

/// Pairs that become notable when the named sibling key is present.
pub(super) const REQUIRES_SIBLING: &[((&str, &str), &str)] = &[
    (("amenity", "place_of_worship"), "wikipedia"),
    (("building", "cathedral"), "wikipedia"),
    (("man_made", "bridge"), "wikipedia"),
    (("man_made", "tower"), "wikipedia"),
    (("leisure", "playground"), "wikipedia"),
    (("place", "square"), "wikipedia"),
    (("ruins", "yes"), "wikipedia"),
    (("tourism", "artwork"), "wikipedia"),
    (("tourism", "attraction"), "wikipedia"),
    (("tourism", "monument"), "wikipedia"),
];

/// A set of tags that must all be present for a companion rule to fire.
pub(super) type Companions = &'static [(&'static str, &'static str)];

/// Pairs that become notable when any one companion set fully matches.
pub(super) const REQUIRES_COMPANIONS: &[((&str, &str), &[Companions])] = &[
    (("artwork_type", "sculpture"), &[&[("landmark", "*")]]),
    (("highway", "pedestrian"), &[&[("place", "square")]]),
    (("leisure", "playground"), &[&[("tourism", "attraction")]]),
    (("man_made", "bridge"), &[&[("tourism", "attraction")]]),
    (("man_made", "tower"), &[&[("tower:type", "defensive")]]),
    (
        ("tourism", "artwork"),
        &[
            &[("artwork_type", "architecture")],
            &[("artwork_type", "statue"), ("wikipedia", "*")],
            &[("artwork_type", "sculpture"), ("wikipedia", "*")],
        ],
    ),
    (
        ("tourism", "attraction"),
        &[
            &[("building", "temple")],
            &[("man_made", "pier")],
            &[("office", "government")],
        ],
    ),
];

/// Accepted pairs that are struck off when a companion set fully matches.
pub(super) const UNDESIRABLE_COMPANIONS: &[((&str, &str), &[Companions])] = &[
    (("attraction", "train"), &[&[("type", "route")]]),
    (("boundary", "protected_area"), &[&[("type", "boundary")]]),
    (("leisure", "garden"), &[&[("garden:type", "roof_garden")]]),
];

/// Name-bearing keys excluded from the stored tag bag.
pub(super) const NAME_KEYS: &[&str] = &[
    "name",
    "alt_name",
    "alt_short_name",
    "int_name",
    "long_name",
    "not_official_name",
    "not:official_name",
    "official_name",
    "old_name",
    "old_proposed_name",
    "old_short_name",
    "short_name",
];

pub(super) const WILDCARD: &str = "*";

pub(super) fn contains_pair(table: &[(&str, &str)], key: &str, value: &str) -> bool {
    table.iter().any(|&(k, v)| k == key && v == value)
}

pub(super) fn lookup_pair<'t, T>(table: &'t [((&str, &str), T)], key: &str, value: &str) -> Option<&'t T> {
    table
        .iter()
        .find(|((k, v), _)| *k == key && *v == value)
        .map(|(_, entry)| entry)
}

pub(super) fn allowed_values(key: &str) -> Option<&'static [&'static str]> {
    ALLOWED
        .iter()
        .find(|(k, _)| *k == key)
        .map(|&(_, values)| values)
}
