//! Built-in rule tables.
//!
//! Keywords are matched as whole phrases of the narrative, ignoring case.
//! They are phrases on purpose: single words such as "dark" or "exit" show
//! up in too many unrelated citations.

/// CFR sections whose citation alone marks a violation as illumination-related.
///
/// 1910.37 covers exit-route lighting, 1926.56 and 1926.26 construction
/// illumination.
pub const CFR_SECTIONS: &[&str] = &["1910.37", "1926.56", "1926.26"];

/// Narrative says outright that there was not enough light.
pub const EXPLICIT_LOW_LIGHT_KEYWORDS: &[&str] = &[
    "inadequate lighting",
    "inadequate illumination",
    "inadequately lit",
    "inadequately lighted",
    "insufficient lighting",
    "insufficient illumination",
    "poor lighting",
    "poor illumination",
    "low light",
    "dimly lit",
    "dim lighting",
    "too dark",
    "not adequately lighted",
    "not adequately lit",
    "lack of lighting",
    "lack of illumination",
];

/// Emergency and exit-route lighting deficiencies.
pub const EGRESS_LIGHTING_KEYWORDS: &[&str] = &[
    "no emergency lighting",
    "emergency lighting",
    "emergency lights",
    "egress lighting",
    "exit lighting",
    "exit route lighting",
    "exit sign not illuminated",
    "exit signs not illuminated",
    "exit sign was not illuminated",
    "exit signs were not illuminated",
    "unlit exit",
];

/// Hazards that arise because workers could not see.
pub const VISIBILITY_HAZARD_KEYWORDS: &[&str] = &[
    "poor visibility",
    "low visibility",
    "limited visibility",
    "reduced visibility",
    "unable to see",
    "could not see",
    "not visible",
    "dark stairway",
    "dark stairwell",
    "dark area",
];
