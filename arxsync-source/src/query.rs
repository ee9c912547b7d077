//! Search-query presets for the arXiv API.
//!
//! Queries are built in the API's own `+OR+` form and passed through verbatim.

use arxsync_core::{config::DEFAULT_QUERY, Query};

/// Every `cs.*` category.
pub const CS_CATEGORIES: &[&str] = &[
    "cs.AI", "cs.CL", "cs.CC", "cs.CE", "cs.CG", "cs.GT", "cs.CV", "cs.CY", "cs.CR", "cs.DS",
    "cs.DB", "cs.DL", "cs.DM", "cs.DC", "cs.ET", "cs.FL", "cs.GL", "cs.GR", "cs.AR", "cs.HC",
    "cs.IR", "cs.IT", "cs.LO", "cs.LG", "cs.MS", "cs.MA", "cs.MM", "cs.NI", "cs.NE", "cs.NA",
    "cs.OS", "cs.OH", "cs.PF", "cs.PL", "cs.RO", "cs.SI", "cs.SE", "cs.SD", "cs.SC", "cs.SY",
];

/// Union of the given categories: `cat:a+OR+cat:b+OR+…`.
pub fn categories(cats: &[&str]) -> Query {
    let joined = cats
        .iter()
        .map(|c| format!("cat:{c}"))
        .collect::<Vec<_>>()
        .join("+OR+");
    Query::from(joined)
}

/// Audio and speech processing (`eess.AS`, `cs.SD`). The default query.
pub fn audio_speech() -> Query {
    Query::from(DEFAULT_QUERY)
}

/// All of computer science.
pub fn computer_science() -> Query {
    categories(CS_CATEGORIES)
}

/// Resolve a preset name, or `None` if `name` is not a preset.
pub fn preset(name: &str) -> Option<Query> {
    match name {
        "audio" | "audio-speech" => Some(audio_speech()),
        "cs" | "computer-science" => Some(computer_science()),
        _ => None,
    }
}
