/// Descriptive tags and the registry that names them
///
/// A tag is a slash path such as `/Expressive/Loud` or `/Serif/Humanist`.
/// The first segment is the tag's area; the rest narrows it down. Tags are
/// reference data: they are loaded once, before any tagging points at them,
/// and never change during a session.
///
/// Made with curiosity at FontLab https://www.fontlab.com/
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::Serialize;

/// Areas whose friendly names read as "<style> <area>", e.g. "Humanist Serif".
const CLASSIFICATION_AREAS: &[&str] = &["Sans", "Serif", "Slab", "Script", "Monospace"];

pub const DEFAULT_LOWEST_SCORE: f32 = 0.0;
pub const DEFAULT_HIGHEST_SCORE: f32 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDefinition {
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub related: Vec<String>,
    pub lowest_score: f32,
    pub highest_score: f32,
}

impl TagDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            short_description: String::new(),
            related: Vec::new(),
            lowest_score: DEFAULT_LOWEST_SCORE,
            highest_score: DEFAULT_HIGHEST_SCORE,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_short_description(mut self, short: impl Into<String>) -> Self {
        self.short_description = short.into();
        self
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    pub fn with_bounds(mut self, lowest: f32, highest: f32) -> Self {
        self.lowest_score = lowest;
        self.highest_score = highest;
        self
    }

    pub fn score_range(&self) -> RangeInclusive<f32> {
        self.lowest_score..=self.highest_score
    }

    /// Path segments, ignoring empty pieces from leading or doubled slashes.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split('/').filter(|s| !s.is_empty())
    }

    /// The top-level segment (`Expressive` for `/Expressive/Loud`).
    pub fn area(&self) -> Option<&str> {
        self.segments().next()
    }

    /// Human-facing label derived from the path.
    ///
    /// Classification areas put the area last (`/Sans/Geometric` becomes
    /// "Geometric Sans"); every other area drops it (`/Expressive/Loud`
    /// becomes "Loud"). Single-segment tags are their own label.
    pub fn friendly_name(&self) -> String {
        let segments: Vec<&str> = self.segments().collect();
        match segments.as_slice() {
            [] => self.name.clone(),
            [only] => (*only).to_string(),
            [area, rest @ ..] => {
                let rest = rest.join(" ");
                if CLASSIFICATION_AREAS.contains(area) {
                    format!("{rest} {area}")
                } else {
                    rest
                }
            }
        }
    }
}

/// Tag definitions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: BTreeMap<String, TagDefinition>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tag`, replacing any earlier definition with the same name.
    pub fn register(&mut self, tag: TagDefinition) {
        self.tags.insert(tag.name.clone(), tag);
    }

    pub fn get(&self, name: &str) -> Option<&TagDefinition> {
        self.tags.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut TagDefinition> {
        self.tags.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &TagDefinition> {
        self.tags.values()
    }
}
