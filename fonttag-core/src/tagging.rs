//! Taggings and the fonts that own them (made by FontLab https://www.fontlab.com/)

use std::collections::HashMap;

use read_fonts::types::Tag;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::location::{axis_name, Location};

/// One variation axis of a family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    #[serde(serialize_with = "serialize_axis_tag")]
    pub tag: Tag,
    pub min: f32,
    pub max: f32,
    pub default_value: Option<f32>,
}

impl Axis {
    pub fn new(tag: Tag, min: f32, max: f32) -> Self {
        Self {
            tag,
            min,
            max,
            default_value: None,
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// A whole-font score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticTagging {
    pub font: String,
    pub tag: String,
    pub score: f32,
}

/// Scores keyed by design-space location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableTagging {
    pub font: String,
    pub tag: String,
    pub scores: Vec<(Location, f32)>,
}

impl VariableTagging {
    pub fn new(font: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            font: font.into(),
            tag: tag.into(),
            scores: Vec::new(),
        }
    }

    pub fn with_score(mut self, location: Location, score: f32) -> Self {
        self.push_score(location, score);
        self
    }

    /// Record `score` at `location`. Returns false, leaving the existing entry
    /// alone, when the location already has a score.
    pub fn push_score(&mut self, location: Location, score: f32) -> bool {
        if self.score_at(&location).is_some() {
            return false;
        }
        self.scores.push((location, score));
        true
    }

    /// Score recorded for exactly this location.
    pub fn score_at(&self, location: &Location) -> Option<f32> {
        self.scores
            .iter()
            .find(|(loc, _)| loc == location)
            .map(|(_, score)| *score)
    }

    /// Mean over every location. Prefer [`VariableTagging::score_at`]: the
    /// average hides exactly the variation this tagging exists to record.
    pub fn score(&self) -> Option<f32> {
        if self.scores.is_empty() {
            return None;
        }
        let total: f32 = self.scores.iter().map(|(_, s)| s).sum();
        Some(total / self.scores.len() as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tagging {
    Static(StaticTagging),
    Variable(VariableTagging),
}

impl Tagging {
    pub fn new_static(font: impl Into<String>, tag: impl Into<String>, score: f32) -> Self {
        Tagging::Static(StaticTagging {
            font: font.into(),
            tag: tag.into(),
            score,
        })
    }

    pub fn font(&self) -> &str {
        match self {
            Tagging::Static(t) => &t.font,
            Tagging::Variable(t) => &t.font,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Tagging::Static(t) => &t.tag,
            Tagging::Variable(t) => &t.tag,
        }
    }

    pub fn as_static(&self) -> Option<&StaticTagging> {
        match self {
            Tagging::Static(t) => Some(t),
            Tagging::Variable(_) => None,
        }
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Tagging::Static(_))
    }
}

/// A family and the taggings recorded for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub name: String,
    pub axes: Vec<Axis>,
    taggings: Vec<Tagging>,
}

impl Font {
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Self {
        Self {
            name: name.into(),
            axes,
            taggings: Vec::new(),
        }
    }

    pub fn is_vf(&self) -> bool {
        !self.axes.is_empty()
    }

    pub fn axis(&self, tag: Tag) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.tag == tag)
    }

    pub fn taggings(&self) -> &[Tagging] {
        &self.taggings
    }

    pub fn has_tagging(&self, tag_name: &str) -> bool {
        self.taggings.iter().any(|t| t.tag() == tag_name)
    }

    pub fn tagging(&self, tag_name: &str) -> Option<&Tagging> {
        self.taggings.iter().find(|t| t.tag() == tag_name)
    }

    pub(crate) fn tagging_mut(&mut self, tag_name: &str) -> Option<&mut Tagging> {
        self.taggings.iter_mut().find(|t| t.tag() == tag_name)
    }

    /// Add `tagging` unless it names another family or this font already has
    /// one for the same tag.
    pub fn add_tagging(&mut self, tagging: Tagging) -> bool {
        if tagging.font() != self.name {
            warn!(
                font = %self.name,
                tagging_font = %tagging.font(),
                "tagging belongs to another family; skipping addition"
            );
            return false;
        }
        if self.has_tagging(tagging.tag()) {
            warn!(
                font = %self.name,
                tag = %tagging.tag(),
                "tagging already exists; skipping addition"
            );
            return false;
        }
        self.taggings.push(tagging);
        true
    }

    pub fn remove_tagging(&mut self, tag_name: &str) -> Option<Tagging> {
        let idx = self.taggings.iter().position(|t| t.tag() == tag_name)?;
        Some(self.taggings.remove(idx))
    }

    /// Tag name to score for static taggings only; variable taggings have no
    /// single score to offer.
    pub fn static_scores(&self) -> HashMap<&str, f32> {
        self.taggings
            .iter()
            .filter_map(Tagging::as_static)
            .map(|t| (t.tag.as_str(), t.score))
            .collect()
    }
}

fn serialize_axis_tag<S: Serializer>(tag: &Tag, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&axis_name(*tag))
}
