//! The mutable tagging store (made by FontLab https://www.fontlab.com/)
//!
//! A [`Library`] pairs the immutable [`Registry`] with one [`Font`] per
//! family and everything the session has tagged. All mutation goes through
//! `&mut self`, so the at-most-one-tagging-per-tag check and the insert it
//! guards cannot interleave with another writer.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::csv::{export_taggings, parse_taggings, TaggingRecord};
use crate::exemplars::{select_exemplars, ExemplarCache, Exemplars};
use crate::lint::LintWarning;
use crate::location::{axis_name, Location};
use crate::registry::Registry;
use crate::tagging::{Font, StaticTagging, Tagging, VariableTagging};

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct Library {
    registry: Arc<Registry>,
    fonts: Vec<Font>,
    positions: HashMap<String, usize>,
    exemplars: ExemplarCache,
}

impl Library {
    pub fn new(registry: Arc<Registry>) -> Self {
        let fonts: Vec<Font> = registry
            .families()
            .iter()
            .map(|f| Font::new(f.name.clone(), f.axes.clone()))
            .collect();
        let positions = fonts
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .collect();

        Self {
            registry,
            fonts,
            positions,
            exemplars: ExemplarCache::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fonts(&self) -> &[Font] {
        &self.fonts
    }

    pub fn font(&self, name: &str) -> Option<&Font> {
        self.positions.get(name).map(|&idx| &self.fonts[idx])
    }

    /// Add a tagging after checking that its family, tag and axes exist.
    ///
    /// Returns false, with a logged reason, when any reference is unknown or
    /// the font already has a tagging for this tag.
    pub fn add_tagging(&mut self, tagging: Tagging) -> bool {
        let Some(&idx) = self.positions.get(tagging.font()) else {
            warn!(family = %tagging.font(), "family not found; tagging not added");
            return false;
        };
        let Some(tag) = self.registry.tags().get(tagging.tag()) else {
            warn!(tag = %tagging.tag(), "tag not registered; tagging not added");
            return false;
        };

        let font = &self.fonts[idx];
        if let Tagging::Variable(variable) = &tagging {
            if !variable.scores.iter().all(|(loc, _)| location_fits(font, loc)) {
                return false;
            }
        }

        let range = tag.score_range();
        let out_of_range = match &tagging {
            Tagging::Static(t) => !range.contains(&t.score),
            Tagging::Variable(t) => t.scores.iter().any(|(_, s)| !range.contains(s)),
        };
        if out_of_range {
            warn!(
                family = %tagging.font(),
                tag = %tagging.tag(),
                lowest = tag.lowest_score,
                highest = tag.highest_score,
                "score outside the tag's bounds"
            );
        }

        let tag_name = tagging.tag().to_string();
        let is_static = tagging.is_static();
        let added = self.fonts[idx].add_tagging(tagging);
        if added && is_static {
            self.exemplars.invalidate(&tag_name);
        }
        added
    }

    /// Remove the tagging `family` has for `tag`, if any.
    pub fn remove_tagging(&mut self, family: &str, tag: &str) -> Option<Tagging> {
        let idx = *self.positions.get(family)?;
        let removed = self.fonts[idx].remove_tagging(tag)?;
        if removed.is_static() {
            self.exemplars.invalidate(tag);
        }
        Some(removed)
    }

    pub fn has_tagging(&self, family: &str, tag: &str) -> bool {
        self.font(family).is_some_and(|f| f.has_tagging(tag))
    }

    /// Every tagging of every font, read-only.
    pub fn all_taggings(&self) -> impl Iterator<Item = &Tagging> + '_ {
        self.fonts.iter().flat_map(|f| f.taggings().iter())
    }

    pub fn len(&self) -> usize {
        self.fonts.iter().map(|f| f.taggings().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tag names in use, sorted and de-duplicated.
    pub fn categories(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.all_taggings().map(Tagging::tag).collect();
        names.into_iter().collect()
    }

    /// Exemplars for a registered tag, computed once and reused until a static
    /// tagging of that tag is added or removed.
    pub fn exemplars(&mut self, tag: &str) -> Option<&Exemplars> {
        if !self.registry.tags().contains(tag) {
            warn!(tag, "tag not registered; no exemplars");
            return None;
        }
        let fonts = &self.fonts;
        Some(self.exemplars.get_or_insert_with(tag, || {
            select_exemplars(tag, fonts.iter().flat_map(|f| f.taggings().iter()))
        }))
    }

    /// Run the registry's rule table against one family.
    pub fn lint(&self, family: &str) -> Option<Vec<LintWarning>> {
        let Some(font) = self.font(family) else {
            warn!(family, "family not found; nothing to lint");
            return None;
        };
        Some(self.registry.rule_table().lint(font))
    }

    /// Families with at least one warning, in family order.
    pub fn lint_all(&self) -> Vec<(&str, Vec<LintWarning>)> {
        self.fonts
            .iter()
            .map(|font| (font.name.as_str(), self.registry.rule_table().lint(font)))
            .filter(|(_, warnings)| !warnings.is_empty())
            .collect()
    }

    pub fn similar_families(&self, family: &str, count: usize) -> Vec<String> {
        self.registry.similar_families(family, count)
    }

    /// Add one parsed CSV row. Variable rows for a (family, tag) pair that
    /// already has a variable tagging extend it with a new location.
    pub fn import_record(&mut self, record: TaggingRecord) -> bool {
        let TaggingRecord {
            family,
            location,
            tag,
            score,
        } = record;

        let Some(location) = location else {
            return self.add_tagging(Tagging::Static(StaticTagging {
                font: family,
                tag,
                score,
            }));
        };

        if let Some(&idx) = self.positions.get(&family) {
            if !location_fits(&self.fonts[idx], &location) {
                return false;
            }
            if let Some(Tagging::Variable(existing)) = self.fonts[idx].tagging_mut(&tag) {
                if existing.push_score(location, score) {
                    return true;
                }
                warn!(%family, %tag, "location already scored; skipping");
                return false;
            }
        }

        self.add_tagging(Tagging::Variable(
            VariableTagging::new(family, tag).with_score(location, score),
        ))
    }

    /// Import a whole tagging table. Unparsable lines count as skipped.
    pub fn import_taggings(&mut self, text: &str) -> ImportSummary {
        let data_lines = text
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .count();
        let records = parse_taggings(text);

        let mut summary = ImportSummary {
            added: 0,
            skipped: data_lines - records.len(),
        };
        for record in records {
            if self.import_record(record) {
                summary.added += 1;
            } else {
                summary.skipped += 1;
            }
        }

        debug!(added = summary.added, skipped = summary.skipped, "taggings imported");
        summary
    }

    /// The tagging table, fonts sorted by name and taggings by tag.
    pub fn export_taggings(&self) -> String {
        export_taggings(&self.fonts)
    }
}

fn location_fits(font: &Font, location: &Location) -> bool {
    for axis in location.axes() {
        if font.axis(axis).is_none() {
            warn!(
                family = %font.name,
                axis = %axis_name(axis),
                "axis not found in family; tagging not added"
            );
            return false;
        }
    }
    true
}
