//! Immutable reference data and the builder that assembles it (made by FontLab https://www.fontlab.com/)
//!
//! Families, tag definitions, lint rules and style embeddings are read once
//! and never change during a session. [`RegistryBuilder`] takes every raw
//! input up front and decodes it into typed records, rejecting malformed
//! files instead of letting half-read data through. Taggings live in a
//! [`crate::library::Library`], which can only be created from a finished
//! [`Registry`], so every tag a tagging names is known before the tagging
//! exists.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::csv::{parse_rules, parse_tag_metadata};
use crate::error::LoadError;
use crate::lint::{LintRule, RuleTable};
use crate::location::axis_tag;
use crate::similarity::EmbeddingIndex;
use crate::source::{DataFiles, TextSource};
use crate::tagging::{Axis, Font};
use crate::tags::{TagDefinition, TagRegistry};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FamilyDataFile {
    family_metadata_list: Vec<FamilyRecord>,
}

#[derive(Debug, Deserialize)]
struct FamilyRecord {
    family: String,
    #[serde(default)]
    axes: Vec<AxisRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AxisRecord {
    tag: String,
    min: f32,
    max: f32,
    #[serde(default)]
    default_value: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagDefinitionRecord {
    #[serde(default)]
    description: String,
    #[serde(default)]
    super_short_description: String,
    #[serde(default)]
    related: Vec<String>,
}

/// Everything loaded at startup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tags: TagRegistry,
    families: Vec<Font>,
    rules: RuleTable,
    embeddings: EmbeddingIndex,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Read and decode every file named in `files`.
    pub fn load(source: &impl TextSource, files: &DataFiles) -> Result<Self, LoadError> {
        let read = |path: &str| {
            source.load_text(path).map_err(|err| LoadError::Read {
                path: path.to_string(),
                source: err,
            })
        };

        RegistryBuilder::default()
            .with_paths(files.clone())
            .family_data(read(&files.family_data)?)
            .embeddings(read(&files.embeddings)?)
            .tag_definitions(read(&files.tag_definitions)?)
            .tag_metadata(read(&files.tag_metadata)?)
            .rules(read(&files.rules)?)
            .build()
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Families in `family_data.json` order, without taggings.
    pub fn families(&self) -> &[Font] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&Font> {
        self.families.iter().find(|f| f.name == name)
    }

    pub fn rules(&self) -> &[LintRule] {
        self.rules.rules()
    }

    /// The rule table, compiled once at build time.
    pub fn rule_table(&self) -> &RuleTable {
        &self.rules
    }

    pub fn embeddings(&self) -> &EmbeddingIndex {
        &self.embeddings
    }

    pub fn similar_families(&self, name: &str, count: usize) -> Vec<String> {
        self.embeddings.similar_families(name, count)
    }
}

/// Collects raw inputs and typed extras, then decodes them all in [`RegistryBuilder::build`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    paths: DataFiles,
    family_data: Option<String>,
    embeddings: Option<String>,
    tag_definitions: Option<String>,
    tag_metadata: Option<String>,
    rules: Option<String>,
    extra_tags: Vec<TagDefinition>,
    extra_families: Vec<Font>,
    extra_rules: Vec<LintRule>,
    extra_embeddings: Vec<(String, Vec<f32>)>,
}

impl RegistryBuilder {
    /// File names used in error messages.
    pub fn with_paths(mut self, paths: DataFiles) -> Self {
        self.paths = paths;
        self
    }

    pub fn family_data(mut self, json: impl Into<String>) -> Self {
        self.family_data = Some(json.into());
        self
    }

    pub fn embeddings(mut self, json: impl Into<String>) -> Self {
        self.embeddings = Some(json.into());
        self
    }

    pub fn tag_definitions(mut self, json: impl Into<String>) -> Self {
        self.tag_definitions = Some(json.into());
        self
    }

    pub fn tag_metadata(mut self, csv: impl Into<String>) -> Self {
        self.tag_metadata = Some(csv.into());
        self
    }

    pub fn rules(mut self, csv: impl Into<String>) -> Self {
        self.rules = Some(csv.into());
        self
    }

    pub fn tag(mut self, tag: TagDefinition) -> Self {
        self.extra_tags.push(tag);
        self
    }

    pub fn family(mut self, font: Font) -> Self {
        self.extra_families.push(font);
        self
    }

    pub fn rule(mut self, rule: LintRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    pub fn embedding(mut self, family: impl Into<String>, vector: Vec<f32>) -> Self {
        self.extra_embeddings.push((family.into(), vector));
        self
    }

    pub fn build(self) -> Result<Registry, LoadError> {
        let tags = self.build_tags()?;
        let families = self.build_families()?;
        let embeddings = self.build_embeddings(&families)?;

        let mut rules = match &self.rules {
            Some(text) => parse_rules(text),
            None => Vec::new(),
        };
        rules.extend(self.extra_rules);

        debug!(
            tags = tags.len(),
            families = families.len(),
            rules = rules.len(),
            embeddings = embeddings.len(),
            "registry built"
        );

        Ok(Registry {
            tags,
            families,
            rules: RuleTable::compile(rules),
            embeddings,
        })
    }

    fn build_tags(&self) -> Result<TagRegistry, LoadError> {
        let mut tags = TagRegistry::new();

        if let Some(json) = &self.tag_definitions {
            let defs: HashMap<String, TagDefinitionRecord> = serde_json::from_str(json)
                .map_err(|e| LoadError::malformed(&self.paths.tag_definitions, e))?;
            for (name, def) in defs {
                tags.register(
                    TagDefinition::new(name)
                        .with_description(def.description)
                        .with_short_description(def.super_short_description)
                        .with_related(def.related),
                );
            }
        }

        if let Some(csv) = &self.tag_metadata {
            for row in parse_tag_metadata(csv) {
                if row.lowest_score > row.highest_score {
                    return Err(LoadError::malformed(
                        &self.paths.tag_metadata,
                        format!("{}: lowScore above highScore", row.name),
                    ));
                }
                match tags.get_mut(&row.name) {
                    Some(tag) => {
                        tag.lowest_score = row.lowest_score;
                        tag.highest_score = row.highest_score;
                        if tag.description.is_empty() {
                            tag.description = row.description;
                        }
                    }
                    None => tags.register(
                        TagDefinition::new(row.name)
                            .with_description(row.description)
                            .with_bounds(row.lowest_score, row.highest_score),
                    ),
                }
            }
        }

        for tag in &self.extra_tags {
            tags.register(tag.clone());
        }

        Ok(tags)
    }

    fn build_families(&self) -> Result<Vec<Font>, LoadError> {
        let mut families = Vec::new();
        let mut seen = HashSet::new();

        if let Some(json) = &self.family_data {
            let file: FamilyDataFile = serde_json::from_str(json)
                .map_err(|e| LoadError::malformed(&self.paths.family_data, e))?;

            for record in file.family_metadata_list {
                let axes = record
                    .axes
                    .into_iter()
                    .map(|axis| {
                        let tag = axis_tag(&axis.tag).map_err(|e| {
                            let reason = format!("{}: {e}", record.family);
                            LoadError::malformed(&self.paths.family_data, reason)
                        })?;
                        Ok(Axis {
                            tag,
                            min: axis.min,
                            max: axis.max,
                            default_value: axis.default_value,
                        })
                    })
                    .collect::<Result<Vec<Axis>, LoadError>>()?;

                if !seen.insert(record.family.clone()) {
                    warn!(
                        family = %record.family,
                        "duplicate family in family data; keeping the first"
                    );
                    continue;
                }
                families.push(Font::new(record.family, axes));
            }
        }

        for font in &self.extra_families {
            if seen.insert(font.name.clone()) {
                families.push(Font::new(font.name.clone(), font.axes.clone()));
            }
        }

        Ok(families)
    }

    fn build_embeddings(&self, families: &[Font]) -> Result<EmbeddingIndex, LoadError> {
        let mut index = EmbeddingIndex::new();

        if let Some(json) = &self.embeddings {
            let mut vectors: HashMap<String, Vec<f32>> = serde_json::from_str(json)
                .map_err(|e| LoadError::malformed(&self.paths.embeddings, e))?;
            // Family order, not file order, decides tie-breaking in searches.
            for font in families {
                if let Some(vector) = vectors.remove(&font.name) {
                    index.insert(font.name.clone(), vector);
                }
            }
            if !vectors.is_empty() {
                debug!(
                    count = vectors.len(),
                    "embeddings without family metadata ignored"
                );
            }
        }

        for (family, vector) in &self.extra_embeddings {
            index.insert(family.clone(), vector.clone());
        }

        Ok(index)
    }
}
