//! Flat-file CSV codecs (made by FontLab https://www.fontlab.com/)
//!
//! These are not general CSV readers. Lines split on commas with no quoting,
//! except in two places: the final free-text column of the rule and tag
//! metadata tables loses one layer of surrounding double quotes, and the
//! location column of the tagging table may be a double-quoted
//! `axis,axis@value,value` spec.

use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use tracing::warn;

use crate::lint::{LintRule, Severity};
use crate::location::Location;
use crate::tagging::{Font, Tagging};

/// A parsed line, fields addressed by the keys given to [`parse_csv`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    fields: Vec<(String, Option<String>)>,
}

impl CsvRecord {
    /// Field value; `None` when the line ran out of fields before `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    /// Like [`CsvRecord::get`], treating an empty field as missing.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

fn is_skipped(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Split each data line into at most `keys.len()` trimmed fields.
///
/// `#` comment lines and blank lines are skipped. The last key receives the
/// rest of the line, commas included.
pub fn parse_csv(text: &str, keys: &[&str]) -> Vec<CsvRecord> {
    text.lines()
        .filter(|line| !is_skipped(line))
        .map(|line| {
            let mut values = line.splitn(keys.len().max(1), ',');
            let fields = keys
                .iter()
                .map(|key| (key.to_string(), values.next().map(|v| v.trim().to_string())))
                .collect();
            CsvRecord { fields }
        })
        .collect()
}

fn quoted() -> &'static Regex {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    QUOTED.get_or_init(|| Regex::new(r#"^"(.*)"$"#).expect("static pattern compiles"))
}

/// Remove exactly one layer of surrounding double quotes.
pub fn strip_quotes(field: &str) -> String {
    match quoted().captures(field) {
        Some(caps) => caps[1].to_string(),
        None => field.to_string(),
    }
}

/// Parse `tag_rules.csv` (`rule,severity,description`).
pub fn parse_rules(text: &str) -> Vec<LintRule> {
    let mut rules = Vec::new();

    for record in parse_csv(text, &["rule", "severity", "description"]) {
        let (Some(rule), Some(severity), Some(description)) = (
            record.non_empty("rule"),
            record.non_empty("severity"),
            record.non_empty("description"),
        ) else {
            warn!(?record, "skipping rule line due to missing fields");
            continue;
        };

        let severity: Severity = match severity.parse() {
            Ok(sev) => sev,
            Err(err) => {
                warn!(rule, %err, "skipping rule line");
                continue;
            }
        };

        rules.push(LintRule {
            rule: rule.to_string(),
            description: strip_quotes(description).trim().to_string(),
            severity,
        });
    }

    rules
}

/// One row of `tags_metadata.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagMetadata {
    pub name: String,
    pub lowest_score: f32,
    pub highest_score: f32,
    pub description: String,
}

/// Parse `tags_metadata.csv` (`name,lowScore,highScore,description`).
pub fn parse_tag_metadata(text: &str) -> Vec<TagMetadata> {
    let mut rows = Vec::new();

    for record in parse_csv(text, &["name", "lowScore", "highScore", "description"]) {
        let Some(name) = record.non_empty("name") else {
            warn!(?record, "skipping tag metadata line without a name");
            continue;
        };
        let bounds = (
            record.get("lowScore").map(str::parse::<f32>),
            record.get("highScore").map(str::parse::<f32>),
        );
        let (Some(Ok(lowest_score)), Some(Ok(highest_score))) = bounds else {
            warn!(tag = name, "skipping tag metadata line with unreadable score bounds");
            continue;
        };

        rows.push(TagMetadata {
            name: name.to_string(),
            lowest_score,
            highest_score,
            description: strip_quotes(record.get("description").unwrap_or_default())
                .trim()
                .to_string(),
        });
    }

    rows
}

/// One row of the tagging table, before it is resolved against a library.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggingRecord {
    pub family: String,
    /// `None` for a static tagging.
    pub location: Option<Location>,
    pub tag: String,
    pub score: f32,
}

/// Parse `family,locationSpec,tag,score`.
pub fn parse_tagging_line(line: &str) -> Result<TaggingRecord> {
    let (family, rest) = line
        .split_once(',')
        .ok_or_else(|| anyhow!("expected 4 fields"))?;

    let (spec, rest) = match rest.trim_start().strip_prefix('"') {
        Some(quoted) => {
            let (spec, tail) = quoted
                .split_once('"')
                .ok_or_else(|| anyhow!("unterminated location spec"))?;
            let tail = tail
                .trim_start()
                .strip_prefix(',')
                .ok_or_else(|| anyhow!("expected ',' after location spec"))?;
            (spec, tail)
        }
        None => rest
            .split_once(',')
            .ok_or_else(|| anyhow!("expected 4 fields"))?,
    };

    let (tag, score) = rest
        .rsplit_once(',')
        .ok_or_else(|| anyhow!("expected 4 fields"))?;

    let family = family.trim();
    let tag = tag.trim();
    if family.is_empty() || tag.is_empty() {
        return Err(anyhow!("missing family name or tag name"));
    }

    let score: f32 = score
        .trim()
        .parse()
        .with_context(|| format!("invalid score {:?}", score.trim()))?;
    if !score.is_finite() {
        return Err(anyhow!("score must be a finite number, got {score}"));
    }

    let spec = spec.trim();
    let location = if spec.is_empty() {
        None
    } else {
        Some(Location::parse_spec(spec)?)
    };

    Ok(TaggingRecord {
        family: family.to_string(),
        location,
        tag: tag.to_string(),
        score,
    })
}

/// Parse a whole tagging table, skipping comments and unreadable lines.
pub fn parse_taggings(text: &str) -> Vec<TaggingRecord> {
    text.lines()
        .filter(|line| !is_skipped(line))
        .filter_map(|line| match parse_tagging_line(line) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(line, %err, "skipping tagging line");
                None
            }
        })
        .collect()
}

/// Lines for one tagging: one for a static tagging, one per location otherwise.
pub fn tagging_lines(tagging: &Tagging) -> Vec<String> {
    match tagging {
        Tagging::Static(t) => vec![format!("{},,{},{}", t.font, t.tag, t.score)],
        Tagging::Variable(t) => t
            .scores
            .iter()
            .map(|(location, score)| {
                format!("{},\"{}\",{},{}", t.font, location.to_spec(), t.tag, score)
            })
            .collect(),
    }
}

/// Serialize every tagging, fonts sorted by name and taggings by tag name.
pub fn export_taggings<'a, I>(fonts: I) -> String
where
    I: IntoIterator<Item = &'a Font>,
{
    let mut fonts: Vec<&Font> = fonts.into_iter().collect();
    fonts.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = Vec::new();
    for font in fonts {
        let mut taggings: Vec<&Tagging> = font.taggings().iter().collect();
        taggings.sort_by(|a, b| a.tag().cmp(b.tag()));
        for tagging in taggings {
            lines.extend(tagging_lines(tagging));
        }
    }

    lines.join("\n")
}
