//! Representative taggings for a tag (made by FontLab https://www.fontlab.com/)

use std::collections::HashMap;

use serde::Serialize;

use crate::tagging::{StaticTagging, Tagging};

pub const MAX_PER_BUCKET: usize = 3;

const HIGH_ABOVE: f32 = 80.0;
const LOW_AT_MOST: f32 = 20.0;
const MEDIUM_ABOVE: f32 = 33.0;
const MEDIUM_BELOW: f32 = 66.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Exemplars {
    pub high: Vec<StaticTagging>,
    pub low: Vec<StaticTagging>,
    pub medium: Vec<StaticTagging>,
}

impl Exemplars {
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty() && self.medium.is_empty()
    }
}

/// Pick up to three high, low and medium static taggings of `tag_name`.
///
/// High is the strongest scores above 80, low the weakest at or below 20,
/// medium the first three seen strictly between 33 and 66. Scores in
/// (20, 33] and [66, 80] never qualify. Variable taggings are ignored.
pub fn select_exemplars<'a, I>(tag_name: &str, taggings: I) -> Exemplars
where
    I: IntoIterator<Item = &'a Tagging>,
{
    let mut exemplars = Exemplars::default();

    for tagging in taggings {
        let Some(tagging) = tagging.as_static() else {
            continue;
        };
        if tagging.tag != tag_name {
            continue;
        }

        let score = tagging.score;
        if score > HIGH_ABOVE {
            exemplars.high.push(tagging.clone());
        } else if score <= LOW_AT_MOST {
            exemplars.low.push(tagging.clone());
        } else if score > MEDIUM_ABOVE
            && score < MEDIUM_BELOW
            && exemplars.medium.len() < MAX_PER_BUCKET
        {
            exemplars.medium.push(tagging.clone());
        }
    }

    exemplars.high.sort_by(|a, b| b.score.total_cmp(&a.score));
    exemplars.high.truncate(MAX_PER_BUCKET);
    exemplars.low.sort_by(|a, b| a.score.total_cmp(&b.score));
    exemplars.low.truncate(MAX_PER_BUCKET);

    exemplars
}

/// Per-tag memo of [`select_exemplars`] results.
#[derive(Debug, Clone, Default)]
pub struct ExemplarCache {
    entries: HashMap<String, Exemplars>,
}

impl ExemplarCache {
    pub fn get(&self, tag_name: &str) -> Option<&Exemplars> {
        self.entries.get(tag_name)
    }

    pub fn get_or_insert_with(
        &mut self,
        tag_name: &str,
        compute: impl FnOnce() -> Exemplars,
    ) -> &Exemplars {
        self.entries
            .entry(tag_name.to_string())
            .or_insert_with(compute)
    }

    pub fn invalidate(&mut self, tag_name: &str) {
        self.entries.remove(tag_name);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
