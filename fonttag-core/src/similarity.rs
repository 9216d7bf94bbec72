//! Nearest-neighbour search over style embeddings (made by FontLab https://www.fontlab.com/)
//!
//! Every family may carry a precomputed style vector. Families are compared
//! by Euclidean distance over the query's components: a shorter candidate is
//! padded with zeros and a longer candidate's extra components are ignored.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tracing::warn;

pub const DEFAULT_NEIGHBOURS: usize = 10;

/// Style embeddings in insertion order.
#[derive(Debug, Default)]
pub struct EmbeddingIndex {
    entries: Vec<(String, Vec<f32>)>,
    positions: HashMap<String, usize>,
    // Families already reported as missing an embedding.
    reported: Mutex<HashSet<String>>,
}

impl EmbeddingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a family's vector. Replacing keeps the original position.
    pub fn insert(&mut self, family: impl Into<String>, embedding: Vec<f32>) {
        let family = family.into();
        match self.positions.get(&family) {
            Some(&idx) => self.entries[idx].1 = embedding,
            None => {
                self.positions.insert(family.clone(), self.entries.len());
                self.entries.push((family, embedding));
            }
        }
    }

    pub fn get(&self, family: &str) -> Option<&[f32]> {
        self.positions
            .get(family)
            .map(|&idx| self.entries[idx].1.as_slice())
    }

    pub fn contains(&self, family: &str) -> bool {
        self.positions.contains_key(family)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Up to `count` families closest to `family`, nearest first.
    ///
    /// The ranking includes `family` itself (at distance zero) and is cut to
    /// `count` before it is removed, so the result may hold `count - 1`
    /// names. Equal distances keep insertion order.
    pub fn similar_families(&self, family: &str, count: usize) -> Vec<String> {
        let Some(query) = self.get(family) else {
            self.report_missing(family);
            return Vec::new();
        };

        let mut ranked: Vec<(&str, f32)> = self
            .entries
            .iter()
            .map(|(name, embedding)| (name.as_str(), distance(query, embedding)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        ranked
            .into_iter()
            .take(count)
            .filter(|(name, _)| *name != family)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn report_missing(&self, family: &str) {
        let first_time = match self.reported.lock() {
            Ok(mut reported) => reported.insert(family.to_string()),
            Err(_) => true,
        };
        if first_time {
            warn!(family, "family has no style embedding; no similar families");
        }
    }
}

impl Clone for EmbeddingIndex {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            positions: self.positions.clone(),
            reported: Mutex::default(),
        }
    }
}

/// Euclidean distance from `query` to `candidate`, taken over the query's
/// components only. Not symmetric when the lengths differ.
pub fn distance(query: &[f32], candidate: &[f32]) -> f32 {
    query
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let y = candidate.get(i).copied().unwrap_or(0.0);
            (x - y) * (x - y)
        })
        .sum::<f32>()
        .sqrt()
}
