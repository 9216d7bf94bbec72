//! Design-space locations and axis tags (made by FontLab https://www.fontlab.com/)
//!
//! A [`Location`] is a point in a variable font's design space, e.g.
//! `wght=400, wdth=100`. Locations key the per-location scores of variable
//! taggings, so equality has to be structural: two locations holding the same
//! axis/value pairs are equal no matter which axis was inserted first. The
//! insertion order is still kept, because the tagging CSV writes axes in the
//! order the location was built with.

use std::fmt;
use std::hash::{Hash, Hasher};

use read_fonts::types::Tag;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::LocationError;

/// Encode a 1-4 character axis name (`wght`, `opsz`, `GRAD`) as a font `Tag`.
pub fn axis_tag(raw: &str) -> Result<Tag, LocationError> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 4 {
        return Err(LocationError::InvalidAxisTag(raw.to_string()));
    }

    let mut buf = [b' '; 4];
    for (i, byte) in raw.bytes().enumerate() {
        if !(0x21..=0x7E).contains(&byte) {
            return Err(LocationError::InvalidAxisTag(raw.to_string()));
        }
        buf[i] = byte;
    }

    Ok(Tag::new(&buf))
}

/// Render an axis tag without the space padding short tags carry.
pub fn axis_name(tag: Tag) -> String {
    String::from_utf8_lossy(&tag.to_be_bytes())
        .trim_end()
        .to_string()
}

#[derive(Debug, Clone, Default)]
pub struct Location {
    coords: Vec<(Tag, f32)>,
}

impl Location {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Location::insert`].
    pub fn with(mut self, axis: Tag, value: f32) -> Self {
        self.insert(axis, value);
        self
    }

    /// Set the value for `axis`, keeping its original position when it is
    /// already present. Returns the previous value.
    pub fn insert(&mut self, axis: Tag, value: f32) -> Option<f32> {
        if let Some(slot) = self.coords.iter_mut().find(|(tag, _)| *tag == axis) {
            let previous = slot.1;
            slot.1 = value;
            return Some(previous);
        }
        self.coords.push((axis, value));
        None
    }

    pub fn get(&self, axis: Tag) -> Option<f32> {
        self.coords
            .iter()
            .find(|(tag, _)| *tag == axis)
            .map(|(_, value)| *value)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Axis/value pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, f32)> + '_ {
        self.coords.iter().copied()
    }

    pub fn axes(&self) -> impl Iterator<Item = Tag> + '_ {
        self.coords.iter().map(|(tag, _)| *tag)
    }

    /// Parse the CSV form `wght,wdth@400,100`.
    pub fn parse_spec(spec: &str) -> Result<Self, LocationError> {
        let (axes, values) = spec
            .split_once('@')
            .ok_or_else(|| LocationError::MissingSeparator(spec.to_string()))?;

        let axes: Vec<&str> = axes.split(',').collect();
        let values: Vec<&str> = values.split(',').collect();
        if axes.len() != values.len() {
            return Err(LocationError::LengthMismatch {
                axes: axes.len(),
                values: values.len(),
            });
        }

        let mut location = Location::new();
        for (raw_axis, raw_value) in axes.iter().zip(values.iter()) {
            let axis = axis_tag(raw_axis)?;
            let value: f32 = raw_value
                .trim()
                .parse()
                .map_err(|_| LocationError::InvalidValue(raw_value.trim().to_string()))?;
            if !value.is_finite() {
                return Err(LocationError::InvalidValue(raw_value.trim().to_string()));
            }
            if location.insert(axis, value).is_some() {
                return Err(LocationError::DuplicateAxis(axis_name(axis)));
            }
        }

        Ok(location)
    }

    /// Render the CSV form, axes in insertion order and values aligned with them.
    pub fn to_spec(&self) -> String {
        let axes: Vec<String> = self.axes().map(axis_name).collect();
        let values: Vec<String> = self.coords.iter().map(|(_, v)| v.to_string()).collect();
        format!("{}@{}", axes.join(","), values.join(","))
    }

    fn canonical(&self) -> Vec<(Tag, u32)> {
        let mut pairs: Vec<(Tag, u32)> = self
            .coords
            .iter()
            .map(|(tag, value)| (*tag, canonical_bits(*value)))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}

// -0.0 and 0.0 name the same coordinate.
fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0.0f32.to_bits()
    } else {
        value.to_bits()
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.coords.len() == other.coords.len() && self.canonical() == other.canonical()
    }
}

impl Eq for Location {}

impl Hash for Location {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_spec())
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.coords.len()))?;
        for (tag, value) in &self.coords {
            map.serialize_entry(&axis_name(*tag), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn wght() -> Tag {
        axis_tag("wght").unwrap()
    }

    fn wdth() -> Tag {
        axis_tag("wdth").unwrap()
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let a = Location::new().with(wght(), 400.0).with(wdth(), 100.0);
        let b = Location::new().with(wdth(), 100.0).with(wght(), 400.0);

        assert_eq!(a, b);
        let set: HashSet<Location> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1, "equal locations must hash alike");
    }

    #[test]
    fn different_values_are_not_equal() {
        let a = Location::new().with(wght(), 400.0);
        let b = Location::new().with(wght(), 700.0);
        let c = Location::new().with(wght(), 400.0).with(wdth(), 100.0);

        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn spec_keeps_insertion_order() {
        let loc = Location::new().with(wdth(), 75.0).with(wght(), 350.5);
        assert_eq!(loc.to_spec(), "wdth,wght@75,350.5");
    }

    #[test]
    fn parses_spec_with_whitespace() {
        let loc = Location::parse_spec("wght, opsz@ 700, 12").expect("parse");
        assert_eq!(loc.get(wght()), Some(700.0));
        assert_eq!(loc.get(axis_tag("opsz").unwrap()), Some(12.0));
        assert_eq!(loc.to_spec(), "wght,opsz@700,12");
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(
            Location::parse_spec("wght=400"),
            Err(LocationError::MissingSeparator("wght=400".into()))
        );
        assert_eq!(
            Location::parse_spec("wght,wdth@400"),
            Err(LocationError::LengthMismatch { axes: 2, values: 1 })
        );
        assert!(matches!(
            Location::parse_spec("wght@heavy"),
            Err(LocationError::InvalidValue(_))
        ));
        assert!(matches!(
            Location::parse_spec("wght,wght@1,2"),
            Err(LocationError::DuplicateAxis(_))
        ));
        assert!(matches!(
            Location::parse_spec("toolong@1"),
            Err(LocationError::InvalidAxisTag(_))
        ));
    }

    #[test]
    fn short_axis_names_render_without_padding() {
        let tag = axis_tag("ab").unwrap();
        assert_eq!(axis_name(tag), "ab");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut loc = Location::new().with(wght(), 400.0).with(wdth(), 100.0);
        assert_eq!(loc.insert(wght(), 500.0), Some(400.0));
        assert_eq!(loc.to_spec(), "wght,wdth@500,100");
    }
}
