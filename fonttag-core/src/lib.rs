/// fonttag-core: a patient critic for font personalities
///
/// Fonts have moods. Some are loud, some whisper, some read easily at small
/// sizes and some only shine on a poster. This library writes those moods
/// down as scored tags, checks the scores against house rules, and finds
/// families that feel alike.
///
/// ## Four Acts of Tagging
///
/// **Registry**: the reference shelf, loaded once and never rearranged
/// - Families and their variation axes from `family_data.json`
/// - Tag definitions and score bounds, merged by name
/// - Lint rules from `tag_rules.csv`, style embeddings from `embeddings.json`
///
/// **Library**: the notebook where scores are written
/// - Static taggings score a whole family
/// - Variable taggings score points in a family's design space
/// - At most one tagging per tag per family
///
/// **Lint**: a small expression language for house rules
/// - `tags["/Expressive/Loud"] > 80 && family == "Roboto"`
/// - A rule that evaluates true is a violation
///
/// **Similarity**: neighbours by Euclidean distance between embeddings
///
/// ## A Sample Conversation
///
/// ```rust
/// use std::sync::Arc;
/// use fonttag_core::library::Library;
/// use fonttag_core::lint::{LintRule, Severity};
/// use fonttag_core::registry::Registry;
/// use fonttag_core::tagging::{Font, Tagging};
/// use fonttag_core::tags::TagDefinition;
///
/// let registry = Registry::builder()
///     .family(Font::new("Roboto", Vec::new()))
///     .tag(TagDefinition::new("/Expressive/Loud"))
///     .rule(LintRule::new(
///         r#"tags["/Expressive/Loud"] > 80"#,
///         Severity::Warn,
///         "Too loud",
///     ))
///     .build()?;
///
/// let mut library = Library::new(Arc::new(registry));
/// library.add_tagging(Tagging::new_static("Roboto", "/Expressive/Loud", 95.0));
///
/// let warnings = library.lint("Roboto").unwrap_or_default();
/// assert_eq!(warnings.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// ---
///
/// Crafted with care at FontLab https://www.fontlab.com/

pub mod csv;
pub mod error;
pub mod exemplars;
pub mod library;
pub mod lint;
pub mod location;
pub mod output;
pub mod registry;
pub mod rule;
pub mod similarity;
pub mod source;
pub mod tagging;
pub mod tags;
