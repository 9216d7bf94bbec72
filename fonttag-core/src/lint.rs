//! Rule-table linting (made by FontLab https://www.fontlab.com/)

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ParseError;
use crate::rule::{Rule, RuleContext};
use crate::tagging::Font;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Fail,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Fail => "FAIL",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ERROR" => Ok(Severity::Error),
            "WARN" => Ok(Severity::Warn),
            "FAIL" => Ok(Severity::Fail),
            "INFO" => Ok(Severity::Info),
            other => Err(anyhow!("unknown severity: {other}")),
        }
    }
}

/// One row of the rule table. A rule that evaluates to true flags the font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintRule {
    pub rule: String,
    pub description: String,
    pub severity: Severity,
}

impl LintRule {
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            description: description.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintWarning {
    pub description: String,
    pub severity: Severity,
}

/// A rule table with every expression compiled once.
///
/// Rules that fail to compile are kept in place and report as a single ERROR
/// warning each time the table is run.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<LintRule>,
    compiled: Vec<Result<Rule, ParseError>>,
}

impl RuleTable {
    pub fn compile(rules: Vec<LintRule>) -> Self {
        let compiled = rules
            .iter()
            .map(|rule| {
                Rule::compile(&rule.rule).inspect_err(|err| {
                    error!(rule = %rule.rule, %err, "error parsing rule");
                })
            })
            .collect();
        Self { rules, compiled }
    }

    pub fn rules(&self) -> &[LintRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against `font`, in order. Only static taggings
    /// feed the rules.
    pub fn lint(&self, font: &Font) -> Vec<LintWarning> {
        let ctx = RuleContext::for_font(font);

        self.rules
            .iter()
            .zip(&self.compiled)
            .filter_map(|(rule, compiled)| match compiled {
                Ok(compiled) => compiled.evaluate(&ctx).then(|| LintWarning {
                    description: rule.description.clone(),
                    severity: rule.severity,
                }),
                Err(_) => Some(LintWarning {
                    description: format!("Rule could not be parsed: {}", rule.rule),
                    severity: Severity::Error,
                }),
            })
            .collect()
    }
}

/// Compile `rules` and run them against `font`.
///
/// A rule that does not compile turns into a single ERROR warning and the
/// remaining rules still run.
pub fn run_lint(rules: &[LintRule], font: &Font) -> Vec<LintWarning> {
    RuleTable::compile(rules.to_vec()).lint(font)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagging::Tagging;

    fn font_with(name: &str, scores: &[(&str, f32)]) -> Font {
        let mut font = Font::new(name, Vec::new());
        for (tag, score) in scores {
            font.add_tagging(Tagging::new_static(name, *tag, *score));
        }
        font
    }

    #[test]
    fn severity_round_trips_through_text() {
        for sev in [Severity::Error, Severity::Warn, Severity::Fail, Severity::Info] {
            assert_eq!(sev.to_string().parse::<Severity>().unwrap(), sev);
        }
        assert!("warning".parse::<Severity>().is_err());
    }

    #[test]
    fn bad_rule_yields_one_error_and_batch_continues() {
        let rules = vec![
            LintRule::new("tags[", Severity::Warn, "broken"),
            LintRule::new(r#"tags["/A"] > 10"#, Severity::Info, "A is set"),
        ];
        let font = font_with("Roboto", &[("/A", 50.0)]);

        let warnings = run_lint(&rules, &font);
        assert_eq!(
            warnings,
            vec![
                LintWarning {
                    description: "Rule could not be parsed: tags[".to_string(),
                    severity: Severity::Error,
                },
                LintWarning {
                    description: "A is set".to_string(),
                    severity: Severity::Info,
                },
            ]
        );
    }

    #[test]
    fn severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Warn).unwrap();
        assert_eq!(json, "\"WARN\"");
    }

    #[test]
    fn deeply_nested_rule_is_one_error() {
        let rules = vec![
            LintRule::new(format!("{}true", "!".repeat(100_000)), Severity::Warn, "deep"),
            LintRule::new("true", Severity::Info, "always"),
        ];
        let warnings = run_lint(&rules, &font_with("Roboto", &[]));

        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].severity, Severity::Error);
        assert_eq!(warnings[1].description, "always");
    }

    #[test]
    fn compiled_table_is_reused_across_fonts() {
        let table = RuleTable::compile(vec![
            LintRule::new(r#"family =~ "^Rob""#, Severity::Info, "robotic"),
            LintRule::new("tags[", Severity::Warn, "broken"),
        ]);
        assert_eq!(table.len(), 2);

        let roboto = table.lint(&font_with("Roboto", &[]));
        let lato = table.lint(&font_with("Lato", &[]));
        assert_eq!(roboto.len(), 2);
        assert_eq!(lato.len(), 1);
        assert_eq!(lato[0].severity, Severity::Error);
    }
}
