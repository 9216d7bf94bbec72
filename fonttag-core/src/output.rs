//! Streaming output helpers (made by FontLab https://www.fontlab.com/)

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

/// Write items as a prettified JSON array.
pub fn write_json_pretty<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write items as newline-delimited JSON (NDJSON).
pub fn write_ndjson<T: Serialize>(items: &[T], mut w: impl Write) -> Result<()> {
    for item in items {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::{LintWarning, Severity};

    fn warning(description: &str) -> LintWarning {
        LintWarning {
            description: description.to_string(),
            severity: Severity::Warn,
        }
    }

    #[test]
    fn ndjson_writes_one_line_per_item() {
        let warnings = vec![warning("a"), warning("b")];
        let mut buf = Vec::new();

        write_ndjson(&warnings, &mut buf).expect("write ndjson");

        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).expect("parse");
        assert_eq!(parsed["description"], "a");
        assert_eq!(parsed["severity"], "WARN");
    }

    #[test]
    fn pretty_json_is_an_array() {
        let mut buf = Vec::new();
        write_json_pretty(&[warning("a")], &mut buf).expect("write json");

        let parsed: serde_json::Value = serde_json::from_slice(&buf).expect("parse");
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    }
}
