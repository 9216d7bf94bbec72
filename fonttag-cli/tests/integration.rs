use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::tempdir;

fn write_fixture(dir: &Path) {
    let write = |name: &str, text: &str| fs::write(dir.join(name), text).expect("write fixture");

    write(
        "family_data.json",
        r#"{"familyMetadataList": [
            {"family": "Roboto", "axes": []},
            {"family": "Comic Sans", "axes": []},
            {"family": "Roboto Flex", "axes": [{"tag": "wght", "min": 100, "max": 1000, "defaultValue": 400}]}
        ]}"#,
    );
    write(
        "embeddings.json",
        r#"{"Roboto": [0.0, 0.0], "Roboto Flex": [0.5, 0.0], "Comic Sans": [9.0, 9.0]}"#,
    );
    write(
        "tag_definitions.json",
        r#"{"/Expressive/Loud": {"description": "Shouty"}}"#,
    );
    write(
        "tags_metadata.csv",
        "# name,lowScore,highScore,description\n/Expressive/Loud,0,100,Loud\n/Purpose/Easy Reading,0,100,Readable\n",
    );
    write(
        "tag_rules.csv",
        "# rule,severity,description\ntags[\"/Expressive/Loud\"] > 80 && family == \"Roboto\",WARN,\"Loud fonts must be Roboto-compatible\"\n",
    );
    write(
        "families.csv",
        concat!(
            "Roboto,,/Expressive/Loud,95\n",
            "Comic Sans,,/Expressive/Loud,95\n",
            "Roboto,,/Purpose/Easy Reading,42\n",
            "Roboto Flex,\"wght@900\",/Expressive/Loud,90\n",
            "Roboto Flex,\"wght@300\",/Expressive/Loud,15\n",
        ),
    );
}

fn fonttag(data: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fonttag"))
        .arg("--data")
        .arg(data)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run fonttag")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn lint_flags_only_loud_roboto() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = fonttag(tmp.path(), &["lint", "--json"]);
    assert_success(&output);

    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json output");
    let reports = parsed.as_array().expect("array");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["family"], "Roboto");
    assert_eq!(reports[0]["warnings"][0]["severity"], "WARN");
    assert_eq!(
        reports[0]["warnings"][0]["description"],
        "Loud fonts must be Roboto-compatible"
    );
}

#[test]
fn lint_unknown_family_fails() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = fonttag(tmp.path(), &["lint", "--family", "Nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown family"));
}

#[test]
fn similar_lists_neighbours_nearest_first() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = fonttag(tmp.path(), &["similar", "Roboto"]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["Roboto Flex", "Comic Sans"]);
}

#[test]
fn exemplars_ignore_variable_taggings() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());

    let output = fonttag(tmp.path(), &["exemplars", "/Expressive/Loud", "--json"]);
    assert_success(&output);

    let parsed: Value = serde_json::from_slice(&output.stdout).expect("json output");
    let high: Vec<&str> = parsed["high"]
        .as_array()
        .expect("high")
        .iter()
        .filter_map(|t| t["font"].as_str())
        .collect();
    assert_eq!(high, vec!["Roboto", "Comic Sans"]);
    assert!(parsed["low"].as_array().expect("low").is_empty());
}

#[test]
fn export_writes_canonical_table() {
    let tmp = tempdir().expect("tempdir");
    write_fixture(tmp.path());
    let out = tmp.path().join("out.csv");

    let output = fonttag(tmp.path(), &["export", "--output", out.to_str().expect("utf8 path")]);
    assert_success(&output);

    let text = fs::read_to_string(&out).expect("read export");
    assert_eq!(
        text,
        concat!(
            "Comic Sans,,/Expressive/Loud,95\n",
            "Roboto,,/Expressive/Loud,95\n",
            "Roboto,,/Purpose/Easy Reading,42\n",
            "Roboto Flex,\"wght@900\",/Expressive/Loud,90\n",
            "Roboto Flex,\"wght@300\",/Expressive/Loud,15\n",
        )
    );
}

#[test]
fn missing_data_directory_is_reported() {
    let tmp = tempdir().expect("tempdir");

    let output = fonttag(&tmp.path().join("absent"), &["lint"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("family_data.json"), "stderr: {stderr}");
}
