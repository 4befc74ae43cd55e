//! CLI integration tests
use std::fs;

use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("prism")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    fs::read_to_string(get_fixture_path(name)).unwrap()
}

#[test]
fn test_cli_convert_html_to_json() {
    let output = cmd()
        .args(["convert", &get_fixture_path("nature_article.html")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["title"], "Microbial mats record tidal cycles");
    assert_eq!(value["doi"], "10.1038/s41586-024-00001-x");
    assert!(value["figures"].is_array());
}

#[test]
fn test_cli_convert_xml_to_markdown() {
    cmd()
        .args(["convert", "-f", "md", &get_fixture_path("pmc_article.xml")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Diffusion of nutrients in Posidonia meadows\n"))
        .stdout(predicate::str::contains("#### Boundary conditions"));
}

#[test]
fn test_cli_json_options() {
    cmd()
        .args(["convert", "--pretty", "--no-figures", &get_fixture_path("pmc_article.xml")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{\n  \"title\""))
        .stdout(predicate::str::contains("\"figures\"").not());
}

#[test]
fn test_cli_frontmatter() {
    cmd()
        .args(["convert", "-f", "markdown", "--frontmatter", &get_fixture_path("nature_article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("+++\ntitle = \"Microbial mats record tidal cycles\"\n"));
}

#[test]
fn test_cli_stdin_input() {
    cmd()
        .args(["convert", "--input-format", "xml", "-"])
        .write_stdin(read_fixture("pmc_article.xml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Posidonia"));
}

#[test]
fn test_cli_stdin_requires_input_format() {
    cmd()
        .args(["convert", "-"])
        .write_stdin(read_fixture("pmc_article.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input-format"));
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("nested").join("article.md");

    cmd()
        .args(["convert", "-f", "markdown", "-o", output.to_str().unwrap()])
        .arg(get_fixture_path("nature_article.html"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("## Results"));
}

#[test]
fn test_cli_existing_output_skipped_without_force() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("article.json");
    fs::write(&output, "keep").unwrap();

    cmd()
        .args(["convert", "-o", output.to_str().unwrap(), &get_fixture_path("pmc_article.xml")])
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&output).unwrap(), "keep");

    cmd()
        .args(["convert", "--force", "-o", output.to_str().unwrap(), &get_fixture_path("pmc_article.xml")])
        .assert()
        .success();
    assert!(fs::read_to_string(&output).unwrap().contains("Posidonia"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().args(["convert", "nonexistent.html"]).assert().failure();
}

#[test]
fn test_cli_unsupported_extension() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("article.txt");
    fs::write(&input, "plain text").unwrap();

    cmd()
        .args(["convert", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input-format"));
}

#[test]
fn test_cli_malformed_xml() {
    cmd().args(["convert", &get_fixture_path("malformed.xml")]).assert().failure();
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", "convert", &get_fixture_path("nature_article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Prism"));
}

#[test]
fn test_cli_batch_mirrors_tree() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::create_dir_all(input.path().join("pmc")).unwrap();
    fs::copy(get_fixture_path("nature_article.html"), input.path().join("nature.html")).unwrap();
    fs::copy(get_fixture_path("pmc_article.xml"), input.path().join("pmc").join("record.xml")).unwrap();
    fs::write(input.path().join("notes.txt"), "ignored").unwrap();

    cmd()
        .args(["batch", input.path().to_str().unwrap(), "-o", output.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done. 2/2 files converted."));

    assert!(output.path().join("nature.md").exists());
    assert!(output.path().join("pmc").join("record.md").exists());
    assert!(!output.path().join("notes.md").exists());
}

#[test]
fn test_cli_batch_skips_existing_and_reports_failures() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    fs::copy(get_fixture_path("nature_article.html"), input.path().join("a.html")).unwrap();
    fs::copy(get_fixture_path("pmc_article.xml"), input.path().join("b.xml")).unwrap();
    fs::copy(get_fixture_path("malformed.xml"), input.path().join("c.xml")).unwrap();
    fs::write(output.path().join("a.json"), "{}").unwrap();

    cmd()
        .args(["batch", "-f", "json", input.path().to_str().unwrap(), "-o", output.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Done. 1/3 files converted. 1 skipped (already exist). 1 failed."))
        .stderr(predicate::str::contains("c.xml"));

    assert_eq!(fs::read_to_string(output.path().join("a.json")).unwrap(), "{}");
    assert!(output.path().join("b.json").exists());
    assert!(!output.path().join("c.json").exists());
}

#[test]
fn test_cli_batch_empty_directory() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    cmd()
        .args(["batch", input.path().to_str().unwrap(), "-o", output.path().to_str().unwrap()])
        .assert()
        .success()
        .stderr(predicate::str::contains("No .html/.xml files"));
}

#[test]
fn test_cli_batch_survives_deeply_nested_xml() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let deep = format!(
        "<article><body><sec><p>{}x{}</p></sec></body></article>",
        "<italic>".repeat(10_000),
        "</italic>".repeat(10_000)
    );
    fs::write(input.path().join("deep.xml"), deep).unwrap();
    fs::copy(get_fixture_path("pmc_article.xml"), input.path().join("pmc.xml")).unwrap();

    cmd()
        .args(["batch", input.path().to_str().unwrap(), "-o", output.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Done. 1/2 files converted. 1 failed."))
        .stderr(predicate::str::contains("deep.xml"));

    assert!(output.path().join("pmc.md").exists());
}
