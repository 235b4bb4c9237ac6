//! Integration tests for the `entitygraph` binary.
//!
//! Each test writes its documents into a temporary directory and points
//! every config lookup there, so no user configuration leaks in.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Fixtures
// =============================================================================

const LIBRARY: &str = r#"
kind = "entitygraph.schema"
schema_version = 1

[[entity]]
name = "Author"
keys = ["id"]
key_store_generated = true
properties = ["name"]
unique = [["name"]]

[[entity]]
name = "Book"
keys = ["id"]
key_store_generated = true
properties = ["author_id", "title"]

[[entity]]
name = "Cover"
keys = ["book_id"]
properties = ["colour"]

[[relationship]]
principal = "Author"
principal_keys = ["id"]
dependent = "Book"
dependent_keys = ["author_id"]
required = true
principal_navigation = "books"
dependent_navigation = "author"

[[relationship]]
principal = "Book"
principal_keys = ["id"]
dependent = "Cover"
dependent_keys = ["book_id"]
unique = true
required = true
principal_navigation = "cover"
dependent_navigation = "book"
"#;

const CYCLIC: &str = r#"
kind = "entitygraph.schema"
schema_version = 1

[[entity]]
name = "Egg"
keys = ["id"]
properties = ["hen_id"]

[[entity]]
name = "Hen"
keys = ["id"]
properties = ["egg_id"]

[[relationship]]
principal = "Egg"
principal_keys = ["id"]
dependent = "Hen"
dependent_keys = ["egg_id"]
dependent_navigation = "egg"

[[relationship]]
principal = "Hen"
principal_keys = ["id"]
dependent = "Egg"
dependent_keys = ["hen_id"]
dependent_navigation = "hen"
"#;

const BATCH: &str = r#"
kind = "entitygraph.batch"
schema_version = 1
roots = ["book"]

[[object]]
id = "author"
type = "Author"
values = { name = "Le Guin" }

[[object]]
id = "book"
type = "Book"
values = { title = "The Dispossessed" }

[[link]]
from = "book"
navigation = "author"
to = "author"

[[persisted]]
type = "Author"
values = { id = 7, name = "Le Guin" }
"#;

/// Temporary project directory with isolated config locations.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, contents).expect("failed to write fixture");
        path
    }

    /// The binary, run from the workspace with config isolated to it.
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("entitygraph").expect("binary not built");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("ENTITYGRAPH_CONFIG", self.path().join("no-global.toml"))
            .env("XDG_CONFIG_HOME", self.path().join("xdg"))
            .env("HOME", self.path().join("home"));
        cmd
    }
}

// =============================================================================
// Global flags
// =============================================================================

#[test]
fn version_and_help() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    ws.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("origin"));
}

#[test]
fn missing_schema_file_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["order", "absent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read schema"));
}

// =============================================================================
// Schema commands
// =============================================================================

#[test]
fn order_lists_principals_first() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);

    let output = ws.cmd().args(["order", "library.toml"]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(lines, vec!["0  Author", "1  Book", "2  Cover"]);
}

#[test]
fn order_as_json() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);

    let output = ws
        .cmd()
        .args(["order", "library.toml", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["name"], "Author");
    assert_eq!(value[2]["principal_count"], 2);
}

#[test]
fn inspect_single_type() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);

    let output = ws
        .cmd()
        .args(["inspect", "library.toml", "--type", "Book", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let types = value["types"].as_array().unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0]["name"], "Book");
    assert_eq!(types[0]["principal_count"], 1);

    ws.cmd()
        .args(["inspect", "library.toml", "--type", "Shelf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Shelf"));
}

#[test]
fn origin_of_shared_key() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);

    ws.cmd()
        .args(["origin", "library.toml", "Cover", "book_id"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Book\n"));

    ws.cmd()
        .args(["origin", "library.toml", "Book", "author_id"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn check_passes_clean_schema() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);

    ws.cmd()
        .args(["check", "library.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schema ok"));
}

#[test]
fn check_fails_on_cycle() {
    let ws = Workspace::new();
    ws.write("cyclic.toml", CYCLIC);

    ws.cmd()
        .args(["check", "cyclic.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("principal cycle"));

    ws.cmd()
        .args(["order", "cyclic.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot order schema types"));
}

#[test]
fn strict_check_fails_on_missing_inverse() {
    let ws = Workspace::new();
    // `books` has an inverse; give Author a second collection without one.
    let schema = LIBRARY.replace(
        "dependent_navigation = \"author\"",
        "dependent_navigation = \"author\"\n\n[[relationship]]\nprincipal = \"Author\"\nprincipal_keys = [\"id\"]\ndependent = \"Book\"\ndependent_keys = [\"author_id\"]\nprincipal_navigation = \"drafts\"",
    );
    ws.write("library.toml", &schema);

    ws.cmd().args(["check", "library.toml"]).assert().success();

    ws.cmd()
        .args(["check", "library.toml", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Author.drafts"));
}

// =============================================================================
// Plan
// =============================================================================

#[test]
fn plan_resolves_persisted_author() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);
    ws.write("batch.toml", BATCH);

    let output = ws
        .cmd()
        .args(["plan", "library.toml", "batch.toml", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = value["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["label"], "author");
    assert_eq!(entries[0]["state"], "unchanged");
    assert_eq!(entries[1]["label"], "book");
    assert_eq!(entries[1]["state"], "new");
}

#[test]
fn plan_text_output() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);
    ws.write("batch.toml", BATCH);

    ws.cmd()
        .args(["plan", "library.toml", "batch.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Author"))
        .stdout(predicate::str::contains("book"));
}

#[test]
fn plan_rejects_unknown_link() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);
    ws.write("batch.toml", &BATCH.replace("to = \"author\"", "to = \"nobody\""));

    ws.cmd()
        .args(["plan", "library.toml", "batch.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nobody"));
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn config_set_then_get_in_project() {
    let ws = Workspace::new();

    ws.cmd()
        .args(["config", "set", "define_children", "false"])
        .assert()
        .success();
    assert!(ws.path().join("entitygraph.toml").exists());

    ws.cmd()
        .args(["config", "get", "define_children"])
        .assert()
        .success()
        .stdout(predicate::str::diff("false\n"));
}

#[test]
fn config_from_other_directory_with_cwd() {
    let ws = Workspace::new();
    let project = ws.path().join("project");
    fs::create_dir_all(&project).unwrap();

    ws.cmd()
        .arg("--cwd")
        .arg(&project)
        .args(["config", "set", "output", "json"])
        .assert()
        .success();

    ws.cmd()
        .arg("--cwd")
        .arg(&project)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("output = json"));
}

#[test]
fn config_rejects_unknown_key_and_bad_value() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["config", "set", "colour", "red"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));

    ws.cmd()
        .args(["config", "set", "output", "yaml"])
        .assert()
        .failure();
    assert!(!ws.path().join("entitygraph.toml").exists());
}

#[test]
fn project_config_output_json_applies() {
    let ws = Workspace::new();
    ws.write("library.toml", LIBRARY);
    ws.write("entitygraph.toml", "output = \"json\"\n");

    let output = ws.cmd().args(["order", "library.toml"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value.is_array());
}
