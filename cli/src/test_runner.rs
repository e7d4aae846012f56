use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use blockform::parser::Parser;
use composer::{Composer, FormNode};

use crate::{host, values};

/// The `[test]` table of a `.test.toml` file. The rest of the file holds the
/// block declarations under test.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Block to render. Required by every render expectation.
    #[serde(default)]
    pub block: Option<String>,

    /// Submitted values, validated by the host stand-in before rendering.
    #[serde(default)]
    pub values: toml::Table,

    /// If true, the test expects the declarations to fail parsing.
    #[serde(default)]
    pub expect_parse_error: bool,

    /// Expected layout error: some error's Display string must contain this substring.
    #[serde(default)]
    pub expect_error: Option<String>,

    /// Expected headings of the sections flagged with errors, in render order.
    #[serde(default)]
    pub expect_flagged: Option<Vec<String>>,

    /// Expected top-level nodes: field names and section headings.
    #[serde(default)]
    pub expect_top_level: Option<Vec<String>>,

    /// Expected leaf order of the resolved layout (children before settings).
    #[serde(default)]
    pub expect_leaves: Option<Vec<String>>,

    /// Expected total number of field errors in the rendered form.
    #[serde(default)]
    pub expect_error_count: Option<usize>,
}

impl TestConfig {
    fn renders(&self) -> bool {
        self.expect_flagged.is_some()
            || self.expect_top_level.is_some()
            || self.expect_leaves.is_some()
            || self.expect_error_count.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct TestFile {
    test: TestConfig,
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".test.toml"))
                .unwrap_or("?")
        })
    }
}

// ---------------------------------------------------------------------------
// Running a single case
// ---------------------------------------------------------------------------

fn run_single_test(path: &Path) -> TestResult {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("cannot read file: {}", e)),
            };
        }
    };

    let config = match toml::from_str::<TestFile>(&content) {
        Ok(file) => file.test,
        Err(e) => {
            return TestResult {
                path: path.to_path_buf(),
                description: None,
                outcome: TestOutcome::Fail(format!("[test] table error: {}", e)),
            };
        }
    };

    let outcome = match check_case(&content, &config) {
        Ok(()) => TestOutcome::Pass,
        Err(reason) => TestOutcome::Fail(reason),
    };
    TestResult {
        path: path.to_path_buf(),
        description: config.description,
        outcome,
    }
}

/// Run one case against its declarations. `Err` carries the failure reason.
fn check_case(source: &str, config: &TestConfig) -> Result<(), String> {
    let parsed = Parser::new(source.to_string(), 0).parse();
    if config.expect_parse_error {
        return match parsed {
            Err(_) => Ok(()),
            Ok(_) => Err("expected parse error, but parsing succeeded".into()),
        };
    }
    let catalog = parsed.map_err(|errs| {
        let msgs: Vec<String> = errs.iter().map(|e| e.message.clone()).collect();
        format!("unexpected parse error: {}", msgs.join("; "))
    })?;

    let composed = Composer::new(&catalog);
    let composer = match (&config.expect_error, composed) {
        (Some(expected), Err(errors)) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return if messages.iter().any(|m| m.contains(expected.as_str())) {
                Ok(())
            } else {
                Err(format!(
                    "expected error containing \"{}\", got:\n  {}",
                    expected,
                    messages.join("\n  ")
                ))
            };
        }
        (Some(expected), Ok(_)) => {
            return Err(format!(
                "expected error containing \"{}\", but every layout resolved",
                expected
            ));
        }
        (None, Err(errors)) => {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(format!("unexpected layout error: {}", messages.join("; ")));
        }
        (None, Ok(composer)) => composer,
    };

    if !config.renders() {
        return Ok(());
    }
    let block = config
        .block
        .as_deref()
        .ok_or("render expectations need a `block` in the [test] table")?;

    if let Some(expected) = &config.expect_leaves {
        let layout = composer
            .layout(block)
            .ok_or_else(|| format!("unknown block '{}'", block))?;
        compare_list("leaf order", expected, &layout.leaf_names())?;
    }

    let values = values::from_table(&config.values);
    let errors = host::validate(&composer, block, &values);
    let tree = composer
        .render_block(block, &values, &errors)
        .map_err(|e| e.to_string())?;

    if let Some(expected) = &config.expect_top_level {
        let actual: Vec<&str> = tree.root.children.iter().map(FormNode::describe).collect();
        compare_list("top-level nodes", expected, &actual)?;
    }
    if let Some(expected) = &config.expect_flagged {
        compare_list("flagged sections", expected, &tree.flagged_sections())?;
    }
    if let Some(expected) = config.expect_error_count {
        if tree.error_count() != expected {
            return Err(format!(
                "expected {} field error(s), got {}",
                expected,
                tree.error_count()
            ));
        }
    }
    Ok(())
}

fn compare_list(what: &str, expected: &[String], actual: &[&str]) -> Result<(), String> {
    if expected.iter().map(String::as_str).eq(actual.iter().copied()) {
        Ok(())
    } else {
        Err(format!(
            "{} mismatch\n  expected: [{}]\n  actual:   [{}]",
            what,
            expected.join(", "),
            actual.join(", ")
        ))
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Discover `.test.toml` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".test.toml"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// Keep the requested categories (and their subfolders), warning about unknown ones.
fn select_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }
    let mut selected = BTreeMap::new();
    for request in requested {
        let request = request.trim_matches('/');
        let prefix = format!("{}/", request);
        let before = selected.len();
        for (cat, files) in all {
            if cat == request || cat.starts_with(&prefix) {
                selected.insert(cat.as_str(), files.as_slice());
            }
        }
        if selected.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                request,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    selected
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.toml files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

struct Palette {
    no_color: bool,
}

impl Palette {
    fn paint(&self, code: &str, s: &str) -> String {
        if self.no_color {
            s.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        }
    }

    fn pass(&self) -> String {
        self.paint("32", "PASS")
    }

    fn fail(&self) -> String {
        self.paint("31", "FAIL")
    }

    fn bold(&self, s: &str) -> String {
        self.paint("1", s)
    }
}

/// Run all `.test.toml` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let palette = Palette { no_color };

    let all_categories = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        discover_categorized(path)
    };
    if all_categories.is_empty() {
        eprintln!("no .test.toml files found in {}", path.display());
        return 1;
    }

    let selected = if path.is_file() {
        select_categories(&all_categories, &[])
    } else {
        select_categories(&all_categories, categories)
    };
    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if !path.is_file() {
            eprintln!();
            eprintln!("{}", palette.bold(category_label(cat)));
        }
        for file in files.iter() {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", palette.pass(), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", palette.fail(), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    if failures.is_empty() {
        eprintln!("test result: {}. {} passed, 0 failed", palette.paint("32", "ok"), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            palette.paint("31", "FAILED"),
            passed,
            failures.len(),
            passed + failures.len()
        );
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PERSON: &str = r#"
[test]
description = "email error surfaces through settings"
block = "person"
values = { name = "Jane" }
expect_top_level = ["name"]
expect_flagged = ["Contact"]
expect_error_count = 1
expect_leaves = ["name", "visible", "email"]

[[block]]
name = "person"

[[block.field]]
name = "name"
type = "char"

[[block.field]]
name = "visible"
type = "boolean"

[[block.field]]
name = "email"
type = "email"

[block.layout]
children = ["name"]
settings = [{ heading = "Contact", children = ["visible"], settings = ["email"], classname = "collapsed" }]
"#;

    fn write_case(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn passing_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_case(dir.path(), "person.test.toml", PERSON);
        let result = run_single_test(&path);
        match result.outcome {
            TestOutcome::Pass => {}
            TestOutcome::Fail(reason) => panic!("unexpected failure: {}", reason),
        }
        assert_eq!(result.label(), "email error surfaces through settings");
    }

    #[test]
    fn mismatch_reports_both_lists() {
        let dir = tempfile::tempdir().unwrap();
        let content = PERSON.replace(
            r#"expect_flagged = ["Contact"]"#,
            r#"expect_flagged = []"#,
        );
        let path = write_case(dir.path(), "person.test.toml", &content);
        match run_single_test(&path).outcome {
            TestOutcome::Fail(reason) => {
                assert!(reason.starts_with("flagged sections mismatch"));
                assert!(reason.contains("actual:   [Contact]"));
            }
            TestOutcome::Pass => panic!("expected failure"),
        }
    }

    #[test]
    fn expected_layout_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_case(
            dir.path(),
            "dup.test.toml",
            r#"
[test]
expect_error = "placed more than once"

[[block]]
name = "b"
layout = ["a", "a"]

[[block.field]]
name = "a"
type = "char"
"#,
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
        assert_eq!(run_single_test(&path).label(), "dup");
    }

    #[test]
    fn expected_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_case(
            dir.path(),
            "bad.test.toml",
            "[test]\nexpect_parse_error = true\n\n[[block]]\nname = \"b\"\n[[block.field]]\nname = \"a\"\ntype = \"wibble\"\n",
        );
        assert!(matches!(run_single_test(&path).outcome, TestOutcome::Pass));
    }

    #[test]
    fn discovers_by_category() {
        let dir = tempfile::tempdir().unwrap();
        write_case(dir.path(), "top.test.toml", PERSON);
        write_case(dir.path(), "layout/a.test.toml", PERSON);
        write_case(dir.path(), "layout/nested/b.test.toml", PERSON);
        write_case(dir.path(), "layout/notes.md", "ignored");

        let categories = discover_categorized(dir.path());
        let names: Vec<&str> = categories.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["", "layout", "layout/nested"]);

        let selected = select_categories(&categories, &["layout".to_string()]);
        assert_eq!(selected.len(), 2);
        assert_eq!(run_tests(dir.path(), true, &[]), 0);
    }

    #[test]
    fn bundled_cases_pass() {
        let cases = Path::new(env!("CARGO_MANIFEST_DIR")).join("cases");
        assert_eq!(run_tests(&cases, true, &[]), 0);
    }
}
