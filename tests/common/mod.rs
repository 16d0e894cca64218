// Shared test helpers for integration tests
#![allow(dead_code)]

use poly_runner::core::models::RunResult;
use poly_runner::core::parser::ResultParser;
use poly_runner::core::registry::TestSuite;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Pins the message catalogue to English so assertions on text are stable.
pub fn setup_i18n() {
    poly_runner::init(Some("en"));
}

/// A scratch directory for one test.
pub fn scratch_dir() -> TempDir {
    tempdir().expect("Failed to create temporary directory")
}

/// Writes `content` to `name` inside `dir` and returns the path.
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}

/// A finished result with the given output and exit code.
pub fn finished(output: &str, exit_code: i32) -> RunResult {
    RunResult::finished(output, Some(exit_code))
}

/// A shared suite with the fallback parser.
pub fn suite(name: &str, command: &str) -> Arc<TestSuite> {
    Arc::new(TestSuite::new(name, command))
}

/// A shared suite using `parser`.
pub fn suite_with_parser(
    name: &str,
    command: &str,
    parser: Arc<dyn ResultParser>,
) -> Arc<TestSuite> {
    Arc::new(TestSuite::new(name, command).with_parser(parser))
}

/// Path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}
