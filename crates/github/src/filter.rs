//! Eligibility rules for repository files.

/// Directories never descended into.
const SKIP_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    "migrations",
    "venv",
    ".venv",
    "node_modules",
    "dist",
    "build",
];

/// Test directories, skipped unless tests are included.
const TEST_DIRS: &[&str] = &["tests", "test"];

/// Entry-point and tooling files that never convert meaningfully.
const SKIP_FILES: &[&str] = &["setup.py", "conftest.py", "manage.py"];

/// Extension of eligible source files.
const SOURCE_EXTENSION: &str = ".py";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Admit test directories and `test_*.py` / `*_test.py` files.
    pub include_tests: bool,
}

impl FileFilter {
    pub fn new(include_tests: bool) -> Self {
        Self { include_tests }
    }

    pub fn allows_dir(&self, name: &str) -> bool {
        if SKIP_DIRS.contains(&name) {
            return false;
        }
        self.include_tests || !TEST_DIRS.contains(&name)
    }

    pub fn allows_file(&self, name: &str) -> bool {
        if !name.ends_with(SOURCE_EXTENSION) || SKIP_FILES.contains(&name) {
            return false;
        }
        let is_test = name.starts_with("test_") || name.ends_with("_test.py");
        self.include_tests || !is_test
    }
}
