use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "md", "yaml", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock"];

fn main() {
    let root = manifest_root();
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }

    let rust_sources: Vec<PathBuf> = files
        .iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .cloned()
        .collect();

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&root, &rust_sources);
    enforce_no_test_skips(&root, &rust_sources);
    enforce_serial_for_env_mutations(&root, &rust_sources);
}

fn manifest_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set");
    PathBuf::from(manifest_dir)
}

fn relative(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root).unwrap_or(file).to_path_buf()
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    if let Ok(output) = Command::new("git")
        .args(["ls-files"])
        .current_dir(root)
        .output()
    {
        if output.status.success() {
            if let Ok(stdout) = String::from_utf8(output.stdout) {
                files.extend(
                    stdout
                        .lines()
                        .map(|line| root.join(line))
                        .filter(|path| should_check_file(path, root)),
                );
                if !files.is_empty() {
                    return files;
                }
            }
        }
    }

    walk_directory(root, root, &mut files);
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
            if !excluded {
                walk_directory(&path, root, files);
            }
        } else if should_check_file(&path, root) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path, root: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !CHECKED_EXTENSIONS.contains(&ext) {
        return false;
    }

    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };
    if EXCLUDED_FILES.iter().any(|f| rel_path == Path::new(f)) {
        return false;
    }
    !rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    })
}

fn count_non_empty_lines(content: &str) -> usize {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in files {
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let line_count = count_non_empty_lines(&content);
                if line_count > MAX_LINES {
                    violations.push((relative(root, file), line_count));
                }
            }
            Err(e) => println!(
                "cargo:warning=Could not read file {}: {}",
                relative(root, file).display(),
                e
            ),
        }
    }

    if violations.is_empty() {
        return;
    }
    eprintln!("\n========================================");
    eprintln!("FILE LINE LIMIT EXCEEDED (max {} non-empty lines)", MAX_LINES);
    eprintln!("========================================");
    for (path, lines) in &violations {
        eprintln!(
            "  {} - {} lines (exceeds by {})",
            path.display(),
            lines,
            lines - MAX_LINES
        );
    }
    eprintln!("========================================\n");
    eprintln!("Split these files into smaller modules.\n");
    panic!(
        "Build failed: {} file(s) exceed the {} line limit",
        violations.len(),
        MAX_LINES
    );
}

/// Per-test-function scanner state shared by the test checks below.
struct TestFnTracker {
    in_test_fn: bool,
    start_line: usize,
    name: String,
    brace_depth: i32,
}

impl TestFnTracker {
    fn new() -> Self {
        Self {
            in_test_fn: false,
            start_line: 0,
            name: String::new(),
            brace_depth: 0,
        }
    }

    /// Enters a test when `lines[i]` is a test attribute followed by a `fn`.
    fn observe_attribute(&mut self, lines: &[&str], i: usize) {
        let trimmed = lines[i].trim();
        if trimmed != "#[test]" && !trimmed.starts_with("#[tokio::test") {
            return;
        }
        for candidate in lines.iter().take(i + 5).skip(i + 1) {
            if let Some(fn_pos) = candidate.find("fn ") {
                let after_fn = candidate.get(fn_pos + 3..).unwrap_or_default();
                self.name = after_fn
                    .split('(')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                self.start_line = i + 1;
                self.in_test_fn = true;
                self.brace_depth = 0;
                return;
            }
        }
    }

    /// Updates brace depth; returns true when the test body just closed.
    fn track_braces(&mut self, line: &str) -> bool {
        for c in line.chars() {
            match c {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.brace_depth == 0 {
                        self.in_test_fn = false;
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
}

fn report(title: &str, violations: &[(PathBuf, usize, String)], advice: &[&str], verdict: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================\n");
    for (path, line_num, message) in violations {
        eprintln!("  {}:{}", path.display(), line_num);
        eprintln!("    {}\n", message.trim());
    }
    eprintln!("========================================\n");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!("\n========================================\n");
    panic!("Build failed: {} {}", violations.len(), verdict);
}

fn enforce_no_dead_code_allows(root: &Path, sources: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in sources {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push((relative(root, file), line_num + 1, line.to_string()));
            }
        }
    }

    report(
        "#[allow(dead_code)] IS NOT ALLOWED",
        &violations,
        &[
            "Delete unused code instead of silencing the warning.",
            "Code only needed by tests belongs under #[cfg(test)].",
        ],
        "#[allow(dead_code)] occurrence(s) found. Remove the dead code.",
    );
}

/// Bans tests that silently skip instead of failing.
fn enforce_no_test_skips(root: &Path, sources: &[PathBuf]) {
    let skip_patterns = ["Skipping test", "skipping test", "Test skipped", "test skipped"];

    let mut violations = Vec::new();
    for file in sources {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut tracker = TestFnTracker::new();

        for (i, line) in lines.iter().enumerate() {
            tracker.observe_attribute(&lines, i);
            if !tracker.in_test_fn {
                continue;
            }
            tracker.track_braces(line);

            let skip = skip_patterns
                .iter()
                .find(|pattern| line.contains(**pattern))
                .map(|pattern| format!("test `{}` contains skip pattern: {}", tracker.name, pattern));
            // A bare return inside a nested block is a conditional early exit.
            let early_return = (tracker.in_test_fn
                && line.trim() == "return;"
                && tracker.brace_depth > 1)
                .then(|| format!("test `{}` has conditional early return", tracker.name));

            if let Some(message) = skip.or(early_return) {
                violations.push((relative(root, file), tracker.start_line, message));
                tracker.in_test_fn = false;
            }
        }
    }

    report(
        "SILENT TEST SKIPS ARE NOT ALLOWED",
        &violations,
        &[
            "Tests must FAIL if they cannot run, not silently pass.",
            "Use assert!() for preconditions, or #[ignore] with a reason.",
        ],
        "silent test skip(s) found. Make tests fail instead of skip.",
    );
}

/// Requires #[serial] for tests that mutate environment variables.
fn enforce_serial_for_env_mutations(root: &Path, sources: &[PathBuf]) {
    let mut violations = Vec::new();
    for file in sources {
        let Ok(content) = std::fs::read_to_string(file) else {
            continue;
        };
        let lines: Vec<&str> = content.lines().collect();
        let mut tracker = TestFnTracker::new();
        let mut has_serial = false;

        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
                has_serial = true;
            }
            tracker.observe_attribute(&lines, i);
            if !tracker.in_test_fn {
                continue;
            }
            if tracker.track_braces(line) {
                has_serial = false;
            }

            let mutates_env = !trimmed.starts_with("//")
                && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"));
            if mutates_env && !has_serial {
                violations.push((
                    relative(root, file),
                    tracker.start_line,
                    format!("test `{}` mutates env without #[serial]", tracker.name),
                ));
                tracker.in_test_fn = false;
            }
        }
    }

    report(
        "ENV MUTATIONS REQUIRE #[serial]",
        &violations,
        &[
            "Environment variables are process-global; mark the test with",
            "#[serial] from the serial_test crate.",
        ],
        "test(s) mutate env vars without #[serial].",
    );
}
