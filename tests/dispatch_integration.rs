//! End-to-end dispatch tests.
//!
//! These exercise the full task flow - configuration loading, tool
//! resolution, config preparation, candidate collection, partitioning,
//! batching - against a real git repository and a fake formatter script
//! standing in for clang-format.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use groom::engine::{Context, Project, TaskRequest};
use groom::tools::descriptor::Task;
use groom::tools::RunOptions;

// =============================================================================
// Test Fixtures
// =============================================================================

/// A git repository seeded with groom configuration and a fake formatter.
struct TestProject {
    dir: TempDir,
}

impl TestProject {
    /// `tool_exits_zero` controls the fake formatter's exit status for
    /// everything except the version probe (which always succeeds).
    fn new(tool_exits_zero: bool) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path();

        run_git(root, &["init", "-b", "main"]);
        run_git(root, &["config", "user.email", "test@example.com"]);
        run_git(root, &["config", "user.name", "Test User"]);

        // Sources: two C++ files and one that no tool accepts.
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/a.cpp"), "int a;\n").unwrap();
        std::fs::write(root.join("src/b.cpp"), "int b;\n").unwrap();
        std::fs::write(root.join("README.md"), "# Test\n").unwrap();

        // The fake formatter records its arguments and obeys the requested
        // exit status.
        let exit = if tool_exits_zero { 0 } else { 1 };
        let tool = root.join("fake-clang-format");
        std::fs::write(
            &tool,
            format!(
                "#!/bin/sh\n\
                 if [ \"$1\" = \"--version\" ]; then\n\
                 \techo \"clang-format version 14.0.0\"\n\
                 \texit 0\n\
                 fi\n\
                 echo \"$@\" >> \"$(dirname \"$0\")/invocations.log\"\n\
                 exit {exit}\n"
            ),
        )
        .unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Project defaults and a versioned default config file.
        std::fs::create_dir_all(root.join(".groom")).unwrap();
        std::fs::write(
            root.join(".groom/groom.yaml"),
            "tools:\n\
             \x20 ClangFormat:\n\
             \x20   version: '>=13'\n\
             \x20   include:\n\
             \x20     match: .*\\.cpp$\n",
        )
        .unwrap();
        std::fs::write(
            root.join(".groom/clang-format-14"),
            "BasedOnStyle: LLVM\nIndentWidth: 4\n",
        )
        .unwrap();

        // User override pins the executable to the fake formatter.
        std::fs::write(
            root.join(".groom.yaml"),
            format!(
                "tools:\n\
                 \x20 ClangFormat:\n\
                 \x20   path: {}\n",
                tool.display()
            ),
        )
        .unwrap();

        run_git(root, &["add", "."]);
        run_git(root, &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn context(&self) -> Context {
        Context {
            cwd: Some(self.root().to_path_buf()),
            quiet: true,
        }
    }

    fn invocations(&self) -> String {
        std::fs::read_to_string(self.root().join("invocations.log")).unwrap_or_default()
    }
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

// =============================================================================
// Format task
// =============================================================================

#[test]
fn format_succeeds_when_every_batch_succeeds() {
    let project = TestProject::new(true);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();

    let failures = opened.run_task(&ctx, &TaskRequest::new(Task::Format)).unwrap();
    assert_eq!(failures, 0);

    let log = project.invocations();
    assert!(log.contains("src/a.cpp"), "log: {log}");
    assert!(log.contains("src/b.cpp"), "log: {log}");
    assert!(!log.contains("README.md"), "log: {log}");
    // in-place formatting option from the task table
    assert!(log.contains("-i"), "log: {log}");
}

#[test]
fn one_failing_batch_counts_one_failure() {
    let project = TestProject::new(false);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();

    let failures = opened.run_task(&ctx, &TaskRequest::new(Task::Format)).unwrap();
    // Both files fit one batch of thirty.
    assert_eq!(failures, 1);
}

#[test]
fn dry_run_switches_to_report_only_options() {
    let project = TestProject::new(true);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();

    let request = TaskRequest {
        run: RunOptions {
            dry_run: true,
            compile_commands: None,
        },
        ..TaskRequest::new(Task::Format)
    };
    opened.run_task(&ctx, &request).unwrap();

    let log = project.invocations();
    assert!(log.contains("--dry-run"), "log: {log}");
    assert!(!log.contains(" -i "), "log: {log}");
}

#[test]
fn generated_config_is_prepared_from_versioned_default() {
    let project = TestProject::new(true);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();
    opened.run_task(&ctx, &TaskRequest::new(Task::Format)).unwrap();

    let generated = project.root().join(".clang-format");
    assert!(generated.exists());
    let content = std::fs::read_to_string(&generated).unwrap();
    assert!(content.contains("BasedOnStyle: LLVM"));
}

#[test]
fn explicit_sources_bypass_the_listing() {
    let project = TestProject::new(true);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();

    let request = TaskRequest {
        sources: vec![project.root().join("src/a.cpp")],
        ..TaskRequest::new(Task::Format)
    };
    opened.run_task(&ctx, &request).unwrap();

    let log = project.invocations();
    assert!(log.contains("a.cpp"), "log: {log}");
    assert!(!log.contains("b.cpp"), "log: {log}");
}

#[test]
fn directory_source_narrows_the_listing() {
    let project = TestProject::new(true);
    std::fs::create_dir_all(project.root().join("other")).unwrap();
    std::fs::write(project.root().join("other/c.cpp"), "int c;\n").unwrap();
    run_git(project.root(), &["add", "other"]);
    run_git(project.root(), &["commit", "-m", "Add other"]);

    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();
    let request = TaskRequest {
        sources: vec![project.root().join("src")],
        ..TaskRequest::new(Task::Format)
    };
    opened.run_task(&ctx, &request).unwrap();

    let log = project.invocations();
    assert!(log.contains("a.cpp"), "log: {log}");
    assert!(!log.contains("c.cpp"), "log: {log}");
}

#[test]
fn changeset_narrowing_keeps_only_modified_files() {
    let project = TestProject::new(true);
    std::fs::write(project.root().join("src/a.cpp"), "int a = 1;\n").unwrap();
    run_git(project.root(), &["add", "src/a.cpp"]);

    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();
    let request = TaskRequest {
        changeset: Some("staging".parse().unwrap()),
        ..TaskRequest::new(Task::Format)
    };
    let failures = opened.run_task(&ctx, &request).unwrap();
    assert_eq!(failures, 0);

    let log = project.invocations();
    assert!(log.contains("a.cpp"), "log: {log}");
    assert!(!log.contains("b.cpp"), "log: {log}");
}

#[test]
fn language_filter_can_deselect_every_tool() {
    let project = TestProject::new(true);
    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();

    let request = TaskRequest {
        languages: Some(vec!["python".parse().unwrap()]),
        ..TaskRequest::new(Task::Format)
    };
    let failures = opened.run_task(&ctx, &request).unwrap();
    assert_eq!(failures, 0);
    assert!(project.invocations().is_empty());
}

#[test]
fn disabled_tool_never_runs() {
    let project = TestProject::new(true);
    std::fs::write(
        project.root().join(".groom.yaml"),
        "tools:\n\
         \x20 ClangFormat:\n\
         \x20   enable: false\n",
    )
    .unwrap();

    let ctx = project.context();
    let mut opened = Project::open(&ctx).unwrap();
    let failures = opened.run_task(&ctx, &TaskRequest::new(Task::Format)).unwrap();
    assert_eq!(failures, 0);
    assert!(project.invocations().is_empty());
}
