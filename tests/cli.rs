#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command as ProcessCommand;
use tempfile::TempDir;

fn init_git_repo(path: &Path) {
    let output = ProcessCommand::new("git")
        .arg("init")
        .arg("--quiet")
        .current_dir(path)
        .output()
        .expect("git init should run");
    assert!(output.status.success(), "git init should succeed");
}

struct Workspace {
    root: TempDir,
}

impl Workspace {
    /// Temp dir holding `primary/` and `restricted/` git repositories.
    fn new() -> Self {
        let root = TempDir::new().expect("temp dir should be created");
        for name in ["primary", "restricted"] {
            let repo = root.path().join(name);
            fs::create_dir(&repo).unwrap();
            init_git_repo(&repo);
        }
        Self { root }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.root.path().join(name)
    }

    fn write(&self, name: &str, contents: &str) -> std::path::PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("port-score").expect("binary should compile");
        cmd.current_dir(self.root.path())
            .env_remove("PORT_SCORE_SAVINGS")
            .env("GIT_CEILING_DIRECTORIES", self.root.path())
            .env("NO_COLOR", "1");
        cmd
    }
}

#[test]
fn help_lists_positional_arguments() {
    let mut cmd = Command::cargo_bin("port-score").expect("binary should compile");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PR_TABLE"))
        .stdout(predicate::str::contains("PRIMARY_PATH"))
        .stdout(predicate::str::contains("RESTRICTED_PATH"));
}

#[test]
fn requires_all_three_arguments() {
    let ws = Workspace::new();
    ws.command()
        .arg("prs.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn rejects_missing_table() {
    let ws = Workspace::new();
    ws.command()
        .arg(ws.path("missing.json"))
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such file or directory"));
}

#[test]
fn rejects_missing_repository() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1\n");
    ws.command()
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("nowhere"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere: No such file or directory"));
}

#[test]
fn rejects_plain_directory() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1\n");
    let plain = ws.path("plain");
    fs::create_dir(&plain).unwrap();
    ws.command()
        .arg(table)
        .arg(&plain)
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a path to a git repository"));
}

#[test]
fn rejects_unknown_identifier_prefix() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1\nx1\n");
    ws.command()
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"x1\" begins with neither"));
}

#[test]
fn rejects_malformed_table() {
    let ws = Workspace::new();
    let table = ws.write("prs.json", "[{\"main PR\": \"#1\"");
    ws.command()
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed pull request table"));
}

#[test]
fn plain_list_needs_build_settings() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1, r2\n");
    ws.command()
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("build.reference"));
}

#[test]
fn input_savings_need_a_table() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1\n");
    ws.command()
        .env("PORT_SCORE_SAVINGS", "input")
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("primary/1 has no byte savings"));
}

#[test]
fn rejects_missing_config_file() {
    let ws = Workspace::new();
    let table = ws.write("prs.txt", "#1\n");
    ws.command()
        .arg("--config")
        .arg(ws.path("nope.toml"))
        .arg(table)
        .arg(ws.path("primary"))
        .arg(ws.path("restricted"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[cfg(unix)]
mod end_to_end {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn git(repo: &Path, args: &[&str]) {
        let output = ProcessCommand::new("git")
            .args(["-c", "user.name=Port Score", "-c", "user.email=port@example.com"])
            .args(args)
            .current_dir(repo)
            .output()
            .expect("git should run");
        assert!(output.status.success(), "git {:?} failed: {:?}", args, output);
    }

    /// Repository whose target branch is `grown_by` lines ahead of `pr-<number>` in a.c.
    fn repo_with_pr(path: &Path, branch: &str, number: u32, grown_by: usize) {
        fs::create_dir(path).unwrap();
        git(path, &["init", "--quiet"]);
        git(path, &["checkout", "-q", "-b", branch]);
        fs::write(path.join("a.c"), "base\n").unwrap();
        git(path, &["add", "a.c"]);
        git(path, &["commit", "-q", "-m", "base"]);
        git(path, &["branch", &format!("pr-{}", number)]);

        let grown: String = (0..grown_by).map(|i| format!("line {}\n", i)).collect();
        fs::write(path.join("a.c"), format!("base\n{}", grown)).unwrap();
        git(path, &["commit", "-q", "-am", "grow"]);
    }

    const FAKE_GH: &str = r#"#!/bin/sh
if [ "$1" = "pr" ] && [ "$2" = "checkout" ]; then
  exec git checkout -q "pr-$3"
fi
if [ "$1" = "pr" ] && [ "$2" = "view" ]; then
  case "$3" in
    1) echo '{"additions":80,"deletions":20,"changedFiles":1,"commits":[{},{}],"files":[{"path":"a.c"}],"title":"Shrink a"}' ;;
    2) echo '{"additions":150,"deletions":50,"changedFiles":2,"commits":[{},{},{},{}],"files":[{"path":"ChangeLog.d/x.txt"},{"path":"a.c"}],"title":"Shrink b"}' ;;
    *) echo "no pull requests found" >&2; exit 1 ;;
  esac
  exit 0
fi
exit 1
"#;

    struct Fixture {
        root: TempDir,
        primary: std::path::PathBuf,
        restricted: std::path::PathBuf,
        config: std::path::PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let primary = root.path().join("primary");
            let restricted = root.path().join("restricted");
            repo_with_pr(&primary, "development", 1, 50);
            repo_with_pr(&restricted, "development-restricted", 2, 100);
            // checks out fine, but the fake gh knows no pull request 3
            git(&primary, &["branch", "pr-3", "pr-1"]);

            let gh = root.path().join("fake-gh");
            fs::write(&gh, FAKE_GH).unwrap();
            fs::set_permissions(&gh, fs::Permissions::from_mode(0o755)).unwrap();

            let config = root.path().join("port-score.toml");
            fs::write(
                &config,
                format!(
                    "[tools]\ngh = \"{}\"\nupdate_before_run = false\n",
                    gh.display()
                ),
            )
            .unwrap();

            Self {
                root,
                primary,
                restricted,
                config,
            }
        }

        fn table(&self, contents: &str) -> std::path::PathBuf {
            let table = self.root.path().join("prs.json");
            fs::write(&table, contents).unwrap();
            table
        }

        fn command(&self) -> Command {
            let mut cmd = Command::cargo_bin("port-score").expect("binary should compile");
            cmd.current_dir(self.root.path())
                .env_remove("PORT_SCORE_SAVINGS")
                .env("NO_COLOR", "1")
                .arg("--config")
                .arg(&self.config);
            cmd
        }

        fn head(&self, repo: &Path) -> String {
            let head = ProcessCommand::new("git")
                .args(["rev-parse", "--abbrev-ref", "HEAD"])
                .current_dir(repo)
                .output()
                .unwrap();
            String::from_utf8_lossy(&head.stdout).trim().to_string()
        }
    }

    #[test]
    fn ranks_pull_requests_from_both_repositories() {
        let fx = Fixture::new();
        let table = fx.table(
            r##"[
  {"main PR": "r2", "Bytes saved": 100, "group": "b", "short description": "restricted change"},
  {"main PR": "#1", "Bytes saved": 200, "group": "a", "short description": "primary change"}
]"##,
        );
        let markdown = fx.root.path().join("ranking.md");

        let output = fx
            .command()
            .arg("--output")
            .arg(&markdown)
            .arg(&table)
            .arg(&fx.primary)
            .arg(&fx.restricted)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let stdout = String::from_utf8(output).unwrap();

        // maxima (4, 1, 200, 100, 200): primary/1 = 1 / 0.625, restricted/2 = 0.5 / 1
        let first = stdout.find("primary/1:").expect("primary/1 listed");
        let second = stdout.find("restricted/2:").expect("restricted/2 listed");
        assert!(first < second, "unexpected order:\n{}", stdout);
        assert!(stdout.contains("1.600"));
        assert!(stdout.contains("0.500"));

        let md = fs::read_to_string(&markdown).unwrap();
        assert!(md.contains("| 1 | primary/1 | 1.600 | 2 | 1 | 100 | 50 | 200 | a | primary change |"));
        assert_eq!(fx.head(&fx.restricted), "development-restricted");
    }

    #[test]
    fn tool_failure_names_pull_request_and_restores_branch() {
        let fx = Fixture::new();
        let table = fx.table(
            r##"[
  {"main PR": "#1", "Bytes saved": 200},
  {"main PR": "#3", "Bytes saved": 10}
]"##,
        );

        fx.command()
            .arg(&table)
            .arg(&fx.primary)
            .arg(&fx.restricted)
            .assert()
            .failure()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("primary/3: metadata query failed"))
            .stderr(predicate::str::contains("no pull requests found"));
        assert_eq!(fx.head(&fx.primary), "development");
    }
}
