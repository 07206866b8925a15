//! Publish gate-and-sync: clone the publish branch, replace its contents with
//! the rendered artifacts, commit, and push.
//!
//! The two preconditions (token present, building the source branch) are not
//! errors when unmet; they resolve to [`Outcome::Skipped`] and the CLI exits
//! zero either way. Calling automation therefore cannot tell "nothing to do"
//! from "published" by exit code alone, which matches the behavior of the CI
//! deploy scripts this replaces.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info};

use crate::config::PublishConfig;

/// Environment variable holding the access token that authorizes the push.
pub const TOKEN_VAR: &str = "GITHUB_PAT";
/// Environment variable holding the branch the CI run is building.
pub const BRANCH_VAR: &str = "CI_BRANCH";
/// Environment variable holding the `owner/repo` slug of the repository.
pub const SLUG_VAR: &str = "REPO_SLUG";
/// Environment variable holding the CI build number, recorded in the commit message.
pub const BUILD_NUMBER_VAR: &str = "BUILD_NUMBER";

/// The CI-supplied variables, read once at publish time. Empty values count
/// as unset.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub token: Option<String>,
    pub current_branch: Option<String>,
    pub repo_slug: Option<String>,
    pub build_number: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }
        Environment {
            token: var(TOKEN_VAR),
            current_branch: var(BRANCH_VAR),
            repo_slug: var(SLUG_VAR),
            build_number: var(BUILD_NUMBER_VAR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No access token in the environment; nothing to publish.
    NoToken,
    /// The build is not for the configured source branch.
    WrongBranch {
        current: Option<String>,
        expected: String,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoToken => {
                write!(f, "no publish token ({TOKEN_VAR}) in environment")
            }
            SkipReason::WrongBranch { current, expected } => write!(
                f,
                "current branch '{}' is not the publish source branch '{}'",
                current.as_deref().unwrap_or("<unset>"),
                expected
            ),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Skipped(SkipReason),
    Published(PublishReport),
}

#[derive(Debug)]
pub struct PublishReport {
    pub branch: String,
    pub build_number: String,
    pub files_copied: usize,
}

#[derive(Debug)]
pub enum PublishError {
    /// The artifact directory does not exist; build must run first.
    MissingArtifacts(PathBuf),
    /// A variable required after the gates passed is unset.
    MissingEnv(&'static str),
    /// A git step failed. The sync aborts at the failing step; no rollback.
    Git { action: &'static str, detail: String },
    Io(std::io::Error),
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::MissingArtifacts(path) => write!(
                f,
                "artifact directory {} does not exist; run build first",
                path.display()
            ),
            PublishError::MissingEnv(var) => {
                write!(f, "{var} environment variable not set")
            }
            PublishError::Git { action, detail } => {
                write!(f, "git {action} failed: {detail}")
            }
            PublishError::Io(e) => write!(f, "publish I/O error: {e}"),
        }
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        PublishError::Io(e)
    }
}

/// Run the publish step: check the gates, then sync `artifact_dir` into the
/// publish branch and push. Gate misses are a successful no-op.
pub fn run(
    config: &PublishConfig,
    artifact_dir: &Path,
    env: &Environment,
) -> Result<Outcome, PublishError> {
    // Gate 1: the access token.
    let Some(token) = &env.token else {
        info!("No publish token in environment, skipping publish");
        return Ok(Outcome::Skipped(SkipReason::NoToken));
    };

    // Gate 2: only builds of the source branch publish.
    match env.current_branch.as_deref() {
        Some(branch) if branch == config.source_branch => {}
        other => {
            info!(
                current = other.unwrap_or("<unset>"),
                expected = %config.source_branch,
                "Not building the publish source branch, skipping publish"
            );
            return Ok(Outcome::Skipped(SkipReason::WrongBranch {
                current: other.map(str::to_string),
                expected: config.source_branch.clone(),
            }));
        }
    }

    if !artifact_dir.is_dir() {
        error!(path = %artifact_dir.display(), "Artifact directory missing before publish");
        return Err(PublishError::MissingArtifacts(artifact_dir.to_path_buf()));
    }

    let remote = match &config.remote {
        Some(url) => url.clone(),
        None => {
            let slug = env
                .repo_slug
                .as_deref()
                .ok_or(PublishError::MissingEnv(SLUG_VAR))?;
            format!("https://{token}@github.com/{slug}.git")
        }
    };
    let build_number = env
        .build_number
        .as_deref()
        .ok_or(PublishError::MissingEnv(BUILD_NUMBER_VAR))?;

    info!(
        branch = %config.publish_branch,
        build_number = build_number,
        artifact_dir = %artifact_dir.display(),
        "Publishing rendered artifacts"
    );

    let workdir = tempfile::tempdir()?;
    let checkout = workdir.path().join("book-output");

    // Step 2: clone exactly the publish branch into a fresh working directory.
    git(
        None,
        &[
            "clone",
            "--quiet",
            "--branch",
            &config.publish_branch,
            "--single-branch",
            &remote,
            &checkout.to_string_lossy(),
        ],
        "clone",
    )?;

    // Step 1 (identity): local to the clone, so nothing global leaks.
    git(Some(&checkout), &["config", "user.name", &config.commit_name], "config")?;
    git(
        Some(&checkout),
        &["config", "user.email", &config.commit_email],
        "config",
    )?;

    // Step 3: drop every tracked file; the branch is wholly replaced.
    git(
        Some(&checkout),
        &["rm", "-rf", "--quiet", "--ignore-unmatch", "."],
        "rm",
    )?;

    // Step 4: copy the artifact tree in.
    let files_copied = copy_tree(artifact_dir, &checkout)?;
    info!(files = files_copied, "Copied artifact tree into checkout");

    // Step 5: stage, commit with the build number, push.
    git(Some(&checkout), &["add", "--all"], "add")?;
    let message = format!("Update the book (build {build_number})");
    // An unchanged artifact tree still records a publish commit.
    git(
        Some(&checkout),
        &["commit", "--quiet", "--allow-empty", "-m", &message],
        "commit",
    )?;
    git(
        Some(&checkout),
        &["push", "--quiet", "origin", &config.publish_branch],
        "push",
    )?;

    info!(
        branch = %config.publish_branch,
        files = files_copied,
        "Published rendered artifacts"
    );
    Ok(Outcome::Published(PublishReport {
        branch: config.publish_branch.clone(),
        build_number: build_number.to_string(),
        files_copied,
    }))
}

fn git(cwd: Option<&Path>, args: &[&str], action: &'static str) -> Result<(), PublishError> {
    debug!(?args, action, "Running git");
    let mut cmd = Command::new("git");
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let status = cmd.args(args).status().map_err(|e| PublishError::Git {
        action,
        detail: format!("failed to launch git: {e}"),
    })?;
    if status.success() {
        Ok(())
    } else {
        error!(action, code = ?status.code(), "Git command failed");
        Err(PublishError::Git {
            action,
            detail: format!("git exited with {status}"),
        })
    }
}

/// Recursively copy `src` into `dst`, returning the number of files copied.
fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<usize> {
    let mut copied = 0;
    for entry_res in fs::read_dir(src)? {
        let entry = entry_res?;
        let path = entry.path();
        let target = dst.join(entry.file_name());
        if path.is_dir() {
            fs::create_dir_all(&target)?;
            copied += copy_tree(&path, &target)?;
        } else {
            fs::copy(&path, &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublishConfig;

    fn env(token: Option<&str>, branch: Option<&str>) -> Environment {
        Environment {
            token: token.map(str::to_string),
            current_branch: branch.map(str::to_string),
            repo_slug: Some("example/book".to_string()),
            build_number: Some("7".to_string()),
        }
    }

    #[test]
    fn environment_reads_the_documented_ci_variables() {
        std::env::set_var(TOKEN_VAR, "secret");
        std::env::set_var(BRANCH_VAR, "main");
        std::env::set_var(SLUG_VAR, "example/book");
        std::env::set_var(BUILD_NUMBER_VAR, "42");

        let env = Environment::from_env();
        assert_eq!(env.token.as_deref(), Some("secret"));
        assert_eq!(env.current_branch.as_deref(), Some("main"));
        assert_eq!(env.repo_slug.as_deref(), Some("example/book"));
        assert_eq!(env.build_number.as_deref(), Some("42"));

        // A variable set to the empty string counts as unset.
        std::env::set_var(TOKEN_VAR, "");
        assert_eq!(Environment::from_env().token, None);
    }

    #[test]
    fn skip_reasons_render_without_debug_quoting() {
        let unset = SkipReason::WrongBranch {
            current: None,
            expected: "main".to_string(),
        };
        assert_eq!(
            unset.to_string(),
            "current branch '<unset>' is not the publish source branch 'main'"
        );

        let mismatched = SkipReason::WrongBranch {
            current: Some("feature/typo".to_string()),
            expected: "main".to_string(),
        };
        assert_eq!(
            mismatched.to_string(),
            "current branch 'feature/typo' is not the publish source branch 'main'"
        );
    }

    #[test]
    fn missing_token_skips_without_touching_git() {
        let config = PublishConfig::default();
        let outcome = run(&config, Path::new("does-not-exist"), &env(None, Some("main")))
            .expect("gate miss is not an error");
        match outcome {
            Outcome::Skipped(SkipReason::NoToken) => {}
            other => panic!("expected NoToken skip, got {other:?}"),
        }
    }

    #[test]
    fn wrong_branch_skips_without_touching_git() {
        let config = PublishConfig::default();
        let outcome = run(
            &config,
            Path::new("does-not-exist"),
            &env(Some("secret"), Some("feature/typo")),
        )
        .expect("gate miss is not an error");
        match outcome {
            Outcome::Skipped(SkipReason::WrongBranch { current, expected }) => {
                assert_eq!(current.as_deref(), Some("feature/typo"));
                assert_eq!(expected, "main");
            }
            other => panic!("expected WrongBranch skip, got {other:?}"),
        }
    }

    #[test]
    fn unset_branch_counts_as_wrong_branch() {
        let config = PublishConfig::default();
        let outcome = run(&config, Path::new("does-not-exist"), &env(Some("secret"), None))
            .expect("gate miss is not an error");
        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::WrongBranch { current: None, .. })
        ));
    }

    #[test]
    fn missing_artifacts_is_fatal_once_gates_pass() {
        let config = PublishConfig::default();
        let err = run(
            &config,
            Path::new("does-not-exist"),
            &env(Some("secret"), Some("main")),
        )
        .expect_err("missing artifacts must fail");
        assert!(matches!(err, PublishError::MissingArtifacts(_)));
    }

    #[test]
    fn copy_tree_copies_nested_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("sub")).unwrap();
        fs::write(src.path().join("index.html"), "<html>").unwrap();
        fs::write(src.path().join("sub/page.html"), "<p>").unwrap();

        let copied = copy_tree(src.path(), dst.path()).unwrap();
        assert_eq!(copied, 2);
        assert!(dst.path().join("index.html").is_file());
        assert!(dst.path().join("sub/page.html").is_file());
    }
}
