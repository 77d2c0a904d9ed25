//! Build metadata embedded by `build.rs`.

use std::fmt;

use serde::Serialize;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

const UNKNOWN: &str = "unknown";

/// Version and git state of the running binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_branch: &'static str,
    /// Short commit hash.
    pub git_sha: &'static str,
    pub dirty: bool,
}

impl BuildInfo {
    /// Metadata captured at compile time. Fields missing outside a git
    /// checkout read `"unknown"`.
    pub fn current() -> Self {
        let git_branch = match option_env!("VERGEN_GIT_BRANCH") {
            Some(branch) => branch,
            None => UNKNOWN,
        };
        let git_sha = match option_env!("VERGEN_GIT_SHA") {
            Some(sha) => sha,
            None => UNKNOWN,
        };
        let dirty = matches!(option_env!("VERGEN_GIT_DIRTY"), Some("true"));
        Self {
            version: PKG_VERSION,
            git_branch,
            git_sha,
            dirty,
        }
    }
}

/// `{version}+{branch}.{sha7}`, with `.dirty` appended for modified trees.
impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sha = self.git_sha.get(..7).unwrap_or(self.git_sha);
        write!(f, "{}+{}.{sha}", self.version, self.git_branch)?;
        if self.dirty {
            f.write_str(".dirty")?;
        }
        Ok(())
    }
}

/// Display form of [`BuildInfo::current`], logged when an orchestrator is
/// built.
pub fn version_string() -> String {
    BuildInfo::current().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_truncates_sha_and_marks_dirty() {
        let info = BuildInfo {
            version: "0.3.1",
            git_branch: "main",
            git_sha: "9f2c41ab77e0",
            dirty: true,
        };
        assert_eq!(info.to_string(), "0.3.1+main.9f2c41a.dirty");
    }

    #[test]
    fn unknown_metadata_is_kept_whole() {
        let info = BuildInfo {
            version: "0.3.1",
            git_branch: UNKNOWN,
            git_sha: UNKNOWN,
            dirty: false,
        };
        assert_eq!(info.to_string(), "0.3.1+unknown.unknown");
    }

    #[test]
    fn current_uses_package_version() {
        assert!(version_string().starts_with(PKG_VERSION));
        assert_eq!(BuildInfo::current().version, PKG_VERSION);
    }
}
