//! URLs of a repository hosted on GitHub.
//!
//! Release archives are served as GitHub release assets; the index files are
//! served from the repository tree through `raw.githubusercontent.com`.

use super::version::ReleaseVersion;

/// A GitHub repository and the branch the index files live on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubRepo {
    /// User or organisation.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Branch serving the `dist/` files.
    pub branch: String,
}

impl GithubRepo {
    /// Creates a repository location.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
        }
    }

    /// Download URL of a release asset attached to tag `v<version>`.
    #[must_use]
    pub fn release_asset_url(&self, version: &ReleaseVersion, filename: &str) -> String {
        format!(
            "https://github.com/{}/{}/releases/download/{}/{}",
            self.owner,
            self.repo,
            version.tag(),
            filename
        )
    }

    /// Raw URL of a file in the repository tree on the configured branch.
    #[must_use]
    pub fn raw_url(&self, path: &str) -> String {
        format!(
            "https://raw.githubusercontent.com/{}/{}/{}/{}",
            self.owner,
            self.repo,
            self.branch,
            path.trim_start_matches('/')
        )
    }
}
