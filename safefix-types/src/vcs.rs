use serde::{Deserialize, Serialize};

/// Version-control state observed during preflight.
///
/// `repository == false` is a distinct, non-error state: it disables the
/// clean-tree requirement and recovery-branch creation downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsState {
    pub repository: bool,
    pub clean: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,

    /// Recovery branch created for this run. Persists after the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_branch: Option<String>,

    /// Paths reported as modified or untracked when dirty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dirty_paths: Vec<String>,
}

impl VcsState {
    pub fn no_repository() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self) -> bool {
        self.repository && !self.clean
    }
}
