/// Conventional names of a repository's default branch, tried in order
pub const MAIN_BRANCH_CANDIDATES: [&str; 2] = ["main", "master"];

/// Branch a repository is worked on, and whether it is a default branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchContext {
    pub name: String,
    pub is_main: bool,
}

impl BranchContext {
    pub fn new(name: impl Into<String>) -> Self {
        let name_str = name.into();
        let is_main = MAIN_BRANCH_CANDIDATES.contains(&name_str.as_str());

        BranchContext {
            name: name_str,
            is_main,
        }
    }

    /// Strip a `refs/heads/` prefix, if any
    pub fn from_ref(reference: &str) -> Option<Self> {
        reference.strip_prefix("refs/heads/").map(BranchContext::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_branch() {
        assert!(BranchContext::new("main").is_main);
        assert!(BranchContext::new("master").is_main);
    }

    #[test]
    fn test_feature_branch() {
        let branch = BranchContext::new("feature-x");
        assert!(!branch.is_main);
        assert_eq!(branch.name, "feature-x");
    }

    #[test]
    fn test_from_ref() {
        assert_eq!(
            BranchContext::from_ref("refs/heads/tickets/DM-1"),
            Some(BranchContext::new("tickets/DM-1"))
        );
        assert_eq!(BranchContext::from_ref("refs/tags/v1.0.0"), None);
    }
}
