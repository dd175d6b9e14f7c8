//! Repository configuration.

/// Configuration for starting a repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Workspace name reported in the repository id.
    pub workspace_name: String,

    /// User attributed to repository-internal operations such as
    /// lazy workspace creation.
    pub system_user: String,

    /// Primary type given to the store root node.
    pub root_type: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            workspace_name: "komodoLocalWorkspace".to_string(),
            system_user: "komodo".to_string(),
            root_type: crate::lexicon::mode::ROOT.to_string(),
        }
    }
}

impl RepositoryConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workspace name.
    #[must_use]
    pub fn workspace_name(mut self, name: impl Into<String>) -> Self {
        self.workspace_name = name.into();
        self
    }

    /// Sets the system user.
    #[must_use]
    pub fn system_user(mut self, user: impl Into<String>) -> Self {
        self.system_user = user.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RepositoryConfig::default();
        assert_eq!(config.workspace_name, "komodoLocalWorkspace");
        assert_eq!(config.system_user, "komodo");
    }

    #[test]
    fn builder_pattern() {
        let config = RepositoryConfig::new()
            .workspace_name("test")
            .system_user("admin");
        assert_eq!(config.workspace_name, "test");
        assert_eq!(config.system_user, "admin");
    }
}
