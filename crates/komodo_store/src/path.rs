//! Absolute node paths.

use crate::error::{StoreError, StoreResult};
use std::fmt;

/// An absolute, `/`-delimited, case-sensitive node path.
///
/// Paths are normalized on construction: exactly one leading slash,
/// no trailing slash (except the root itself), no empty segments.
/// The root path is `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parses an absolute path string.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the string is empty, is
    /// not absolute, or contains an empty segment.
    pub fn parse(raw: &str) -> StoreResult<Self> {
        if raw.is_empty() {
            return Err(StoreError::invalid_path("path is empty"));
        }
        if !raw.starts_with('/') {
            return Err(StoreError::invalid_path(format!(
                "path is not absolute: {raw}"
            )));
        }
        if raw == "/" {
            return Ok(Self::root());
        }
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        for segment in trimmed[1..].split('/') {
            if segment.is_empty() {
                return Err(StoreError::invalid_path(format!(
                    "path contains an empty segment: {raw}"
                )));
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Returns the final segment, or `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Returns the parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Appends a child segment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if `name` is empty or
    /// contains a slash.
    pub fn join(&self, name: &str) -> StoreResult<Self> {
        if name.is_empty() || name.contains('/') {
            return Err(StoreError::invalid_path(format!(
                "invalid child name: {name:?}"
            )));
        }
        if self.is_root() {
            Ok(Self(format!("/{name}")))
        } else {
            Ok(Self(format!("{}/{name}", self.0)))
        }
    }

    /// Returns the path segments in order, empty for the root.
    #[must_use]
    pub fn segments(&self) -> Vec<&str> {
        if self.is_root() {
            Vec::new()
        } else {
            self.0[1..].split('/').collect()
        }
    }

    /// Returns true if `self` equals `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &NodePath) -> bool {
        if other.is_root() {
            return true;
        }
        self.0 == other.0 || self.0.starts_with(&format!("{}/", other.0))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_root() {
        let p = NodePath::parse("/").unwrap();
        assert!(p.is_root());
        assert!(p.name().is_none());
        assert!(p.parent().is_none());
    }

    #[test]
    fn parse_rejects_relative() {
        assert!(NodePath::parse("a/b").is_err());
        assert!(NodePath::parse("").is_err());
    }

    #[test]
    fn parse_rejects_empty_segment() {
        assert!(NodePath::parse("/a//b").is_err());
    }

    #[test]
    fn trailing_slash_normalized() {
        let p = NodePath::parse("/a/b/").unwrap();
        assert_eq!(p.as_str(), "/a/b");
    }

    #[test]
    fn name_and_parent() {
        let p = NodePath::parse("/tko:komodo/tko:workspace/user").unwrap();
        assert_eq!(p.name(), Some("user"));
        let parent = p.parent().unwrap();
        assert_eq!(parent.as_str(), "/tko:komodo/tko:workspace");
        assert_eq!(parent.parent().unwrap().as_str(), "/tko:komodo");
        assert!(parent.parent().unwrap().parent().unwrap().is_root());
    }

    #[test]
    fn join_builds_children() {
        let p = NodePath::root().join("a").unwrap().join("b").unwrap();
        assert_eq!(p.as_str(), "/a/b");
        assert!(p.join("").is_err());
        assert!(p.join("x/y").is_err());
    }

    #[test]
    fn starts_with_subtree() {
        let parent = NodePath::parse("/a/b").unwrap();
        let child = NodePath::parse("/a/b/c").unwrap();
        let sibling = NodePath::parse("/a/bc").unwrap();
        assert!(child.starts_with(&parent));
        assert!(parent.starts_with(&parent));
        assert!(!sibling.starts_with(&parent));
        assert!(child.starts_with(&NodePath::root()));
    }

    #[test]
    fn paths_are_case_sensitive() {
        let lower = NodePath::parse("/table").unwrap();
        let upper = NodePath::parse("/Table").unwrap();
        assert_ne!(lower, upper);
    }

    proptest! {
        #[test]
        fn join_then_parent_round_trips(segments in prop::collection::vec("[a-zA-Z0-9:_.-]{1,12}", 1..6)) {
            let mut path = NodePath::root();
            for seg in &segments {
                path = path.join(seg).unwrap();
            }
            prop_assert_eq!(path.name().unwrap(), segments.last().unwrap().as_str());
            prop_assert_eq!(path.segments().len(), segments.len());
            let reparsed = NodePath::parse(path.as_str()).unwrap();
            prop_assert_eq!(&reparsed, &path);
            let parent = path.parent().unwrap();
            prop_assert_eq!(parent.segments().len(), segments.len() - 1);
        }
    }
}
