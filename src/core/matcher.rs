use crate::core::permission::{
    parse_permission, PermissionPath, INCLUSIVE_WILDCARD, KEY_SEPARATOR, ROOT_PERMISSION,
};
use crate::utils::error::Result;
use std::collections::HashSet;

/// The grant strings that satisfy `required`, most specific first:
/// the permission itself, the root permission, its own inclusive wildcard, then
/// the inclusive wildcard of every ancestor.
pub fn candidate_grants(required: &str) -> Result<Vec<String>> {
    let (path, _) = parse_permission(required, false)?;
    let segments = match path {
        PermissionPath::Root => return Ok(vec![ROOT_PERMISSION.to_string()]),
        PermissionPath::Segments(segments) => segments,
    };

    let mut candidates = Vec::with_capacity(segments.len() + 2);
    candidates.push(required.to_string());
    candidates.push(ROOT_PERMISSION.to_string());
    let separator = KEY_SEPARATOR.to_string();
    for depth in (1..=segments.len()).rev() {
        candidates.push(format!(
            "{}{}",
            segments[..depth].join(&separator),
            INCLUSIVE_WILDCARD
        ));
    }
    Ok(candidates)
}

/// The set of permission strings granted to one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    grants: HashSet<String>,
}

impl GrantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, grant: impl Into<String>) -> bool {
        self.grants.insert(grant.into())
    }

    pub fn contains(&self, grant: &str) -> bool {
        self.grants.contains(grant)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// True if any grant in the set satisfies the required permission.
    pub fn covers(&self, required: &str) -> Result<bool> {
        if self.grants.is_empty() {
            // still reject malformed input
            parse_permission(required, false)?;
            return Ok(false);
        }
        Ok(candidate_grants(required)?
            .iter()
            .any(|candidate| self.grants.contains(candidate)))
    }
}

impl<S: Into<String>> FromIterator<S> for GrantSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            grants: iter.into_iter().map(Into::<String>::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_walk_up_the_tree() {
        assert_eq!(
            candidate_grants("a.b.c").unwrap(),
            vec!["a.b.c", "*", "a.b.c>", "a.b>", "a>"]
        );
        assert_eq!(candidate_grants("*").unwrap(), vec!["*"]);
    }

    #[test]
    fn test_exact_and_root_grants() {
        let grants: GrantSet = ["test.sub1"].into_iter().collect();
        assert!(grants.covers("test.sub1").unwrap());
        assert!(!grants.covers("test").unwrap());
        assert!(!grants.covers("test.sub1.deeper").unwrap());

        let root: GrantSet = ["*"].into_iter().collect();
        assert!(root.covers("anything.at.all").unwrap());
        assert!(root.covers("*").unwrap());
    }

    #[test]
    fn test_inclusive_wildcard_covers_descendants() {
        let grants: GrantSet = ["test>"].into_iter().collect();
        assert!(grants.covers("test").unwrap());
        assert!(grants.covers("test.sub1").unwrap());
        assert!(grants.covers("test.sub1.deep").unwrap());
        assert!(!grants.covers("test2").unwrap());
        assert!(!grants.covers("*").unwrap());
    }

    #[test]
    fn test_plain_ancestor_grant_does_not_cover_children() {
        let grants: GrantSet = ["test"].into_iter().collect();
        assert!(!grants.covers("test.sub1").unwrap());
    }

    #[test]
    fn test_required_permission_validation() {
        let grants = GrantSet::new();
        assert!(grants.covers("").is_err());
        assert!(grants.covers("test>").is_err());
        assert!(grants.covers("a..b").is_err());
    }
}
