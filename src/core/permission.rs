use crate::utils::error::{PermagateError, Result};
use serde::Serialize;

/// Permission string naming the root permission, which contains every other permission.
pub const ROOT_PERMISSION: &str = "*";
pub const KEY_SEPARATOR: char = '.';
/// Trailing marker on a granted string: "a.b>" grants a.b and all of its descendants.
pub const INCLUSIVE_WILDCARD: char = '>';

/// A parsed permission string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionPath<'a> {
    Root,
    Segments(Vec<&'a str>),
}

/// Splits and validates a permission string.
///
/// Returns the path and whether the string ended with an inclusive wildcard. When
/// `allow_wildcard` is false any '>' is rejected, which is the rule for required
/// permissions.
pub fn parse_permission(permission: &str, allow_wildcard: bool) -> Result<(PermissionPath<'_>, bool)> {
    if permission.is_empty() {
        return Err(PermagateError::invalid_permission(
            permission,
            "the permission string cannot be empty",
        ));
    }

    let (body, inclusive) = match permission.strip_suffix(INCLUSIVE_WILDCARD) {
        Some(body) => (body, true),
        None => (permission, false),
    };

    if inclusive && !allow_wildcard {
        return Err(PermagateError::invalid_permission(
            permission,
            "a required permission cannot contain an inclusive wildcard '>'",
        ));
    }

    if body == ROOT_PERMISSION {
        if inclusive {
            return Err(PermagateError::invalid_permission(
                permission,
                "the root permission '*' cannot take an inclusive wildcard",
            ));
        }
        return Ok((PermissionPath::Root, false));
    }

    let mut segments = Vec::new();
    for segment in body.split(KEY_SEPARATOR) {
        if segment.is_empty() {
            return Err(PermagateError::invalid_permission(
                permission,
                "permission string segments cannot be blank",
            ));
        }
        if segment.contains(INCLUSIVE_WILDCARD) {
            return Err(PermagateError::invalid_permission(
                permission,
                "'>' may only appear at the end of a permission string",
            ));
        }
        if segment.contains(ROOT_PERMISSION) {
            return Err(PermagateError::invalid_permission(
                permission,
                "'*' must be used on its own",
            ));
        }
        segments.push(segment);
    }

    Ok((PermissionPath::Segments(segments), inclusive))
}

/// A node of the permission tree. The root permission has a blank key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    key: String,
    pub name: Option<String>,
    pub description: Option<String>,
    children: Vec<Permission>,
}

impl Permission {
    pub fn root() -> Self {
        Self {
            key: String::new(),
            name: None,
            description: None,
            children: Vec::new(),
        }
    }

    /// Creates a non-root permission. The key must be exactly one permission string segment.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        validate_key(&key)?;
        Ok(Self {
            key,
            name: None,
            description: None,
            children: Vec::new(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_root(&self) -> bool {
        self.key.is_empty()
    }

    pub fn children(&self) -> &[Permission] {
        &self.children
    }

    pub fn child(&self, key: &str) -> Option<&Permission> {
        self.children.iter().find(|child| child.key == key)
    }

    /// Registers child permissions under this one.
    pub fn register(mut self, permissions: Vec<Permission>) -> Result<Self> {
        for permission in permissions {
            if permission.is_root() {
                return Err(PermagateError::TreeError {
                    message: "the root permission cannot be registered as a child".to_string(),
                });
            }
            if self.child(&permission.key).is_some() {
                return Err(PermagateError::TreeError {
                    message: format!(
                        "duplicate permission key '{}' under '{}'",
                        permission.key,
                        if self.is_root() { ROOT_PERMISSION } else { self.key.as_str() }
                    ),
                });
            }
            self.children.push(permission);
        }
        Ok(self)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(PermagateError::invalid_key(
            key,
            "only the root permission has a blank key, use Permission::root()",
        ));
    }
    if key.contains(KEY_SEPARATOR) {
        return Err(PermagateError::invalid_key(
            key,
            "a permission key must be equivalent to one permission string segment",
        ));
    }
    if key.contains(INCLUSIVE_WILDCARD) {
        return Err(PermagateError::invalid_key(
            key,
            "inclusive wildcards belong in granted permission strings, not in keys",
        ));
    }
    if key.contains(ROOT_PERMISSION) {
        return Err(PermagateError::invalid_key(key, "'*' is reserved for the root permission"));
    }
    Ok(())
}

/// One row of a flattened tree, in depth-first order.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionEntry {
    pub permission: String,
    pub depth: usize,
    pub name: Option<String>,
    pub description: Option<String>,
    pub has_children: bool,
}

/// A validated permission tree anchored at a root permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTree {
    root: Permission,
}

impl PermissionTree {
    pub fn new(root: Permission) -> Result<Self> {
        if !root.is_root() {
            return Err(PermagateError::TreeError {
                message: format!("'{}' is not a root permission", root.key),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Permission {
        &self.root
    }

    /// Checks if an absolute permission string is defined in this tree. A trailing
    /// inclusive wildcard is accepted and ignored.
    pub fn exists(&self, permission: &str) -> Result<bool> {
        Ok(self.get(permission)?.is_some())
    }

    pub fn get(&self, permission: &str) -> Result<Option<&Permission>> {
        let (path, _) = parse_permission(permission, true)?;
        let segments = match path {
            PermissionPath::Root => return Ok(Some(&self.root)),
            PermissionPath::Segments(segments) => segments,
        };

        let mut node = &self.root;
        for segment in segments {
            match node.child(segment) {
                Some(child) => node = child,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    /// Every grantable permission string: the root, each node's absolute string and,
    /// for nodes with children, the inclusive wildcard form right after it.
    pub fn permission_list(&self) -> Vec<String> {
        let mut list = vec![ROOT_PERMISSION.to_string()];
        for entry in self.entries().into_iter().skip(1) {
            if entry.has_children {
                let wildcard = format!("{}{}", entry.permission, INCLUSIVE_WILDCARD);
                list.push(entry.permission);
                list.push(wildcard);
            } else {
                list.push(entry.permission);
            }
        }
        list
    }

    pub fn entries(&self) -> Vec<PermissionEntry> {
        let mut entries = vec![PermissionEntry {
            permission: ROOT_PERMISSION.to_string(),
            depth: 0,
            name: self.root.name.clone(),
            description: self.root.description.clone(),
            has_children: !self.root.children.is_empty(),
        }];
        for child in &self.root.children {
            collect_entries(child, "", 1, &mut entries);
        }
        entries
    }
}

fn collect_entries(node: &Permission, prefix: &str, depth: usize, out: &mut Vec<PermissionEntry>) {
    let absolute = if prefix.is_empty() {
        node.key.clone()
    } else {
        format!("{}{}{}", prefix, KEY_SEPARATOR, node.key)
    };
    out.push(PermissionEntry {
        permission: absolute.clone(),
        depth,
        name: node.name.clone(),
        description: node.description.clone(),
        has_children: !node.children.is_empty(),
    });
    for child in &node.children {
        collect_entries(child, &absolute, depth + 1, out);
    }
}
