//! Loading the root permission from a permissions file.
//!
//! The location has the form `<path>[:<name>]`. `<path>` points at a TOML file in
//! which every top-level table is a root permission, and `<name>` picks one of
//! them (default `root`):
//!
//! ```toml
//! [root]
//! name = "Everything"
//!
//! [[root.children]]
//! key = "test"
//! name = "Test"
//!
//! [[root.children.children]]
//! key = "sub1"
//! ```

use crate::core::permission::{Permission, PermissionTree};
use crate::utils::error::{PermagateError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const PERMISSIONS_ENV: &str = "PERMAGATE_PERMISSIONS";
pub const DEFAULT_ROOT_NAME: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionsLocation {
    pub path: PathBuf,
    pub root_name: String,
}

impl PermissionsLocation {
    pub fn parse(location: &str) -> Result<Self> {
        let mut parts = location.split(':');
        let path = parts.next().unwrap_or_default();
        let root_name = parts.next();
        if parts.next().is_some() {
            return Err(PermagateError::LoaderError {
                message: format!(
                    "invalid {} string '{}', it may contain at most one ':'",
                    PERMISSIONS_ENV, location
                ),
            });
        }
        if path.is_empty() {
            return Err(PermagateError::LoaderError {
                message: format!("{} has an empty file path", PERMISSIONS_ENV),
            });
        }
        let root_name = match root_name {
            Some("") => {
                return Err(PermagateError::LoaderError {
                    message: format!("{} has an empty root name after ':'", PERMISSIONS_ENV),
                })
            }
            Some(name) => name.to_string(),
            None => DEFAULT_ROOT_NAME.to_string(),
        };
        Ok(Self {
            path: PathBuf::from(path),
            root_name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PermissionDef {
    key: Option<String>,
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    children: Vec<PermissionDef>,
}

impl PermissionDef {
    fn into_permission(self, is_root: bool) -> Result<Permission> {
        let mut permission = if is_root {
            Permission::root()
        } else {
            Permission::new(self.key.unwrap_or_default())?
        };
        permission.name = self.name;
        permission.description = self.description;

        let children = self
            .children
            .into_iter()
            .map(|child| child.into_permission(false))
            .collect::<Result<Vec<_>>>()?;
        permission.register(children)
    }
}

/// Loads the root permission tree.
///
/// `location` overrides the `PERMAGATE_PERMISSIONS` environment variable.
pub fn load_permission_root(location: Option<&str>) -> Result<PermissionTree> {
    let location = match location {
        Some(location) => location.to_string(),
        None => std::env::var(PERMISSIONS_ENV).map_err(|_| PermagateError::LoaderError {
            message: format!("{} was not initialized", PERMISSIONS_ENV),
        })?,
    };
    let location = PermissionsLocation::parse(&location)?;
    load_from_file(&location.path, &location.root_name)
}

pub fn load_from_file<P: AsRef<Path>>(path: P, root_name: &str) -> Result<PermissionTree> {
    let content = std::fs::read_to_string(&path).map_err(|e| PermagateError::LoaderError {
        message: format!("cannot read {}: {}", path.as_ref().display(), e),
    })?;
    tracing::debug!(
        "Loading root permission '{}' from {}",
        root_name,
        path.as_ref().display()
    );
    load_from_str(&content, root_name)
}

pub fn load_from_str(content: &str, root_name: &str) -> Result<PermissionTree> {
    let mut roots: BTreeMap<String, PermissionDef> = toml::from_str(content)?;
    let def = roots
        .remove(root_name)
        .ok_or_else(|| PermagateError::LoaderError {
            message: format!("no root permission named '{}'", root_name),
        })?;

    if def.key.as_deref().is_some_and(|key| !key.is_empty()) {
        return Err(PermagateError::LoaderError {
            message: format!("'{}' did not point to a root permission object", root_name),
        });
    }

    PermissionTree::new(def.into_permission(true)?)
}
