pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{MemoryGrantStore, PgGrantStore};
pub use config::loader::load_permission_root;
pub use config::{DatabaseConfig, PermagateConfig};
pub use core::{
    gate::PermissionGate,
    matcher::GrantSet,
    permission::{Permission, PermissionTree},
};
pub use domain::ports::GrantStore;
pub use utils::error::{PermagateError, Result};
