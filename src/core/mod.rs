pub mod gate;
pub mod matcher;
pub mod permission;

pub use crate::domain::model::{Group, GroupPermission, Subject, User, UserPermission};
pub use crate::domain::ports::GrantStore;
pub use crate::utils::error::Result;
