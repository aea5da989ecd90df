use thiserror::Error;

#[derive(Error, Debug)]
pub enum PermagateError {
    #[error("Invalid permission key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Invalid permission string '{permission}': {reason}")]
    InvalidPermission { permission: String, reason: String },

    #[error("Permission tree error: {message}")]
    TreeError { message: String },

    #[error("Permission '{permission}' is not defined in the permission tree")]
    UnknownPermission { permission: String },

    #[error("Failed to load root permission: {message}")]
    LoaderError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Permission,
    Configuration,
    Lookup,
    Storage,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PermagateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PermagateError::InvalidKey { .. }
            | PermagateError::InvalidPermission { .. }
            | PermagateError::TreeError { .. }
            | PermagateError::UnknownPermission { .. } => ErrorCategory::Permission,
            PermagateError::LoaderError { .. }
            | PermagateError::ConfigError { .. }
            | PermagateError::ConfigValidationError { .. }
            | PermagateError::MissingConfigError { .. }
            | PermagateError::InvalidConfigValueError { .. }
            | PermagateError::TomlError(_) => ErrorCategory::Configuration,
            PermagateError::UserNotFound(_) | PermagateError::GroupNotFound(_) => {
                ErrorCategory::Lookup
            }
            PermagateError::DatabaseError(_) => ErrorCategory::Storage,
            PermagateError::IoError(_)
            | PermagateError::SerializationError(_)
            | PermagateError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Lookup => ErrorSeverity::Medium,
            ErrorCategory::Permission | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PermagateError::InvalidKey { .. } => {
                "Permission keys are a single segment without '.', '>' or '*'"
            }
            PermagateError::InvalidPermission { .. } => {
                "Use dot-separated segments; '>' may only end a granted permission"
            }
            PermagateError::TreeError { .. } => {
                "Check the permission tree for duplicate keys or misplaced root permissions"
            }
            PermagateError::UnknownPermission { .. } => {
                "Add the permission to the permissions file or fix the spelling"
            }
            PermagateError::LoaderError { .. } => {
                "Set PERMAGATE_PERMISSIONS to '<file.toml>[:<root name>]'"
            }
            PermagateError::ConfigError { .. }
            | PermagateError::ConfigValidationError { .. }
            | PermagateError::InvalidConfigValueError { .. }
            | PermagateError::TomlError(_) => "Review the configuration file and try again",
            PermagateError::MissingConfigError { .. } => {
                "Provide the missing value in the config file or the environment"
            }
            PermagateError::UserNotFound(_) | PermagateError::GroupNotFound(_) => {
                "Create the user or group first, or check the name"
            }
            PermagateError::DatabaseError(_) => {
                "Check that PostgreSQL is reachable and PERMAGATE_DATABASE_URL is correct"
            }
            PermagateError::IoError(_) => "Check file paths and permissions",
            PermagateError::SerializationError(_) | PermagateError::CsvError(_) => {
                "Retry with a different output format"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Permission => format!("Permission problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Lookup => format!("Lookup failed: {}", self),
            ErrorCategory::Storage => format!("Storage failure: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    pub(crate) fn invalid_permission(permission: &str, reason: impl Into<String>) -> Self {
        PermagateError::InvalidPermission {
            permission: permission.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_key(key: &str, reason: impl Into<String>) -> Self {
        PermagateError::InvalidKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PermagateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        let err = PermagateError::UserNotFound("ghost".to_string());
        assert_eq!(err.category(), ErrorCategory::Lookup);
        assert_eq!(err.severity(), ErrorSeverity::Medium);

        let err = PermagateError::invalid_permission(">", "blank segment");
        assert_eq!(err.category(), ErrorCategory::Permission);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.user_friendly_message().starts_with("Permission problem"));
    }
}
