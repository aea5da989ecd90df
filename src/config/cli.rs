use crate::app::commands::SubjectKind;
use crate::app::render::OutputFormat;
use crate::config::toml_config::{DatabaseConfig, PermagateConfig};
use crate::utils::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "permagate")]
#[command(about = "Hierarchical permission gate backed by PostgreSQL")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Permissions location '<file.toml>[:<root name>]', overrides PERMAGATE_PERMISSIONS
    #[arg(short, long, global = true)]
    pub permissions: Option<String>,

    /// PostgreSQL connection string, overrides PERMAGATE_DATABASE_URL
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Exit 0 if the user holds the permission, 1 otherwise
    Check { username: String, permission: String },
    /// Print every grantable permission, or the effective permissions of a user
    List {
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the permission tree
    Tree {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Grant a permission string to a user or group
    Grant {
        #[command(subcommand)]
        target: Target,
    },
    /// Revoke a permission string from a user or group
    Revoke {
        #[command(subcommand)]
        target: Target,
    },
    AddMember { group: String, username: String },
    RemoveMember { group: String, username: String },
    /// Create the database schema
    Migrate {
        /// Preserve existing tables between runs
        #[arg(long)]
        keep_schema: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum Target {
    User { name: String, permission: String },
    Group { name: String, permission: String },
}

impl Target {
    pub fn parts(&self) -> (SubjectKind, &str, &str) {
        match self {
            Target::User { name, permission } => (SubjectKind::User, name.as_str(), permission.as_str()),
            Target::Group { name, permission } => (SubjectKind::Group, name.as_str(), permission.as_str()),
        }
    }
}

impl CliConfig {
    /// File config when --config is given, otherwise the environment, then command-line overrides.
    /// A config file without a `[database]` table takes the database from PERMAGATE_DATABASE_URL.
    pub fn resolve(&self) -> Result<PermagateConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = PermagateConfig::from_file(path)?;
                if config.database.is_none() {
                    config.database = PermagateConfig::from_env()?.database;
                }
                config
            }
            None => PermagateConfig::from_env()?,
        };

        if let Some(permissions) = &self.permissions {
            config.permissions.path = Some(permissions.clone());
        }

        if let Some(url) = &self.database_url {
            match config.database.as_mut() {
                Some(database) => database.url = url.clone(),
                None => config.database = Some(DatabaseConfig::new(url.clone())),
            }
        }

        // only `migrate` may recreate tables; every other command keeps the data it works on
        if let Some(database) = config.database.as_mut() {
            database.keep_schema = match self.command {
                Command::Migrate { keep_schema } => keep_schema || database.keep_schema,
                _ => true,
            };
        }

        if self.json_logs {
            config.logging.format = Some("json".to_string());
        }

        Ok(config)
    }
}
