use anyhow::Result;
use permagate::config::loader::{load_permission_root, PERMISSIONS_ENV};
use permagate::config::toml_config::{DATABASE_URL_ENV, KEEP_SCHEMA_ENV, MAX_CONNECTIONS_ENV};
use permagate::{PermagateConfig, PermagateError};
use std::sync::{Mutex, MutexGuard};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_permissions.toml");
const VARS: [&str; 4] = [PERMISSIONS_ENV, DATABASE_URL_ENV, MAX_CONNECTIONS_ENV, KEEP_SCHEMA_ENV];

// Tests in this binary share the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Clears the PERMAGATE_* variables for the duration of a test and restores them afterwards.
struct EnvGuard {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn new() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let saved = VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();
        for name in VARS {
            std::env::remove_var(name);
        }
        Self { saved, _lock: lock }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[test]
fn test_loader_falls_back_to_environment() -> Result<()> {
    let _env = EnvGuard::new();

    std::env::set_var(PERMISSIONS_ENV, FIXTURE);
    let tree = load_permission_root(None)?;
    assert!(tree.exists("test.sub3")?);

    std::env::set_var(PERMISSIONS_ENV, format!("{}:rootTwo", FIXTURE));
    let tree = load_permission_root(None)?;
    assert!(tree.exists("reports.export")?);
    assert!(!tree.exists("test")?);
    Ok(())
}

#[test]
fn test_loader_without_location() {
    let _env = EnvGuard::new();

    match load_permission_root(None) {
        Err(PermagateError::LoaderError { message }) => {
            assert!(message.contains("was not initialized"), "{}", message)
        }
        other => panic!("expected a loader error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_config_from_environment() -> Result<()> {
    let _env = EnvGuard::new();

    let config = PermagateConfig::from_env()?;
    assert!(config.database.is_none());
    assert!(config.permissions.path.is_none());

    std::env::set_var(PERMISSIONS_ENV, "perms.toml:rootTwo");
    std::env::set_var(DATABASE_URL_ENV, "postgres://ci:ci@localhost:5432/permagate");
    let config = PermagateConfig::from_env()?;
    assert_eq!(config.permissions.path.as_deref(), Some("perms.toml:rootTwo"));
    let database = config.database()?;
    assert_eq!(database.url, "postgres://ci:ci@localhost:5432/permagate");
    assert_eq!(database.max_connections, 5);
    assert!(!database.keep_schema);

    std::env::set_var(MAX_CONNECTIONS_ENV, "12");
    for value in ["1", "true", "YES"] {
        std::env::set_var(KEEP_SCHEMA_ENV, value);
        let config = PermagateConfig::from_env()?;
        let database = config.database()?;
        assert_eq!(database.max_connections, 12);
        assert!(database.keep_schema, "{}", value);
    }

    std::env::set_var(KEEP_SCHEMA_ENV, "0");
    assert!(!PermagateConfig::from_env()?.database()?.keep_schema);
    Ok(())
}

#[test]
fn test_config_from_environment_rejects_garbage() {
    let _env = EnvGuard::new();
    std::env::set_var(DATABASE_URL_ENV, "postgres://localhost/permagate");

    std::env::set_var(MAX_CONNECTIONS_ENV, "many");
    assert!(matches!(
        PermagateConfig::from_env(),
        Err(PermagateError::InvalidConfigValueError { .. })
    ));

    std::env::remove_var(MAX_CONNECTIONS_ENV);
    std::env::set_var(KEEP_SCHEMA_ENV, "ture");
    assert!(matches!(
        PermagateConfig::from_env(),
        Err(PermagateError::InvalidConfigValueError { .. })
    ));
}

#[cfg(feature = "cli")]
#[test]
fn test_config_file_without_database_uses_environment() -> Result<()> {
    use clap::Parser;
    use permagate::CliConfig;
    use std::io::Write;

    let _env = EnvGuard::new();
    std::env::set_var(DATABASE_URL_ENV, "postgres://ci:ci@localhost:5432/permagate");

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(b"[permissions]\npath = \"perms.toml\"\n")?;
    let path = file.path().display().to_string();

    let cli = CliConfig::parse_from(["permagate", "-c", path.as_str(), "check", "tester", "test"]);
    let config = cli.resolve()?;
    assert_eq!(config.permissions.path.as_deref(), Some("perms.toml"));
    let database = config.database()?;
    assert_eq!(database.url, "postgres://ci:ci@localhost:5432/permagate");
    assert!(database.keep_schema);

    std::env::remove_var(DATABASE_URL_ENV);
    let config = cli.resolve()?;
    assert!(matches!(
        config.database(),
        Err(PermagateError::MissingConfigError { .. })
    ));
    Ok(())
}
