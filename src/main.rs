use clap::Parser;
use permagate::app::{commands, render};
use permagate::config::cli::Command;
use permagate::utils::error::ErrorSeverity;
use permagate::utils::{logger, validation::Validate};
use permagate::{
    load_permission_root, CliConfig, PermagateConfig, PermagateError, PermissionGate, PgGrantStore,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            fail(&e);
        }
    };

    logger::init_logger(cli.verbose, config.logging.level.as_deref(), config.log_format());

    tracing::info!("Starting permagate CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(3);
    }

    match run(&cli, &config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => fail(&e),
    }
}

async fn run(cli: &CliConfig, config: &PermagateConfig) -> permagate::Result<i32> {
    let tree = load_permission_root(config.permissions.path.as_deref())?;

    // the tree view needs no database
    if let Command::Tree { format } = &cli.command {
        print!("{}", render::render_tree(&tree, *format)?);
        return Ok(0);
    }
    if let Command::List { user: None } = &cli.command {
        for permission in tree.permission_list() {
            println!("{}", permission);
        }
        return Ok(0);
    }

    let store = PgGrantStore::connect(config.database()?).await?;
    let gate = PermissionGate::new(tree, store);

    match &cli.command {
        Command::Check {
            username,
            permission,
        } => {
            let allowed = commands::check(&gate, username, permission).await?;
            println!("{}", if allowed { "granted" } else { "denied" });
            Ok(if allowed { 0 } else { 1 })
        }
        Command::List { user } => {
            for permission in commands::list(&gate, user.as_deref()).await? {
                println!("{}", permission);
            }
            Ok(0)
        }
        Command::Grant { target } => {
            let (kind, name, permission) = target.parts();
            if !commands::grant(&gate, kind, name, permission).await? {
                println!("{} already holds {}", name, permission);
            }
            Ok(0)
        }
        Command::Revoke { target } => {
            let (kind, name, permission) = target.parts();
            if !commands::revoke(&gate, kind, name, permission).await? {
                println!("{} did not hold {}", name, permission);
            }
            Ok(0)
        }
        Command::AddMember { group, username } => {
            commands::add_member(&gate, group, username).await?;
            Ok(0)
        }
        Command::RemoveMember { group, username } => {
            if !commands::remove_member(&gate, group, username).await? {
                println!("{} was not a member of {}", username, group);
            }
            Ok(0)
        }
        Command::Migrate { .. } => {
            // connect() already brought the schema up to date
            let version = permagate::adapters::postgres::get_schema_version(gate.store().pool()).await?;
            println!("✅ Schema version {}", version.unwrap_or_default());
            Ok(0)
        }
        Command::Tree { .. } => Ok(0),
    }
}

fn fail(e: &PermagateError) -> ! {
    tracing::error!(
        "❌ permagate failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // exit code 1 is reserved for "denied" from `check`
    let exit_code = match e.severity() {
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 3,
        ErrorSeverity::Critical => 4,
    };
    std::process::exit(exit_code);
}
