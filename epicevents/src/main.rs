use clap::Parser;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use epicevents::auth::CredentialStore;
use epicevents::commands::{self, Cli};
use epicevents::config::{Args, Config};
use epicevents::policy::RoleCommandPolicy;
use epicevents::{AppState, ensure_admin_collaborator, migrator, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    // Open the SQLite pool and bring the schema up to date
    let options = SqliteConnectOptions::new()
        .filename(&config.database.path)
        .create_if_missing(config.database.create_if_missing);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    migrator().run(&pool).await?;

    ensure_admin_collaborator(&config.admin_login, config.admin_password.as_deref(), &config, &pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create initial admin collaborator: {e}"))?;

    let state = AppState::builder()
        .db(pool)
        .config(config)
        .policy(RoleCommandPolicy::from_env())
        .store(CredentialStore::new().map_err(|e| anyhow::anyhow!("{e}"))?)
        .build();

    if args.command.is_empty() {
        // No command: interactive shell
        if let Err(e) = commands::shell::run(&state).await {
            e.log();
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
        return Ok(());
    }

    // One-shot command: parse the trailing tokens through the shared tree
    let cli = match Cli::try_parse_from(std::iter::once("epicevents".to_string()).chain(args.command)) {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders its own usage/error text and exit code
            e.exit();
        }
    };

    if let Err(e) = commands::dispatch(&state, cli.command).await {
        e.log();
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}
