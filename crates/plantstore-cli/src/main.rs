mod seed_cmd;
mod serve_cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};

use plantstore_db::config::DbConfig;
use plantstore_db::{pool, queries};

#[derive(Parser)]
#[command(name = "plantstore", about = "Plant store CRUD API server")]
struct Cli {
    /// Database URL (overrides PLANTSTORE_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the plantstore database and run migrations
    DbInit,
    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 5555)]
        port: u16,
    },
    /// Load the sample plants into the database
    Seed,
}

/// Resolve the database config: CLI flag first, then env var, then default.
fn resolve_db_config(cli_db_url: Option<&str>) -> DbConfig {
    match cli_db_url {
        Some(url) => DbConfig::new(url),
        None => DbConfig::from_env(),
    }
}

/// Execute the `plantstore db-init` command: create database and run migrations.
async fn cmd_db_init(config: &DbConfig) -> Result<()> {
    println!("Initializing plantstore database...");

    // 1. Create the database if it does not exist.
    pool::ensure_database_exists(config).await?;

    // 2. Connect to the target database.
    let db_pool = pool::create_pool(config).await?;

    // 3. Run migrations.
    pool::run_migrations(&db_pool).await?;

    // 4. Print success with the current row count.
    let count = queries::plants::count_plants(&db_pool).await?;
    println!("Database ready. plants: {count} rows");

    // 5. Clean shutdown.
    db_pool.close().await;

    println!("plantstore db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = resolve_db_config(cli.database_url.as_deref());

    match cli.command {
        Commands::DbInit => {
            cmd_db_init(&config).await?;
        }
        Commands::Serve { bind, port } => {
            let db_pool = pool::create_pool(&config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Seed => {
            let db_pool = pool::create_pool(&config).await?;
            let result = seed_cmd::run_seed(&db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
