use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use humans::config::Config;
use humans::directory::SeaOrmStore;
use humans::import::{self, ImportSource};
use humans::{db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "-help" || arg == "--help") {
        println!("Usage: humans [OPTIONS]");
        println!("Options:");
        println!("  -config <path>  Path to configuration file (default: ./etc/humans.toml)");
        println!("  -import <file>  Replace the directory with a JSON content snapshot and exit");
        println!("  -fetch          Replace the directory with a snapshot from the content API and exit");
        println!("  -help, --help   Print this help message");
        return Ok(());
    }

    let config_path = flag_value(&args, "-config").unwrap_or_else(|| "./etc/humans.toml".to_string());

    // Load configuration first (before logging init)
    let config = Config::load(&config_path).unwrap_or_else(|e| {
        eprintln!("Could not load config file: {}, using defaults", e);
        let mut config = Config::default();
        config.apply_env();
        config
    });

    // Initialize logging
    // Priority: RUST_LOG env var > config file > default "info"
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Loading configuration from: {}", config_path);

    // One-shot import mode
    let source = if let Some(path) = flag_value(&args, "-import") {
        Some(ImportSource::File(PathBuf::from(path)))
    } else if args.iter().any(|arg| arg == "-fetch") {
        Some(ImportSource::Remote)
    } else {
        None
    };
    if let Some(source) = source {
        import::run_import(&config, source).await?;
        return Ok(());
    }

    info!("Starting Humans server...");

    let db_conn = db::init_database(&config.database).await.map_err(|e| {
        tracing::error!("Database initialization failed: {}", e);
        anyhow::anyhow!("Database initialization failed: {}", e)
    })?;

    let store = SeaOrmStore::new(db_conn, config.search_limit);
    let state = AppState::new(Arc::new(store), config.clone());

    let app = routes::create_router(state);

    let addr: SocketAddr = config.addr.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid address '{}', using default 0.0.0.0:8080", config.addr);
        SocketAddr::from(([0, 0, 0, 0], 8080))
    });

    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Value following `flag` on the command line
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .skip_while(|arg| arg.as_str() != flag)
        .nth(1)
        .cloned()
}
