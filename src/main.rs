//! project-api entry point.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use project_api::api::openapi;
use project_api::api::routes::ENDPOINTS;
use project_api::api::{create_router, AppState};
use project_api::config::Config;
use project_api::metrics;
use project_api::server;
use project_api::store::Store;

/// JSON API for users, projects and statistics.
#[derive(Parser, Debug)]
#[command(name = "project-api")]
#[command(about = "HTTP API over an optional SQLite store")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// Expose Prometheus metrics on this port.
        #[arg(long, env = "METRICS_PORT")]
        metrics_port: Option<u16>,
    },

    /// Resolve configuration, probe the database and print a summary.
    CheckConfig,

    /// Print the OpenAPI document as JSON.
    Openapi,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("project_api=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match args.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    match args.command {
        Some(Command::Serve { metrics_port }) => cmd_serve(metrics_port).await,
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Openapi) => cmd_openapi(),
        None => cmd_serve(None).await,
    }
}

/// Run the server until the process is killed. A bind failure exits with 1.
async fn cmd_serve(metrics_port: Option<u16>) -> anyhow::Result<()> {
    let config = Config::resolve();

    metrics::init_metrics();
    if let Some(port) = metrics_port {
        metrics::install_prometheus(std::net::SocketAddr::from(([0, 0, 0, 0], port)))?;
    }

    let store = Store::connect_or_degrade(&config.database_path);

    info!("Server starting on port {}", config.port);
    info!("Environment: {}", config.environment);
    info!("Debug mode: {}", config.debug);
    if config.debug {
        info!("Available endpoints:");
        for (method, path, description) in ENDPOINTS {
            info!("  {:<4} {:<14} - {}", method, path, description);
        }
    }

    let addr = config.listen_addr();
    let listener = match server::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Server failed to start: {}", e);
            std::process::exit(1);
        }
    };

    let app = create_router(AppState::new(config, store));
    server::serve(listener, app).await;
    Ok(())
}

/// Check configuration and database reachability.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("PROJECT API - CONFIGURATION CHECK");
    println!("======================================================================");

    let config = Config::resolve();
    println!("  Port:          {}", config.port);
    println!("  Database:      {}", config.database_path.display());
    println!("  Environment:   {}", config.environment);
    println!("  Debug:         {}", config.debug);
    println!("  Asset root:    {}", config.asset_root.display());

    print!("Probing database... ");
    match Store::connect(&config.database_path) {
        Ok(_) => println!("OK"),
        Err(e) => {
            println!("UNAVAILABLE");
            println!("  {}", e);
            println!("  The server will run without a database.");
        }
    }

    println!("======================================================================");
    Ok(())
}

/// Print the OpenAPI document.
fn cmd_openapi() -> anyhow::Result<()> {
    println!("{}", openapi::to_json()?);
    Ok(())
}
