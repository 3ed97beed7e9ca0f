//! Larder
//!
//! An MCP server for ingredients, recipes and nutrition labels.

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use larder::build_info;
use larder::config::AppConfig;
use larder::db;
use larder::mcp::LarderService;
use larder::reference::FdcReference;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging (output to stderr to not interfere with MCP stdio)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("larder=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env();
    build_info::print_startup_banner(&config);
    eprintln!("Starting MCP server on stdio...");

    // Ensure data directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    eprintln!("Initializing database...");
    let database = db::Database::new(&config.database_path)?;

    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        eprintln!("Database schema version: {}", version);
        Ok(())
    })?;

    // Reference tables load in the background; tools report when they are not ready
    let reference = FdcReference::new(&config.fdc_dir);
    reference.spawn_load();

    let service = LarderService::new(config, database, reference);

    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
