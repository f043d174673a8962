use tracing::{error, info};

use doccore::config::Config;
use doccore::core::Core;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug cargo run                                  (enable debug for all)
    // RUST_LOG=doccore=debug,sqlx::postgres::notice=off          (debug for us, suppress spam)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info")
            .add_directive("sqlx::postgres::notice=warn".parse().unwrap())
            .add_directive("doccore=info".parse().unwrap())
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    println!("\n🚀 DOCCORE STARTUP");
    println!("{}", "=".repeat(60));

    let config = match Config::from_env() {
        Ok(cfg) => {
            println!("✅ Configuration loaded and validated successfully");
            cfg
        }
        Err(e) => {
            println!("❌ CRITICAL: configuration loading failed!");
            println!("Error: {e}");
            return Err(e);
        }
    };

    println!("\n🗄️  BOOTSTRAP:");
    println!("{}", "=".repeat(50));
    println!("📁 Storage root: {}", config.storage_root);
    println!("🪣 Storage bucket: {}", config.storage_bucket);

    let core = match Core::bootstrap(config).await {
        Ok(core) => {
            println!("✅ Database migrated and collaborators wired up");
            core
        }
        Err(e) => {
            println!("❌ CRITICAL: bootstrap failed!");
            println!("Error: {e}");
            return Err(e);
        }
    };

    println!("\n🔄 Starting OCR worker, lease sweeper and access-log drain...");
    core.spawn_background_tasks();
    info!(
        worker_count = core.config.worker_count,
        lease_ttl_secs = core.config.lease_ttl.as_secs(),
        "background tasks started"
    );

    println!("\n🎉 DOCCORE READY — running until terminated");
    println!("{}", "=".repeat(60));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!("failed to listen for shutdown signal: {e}"),
    }

    Ok(())
}
