use anyhow::Result;
use clap::Parser;

mod cli;
mod data_dir;
mod dsn;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let resolved_dsn = if cli.memory_store {
        None
    } else {
        let data_dir = data_dir::resolve_data_dir(cli.data_dir.as_deref());
        Some(dsn::resolve_dsn(cli.dsn.as_deref().unwrap_or(""), &data_dir)?)
    };

    let args = cgate_core::CliArgs {
        dsn: resolved_dsn,
        host: cli.host,
        port: cli.port,
        admin_key: cli.admin_key,
        proxy: cli.proxy,
        memory_store: cli.memory_store,
    };

    let boot = cgate_core::bootstrap_with_args(args).await?;
    let store = boot.core.state().store.clone();

    let app = boot
        .core
        .router()
        .nest("/admin", cgate_admin::router(store, boot.config.admin_key_hash.clone()));

    let bind = format!("{}:{}", boot.config.host, boot.config.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(event = "listening", addr = %bind);
    axum::serve(listener, app).await?;
    Ok(())
}
