use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result};
use slawarden::Config;
use slawarden::engine::SlaEngine;
use slawarden::store::create_state_store;
use std::sync::Arc;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Daemon { port, host } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            tracing::info!(%host, port, "starting daemon");
            slawarden::platform::daemon::run(Arc::new(config), host, port).await
        }
        Commands::Evaluate => {
            let engine = SlaEngine::bootstrap(&config).await?;
            let report = engine.run_cycle().await;
            let json =
                serde_json::to_string_pretty(&report).context("serialize evaluation report")?;
            println!("{json}");
            Ok(())
        }
        Commands::State => {
            let store = create_state_store(&config.store, &config.workspace_dir).await?;
            let rows = store
                .load_all()
                .await
                .context("read persisted state")?;
            if rows.is_empty() {
                println!("No persisted state.");
            }
            for row in rows {
                println!("{:<40} {:>16} {}", row.name, row.value, row.updated_at);
            }
            Ok(())
        }
    }
}
