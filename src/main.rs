use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use mssql_schema_mcp::cli::{self, Cli};
use mssql_schema_mcp::stdio::StdioServer;
use mssql_schema_mcp::{MssqlPool, ToolContext, ToolRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    // .env first so it can also supply RUST_LOG
    let env_file = cli::load_env_file();

    // Initialize logging (stderr; stdout carries the protocol)
    env_logger::init();

    if let Some(path) = &env_file {
        log::debug!("Loaded environment from {}", path.display());
    }

    let cli = Cli::parse();

    if cli.list_tools {
        println!("Available tools:");
        for tool in mssql_schema_mcp::tools::all_tools() {
            println!("  - {}: {}", tool.name, tool.description);
        }
        return Ok(());
    }

    // Get enabled tools from CLI (--tool/--tools/--toolset)
    let enabled_tools = cli.enabled_tools().await?;

    // VALIDATE IMMEDIATELY - before connecting
    if let Some(ref tools) = enabled_tools {
        let available = cli::available_tools();
        let invalid: Vec<_> = tools
            .iter()
            .filter(|tool| !available.contains(&tool.as_str()))
            .collect();

        if !invalid.is_empty() {
            eprintln!("Error: Invalid tool names specified:");
            for tool in &invalid {
                eprintln!("  - {tool}");
            }
            eprintln!();
            eprintln!("Available tools:");
            for tool in available {
                eprintln!("  - {tool}");
            }
            return Err(anyhow::anyhow!("Invalid tool names specified"));
        }
    }

    // Cancellation token for graceful shutdown (also aborts connection retries)
    let shutdown_token = tokio_util::sync::CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        wait_for_interrupt().await;
        log::debug!("Received interrupt signal");
        signal_token.cancel();
    });

    // Failure to establish the initial pool is fatal
    let pool = MssqlPool::connect(cli.connection_config(), shutdown_token.child_token())
        .await
        .context("Database connection failed")?;

    let context = ToolContext::new(Arc::new(pool.clone()), cli.default_schema.clone());
    let server = StdioServer::new(ToolRegistry::new(context, enabled_tools));

    log::info!(
        "MSSQL schema MCP server running on stdio (default schema: {})",
        cli.default_schema
    );

    let result = tokio::select! {
        res = server.serve_stdio() => res,
        () = shutdown_token.cancelled() => {
            log::info!("Shutting down");
            Ok(())
        }
    };

    pool.close();
    result
}

/// Wait for interrupt signal (cross-platform)
#[cfg(unix)]
async fn wait_for_interrupt() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm_result = signal(SignalKind::terminate());
    let mut sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result.as_mut(), sigint_result.as_mut()) {
        (Ok(sigterm), Ok(sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
        }
        (Ok(sigterm), Err(_)) => {
            let _ = sigterm.recv().await;
        }
        (Err(_), Ok(sigint)) => {
            let _ = sigint.recv().await;
        }
        (Err(_), Err(_)) => {
            let () = std::future::pending().await;
        }
    }
}

/// Wait for interrupt signal (cross-platform)
#[cfg(windows)]
async fn wait_for_interrupt() {
    use tokio::signal::windows;

    match windows::ctrl_c() {
        Ok(mut ctrl_c) => {
            let _ = ctrl_c.recv().await;
        }
        Err(_) => {
            let () = std::future::pending().await;
        }
    }
}
