use std::sync::Arc;

use due_sort::board::{BoardClient, TrelloClient};
use due_sort::config::SyncConfig;
use due_sort::sync::{MappingIssue, Reconciler, spawn_reconcile_ticker, sync_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SyncConfig::from_env()?;

    eprintln!("📋 due-sort v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Board: {}", config.board.board_id);
    eprintln!("   Schedule: {}", config.schedule);
    eprintln!("   Move delay: {}ms", config.move_delay.as_millis());
    eprintln!("   Trigger API: http://0.0.0.0:{}/api/sync", config.port);
    eprintln!("   List check: http://0.0.0.0:{}/api/lists\n", config.port);

    if config.move_delay.is_zero() {
        tracing::warn!("DUE_SORT_MOVE_DELAY_MS is 0; moves will not be rate limited");
    }

    let board: Arc<dyn BoardClient> = Arc::new(TrelloClient::new(config.board.clone())?);

    // ── Startup mapping check ──────────────────────────────────────────
    if !config.mapping.is_complete() {
        tracing::warn!(
            missing = ?config.mapping.missing(),
            "List mapping incomplete; cards in these buckets will be skipped"
        );
    }
    match board.list_board_lists().await {
        Ok(lists) => {
            let issues = config.mapping.check_against(&lists);
            for issue in issues.iter().filter(|i| matches!(i, MappingIssue::UnknownList { .. })) {
                tracing::warn!("List mapping: {}", issue);
            }
            if issues.is_empty() {
                tracing::info!(lists = lists.len(), "List mapping verified against board");
            }
        }
        Err(e) => {
            tracing::warn!("Could not verify list mapping against board: {}", e);
        }
    }

    // ── Reconciler + triggers ──────────────────────────────────────────
    let reconciler = Arc::new(Reconciler::new(
        board,
        config.mapping.clone(),
        config.move_delay,
    ));

    let ticker = spawn_reconcile_ticker(
        Arc::clone(&reconciler),
        config.schedule.clone(),
        config.run_on_start,
    );

    let app = sync_routes(Arc::clone(&reconciler));
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Trigger server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&reconciler)))
        .await?;

    // A scheduled run in progress stops at its next card.
    if let Err(e) = ticker.await {
        tracing::error!("Reconcile ticker task failed: {}", e);
    }
    tracing::info!("Shut down");

    Ok(())
}

/// Wait for Ctrl-C, then flag in-flight runs to stop at the next card.
async fn shutdown_signal(reconciler: Arc<Reconciler>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    reconciler.request_shutdown();
}
