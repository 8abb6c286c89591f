//! Periodic reconciliation trigger.
//!
//! Either a fixed interval or a cron expression evaluated against the local
//! clock. Each tick calls [`Reconciler::run`]; run-level failures are logged
//! and the ticker keeps going. [`Reconciler::request_shutdown`] wakes the
//! ticker while it waits; a run already under way stops at its next card and
//! the task then exits.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Local;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::reconciler::Reconciler;
use crate::error::ReconcileError;

/// When the reconciler fires.
#[derive(Debug, Clone)]
pub enum Schedule {
    /// Every `Duration`, measured from ticker start.
    Interval(Duration),
    /// On a cron expression (seconds-resolution, `cron` crate syntax).
    Cron(cron::Schedule),
}

impl Schedule {
    /// Parse a cron expression.
    pub fn cron(expression: &str) -> Result<Self, String> {
        cron::Schedule::from_str(expression)
            .map(Schedule::Cron)
            .map_err(|e| format!("invalid cron: {e}"))
    }

    /// Time from now until the next cron fire. `None` for intervals or an
    /// exhausted cron expression.
    pub fn next_cron_delay(&self) -> Option<Duration> {
        let Schedule::Cron(schedule) = self else {
            return None;
        };
        let next = schedule.upcoming(Local).next()?;
        Some(
            next.signed_duration_since(Local::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::Interval(period) => write!(f, "every {}s", period.as_secs()),
            Schedule::Cron(schedule) => write!(f, "cron '{schedule}'"),
        }
    }
}

/// Spawn the periodic reconciliation task.
pub fn spawn_reconcile_ticker(
    reconciler: Arc<Reconciler>,
    schedule: Schedule,
    run_on_start: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(schedule = %schedule, "Reconcile ticker started");
        let shutdown = reconciler.shutdown_flag();

        if run_on_start {
            run_tick(&reconciler).await;
        }

        match schedule {
            Schedule::Interval(period) => {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // Skip immediate first tick
                ticker.tick().await;

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = reconciler.shutdown_requested() => {
                            info!("Reconcile ticker shutting down");
                            return;
                        }
                    }
                    if shutdown.load(Ordering::Relaxed) {
                        info!("Reconcile ticker shutting down");
                        return;
                    }
                    run_tick(&reconciler).await;
                }
            }
            Schedule::Cron(_) => loop {
                let Some(delay) = schedule.next_cron_delay() else {
                    warn!(schedule = %schedule, "Cron schedule has no upcoming fire time, stopping ticker");
                    return;
                };
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = reconciler.shutdown_requested() => {
                        info!("Reconcile ticker shutting down");
                        return;
                    }
                }
                if shutdown.load(Ordering::Relaxed) {
                    info!("Reconcile ticker shutting down");
                    return;
                }
                run_tick(&reconciler).await;
            },
        }
    })
}

async fn run_tick(reconciler: &Reconciler) {
    match reconciler.run().await {
        Ok(result) => debug!(run_id = %result.run_id, summary = %result, "Scheduled run complete"),
        Err(ReconcileError::AlreadyRunning) => {
            warn!("Previous reconciliation still running, skipping this tick");
        }
        Err(e) => error!("Scheduled reconciliation failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Notify;

    use super::*;
    use crate::board::{BoardClient, BoardList, Card};
    use crate::error::BoardError;
    use crate::sync::bucket::Bucket;
    use crate::sync::mapping::ListMapping;

    #[derive(Default)]
    struct CountingBoard {
        listings: AtomicUsize,
    }

    #[async_trait]
    impl BoardClient for CountingBoard {
        async fn list_cards(&self) -> Result<Vec<Card>, BoardError> {
            self.listings.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn move_card(&self, _card_id: &str, _list_id: &str) -> Result<(), BoardError> {
            Ok(())
        }

        async fn list_board_lists(&self) -> Result<Vec<BoardList>, BoardError> {
            Ok(Vec::new())
        }
    }

    /// Two overdue cards whose moves each take 200ms.
    #[derive(Default)]
    struct SlowBoard {
        move_started: Notify,
        moves_completed: AtomicUsize,
    }

    #[async_trait]
    impl BoardClient for SlowBoard {
        async fn list_cards(&self) -> Result<Vec<Card>, BoardError> {
            let due = Utc::now() - chrono::Duration::days(30);
            Ok(vec![
                Card::new("a", "Card a", "later").with_due(due),
                Card::new("b", "Card b", "later").with_due(due),
            ])
        }

        async fn move_card(&self, _card_id: &str, _list_id: &str) -> Result<(), BoardError> {
            self.move_started.notify_one();
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.moves_completed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list_board_lists(&self) -> Result<Vec<BoardList>, BoardError> {
            Ok(Vec::new())
        }
    }

    fn counting_reconciler(board: Arc<CountingBoard>) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            board,
            ListMapping::new(),
            Duration::from_millis(100),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_the_current_move_finish() {
        let board = Arc::new(SlowBoard::default());
        let reconciler = Arc::new(Reconciler::new(
            board.clone(),
            ListMapping::new().with_list(Bucket::Overdue, "overdue"),
            Duration::from_millis(100),
        ));

        let handle = spawn_reconcile_ticker(
            Arc::clone(&reconciler),
            Schedule::Interval(Duration::from_secs(900)),
            true,
        );

        board.move_started.notified().await;
        reconciler.request_shutdown();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("ticker still running after shutdown")
            .unwrap();
        // The first move completed; the second card was never started.
        assert_eq!(board.moves_completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wakes_an_idle_interval_ticker() {
        let board = Arc::new(CountingBoard::default());
        let reconciler = counting_reconciler(board.clone());

        let handle = spawn_reconcile_ticker(
            Arc::clone(&reconciler),
            Schedule::Interval(Duration::from_secs(900)),
            false,
        );

        tokio::time::sleep(Duration::from_secs(10)).await;
        reconciler.request_shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker still running after shutdown")
            .unwrap();
        assert_eq!(board.listings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_wakes_a_sleeping_cron_ticker() {
        let board = Arc::new(CountingBoard::default());
        let reconciler = counting_reconciler(board.clone());

        // Once a year, on January 1st.
        let schedule = Schedule::cron("0 0 0 1 1 *").unwrap();
        let handle = spawn_reconcile_ticker(Arc::clone(&reconciler), schedule, false);

        tokio::time::sleep(Duration::from_secs(1)).await;
        reconciler.request_shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ticker still running after shutdown")
            .unwrap();
        assert_eq!(board.listings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_runs_on_start_and_each_period() {
        let board = Arc::new(CountingBoard::default());
        let reconciler = Arc::new(Reconciler::new(
            board.clone(),
            ListMapping::new(),
            Duration::from_millis(100),
        ));

        let handle = spawn_reconcile_ticker(
            Arc::clone(&reconciler),
            Schedule::Interval(Duration::from_secs(60)),
            true,
        );

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(board.listings.load(Ordering::SeqCst), 3);

        reconciler.shutdown_flag().store(true, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(handle.is_finished());
        assert_eq!(board.listings.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_without_start_run_waits_one_period() {
        let board = Arc::new(CountingBoard::default());
        let reconciler = Arc::new(Reconciler::new(
            board.clone(),
            ListMapping::new(),
            Duration::from_millis(100),
        ));

        let handle = spawn_reconcile_ticker(
            reconciler,
            Schedule::Interval(Duration::from_secs(60)),
            false,
        );

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(board.listings.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(board.listings.load(Ordering::SeqCst), 1);
        handle.abort();
    }

    #[test]
    fn cron_schedule_parses() {
        let schedule = Schedule::cron("0 */15 * * * *").unwrap();
        assert!(schedule.to_string().starts_with("cron"));
        let delay = schedule.next_cron_delay().unwrap();
        assert!(delay <= Duration::from_secs(15 * 60));
    }

    #[test]
    fn invalid_cron_is_rejected() {
        assert!(Schedule::cron("not a cron").is_err());
    }

    #[test]
    fn interval_has_no_cron_delay() {
        let schedule = Schedule::Interval(Duration::from_secs(900));
        assert!(schedule.next_cron_delay().is_none());
        assert_eq!(schedule.to_string(), "every 900s");
    }
}
