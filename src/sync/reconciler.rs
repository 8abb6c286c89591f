//! Reconciliation pass: moves every card into the list for its due bucket.
//!
//! One run is a single sequential sweep:
//! 1. List all cards on the board (failure aborts the run)
//! 2. Classify each card against the clock, in the order received
//! 3. Move cards that sit outside their bucket's list, pausing after each move
//!
//! Per-card problems (no list mapped, a failed move) are tallied and the
//! sweep continues. Runs are serialized by an internal lock; a run that finds
//! another one in flight is rejected rather than queued.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::bucket::classify;
use super::mapping::ListMapping;
use crate::board::BoardClient;
use crate::error::ReconcileError;

/// Tallies for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub run_id: Uuid,
    /// Cards moved into their bucket's list.
    pub moved: usize,
    /// Cards whose bucket has no list configured.
    pub skipped: usize,
    /// Cards whose move request failed.
    pub failed: usize,
    /// Cards already in the right list.
    pub unchanged: usize,
    /// The sweep stopped early on a shutdown request.
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconciliationResult {
    fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            moved: 0,
            skipped: 0,
            failed: 0,
            unchanged: 0,
            cancelled: false,
            started_at,
            finished_at: started_at,
        }
    }

    /// Number of cards the run looked at.
    pub fn processed(&self) -> usize {
        self.moved + self.skipped + self.failed + self.unchanged
    }
}

impl fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "moved={} skipped={} failed={} unchanged={}",
            self.moved, self.skipped, self.failed, self.unchanged
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Keeps the board's lists in step with card due dates.
pub struct Reconciler {
    board: Arc<dyn BoardClient>,
    mapping: ListMapping,
    /// Pause after every move request.
    move_delay: Duration,
    /// Held for the duration of a run.
    run_lock: Mutex<()>,
    /// Checked between cards; set to stop a sweep early.
    shutdown: Arc<AtomicBool>,
    /// Wakes a ticker parked between runs.
    wake: Notify,
}

impl Reconciler {
    pub fn new(board: Arc<dyn BoardClient>, mapping: ListMapping, move_delay: Duration) -> Self {
        Self {
            board,
            mapping,
            move_delay,
            run_lock: Mutex::new(()),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Notify::new(),
        }
    }

    /// Builder: share an externally owned shutdown flag.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// The flag that cancels in-flight and future sweeps when set.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Stop sweeps at the next card boundary and wake anything waiting in
    /// [`shutdown_requested`](Self::shutdown_requested). A move already in
    /// flight is allowed to finish.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Resolves once shutdown has been requested.
    ///
    /// Setting the shared flag directly is seen here only on the next call.
    pub async fn shutdown_requested(&self) {
        if self.shutdown.load(Ordering::Relaxed) {
            return;
        }
        self.wake.notified().await;
    }

    pub fn mapping(&self) -> &ListMapping {
        &self.mapping
    }

    pub fn board(&self) -> &Arc<dyn BoardClient> {
        &self.board
    }

    /// Run one pass against the host's local clock.
    pub async fn run(&self) -> Result<ReconciliationResult, ReconcileError> {
        self.run_with_clock(Local::now).await
    }

    /// Run one pass, reading "now" from `now` once per card.
    pub async fn run_with_clock<Tz, F>(&self, now: F) -> Result<ReconciliationResult, ReconcileError>
    where
        Tz: TimeZone,
        F: Fn() -> DateTime<Tz>,
    {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| ReconcileError::AlreadyRunning)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        let cards = self.board.list_cards().await.map_err(|e| {
            error!(run_id = %run_id, "Failed to list cards: {}", e);
            ReconcileError::ListCards(e)
        })?;

        info!(run_id = %run_id, cards = cards.len(), "Reconciliation started");

        let mut result = ReconciliationResult::new(run_id, started_at);

        for card in &cards {
            if self.shutdown.load(Ordering::Relaxed) {
                warn!(run_id = %run_id, processed = result.processed(), "Reconciliation cancelled");
                result.cancelled = true;
                break;
            }

            let bucket = classify(card.due.as_ref(), &now());

            let Some(target) = self.mapping.get(bucket) else {
                warn!(
                    run_id = %run_id,
                    card_id = %card.id,
                    bucket = %bucket,
                    "No list configured for bucket ({}), skipping card",
                    bucket.env_key()
                );
                result.skipped += 1;
                continue;
            };

            if card.list_id == target {
                debug!(card_id = %card.id, bucket = %bucket, "Card already in place");
                result.unchanged += 1;
                continue;
            }

            match self.board.move_card(&card.id, target).await {
                Ok(()) => {
                    info!(
                        run_id = %run_id,
                        card_id = %card.id,
                        card = %card.name,
                        bucket = %bucket,
                        from = %card.list_id,
                        previous_bucket = ?self.mapping.bucket_for_list(&card.list_id),
                        to = %target,
                        "Card moved"
                    );
                    result.moved += 1;
                }
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        card_id = %card.id,
                        bucket = %bucket,
                        "Failed to move card: {}", e
                    );
                    result.failed += 1;
                }
            }

            tokio::time::sleep(self.move_delay).await;
        }

        result.finished_at = Utc::now();
        info!(run_id = %run_id, summary = %result, "Reconciliation finished");

        Ok(result)
    }
}
