use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::gateway::BlobGateway;
use crate::storage::{Database, DatabaseError, MetadataStore};

/// Outcome of a single reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub swept: u64,
    pub failed: u64,
}

/// Periodic reconciliation that removes expired records and their blobs.
pub struct ExpirationSweeper {
    db: Database,
    gateway: Arc<BlobGateway>,
    interval: Duration,
}

impl ExpirationSweeper {
    pub fn new(db: Database, gateway: Arc<BlobGateway>, interval: Duration) -> Self {
        Self {
            db,
            gateway,
            interval,
        }
    }

    /// Sweep forever on the configured interval. Cycle errors are logged,
    /// never fatal.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(stats) if stats.swept > 0 || stats.failed > 0 => {
                    info!(
                        swept = stats.swept,
                        failed = stats.failed,
                        "Expiration sweep finished"
                    );
                }
                Ok(_) => debug!("Expiration sweep found nothing to reclaim"),
                Err(e) => warn!(error = %e, "Expiration sweep failed"),
            }
        }
    }

    /// One pass over every expired record. Blob first, then record: a crash
    /// mid-item leaves a harmless metadata row that is rediscovered next
    /// cycle, never an unindexed blob. A failure on one item never aborts
    /// the rest of the batch.
    pub async fn sweep_once(&self) -> Result<SweepStats, DatabaseError> {
        let expired = self.db.find_expired(Utc::now())?;
        let mut stats = SweepStats::default();

        for record in expired {
            if let Err(e) = self.gateway.delete(&record.location).await {
                warn!(
                    file_id = %record.id,
                    location = %record.location,
                    error = %e,
                    "Failed to delete expired blob; record kept for retry"
                );
                stats.failed += 1;
                continue;
            }

            match self.db.delete_record(&record.id) {
                Ok(_) => stats.swept += 1,
                Err(e) => {
                    warn!(file_id = %record.id, error = %e, "Failed to delete expired record");
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}
