//! services/api/src/sweep.rs
//!
//! The daily delay sweep: at every UTC midnight, schedule entries that are past
//! due and still incomplete are flagged as delayed.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use study_assistant_core::ports::{DatabaseService, PortResult};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Runs one sweep as of `now` and returns how many entries were marked.
pub async fn run_delay_sweep(db: &dyn DatabaseService, now: DateTime<Utc>) -> PortResult<u64> {
    let marked = db.mark_overdue_entries_delayed(now).await?;
    info!("Delay sweep marked {} schedule entries as delayed", marked);
    Ok(marked)
}

/// Time left until the next UTC midnight strictly after `now`.
pub fn until_next_midnight(now: DateTime<Utc>) -> Duration {
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .and_then(|midnight| (midnight.and_utc() - now).to_std().ok())
        .unwrap_or(ONE_DAY)
}

/// Spawns the background sweep loop. It exits when `shutdown` is cancelled.
pub fn spawn_daily_sweep(
    db: Arc<dyn DatabaseService>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let wait = until_next_midnight(Utc::now());
            info!("Next delay sweep in {}s", wait.as_secs());

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Delay sweep stopped.");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = run_delay_sweep(db.as_ref(), Utc::now()).await {
                        error!("Delay sweep failed: {:?}", e);
                    }
                }
            }
        }
    })
}
