//! Interval loop driving the batch classifier.

use super::BatchClassifier;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Run the classifier on a fixed interval until shutdown is signalled.
///
/// Runs longer than the interval are not stacked; the next tick after a long
/// run fires immediately and later ticks are skipped.
pub async fn run_daemon(classifier: BatchClassifier, interval: Duration, shutdown: CancellationToken) {
    info!(interval = ?interval, "starting classifier daemon");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("classifier daemon shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(error) = classifier.run_once().await {
                    error!(%error, "classifier run failed");
                }
            }
        }
    }
}
