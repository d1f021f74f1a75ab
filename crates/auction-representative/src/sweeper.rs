use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{
    info,
    warn,
};

use crate::Representative;

/// Default age at which an unreleased, unclaimed tentative reservation is
/// considered orphaned and force-released.
///
/// Must comfortably exceed any plausible `max_rounds * per_round_timeout`
/// for a live auction, or the sweeper would race a legitimate, still-running
/// reservation.
pub const DEFAULT_HORIZON: Duration = Duration::from_secs(5 * 60);

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns a background task that periodically sweeps `rep` for tentative
/// reservations older than `horizon`.
///
/// This is belt-and-suspenders cleanup for auctions that crashed or were
/// killed between reserving and releasing/claiming; well-behaved auctions
/// never trigger it.
pub fn spawn(
    rep: Representative,
    horizon: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let swept = rep.sweep_orphans(horizon);
                    if !swept.is_empty() {
                        warn!(
                            rep = rep.guid(),
                            count = swept.len(),
                            horizon_secs = horizon.as_secs(),
                            "swept orphaned tentative reservations",
                        );
                    }
                }
            }
        }
        info!(rep = rep.guid(), "orphan sweeper shut down");
    })
}
