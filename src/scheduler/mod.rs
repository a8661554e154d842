/// Expired lot scheduler
/// Lots close on an explicit admin call by default so the host can narrate
/// the close live. With `AUTO_CLOSE_LOTS` enabled this task closes the active
/// lot once its deadline has passed, through the same end-lot path.
// region:    --- Imports
use crate::auction::commands;
use crate::auction::model::LotOutcome;
use crate::auction::rules::AuctionRules;
use crate::error::Result;
use crate::notifier::LiveNotifier;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
pub struct AuctionScheduler {
    store: Arc<dyn AuctionStore>,
    notifier: LiveNotifier,
    rules: AuctionRules,
}

impl AuctionScheduler {
    pub fn new(store: Arc<dyn AuctionStore>, notifier: LiveNotifier, rules: AuctionRules) -> Self {
        Self {
            store,
            notifier,
            rules,
        }
    }

    /// Ticks once per second until the runtime shuts down.
    pub fn start(self) -> JoinHandle<()> {
        info!("{:<12} --> auto-close enabled", "Scheduler");
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                if let Err(e) = self.close_expired_lot(Utc::now()).await {
                    error!("{:<12} --> auto-close failed: {:?}", "Scheduler", e);
                }
            }
        })
    }

    /// Ends the active lot if its deadline is behind `now`.
    pub async fn close_expired_lot(&self, now: DateTime<Utc>) -> Result<Option<LotOutcome>> {
        let Some(active) = self.store.active_lot().await? else {
            return Ok(None);
        };
        match active.lot.auction_ends_at {
            Some(ends_at) if ends_at < now => {
                debug!("{:<12} --> lot {} expired", "Scheduler", active.lot.id);
                let outcome = commands::handle_end_lot(
                    self.store.as_ref(),
                    &self.notifier,
                    &self.rules,
                    active.lot.id,
                )
                .await?;
                Ok(Some(outcome))
            }
            _ => Ok(None),
        }
    }
}
// endregion: --- Auction Scheduler

// endregion: --- Tests
