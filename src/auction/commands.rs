/// Auction commands
/// 1. start lot
/// 2. place bid
/// 3. end lot
/// 4. add / delete lot
/// 5. adjust points
// region:    --- Imports
use super::events::AuctionEvent;
use super::model::{AcceptedBid, Lot, LotOutcome, NewBid, NewLot, User};
use super::rules::{self, AuctionRules};
use crate::error::{AuctionError, Result};
use crate::notifier::LiveNotifier;
use crate::store::AuctionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands

/// Bid request as sent by the mini app
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub user_id: i64,
    pub user_name: String,
    pub lot_id: i64,
    pub bid_amount: i64,
    #[serde(default)]
    pub team_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StartedLot {
    pub lot_id: i64,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BidReceipt {
    #[serde(flatten)]
    pub accepted: AcceptedBid,
    pub time_left: i64,
}

/// 1. start lot
pub async fn handle_start_lot(
    store: &dyn AuctionStore,
    notifier: &LiveNotifier,
    rules: &AuctionRules,
    lot_id: i64,
) -> Result<StartedLot> {
    info!("{:<12} --> start lot id: {}", "Command", lot_id);
    let lot = store.start_lot(lot_id, rules, Utc::now()).await?;
    let ends_at = lot
        .auction_ends_at
        .ok_or(AuctionError::InvalidState("lot started without deadline"))?;

    notifier.publish(AuctionEvent::LotStarted { lot_id, ends_at });
    Ok(StartedLot { lot_id, ends_at })
}

/// 2. place bid
pub async fn handle_place_bid(
    store: &dyn AuctionStore,
    notifier: &LiveNotifier,
    rules: &AuctionRules,
    cmd: PlaceBidCommand,
) -> Result<BidReceipt> {
    info!("{:<12} --> place bid: {:?}", "Command", cmd);

    // non-positive amounts fall below the minimum inside the store
    let user_name = cmd.user_name.trim();
    if user_name.is_empty() {
        // lot errors still come first
        let view = store.get_lot(cmd.lot_id).await?;
        rules.check_bid(&view.lot, cmd.bid_amount, Utc::now())?;
        return Err(AuctionError::Validation("user_name is required".to_string()));
    }

    let new_bid = NewBid {
        lot_id: cmd.lot_id,
        user_id: cmd.user_id,
        user_name: user_name.to_string(),
        bid_amount: cmd.bid_amount,
        team_id: cmd.team_id,
    };

    let now = Utc::now();
    let accepted = match store.place_bid(new_bid, rules, now).await {
        Ok(accepted) => accepted,
        Err(e) => {
            warn!(
                "{:<12} --> bid rejected: lot {} user {} amount {}: {}",
                "Command", cmd.lot_id, cmd.user_id, cmd.bid_amount, e
            );
            return Err(e);
        }
    };

    notifier.publish(AuctionEvent::BidPlaced {
        lot_id: accepted.bid.lot_id,
        user_id: accepted.bid.user_id,
        user_name: accepted.bid.user_name.clone(),
        bid_amount: accepted.bid.bid_amount,
        ends_at: accepted.ends_at,
    });

    Ok(BidReceipt {
        time_left: rules::time_left(Some(accepted.ends_at), now),
        accepted,
    })
}

/// 3. end lot
pub async fn handle_end_lot(
    store: &dyn AuctionStore,
    notifier: &LiveNotifier,
    rules: &AuctionRules,
    lot_id: i64,
) -> Result<LotOutcome> {
    info!("{:<12} --> end lot id: {}", "Command", lot_id);
    let outcome = store.end_lot(lot_id, rules).await?;

    match &outcome.winner {
        Some(winner) => info!(
            "{:<12} --> lot {} won by {} ({}) for {}",
            "Command", lot_id, winner.user_name, winner.user_id, winner.amount
        ),
        None => info!("{:<12} --> lot {} closed without bids", "Command", lot_id),
    }

    notifier.publish(AuctionEvent::LotEnded {
        lot_id,
        winner_user_id: outcome.winner.as_ref().map(|w| w.user_id),
        winner_name: outcome.winner.as_ref().map(|w| w.user_name.clone()),
        final_price: outcome.final_price,
    });
    Ok(outcome)
}

/// 4. add lot
pub async fn handle_add_lot(
    store: &dyn AuctionStore,
    notifier: &LiveNotifier,
    mut new_lot: NewLot,
) -> Result<Lot> {
    info!("{:<12} --> add lot: {:?}", "Command", new_lot.title);
    new_lot.title = new_lot.title.trim().to_string();
    if new_lot.title.is_empty() {
        return Err(AuctionError::Validation("title is required".to_string()));
    }
    rules::check_points("starting_price", new_lot.starting_price)?;

    let lot = store.create_lot(new_lot).await?;
    notifier.publish(AuctionEvent::LotCreated { lot_id: lot.id });
    Ok(lot)
}

/// 4. delete lot
pub async fn handle_delete_lot(store: &dyn AuctionStore, lot_id: i64) -> Result<()> {
    info!("{:<12} --> delete lot id: {}", "Command", lot_id);
    store.delete_lot(lot_id).await
}

/// 5. adjust points
pub async fn handle_adjust_points(
    store: &dyn AuctionStore,
    user_id: i64,
    delta: i64,
) -> Result<User> {
    info!(
        "{:<12} --> adjust points id: {} delta: {}",
        "Command", user_id, delta
    );
    rules::check_points("delta", delta.saturating_abs())?;
    store.adjust_points(user_id, delta).await
}

// endregion: --- Commands

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn store_with_lot(starting_price: i64) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let lot = store
            .create_lot(NewLot {
                title: "Festival hoodie".to_string(),
                description: String::new(),
                starting_price,
                image_url: None,
            })
            .await
            .unwrap();
        store.upsert_user(1, "Alice").await.unwrap();
        store.adjust_points(1, 1_000).await.unwrap();
        (store, lot.id)
    }

    fn bid(lot_id: i64, amount: i64) -> PlaceBidCommand {
        PlaceBidCommand {
            user_id: 1,
            user_name: "Alice".to_string(),
            lot_id,
            bid_amount: amount,
            team_id: None,
        }
    }

    #[tokio::test]
    async fn commands_publish_lifecycle_events() {
        let (store, lot_id) = store_with_lot(200).await;
        let notifier = LiveNotifier::new(16);
        let mut events = notifier.subscribe();
        let rules = AuctionRules::default();

        handle_start_lot(&store, &notifier, &rules, lot_id).await.unwrap();
        handle_place_bid(&store, &notifier, &rules, bid(lot_id, 210))
            .await
            .unwrap();
        handle_end_lot(&store, &notifier, &rules, lot_id).await.unwrap();

        assert_eq!(events.recv().await.unwrap().kind(), "lot_started");
        assert_eq!(events.recv().await.unwrap().kind(), "bid_placed");
        match events.recv().await.unwrap() {
            AuctionEvent::LotEnded {
                winner_user_id,
                final_price,
                ..
            } => {
                assert_eq!(winner_user_id, Some(1));
                assert_eq!(final_price, 210);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejected_bid_publishes_nothing() {
        let (store, lot_id) = store_with_lot(200).await;
        let notifier = LiveNotifier::new(16);
        let rules = AuctionRules::default();
        handle_start_lot(&store, &notifier, &rules, lot_id).await.unwrap();

        let mut events = notifier.subscribe();
        let err = handle_place_bid(&store, &notifier, &rules, bid(lot_id, 209))
            .await
            .unwrap_err();
        assert!(matches!(err, AuctionError::BelowMinimum { minimum: 210 }));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn bid_receipt_reports_time_left() {
        let (store, lot_id) = store_with_lot(200).await;
        let notifier = LiveNotifier::default();
        let rules = AuctionRules::default();
        handle_start_lot(&store, &notifier, &rules, lot_id).await.unwrap();

        let receipt = handle_place_bid(&store, &notifier, &rules, bid(lot_id, 250))
            .await
            .unwrap();
        assert_eq!(receipt.accepted.current_price, 250);
        assert!(receipt.time_left > 50 && receipt.time_left <= 60);
    }

    #[tokio::test]
    async fn malformed_input_is_a_validation_error() {
        let (store, lot_id) = store_with_lot(200).await;
        let notifier = LiveNotifier::default();
        let rules = AuctionRules::default();
        handle_start_lot(&store, &notifier, &rules, lot_id).await.unwrap();

        let mut blank_name = bid(lot_id, 210);
        blank_name.user_name = "  ".to_string();
        assert!(matches!(
            handle_place_bid(&store, &notifier, &rules, blank_name).await,
            Err(AuctionError::Validation(_))
        ));

        let new_lot = NewLot {
            title: " ".to_string(),
            description: String::new(),
            starting_price: 10,
            image_url: None,
        };
        assert!(matches!(
            handle_add_lot(&store, &notifier, new_lot).await,
            Err(AuctionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn lot_errors_take_precedence_over_bad_input() {
        let (store, lot_id) = store_with_lot(200).await;
        let notifier = LiveNotifier::default();
        let rules = AuctionRules::default();

        let mut blank_name = bid(lot_id + 1, 0);
        blank_name.user_name = String::new();
        assert!(matches!(
            handle_place_bid(&store, &notifier, &rules, blank_name).await,
            Err(AuctionError::NotFound("lot"))
        ));
        assert!(matches!(
            handle_place_bid(&store, &notifier, &rules, bid(lot_id + 1, 0)).await,
            Err(AuctionError::NotFound("lot"))
        ));
        assert!(matches!(
            handle_place_bid(&store, &notifier, &rules, bid(lot_id, -5)).await,
            Err(AuctionError::InvalidState(_))
        ));

        handle_start_lot(&store, &notifier, &rules, lot_id).await.unwrap();
        assert!(matches!(
            handle_place_bid(&store, &notifier, &rules, bid(lot_id, 0)).await,
            Err(AuctionError::BelowMinimum { minimum: 210 })
        ));
    }

    #[tokio::test]
    async fn out_of_range_points_are_rejected() {
        let (store, _) = store_with_lot(200).await;
        let notifier = LiveNotifier::default();

        let pricey = NewLot {
            title: "Golden ticket".to_string(),
            description: String::new(),
            starting_price: i64::MAX - 5,
            image_url: None,
        };
        assert!(matches!(
            handle_add_lot(&store, &notifier, pricey).await,
            Err(AuctionError::Validation(_))
        ));

        for delta in [i64::MAX, i64::MIN, rules::MAX_POINTS + 1] {
            assert!(matches!(
                handle_adjust_points(&store, 1, delta).await,
                Err(AuctionError::Validation(_))
            ));
        }
        assert_eq!(store.get_user(1).await.unwrap().total_points, 1_000);

        let user = handle_adjust_points(&store, 1, -rules::MAX_POINTS).await.unwrap();
        assert_eq!(user.total_points, 1_000 - rules::MAX_POINTS);
    }

    #[tokio::test]
    async fn unknown_lot_is_not_found() {
        let store = MemoryStore::new();
        let notifier = LiveNotifier::default();
        let rules = AuctionRules::default();
        assert!(matches!(
            handle_start_lot(&store, &notifier, &rules, 42).await,
            Err(AuctionError::NotFound("lot"))
        ));
        assert!(matches!(
            handle_end_lot(&store, &notifier, &rules, 42).await,
            Err(AuctionError::NotFound("lot"))
        ));
    }
}
// endregion: --- Tests
