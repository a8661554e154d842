//! Runs the store contract against a real Postgres when `TEST_DATABASE_URL` is set.
use chrono::{Duration, Utc};
use sothebeat_auction::auction::model::{NewBid, NewLot};
use sothebeat_auction::auction::rules::AuctionRules;
use sothebeat_auction::database::DatabaseManager;
use sothebeat_auction::error::AuctionError;
use sothebeat_auction::store::{AuctionStore, PostgresStore};
use std::sync::Arc;

async fn setup() -> Option<PostgresStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db_manager = DatabaseManager::new(&url, 5).await.unwrap();
    db_manager.initialize_database().await.unwrap();
    Some(PostgresStore::new(Arc::new(db_manager)))
}

fn bid(lot_id: i64, user_id: i64, amount: i64) -> NewBid {
    NewBid {
        lot_id,
        user_id,
        user_name: format!("pg-user-{user_id}"),
        bid_amount: amount,
        team_id: None,
    }
}

/// One sequential scenario, since starting a lot closes every other lot in the database.
#[tokio::test]
async fn test_postgres_auction_flow() {
    let Some(store) = setup().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let rules = AuctionRules::default();

    // unique ids per run
    let base = Utc::now().timestamp_micros();
    let (alice, bob) = (base, base + 1);
    store.upsert_user(alice, "Alice").await.unwrap();
    store.adjust_points(alice, 1_000).await.unwrap();
    store.upsert_user(bob, "Bob").await.unwrap();
    store.adjust_points(bob, 250).await.unwrap();

    let new_lot = |title: &str| NewLot {
        title: title.to_string(),
        description: "postgres store test".to_string(),
        starting_price: 200,
        image_url: None,
    };
    let first = store.create_lot(new_lot("pg lot A")).await.unwrap();
    let second = store.create_lot(new_lot("pg lot B")).await.unwrap();
    assert_eq!(first.current_price, 200);
    assert!(second.order_num > first.order_num);

    // single active lot
    let start = Utc::now();
    store.start_lot(first.id, &rules, start).await.unwrap();
    store.start_lot(second.id, &rules, start).await.unwrap();
    let active = store.active_lot().await.unwrap().unwrap();
    assert_eq!(active.lot.id, second.id);
    assert!(!store.get_lot(first.id).await.unwrap().lot.is_active);

    // minimum and balance checks
    assert!(matches!(
        store.place_bid(bid(second.id, alice, 209), &rules, start).await,
        Err(AuctionError::BelowMinimum { minimum: 210 })
    ));
    assert!(matches!(
        store.place_bid(bid(second.id, bob, 300), &rules, start).await,
        Err(AuctionError::InsufficientBalance { .. })
    ));
    assert!(store.bids_for_lot(second.id, 20).await.unwrap().is_empty());

    // accepted bids and soft close
    let accepted = store
        .place_bid(bid(second.id, bob, 210), &rules, start + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(accepted.current_price, 210);
    let late = start + Duration::seconds(55);
    let accepted = store
        .place_bid(bid(second.id, alice, 300), &rules, late)
        .await
        .unwrap();
    assert_eq!(
        accepted.ends_at.timestamp_millis(),
        (late + Duration::seconds(10)).timestamp_millis()
    );

    let view = store.get_lot(second.id).await.unwrap();
    assert_eq!(view.stats.bid_count, 2);
    assert_eq!(view.stats.highest_bid, Some(300));
    assert_eq!(view.stats.leading_bidder, Some(format!("pg-user-{alice}")));

    // settlement
    let outcome = store.end_lot(second.id, &rules).await.unwrap();
    assert_eq!(outcome.winner.unwrap().user_id, alice);
    assert_eq!(store.get_user(alice).await.unwrap().total_points, 700);
    assert_eq!(store.get_user(bob).await.unwrap().total_points, 250);
    assert!(store.start_lot(second.id, &rules, Utc::now()).await.is_err());

    // a pre-empted lot resumes above its earlier bids
    let third = store.create_lot(new_lot("pg lot C")).await.unwrap();
    let now = Utc::now();
    store.start_lot(first.id, &rules, now).await.unwrap();
    store
        .place_bid(bid(first.id, alice, 400), &rules, now)
        .await
        .unwrap();
    store.start_lot(third.id, &rules, now).await.unwrap();
    store.end_lot(third.id, &rules).await.unwrap();
    let resumed = store.start_lot(first.id, &rules, Utc::now()).await.unwrap();
    assert_eq!(resumed.current_price, 400);
    assert!(matches!(
        store.place_bid(bid(first.id, bob, 210), &rules, Utc::now()).await,
        Err(AuctionError::BelowMinimum { minimum: 410 })
    ));
    store.end_lot(first.id, &rules).await.unwrap();
    assert_eq!(store.get_user(alice).await.unwrap().total_points, 300);

    // cleanup
    store.delete_lot(third.id).await.unwrap();
    store.delete_lot(second.id).await.unwrap();
    store.delete_lot(first.id).await.unwrap();
}
