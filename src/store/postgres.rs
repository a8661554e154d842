/// Postgres-backed store.
/// Writes run in one transaction each: the lot row is locked with
/// `FOR UPDATE`, then the bidder's row, so validation always sees the
/// freshest state and the price only ever moves through a compare-and-set.
// region:    --- Imports
use super::AuctionStore;
use crate::auction::model::{AcceptedBid, Bid, Lot, LotOutcome, LotView, NewBid, NewLot, User};
use crate::auction::rules::{self, AuctionRules};
use crate::database::DatabaseManager;
use crate::error::{AuctionError, Result};
use crate::game::{GameState, CURRENT_PHASE_KEY, PHASE_KEY_PREFIX};
use crate::query::{handlers, queries};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Postgres, Transaction};
use std::sync::Arc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Postgres Store

pub struct PostgresStore {
    db_manager: Arc<DatabaseManager>,
}

impl PostgresStore {
    pub fn new(db_manager: Arc<DatabaseManager>) -> Self {
        Self { db_manager }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.db_manager.pool().begin().await?)
    }
}

async fn lock_lot(conn: &mut PgConnection, lot_id: i64) -> Result<Lot> {
    sqlx::query_as::<_, Lot>(queries::LOCK_LOT)
        .bind(lot_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AuctionError::NotFound("lot"))
}

async fn set_config(conn: &mut PgConnection, key: &str, value: &str) -> Result<()> {
    sqlx::query(queries::SET_GAME_CONFIG)
        .bind(key)
        .bind(value)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl AuctionStore for PostgresStore {
    async fn list_lots(&self) -> Result<Vec<LotView>> {
        Ok(handlers::get_all_lots(&self.db_manager).await?)
    }

    async fn get_lot(&self, lot_id: i64) -> Result<LotView> {
        handlers::get_lot(&self.db_manager, lot_id)
            .await?
            .ok_or(AuctionError::NotFound("lot"))
    }

    async fn active_lot(&self) -> Result<Option<LotView>> {
        Ok(handlers::get_active_lot(&self.db_manager).await?)
    }

    async fn create_lot(&self, lot: NewLot) -> Result<Lot> {
        let lot = sqlx::query_as::<_, Lot>(queries::INSERT_LOT)
            .bind(&lot.title)
            .bind(&lot.description)
            .bind(lot.starting_price)
            .bind(&lot.image_url)
            .fetch_one(self.db_manager.pool())
            .await?;
        Ok(lot)
    }

    async fn delete_lot(&self, lot_id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        let lot = lock_lot(&mut tx, lot_id).await?;
        if lot.is_active {
            return Err(AuctionError::InvalidState("cannot delete the active lot"));
        }
        sqlx::query(queries::DELETE_LOT)
            .bind(lot_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn start_lot(
        &self,
        lot_id: i64,
        rules: &AuctionRules,
        now: DateTime<Utc>,
    ) -> Result<Lot> {
        let mut tx = self.begin().await?;
        let lot = lock_lot(&mut tx, lot_id).await?;
        rules.check_startable(&lot)?;

        let deactivated = sqlx::query(queries::DEACTIVATE_OTHER_LOTS)
            .bind(lot_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deactivated > 0 {
            warn!(
                "{:<12} --> deactivated {} lot(s) before starting {}",
                "Store", deactivated, lot_id
            );
        }

        let lot = sqlx::query_as::<_, Lot>(queries::START_LOT)
            .bind(lot_id)
            .bind(now)
            .bind(now + rules.lot_duration)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(lot)
    }

    async fn end_lot(&self, lot_id: i64, rules: &AuctionRules) -> Result<LotOutcome> {
        let mut tx = self.begin().await?;
        let lot = lock_lot(&mut tx, lot_id).await?;
        rules.check_endable(&lot)?;

        let bids = sqlx::query_as::<_, Bid>(queries::GET_ALL_LOT_BIDS)
            .bind(lot_id)
            .fetch_all(&mut *tx)
            .await?;
        let winner = rules::select_winner(&bids);

        if let Some(winner) = &winner {
            let user = sqlx::query_as::<_, User>(queries::ADJUST_POINTS)
                .bind(winner.user_id)
                .bind(-winner.amount)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AuctionError::NotFound("user"))?;
            if user.total_points < 0 {
                warn!(
                    "{:<12} --> winner {} settled into negative balance {}",
                    "Store", user.id, user.total_points
                );
            }
        }

        sqlx::query(queries::COMPLETE_LOT)
            .bind(lot_id)
            .bind(winner.as_ref().map(|w| w.user_id))
            .bind(winner.as_ref().map(|w| w.user_name.clone()))
            .bind(winner.as_ref().map(|w| w.amount))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            "{:<12} --> lot {} closed after {} bid(s)",
            "Store",
            lot_id,
            bids.len()
        );
        Ok(LotOutcome {
            lot_id,
            final_price: winner.as_ref().map(|w| w.amount).unwrap_or(0),
            winner,
        })
    }

    async fn place_bid(
        &self,
        new_bid: NewBid,
        rules: &AuctionRules,
        now: DateTime<Utc>,
    ) -> Result<AcceptedBid> {
        let mut tx = self.begin().await?;

        let lot = lock_lot(&mut tx, new_bid.lot_id).await?;
        rules.check_bid(&lot, new_bid.bid_amount, now)?;

        let balance = sqlx::query_scalar::<_, i64>(queries::LOCK_USER_BALANCE)
            .bind(new_bid.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AuctionError::NotFound("user"))?;
        rules.check_balance(balance, new_bid.bid_amount)?;

        let bid = sqlx::query_as::<_, Bid>(queries::INSERT_BID)
            .bind(new_bid.lot_id)
            .bind(new_bid.user_id)
            .bind(&new_bid.user_name)
            .bind(new_bid.bid_amount)
            .bind(new_bid.team_id)
            .bind(new_bid.team_id.is_some())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        let ends_at = rules.extended_deadline(lot.auction_ends_at.unwrap_or(now), now);
        let raised = sqlx::query(queries::RAISE_PRICE)
            .bind(new_bid.lot_id)
            .bind(bid.bid_amount)
            .bind(ends_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if raised == 0 {
            // dropping the transaction rolls the ledger insert back
            return Err(AuctionError::Superseded);
        }

        tx.commit().await?;
        Ok(AcceptedBid {
            current_price: bid.bid_amount,
            ends_at,
            bid,
        })
    }

    async fn bids_for_lot(&self, lot_id: i64, limit: i64) -> Result<Vec<Bid>> {
        if !handlers::lot_exists(&self.db_manager, lot_id).await? {
            return Err(AuctionError::NotFound("lot"));
        }
        Ok(handlers::get_lot_bids(&self.db_manager, lot_id, limit).await?)
    }

    async fn upsert_user(&self, user_id: i64, name: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(queries::UPSERT_USER)
            .bind(user_id)
            .bind(name)
            .fetch_one(self.db_manager.pool())
            .await?;
        Ok(user)
    }

    async fn get_user(&self, user_id: i64) -> Result<User> {
        handlers::get_user(&self.db_manager, user_id)
            .await?
            .ok_or(AuctionError::NotFound("user"))
    }

    async fn adjust_points(&self, user_id: i64, delta: i64) -> Result<User> {
        sqlx::query_as::<_, User>(queries::ADJUST_POINTS)
            .bind(user_id)
            .bind(delta)
            .fetch_optional(self.db_manager.pool())
            .await?
            .ok_or(AuctionError::NotFound("user"))
    }

    async fn game_state(&self) -> Result<GameState> {
        let entries = handlers::get_game_config(&self.db_manager).await?;
        Ok(GameState::from_entries(entries))
    }

    async fn set_current_phase(&self, phase: &str) -> Result<GameState> {
        let mut conn = self.db_manager.pool().acquire().await?;
        set_config(&mut conn, CURRENT_PHASE_KEY, phase).await?;
        drop(conn);
        self.game_state().await
    }

    async fn set_phase_enabled(&self, phase: &str, enabled: bool) -> Result<GameState> {
        let mut conn = self.db_manager.pool().acquire().await?;
        let key = format!("{PHASE_KEY_PREFIX}{phase}");
        set_config(&mut conn, &key, if enabled { "true" } else { "false" }).await?;
        drop(conn);
        self.game_state().await
    }
}

// endregion: --- Postgres Store
