/// In-process store for local runs and tests.
/// A single mutex makes every operation one atomic step, matching the
/// transactional behaviour of the Postgres store.
// region:    --- Imports
use super::AuctionStore;
use crate::auction::model::{
    AcceptedBid, Bid, Lot, LotOutcome, LotView, NewBid, NewLot, User,
};
use crate::auction::rules::{self, AuctionRules};
use crate::error::{AuctionError, Result};
use crate::game::GameState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Memory Store

#[derive(Default)]
struct State {
    lots: BTreeMap<i64, Lot>,
    bids: Vec<Bid>,
    users: HashMap<i64, User>,
    game: GameState,
    next_lot_id: i64,
    next_bid_id: i64,
}

impl State {
    fn lot_bids(&self, lot_id: i64) -> Vec<Bid> {
        self.bids
            .iter()
            .filter(|bid| bid.lot_id == lot_id)
            .cloned()
            .collect()
    }

    fn view(&self, lot: &Lot) -> LotView {
        LotView {
            lot: lot.clone(),
            stats: rules::bid_stats(&self.lot_bids(lot.id)),
        }
    }

    fn lot_mut(&mut self, lot_id: i64) -> Result<&mut Lot> {
        self.lots
            .get_mut(&lot_id)
            .ok_or(AuctionError::NotFound("lot"))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuctionStore for MemoryStore {
    async fn list_lots(&self) -> Result<Vec<LotView>> {
        let state = self.state.lock().await;
        let mut lots: Vec<&Lot> = state.lots.values().collect();
        lots.sort_by_key(|lot| (lot.order_num, lot.id));
        Ok(lots.into_iter().map(|lot| state.view(lot)).collect())
    }

    async fn get_lot(&self, lot_id: i64) -> Result<LotView> {
        let state = self.state.lock().await;
        let lot = state
            .lots
            .get(&lot_id)
            .ok_or(AuctionError::NotFound("lot"))?;
        Ok(state.view(lot))
    }

    async fn active_lot(&self) -> Result<Option<LotView>> {
        let state = self.state.lock().await;
        Ok(state
            .lots
            .values()
            .find(|lot| lot.is_active)
            .map(|lot| state.view(lot)))
    }

    async fn create_lot(&self, new_lot: NewLot) -> Result<Lot> {
        let mut state = self.state.lock().await;
        state.next_lot_id += 1;
        let order_num = state.lots.values().map(|l| l.order_num).max().unwrap_or(0) + 1;
        let lot = Lot {
            id: state.next_lot_id,
            title: new_lot.title,
            description: new_lot.description,
            starting_price: new_lot.starting_price,
            current_price: new_lot.starting_price,
            image_url: new_lot.image_url,
            order_num,
            is_active: false,
            is_completed: false,
            auction_started_at: None,
            auction_ends_at: None,
            winner_user_id: None,
            winner_name: None,
            created_at: Utc::now(),
        };
        state.lots.insert(lot.id, lot.clone());
        Ok(lot)
    }

    async fn delete_lot(&self, lot_id: i64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.lot_mut(lot_id)?.is_active {
            return Err(AuctionError::InvalidState("cannot delete the active lot"));
        }
        state.lots.remove(&lot_id);
        state.bids.retain(|bid| bid.lot_id != lot_id);
        Ok(())
    }

    async fn start_lot(
        &self,
        lot_id: i64,
        rules: &AuctionRules,
        now: DateTime<Utc>,
    ) -> Result<Lot> {
        let mut state = self.state.lock().await;
        rules.check_startable(state.lot_mut(lot_id)?)?;

        for other in state.lots.values_mut().filter(|l| l.is_active) {
            warn!(
                "{:<12} --> deactivating lot {} before starting {}",
                "Store", other.id, lot_id
            );
            other.is_active = false;
        }

        let highest_bid = state.lot_bids(lot_id).iter().map(|b| b.bid_amount).max();
        let lot = state.lot_mut(lot_id)?;
        lot.is_active = true;
        lot.is_completed = false;
        lot.auction_started_at = Some(now);
        lot.auction_ends_at = Some(now + rules.lot_duration);
        lot.current_price = rules.resume_price(lot.starting_price, highest_bid);
        lot.winner_user_id = None;
        lot.winner_name = None;
        Ok(lot.clone())
    }

    async fn end_lot(&self, lot_id: i64, rules: &AuctionRules) -> Result<LotOutcome> {
        let mut state = self.state.lock().await;
        rules.check_endable(state.lot_mut(lot_id)?)?;

        let winner = rules::select_winner(&state.lot_bids(lot_id));
        if let Some(winner) = &winner {
            let user = state
                .users
                .get_mut(&winner.user_id)
                .ok_or(AuctionError::NotFound("user"))?;
            user.total_points = user
                .total_points
                .checked_sub(winner.amount)
                .ok_or_else(|| AuctionError::Validation("balance out of range".to_string()))?;
            if user.total_points < 0 {
                warn!(
                    "{:<12} --> winner {} settled into negative balance {}",
                    "Store", user.id, user.total_points
                );
            }
        }

        let lot = state.lot_mut(lot_id)?;
        lot.is_active = false;
        lot.is_completed = true;
        lot.winner_user_id = winner.as_ref().map(|w| w.user_id);
        lot.winner_name = winner.as_ref().map(|w| w.user_name.clone());
        if let Some(winner) = &winner {
            lot.current_price = winner.amount;
        }

        info!("{:<12} --> lot {} closed", "Store", lot_id);
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
        let mut state = self.state.lock().await;

        let lot = state
            .lots
            .get(&new_bid.lot_id)
            .ok_or(AuctionError::NotFound("lot"))?;
        rules.check_bid(lot, new_bid.bid_amount, now)?;
        let ends_at = lot.auction_ends_at.unwrap_or(now);

        let balance = state
            .users
            .get(&new_bid.user_id)
            .ok_or(AuctionError::NotFound("user"))?
            .total_points;
        rules.check_balance(balance, new_bid.bid_amount)?;

        state.next_bid_id += 1;
        let bid = Bid {
            id: state.next_bid_id,
            lot_id: new_bid.lot_id,
            user_id: new_bid.user_id,
            user_name: new_bid.user_name,
            bid_amount: new_bid.bid_amount,
            team_id: new_bid.team_id,
            is_team_bid: new_bid.team_id.is_some(),
            created_at: now,
        };
        state.bids.push(bid.clone());

        let ends_at = rules.extended_deadline(ends_at, now);
        let lot = state.lot_mut(new_bid.lot_id)?;
        lot.current_price = bid.bid_amount;
        lot.auction_ends_at = Some(ends_at);

        Ok(AcceptedBid {
            current_price: bid.bid_amount,
            ends_at,
            bid,
        })
    }

    async fn bids_for_lot(&self, lot_id: i64, limit: i64) -> Result<Vec<Bid>> {
        let state = self.state.lock().await;
        if !state.lots.contains_key(&lot_id) {
            return Err(AuctionError::NotFound("lot"));
        }
        let mut bids = state.lot_bids(lot_id);
        rules::rank_bids(&mut bids);
        bids.truncate(limit.max(0) as usize);
        Ok(bids)
    }

    async fn upsert_user(&self, user_id: i64, name: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state.users.entry(user_id).or_insert_with(|| User {
            id: user_id,
            name: name.to_string(),
            total_points: 0,
            created_at: Utc::now(),
        });
        user.name = name.to_string();
        Ok(user.clone())
    }

    async fn get_user(&self, user_id: i64) -> Result<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(&user_id)
            .cloned()
            .ok_or(AuctionError::NotFound("user"))
    }

    async fn adjust_points(&self, user_id: i64, delta: i64) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(AuctionError::NotFound("user"))?;
        user.total_points = user
            .total_points
            .checked_add(delta)
            .ok_or_else(|| AuctionError::Validation("balance out of range".to_string()))?;
        Ok(user.clone())
    }

    async fn game_state(&self) -> Result<GameState> {
        Ok(self.state.lock().await.game.clone())
    }

    async fn set_current_phase(&self, phase: &str) -> Result<GameState> {
        let mut state = self.state.lock().await;
        state.game.current_phase = phase.to_string();
        Ok(state.game.clone())
    }

    async fn set_phase_enabled(&self, phase: &str, enabled: bool) -> Result<GameState> {
        let mut state = self.state.lock().await;
        state.game.phases.insert(phase.to_string(), enabled);
        Ok(state.game.clone())
    }
}

// endregion: --- Memory Store

// endregion: --- Tests
