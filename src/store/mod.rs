// region:    --- Imports
use crate::auction::model::{AcceptedBid, Bid, Lot, LotOutcome, LotView, NewBid, NewLot, User};
use crate::auction::rules::AuctionRules;
use crate::error::Result;
use crate::game::GameState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

// endregion: --- Imports

// region:    --- Auction Store Trait

/// Persistent state of the game: lots, the bid ledger, participants and the
/// phase configuration.
///
/// Every write is a single atomic unit. Implementations lock the lot row
/// before the user row so concurrent bids and settlements serialize in the
/// same order.
#[async_trait]
pub trait AuctionStore: Send + Sync {
    // -- lots
    async fn list_lots(&self) -> Result<Vec<LotView>>;

    async fn get_lot(&self, lot_id: i64) -> Result<LotView>;

    async fn active_lot(&self) -> Result<Option<LotView>>;

    async fn create_lot(&self, lot: NewLot) -> Result<Lot>;

    async fn delete_lot(&self, lot_id: i64) -> Result<()>;

    /// Opens bidding on an inert lot and closes any other active lot.
    async fn start_lot(&self, lot_id: i64, rules: &AuctionRules, now: DateTime<Utc>)
        -> Result<Lot>;

    /// Closes a lot, settling the winning bid against the winner's balance.
    async fn end_lot(&self, lot_id: i64, rules: &AuctionRules) -> Result<LotOutcome>;

    // -- bids
    async fn place_bid(
        &self,
        bid: NewBid,
        rules: &AuctionRules,
        now: DateTime<Utc>,
    ) -> Result<AcceptedBid>;

    /// Ranked highest amount first, earliest first among equals.
    async fn bids_for_lot(&self, lot_id: i64, limit: i64) -> Result<Vec<Bid>>;

    // -- participants
    async fn upsert_user(&self, user_id: i64, name: &str) -> Result<User>;

    async fn get_user(&self, user_id: i64) -> Result<User>;

    async fn adjust_points(&self, user_id: i64, delta: i64) -> Result<User>;

    // -- game phase
    async fn game_state(&self) -> Result<GameState>;

    async fn set_current_phase(&self, phase: &str) -> Result<GameState>;

    async fn set_phase_enabled(&self, phase: &str, enabled: bool) -> Result<GameState>;
}

// endregion: --- Auction Store Trait
