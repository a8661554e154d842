/// Pure auction rules shared by every store implementation.
/// Stores call these inside their own transaction so validation always runs
/// against the freshest, locked lot row.
// region:    --- Imports
use super::model::{Bid, BidStats, Lot, Winner};
use crate::error::{AuctionError, Result};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

// endregion: --- Imports

// region:    --- Rules

pub const BID_INCREMENT: i64 = 10;
pub const LOT_DURATION_SECS: i64 = 60;
pub const SOFT_CLOSE_SECS: i64 = 10;
/// Upper bound for prices and single balance adjustments.
pub const MAX_POINTS: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuctionRules {
    pub bid_increment: i64,
    pub lot_duration: Duration,
    pub soft_close_window: Duration,
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            bid_increment: BID_INCREMENT,
            lot_duration: Duration::seconds(LOT_DURATION_SECS),
            soft_close_window: Duration::seconds(SOFT_CLOSE_SECS),
        }
    }
}

impl AuctionRules {
    /// `max(current_price + increment, starting_price)`
    pub fn minimum_bid(&self, lot: &Lot) -> i64 {
        lot.current_price
            .saturating_add(self.bid_increment)
            .max(lot.starting_price)
    }

    /// Price a lot reopens at. Bids from an earlier session stay in the
    /// ledger, so the price never drops below the highest of them.
    pub fn resume_price(&self, starting_price: i64, highest_bid: Option<i64>) -> i64 {
        highest_bid.map_or(starting_price, |highest| highest.max(starting_price))
    }

    /// Checks 1 to 4 of bid placement, in order. Balance is checked separately
    /// once the bidder row is locked.
    pub fn check_bid(&self, lot: &Lot, bid_amount: i64, now: DateTime<Utc>) -> Result<()> {
        if !lot.is_active || lot.is_completed {
            return Err(AuctionError::InvalidState("auction not active"));
        }
        match lot.auction_ends_at {
            Some(ends_at) if now <= ends_at => {}
            _ => return Err(AuctionError::Expired),
        }
        let minimum = self.minimum_bid(lot);
        if bid_amount < minimum {
            return Err(AuctionError::BelowMinimum { minimum });
        }
        Ok(())
    }

    pub fn check_balance(&self, balance: i64, bid_amount: i64) -> Result<()> {
        if balance < bid_amount {
            return Err(AuctionError::InsufficientBalance {
                balance,
                required: bid_amount,
            });
        }
        Ok(())
    }

    /// Anti-snipe: a bid with less than the soft-close window left resets the
    /// deadline to exactly `now + window`. Not additive.
    pub fn extended_deadline(&self, ends_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        if ends_at - now < self.soft_close_window {
            now + self.soft_close_window
        } else {
            ends_at
        }
    }

    pub fn check_startable(&self, lot: &Lot) -> Result<()> {
        if lot.is_completed {
            return Err(AuctionError::InvalidState("lot already completed"));
        }
        if lot.is_active {
            return Err(AuctionError::InvalidState("lot already active"));
        }
        Ok(())
    }

    pub fn check_endable(&self, lot: &Lot) -> Result<()> {
        if lot.is_completed {
            return Err(AuctionError::InvalidState("lot already completed"));
        }
        Ok(())
    }
}

/// Rejects amounts outside `0..=MAX_POINTS` before they reach storage.
pub fn check_points(field: &str, amount: i64) -> Result<()> {
    if !(0..=MAX_POINTS).contains(&amount) {
        return Err(AuctionError::Validation(format!(
            "{field} must be between 0 and {MAX_POINTS}"
        )));
    }
    Ok(())
}

/// Whole seconds left, floored, never negative.
pub fn time_left(ends_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    ends_at
        .map(|ends_at| (ends_at - now).num_seconds().max(0))
        .unwrap_or(0)
}

/// Bid ordering used for the winner and for bid listings:
/// highest amount first, then earliest, then lowest id.
pub fn bid_order(a: &Bid, b: &Bid) -> Ordering {
    b.bid_amount
        .cmp(&a.bid_amount)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

pub fn rank_bids(bids: &mut [Bid]) {
    bids.sort_by(bid_order);
}

pub fn select_winner(bids: &[Bid]) -> Option<Winner> {
    bids.iter().min_by(|a, b| bid_order(a, b)).map(|bid| Winner {
        user_id: bid.user_id,
        user_name: bid.user_name.clone(),
        amount: bid.bid_amount,
    })
}

pub fn bid_stats(bids: &[Bid]) -> BidStats {
    let leader = select_winner(bids);
    BidStats {
        bid_count: bids.len() as i64,
        highest_bid: leader.as_ref().map(|w| w.amount),
        leading_bidder: leader.map(|w| w.user_name),
    }
}

// endregion: --- Rules

// endregion: --- Tests
