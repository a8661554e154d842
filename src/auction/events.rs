use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    // lot opened for bidding
    LotStarted {
        lot_id: i64,
        ends_at: DateTime<Utc>,
    },
    // accepted bid
    BidPlaced {
        lot_id: i64,
        user_id: i64,
        user_name: String,
        bid_amount: i64,
        ends_at: DateTime<Utc>,
    },
    // lot closed, with or without a winner
    LotEnded {
        lot_id: i64,
        winner_user_id: Option<i64>,
        winner_name: Option<String>,
        final_price: i64,
    },
    LotCreated {
        lot_id: i64,
    },
    PhaseChanged {
        current_phase: String,
    },
}

impl AuctionEvent {
    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            AuctionEvent::LotStarted { .. } => "lot_started",
            AuctionEvent::BidPlaced { .. } => "bid_placed",
            AuctionEvent::LotEnded { .. } => "lot_ended",
            AuctionEvent::LotCreated { .. } => "lot_created",
            AuctionEvent::PhaseChanged { .. } => "phase_changed",
        }
    }
}
