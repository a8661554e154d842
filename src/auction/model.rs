use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Lot model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lot {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub starting_price: i64,
    pub current_price: i64,
    pub image_url: Option<String>,
    pub order_num: i32,
    pub is_active: bool,
    pub is_completed: bool,
    pub auction_started_at: Option<DateTime<Utc>>,
    pub auction_ends_at: Option<DateTime<Utc>>,
    pub winner_user_id: Option<i64>,
    pub winner_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Bid model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub lot_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub bid_amount: i64,
    pub team_id: Option<i64>,
    pub is_team_bid: bool,
    pub created_at: DateTime<Utc>,
}

/// Figures derived from the bid ledger at read time, never stored on the lot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BidStats {
    pub bid_count: i64,
    pub highest_bid: Option<i64>,
    pub leading_bidder: Option<String>,
}

/// A lot as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LotView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub lot: Lot,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub stats: BidStats,
}

// Participant model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub total_points: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for a new, inert lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLot {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub starting_price: i64,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Input for a bid after the command has been validated for shape.
#[derive(Debug, Clone)]
pub struct NewBid {
    pub lot_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub bid_amount: i64,
    pub team_id: Option<i64>,
}

/// Result of an accepted bid.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptedBid {
    pub bid: Bid,
    pub current_price: i64,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub user_id: i64,
    pub user_name: String,
    pub amount: i64,
}

/// Result of closing a lot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotOutcome {
    pub lot_id: i64,
    pub winner: Option<Winner>,
    pub final_price: i64,
}
