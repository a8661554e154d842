/// Lot columns, in `Lot` field order.
macro_rules! lot_columns {
    () => {
        "id, title, description, starting_price, current_price, image_url, order_num, is_active, is_completed, auction_started_at, auction_ends_at, winner_user_id, winner_name, created_at"
    };
}

/// Lot rows decorated with bid figures derived from the ledger at read time.
macro_rules! lot_view_query {
    ($tail:literal) => {
        concat!(
            r#"
    SELECT l.id, l.title, l.description, l.starting_price, l.current_price, l.image_url,
           l.order_num, l.is_active, l.is_completed, l.auction_started_at, l.auction_ends_at,
           l.winner_user_id, l.winner_name, l.created_at,
           COALESCE(s.bid_count, 0) AS bid_count,
           s.highest_bid,
           lb.user_name AS leading_bidder
    FROM lots l
    LEFT JOIN (
        SELECT lot_id, COUNT(*) AS bid_count, MAX(bid_amount) AS highest_bid
        FROM bids
        GROUP BY lot_id
    ) s ON s.lot_id = l.id
    LEFT JOIN LATERAL (
        SELECT b.user_name
        FROM bids b
        WHERE b.lot_id = l.id
        ORDER BY b.bid_amount DESC, b.created_at ASC, b.id ASC
        LIMIT 1
    ) lb ON TRUE
"#,
            $tail
        )
    };
}

macro_rules! bid_columns {
    () => {
        "id, lot_id, user_id, user_name, bid_amount, team_id, is_team_bid, created_at"
    };
}

macro_rules! user_columns {
    () => {
        "id, name, total_points, created_at"
    };
}

// -- lot reads

/// All lots in display order
pub const LIST_LOTS: &str = lot_view_query!("    ORDER BY l.order_num, l.id");

/// One lot
pub const GET_LOT: &str = lot_view_query!("    WHERE l.id = $1");

/// Lot currently open for bidding
pub const GET_ACTIVE_LOT: &str = lot_view_query!("    WHERE l.is_active LIMIT 1");

pub const LOT_EXISTS: &str = "SELECT EXISTS (SELECT 1 FROM lots WHERE id = $1)";

// -- lot writes

/// Row lock taken first by every write touching a lot
pub const LOCK_LOT: &str = concat!("SELECT ", lot_columns!(), " FROM lots WHERE id = $1 FOR UPDATE");

pub const INSERT_LOT: &str = concat!(
    "INSERT INTO lots (title, description, starting_price, current_price, image_url, order_num)
     VALUES ($1, $2, $3, $3, $4, (SELECT COALESCE(MAX(order_num), 0) + 1 FROM lots))
     RETURNING ",
    lot_columns!()
);

pub const DELETE_LOT: &str = "DELETE FROM lots WHERE id = $1";

pub const DEACTIVATE_OTHER_LOTS: &str =
    "UPDATE lots SET is_active = FALSE WHERE is_active AND id <> $1";

pub const START_LOT: &str = concat!(
    "UPDATE lots
     SET is_active = TRUE, is_completed = FALSE,
         auction_started_at = $2, auction_ends_at = $3,
         current_price = GREATEST(
             starting_price,
             COALESCE((SELECT MAX(bid_amount) FROM bids WHERE lot_id = $1), 0)
         ),
         winner_user_id = NULL, winner_name = NULL
     WHERE id = $1
     RETURNING ",
    lot_columns!()
);

/// Compare-and-set: only ever raises the price
pub const RAISE_PRICE: &str =
    "UPDATE lots SET current_price = $2, auction_ends_at = $3 WHERE id = $1 AND current_price < $2";

pub const COMPLETE_LOT: &str = "UPDATE lots
     SET is_active = FALSE, is_completed = TRUE,
         winner_user_id = $2, winner_name = $3,
         current_price = COALESCE($4, current_price)
     WHERE id = $1";

// -- bids

pub const INSERT_BID: &str = concat!(
    "INSERT INTO bids (lot_id, user_id, user_name, bid_amount, team_id, is_team_bid, created_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7)
     RETURNING ",
    bid_columns!()
);

/// Ranked bids for a lot
pub const GET_LOT_BIDS: &str = concat!(
    "SELECT ",
    bid_columns!(),
    " FROM bids WHERE lot_id = $1 ORDER BY bid_amount DESC, created_at ASC, id ASC LIMIT $2"
);

pub const GET_ALL_LOT_BIDS: &str = concat!("SELECT ", bid_columns!(), " FROM bids WHERE lot_id = $1");

// -- users

pub const GET_USER: &str = concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1");

pub const LOCK_USER_BALANCE: &str = "SELECT total_points FROM users WHERE id = $1 FOR UPDATE";

pub const UPSERT_USER: &str = concat!(
    "INSERT INTO users (id, name) VALUES ($1, $2)
     ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
     RETURNING ",
    user_columns!()
);

pub const ADJUST_POINTS: &str = concat!(
    "UPDATE users SET total_points = total_points + $2 WHERE id = $1 RETURNING ",
    user_columns!()
);

// -- game config

pub const GET_GAME_CONFIG: &str = "SELECT key, value FROM game_config";

pub const SET_GAME_CONFIG: &str = "INSERT INTO game_config (key, value) VALUES ($1, $2)
     ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value";
