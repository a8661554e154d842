// region:    --- Imports
use super::queries;
use crate::auction::model::{Bid, LotView, User};
use crate::database::DatabaseManager;
use sqlx::Error as SqlxError;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// All lots with bid figures
pub async fn get_all_lots(db_manager: &DatabaseManager) -> Result<Vec<LotView>, SqlxError> {
    info!("{:<12} --> list lots", "Query");
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, LotView>(queries::LIST_LOTS)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

/// One lot
pub async fn get_lot(
    db_manager: &DatabaseManager,
    lot_id: i64,
) -> Result<Option<LotView>, SqlxError> {
    info!("{:<12} --> get lot id: {}", "Query", lot_id);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, LotView>(queries::GET_LOT)
                    .bind(lot_id)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

/// Lot currently open for bidding, polled by every client
pub async fn get_active_lot(db_manager: &DatabaseManager) -> Result<Option<LotView>, SqlxError> {
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, LotView>(queries::GET_ACTIVE_LOT)
                    .fetch_optional(&mut **tx)
                    .await
            })
        })
        .await
}

pub async fn lot_exists(db_manager: &DatabaseManager, lot_id: i64) -> Result<bool, SqlxError> {
    sqlx::query_scalar::<_, bool>(queries::LOT_EXISTS)
        .bind(lot_id)
        .fetch_one(db_manager.pool())
        .await
}

/// Ranked bid history of a lot
pub async fn get_lot_bids(
    db_manager: &DatabaseManager,
    lot_id: i64,
    limit: i64,
) -> Result<Vec<Bid>, SqlxError> {
    info!("{:<12} --> bid history id: {} limit: {}", "Query", lot_id, limit);
    db_manager
        .transaction(|tx| {
            Box::pin(async move {
                sqlx::query_as::<_, Bid>(queries::GET_LOT_BIDS)
                    .bind(lot_id)
                    .bind(limit)
                    .fetch_all(&mut **tx)
                    .await
            })
        })
        .await
}

pub async fn get_user(db_manager: &DatabaseManager, user_id: i64) -> Result<Option<User>, SqlxError> {
    info!("{:<12} --> get user id: {}", "Query", user_id);
    sqlx::query_as::<_, User>(queries::GET_USER)
        .bind(user_id)
        .fetch_optional(db_manager.pool())
        .await
}

/// Raw `game_config` rows
pub async fn get_game_config(
    db_manager: &DatabaseManager,
) -> Result<Vec<(String, String)>, SqlxError> {
    sqlx::query_as::<_, (String, String)>(queries::GET_GAME_CONFIG)
        .fetch_all(db_manager.pool())
        .await
}

// endregion: --- Query Handlers
