// region:    --- Imports
use crate::app::AppState;
use crate::auction::commands::{self, BidReceipt, PlaceBidCommand, StartedLot};
use crate::auction::events::AuctionEvent;
use crate::auction::model::{Bid, LotView, NewLot, User};
use crate::auction::rules;
use crate::error::{AuctionError, Result};
use crate::game::{self, GameState, SetPhaseCommand, SetPhaseEnabledCommand};
use crate::notifier::{self, LiveStream};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

// endregion: --- Imports

// region:    --- Request / Response Types

pub const DEFAULT_BID_LIMIT: i64 = 20;
pub const MAX_BID_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLotResponse {
    pub lot: Option<LotView>,
    pub time_left: i64,
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BidsQuery {
    pub limit: Option<i64>,
}

impl BidsQuery {
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_BID_LIMIT)
            .clamp(1, MAX_BID_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserCommand {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustPointsCommand {
    pub delta: i64,
}

// endregion: --- Request / Response Types

// region:    --- Command Handlers

/// Place a bid
pub async fn handle_place_bid(
    State(state): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<Json<BidReceipt>> {
    let receipt =
        commands::handle_place_bid(state.store.as_ref(), &state.notifier, &state.rules, cmd)
            .await?;
    Ok(Json(receipt))
}

/// Add a lot (admin)
pub async fn handle_add_lot(
    State(state): State<AppState>,
    Json(new_lot): Json<NewLot>,
) -> Result<impl IntoResponse> {
    let lot = commands::handle_add_lot(state.store.as_ref(), &state.notifier, new_lot).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": lot.id, "lot": lot }))))
}

/// Start a lot (admin)
pub async fn handle_start_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
) -> Result<Json<StartedLot>> {
    let started =
        commands::handle_start_lot(state.store.as_ref(), &state.notifier, &state.rules, lot_id)
            .await?;
    Ok(Json(started))
}

/// End a lot (admin)
pub async fn handle_end_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let outcome =
        commands::handle_end_lot(state.store.as_ref(), &state.notifier, &state.rules, lot_id)
            .await?;
    let message = match &outcome.winner {
        Some(winner) => format!("{} wins for {} points", winner.user_name, winner.amount),
        None => "no bids, lot closed without a winner".to_string(),
    };
    Ok(Json(json!({
        "lot_id": outcome.lot_id,
        "winner": outcome.winner,
        "final_price": outcome.final_price,
        "message": message,
    })))
}

/// Delete an inactive lot and its bids (admin)
pub async fn handle_delete_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
) -> Result<StatusCode> {
    commands::handle_delete_lot(state.store.as_ref(), lot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Switch the current game phase (admin)
pub async fn handle_set_phase(
    State(state): State<AppState>,
    Json(cmd): Json<SetPhaseCommand>,
) -> Result<Json<GameState>> {
    let phase = game::validate_phase_name(&cmd.phase)?;
    info!("{:<12} --> current phase: {}", "Command", phase);
    let game_state = state.store.set_current_phase(phase).await?;
    state.notifier.publish(AuctionEvent::PhaseChanged {
        current_phase: game_state.current_phase.clone(),
    });
    Ok(Json(game_state))
}

/// Enable or disable one phase (admin)
pub async fn handle_set_phase_enabled(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(cmd): Json<SetPhaseEnabledCommand>,
) -> Result<Json<GameState>> {
    let phase = game::validate_phase_name(&name)?;
    info!("{:<12} --> phase {} enabled: {}", "Command", phase, cmd.enabled);
    let game_state = state.store.set_phase_enabled(phase, cmd.enabled).await?;
    state.notifier.publish(AuctionEvent::PhaseChanged {
        current_phase: game_state.current_phase.clone(),
    });
    Ok(Json(game_state))
}

/// Register or rename a participant
pub async fn handle_register_user(
    State(state): State<AppState>,
    Json(cmd): Json<RegisterUserCommand>,
) -> Result<Json<User>> {
    let name = cmd.name.trim();
    if name.is_empty() {
        return Err(AuctionError::Validation("name is required".to_string()));
    }
    info!("{:<12} --> register user id: {}", "Command", cmd.id);
    Ok(Json(state.store.upsert_user(cmd.id, name).await?))
}

/// Adjust a participant's points (admin)
pub async fn handle_adjust_points(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(cmd): Json<AdjustPointsCommand>,
) -> Result<Json<User>> {
    let user = commands::handle_adjust_points(state.store.as_ref(), user_id, cmd.delta).await?;
    Ok(Json(user))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

pub async fn handle_health() -> &'static str {
    "ok"
}

/// All lots
pub async fn handle_get_lots(State(state): State<AppState>) -> Result<Json<Vec<LotView>>> {
    info!("{:<12} --> list lots", "HandlerQuery");
    Ok(Json(state.store.list_lots().await?))
}

/// One lot
pub async fn handle_get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
) -> Result<Json<LotView>> {
    info!("{:<12} --> get lot id: {}", "HandlerQuery", lot_id);
    Ok(Json(state.store.get_lot(lot_id).await?))
}

/// Active lot, polled by the mini app every few seconds
pub async fn handle_get_active_lot(State(state): State<AppState>) -> Result<Json<ActiveLotResponse>> {
    let lot = state.store.active_lot().await?;
    let now = Utc::now();
    let time_left = rules::time_left(lot.as_ref().and_then(|view| view.lot.auction_ends_at), now);
    Ok(Json(ActiveLotResponse {
        lot,
        time_left,
        server_time: now,
    }))
}

/// Ranked bids of a lot
pub async fn handle_get_lot_bids(
    State(state): State<AppState>,
    Path(lot_id): Path<i64>,
    Query(query): Query<BidsQuery>,
) -> Result<Json<Vec<Bid>>> {
    info!("{:<12} --> bid history id: {}", "HandlerQuery", lot_id);
    Ok(Json(
        state
            .store
            .bids_for_lot(lot_id, query.effective_limit())
            .await?,
    ))
}

pub async fn handle_get_game_state(State(state): State<AppState>) -> Result<Json<GameState>> {
    Ok(Json(state.store.game_state().await?))
}

pub async fn handle_get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>> {
    info!("{:<12} --> get user id: {}", "HandlerQuery", user_id);
    Ok(Json(state.store.get_user(user_id).await?))
}

/// Server-sent events feed
pub async fn handle_live(State(state): State<AppState>) -> Sse<LiveStream> {
    Sse::new(notifier::live_stream(&state.notifier))
        .keep_alive(KeepAlive::new().interval(state.sse_keepalive))
}

// endregion: --- Query Handlers

// endregion: --- Tests
