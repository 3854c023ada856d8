// Administrative HTTP routes: inspect sessions and add/remove entities while they run.

use crate::domain::state::EntityListing;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    EnemyDto, EnemyKindDto, ItemDto, ItemKindDto, ModeDto,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionError, SessionHandle, SessionId, SessionSummary};

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, serde::Deserialize)]
pub struct SpawnEnemyRequest {
    kind: EnemyKindDto,
    track: usize,
    height: f32,
}

#[derive(Debug, serde::Deserialize)]
pub struct SpawnItemRequest {
    kind: ItemKindDto,
    track: usize,
    height: f32,
    // Overrides the kind's default value.
    #[serde(default)]
    points: Option<u32>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ItemPositionQuery {
    #[serde(default)]
    track: Option<usize>,
    #[serde(default)]
    height: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
pub struct ModeRequest {
    mode: ModeDto,
}

#[derive(Debug, serde::Serialize)]
struct CreatedResponse {
    id: u64,
}

#[derive(Debug, serde::Serialize)]
struct ModeResponse {
    mode: ModeDto,
}

#[derive(Debug, serde::Serialize)]
struct SessionSummaryDto {
    session_id: u64,
    name: String,
    level: u32,
    score: u32,
    lives: u32,
    spectators: usize,
}

impl From<SessionSummary> for SessionSummaryDto {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            name: summary.name.to_string(),
            level: summary.level,
            score: summary.score,
            lives: summary.lives,
            spectators: summary.spectators,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct EntityListingDto {
    enemies: Vec<EnemyDto>,
    items: Vec<ItemDto>,
}

impl From<EntityListing> for EntityListingDto {
    fn from(listing: EntityListing) -> Self {
        Self {
            enemies: listing.enemies.iter().map(EnemyDto::from).collect(),
            items: listing.items.iter().map(ItemDto::from).collect(),
        }
    }
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn session_error_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::CapacityExceeded { .. } => StatusCode::CONFLICT,
        SessionError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Rejected(admin) if admin.is_not_found() => StatusCode::NOT_FOUND,
        SessionError::Rejected(_) => StatusCode::BAD_REQUEST,
    };
    if status == StatusCode::BAD_REQUEST {
        warn!(error = %err, "admin request rejected");
    }
    error_response(status, err.to_string())
}

async fn find_session(state: &AppState, session_id: SessionId) -> Result<SessionHandle, Response> {
    state
        .registry
        .get_session(session_id)
        .await
        .ok_or_else(|| session_error_response(SessionError::NotFound))
}

pub async fn list_sessions_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sessions: Vec<SessionSummaryDto> = state
        .registry
        .list_sessions()
        .await
        .into_iter()
        .map(SessionSummaryDto::from)
        .collect();
    Json(sessions)
}

pub async fn list_entities_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.listing().await {
        Ok(listing) => Json(EntityListingDto::from(listing)).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub async fn spawn_enemy_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(payload): Json<SpawnEnemyRequest>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session
        .spawn_enemy(payload.kind.into(), payload.track, payload.height)
        .await
    {
        Ok(id) => {
            info!(session_id, enemy_id = id, "admin spawned enemy");
            (StatusCode::CREATED, Json(CreatedResponse { id })).into_response()
        }
        Err(err) => session_error_response(err),
    }
}

pub async fn despawn_enemy_handler(
    State(state): State<Arc<AppState>>,
    Path((session_id, enemy_id)): Path<(SessionId, u64)>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.despawn_enemy(enemy_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => session_error_response(err),
    }
}

pub async fn spawn_item_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(payload): Json<SpawnItemRequest>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session
        .spawn_item(
            payload.kind.into(),
            payload.track,
            payload.height,
            payload.points,
        )
        .await
    {
        Ok(id) => {
            info!(session_id, item_id = id, "admin spawned item");
            (StatusCode::CREATED, Json(CreatedResponse { id })).into_response()
        }
        Err(err) => session_error_response(err),
    }
}

pub async fn despawn_item_handler(
    State(state): State<Arc<AppState>>,
    Path((session_id, item_id)): Path<(SessionId, u64)>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.despawn_item(item_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => session_error_response(err),
    }
}

/// `DELETE /sessions/{id}/items?track=&height=`
pub async fn despawn_item_at_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Query(query): Query<ItemPositionQuery>,
) -> Response {
    let (Some(track), Some(height)) = (query.track, query.height) else {
        return error_response(StatusCode::BAD_REQUEST, "track and height are required");
    };

    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.despawn_item_at(track, height).await {
        Ok(id) => Json(CreatedResponse { id }).into_response(),
        Err(err) => session_error_response(err),
    }
}

pub async fn set_mode_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(payload): Json<ModeRequest>,
) -> Response {
    let session = match find_session(&state, session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.set_mode(payload.mode.into()).await {
        Ok(()) => Json(ModeResponse {
            mode: payload.mode,
        })
        .into_response(),
        Err(err) => session_error_response(err),
    }
}
