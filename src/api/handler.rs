use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::models::*;
use crate::{
    error::{AppError, AppResult},
    ledger::{
        models::{FeedMessage, Profile, Release},
        RecordStore,
    },
    reconcile::PendingTxDaemon,
};

const DEFAULT_FEED_LIMIT: i64 = 20;
const MAX_FEED_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub daemon: Arc<PendingTxDaemon>,
}

/// Trimmed value of a required text field
fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

/// GET /health - Health check
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let pending_releases = state.store.count_pending_releases().await?;
    let pending_profiles = state.store.count_pending_profiles().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        pending_releases,
        pending_profiles,
    }))
}

/// POST /releases - Record a submitted release transaction
pub async fn submit_release(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubmitReleaseRequest>,
) -> AppResult<(StatusCode, Json<Release>)> {
    let tx = required("tx", &request.tx)?;
    let title = required("title", &request.title)?;
    let artist_address = required("artist_address", &request.artist_address)?;

    let release = Release::new_pending(title, artist_address, tx);
    state.store.insert_release(&release).await?;

    info!(release_id = %release.id, tx = ?release.tx, "Release submitted, awaiting confirmation");
    Ok((StatusCode::CREATED, Json(release)))
}

/// GET /releases/:id
pub async fn get_release(
    State(state): State<AppState>,
    ApiPath(release_id): ApiPath<Uuid>,
) -> AppResult<Json<Release>> {
    let release = state
        .store
        .get_release(release_id)
        .await?
        .ok_or_else(|| AppError::release_not_found(release_id))?;

    Ok(Json(release))
}

/// POST /profiles - Record a new profile awaiting its publication transaction
pub async fn submit_profile(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SubmitProfileRequest>,
) -> AppResult<(StatusCode, Json<Profile>)> {
    let tx = required("tx", &request.tx)?;
    let display_name = required("display_name", &request.display_name)?;

    if let Some(inviter_id) = request.invited_by {
        if state.store.get_profile(inviter_id).await?.is_none() {
            return Err(AppError::InvalidInput(format!("Unknown inviter {}", inviter_id)));
        }
    }

    let profile = Profile::new_pending(display_name, request.invited_by, tx);
    state.store.insert_profile(&profile).await?;

    info!(profile_id = %profile.id, "Profile submitted, awaiting confirmation");
    Ok((StatusCode::CREATED, Json(profile)))
}

/// POST /profiles/:id/update - Record a submitted profile update transaction
pub async fn submit_profile_update(
    State(state): State<AppState>,
    ApiPath(profile_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ProfileUpdateRequest>,
) -> AppResult<Json<Profile>> {
    let tx = required("tx", &request.tx)?;

    if state.store.get_profile(profile_id).await?.is_none() {
        return Err(AppError::profile_not_found(profile_id));
    }

    if !state.store.begin_profile_update(profile_id, &tx).await? {
        return Err(AppError::Conflict(format!(
            "Profile {} already has an update pending",
            profile_id
        )));
    }

    let profile = state
        .store
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::profile_not_found(profile_id))?;

    info!(%profile_id, %tx, "Profile update submitted, awaiting confirmation");
    Ok(Json(profile))
}

/// GET /profiles/:id
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(profile_id): ApiPath<Uuid>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .store
        .get_profile(profile_id)
        .await?
        .ok_or_else(|| AppError::profile_not_found(profile_id))?;

    Ok(Json(profile))
}

/// GET /pending - Everything still awaiting confirmation
pub async fn list_pending(State(state): State<AppState>) -> AppResult<Json<PendingResponse>> {
    Ok(Json(PendingResponse {
        releases: state.store.pending_releases().await?,
        profiles: state.store.pending_profiles().await?,
    }))
}

/// POST /reconcile - Run one release and one profile cycle now
pub async fn trigger_reconcile(
    State(state): State<AppState>,
) -> AppResult<Json<ReconcileResponse>> {
    info!("Manual reconciliation requested");
    let (releases, profiles) = state.daemon.run_once().await?;
    Ok(Json(ReconcileResponse { releases, profiles }))
}

/// GET /feed?limit=n - Recent feed messages, newest first
pub async fn get_feed(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FeedQuery>,
) -> AppResult<Json<Vec<FeedMessage>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_FEED_LIMIT)
        .clamp(1, MAX_FEED_LIMIT);

    Ok(Json(state.store.recent_feed_messages(limit).await?))
}
