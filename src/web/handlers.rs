//! HTTP handlers
//!
//! Thin delegation only; anything interesting happens in the services.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::database::{ChannelRepository, GroupRepository, TeamRepository, TemplateRepository};
use crate::lifecycle::engine::{CreateTiming, LifecycleEngine};
use crate::models::TeamChannelCreateRequest;

use super::AppState;

fn internal_error(err: impl std::fmt::Display) -> Response {
    error!("Request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
        .into_response()
}

pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "scheduler_last_run": state.scheduler.last_run().await,
    }))
    .into_response()
}

pub async fn xmltv(State(state): State<Arc<AppState>>) -> Response {
    let cached = state.last_xmltv.read().await;
    match cached.as_ref() {
        Some(document) => (
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            document.clone(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "no EPG generated yet"})),
        )
            .into_response(),
    }
}

/// Run a full generation and cache the rendered XMLTV
pub async fn generate_epg(State(state): State<Arc<AppState>>) -> Response {
    match state.run_generation().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn provider_status(State(state): State<Arc<AppState>>) -> Response {
    let stats: Vec<serde_json::Value> = state
        .registry
        .get_all()
        .iter()
        .map(|provider| {
            json!({
                "provider": provider.name(),
                "rate_limit": provider.rate_limit_stats(),
            })
        })
        .collect();
    Json(json!({
        "providers": stats,
        "registered": state.registry.info(),
    }))
    .into_response()
}

pub async fn list_teams(State(state): State<Arc<AppState>>) -> Response {
    let repo = TeamRepository::new(state.database.pool().clone());
    match repo.list_all().await {
        Ok(teams) => Json(teams).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TeamChannelCreateRequest>,
) -> Response {
    if request.team_id.trim().is_empty() || request.channel_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "team_id and channel_id are required"})),
        )
            .into_response();
    }
    let repo = TeamRepository::new(state.database.pool().clone());
    match repo.create(request).await {
        Ok(team) => (StatusCode::CREATED, Json(team)).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn list_groups(State(state): State<Arc<AppState>>) -> Response {
    let repo = GroupRepository::new(state.database.pool().clone());
    match repo.list_active().await {
        Ok(groups) => Json(groups).into_response(),
        Err(err) => internal_error(err),
    }
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(group): Json<crate::models::EventGroup>,
) -> Response {
    if group.name.trim().is_empty() || group.include_leagues.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "name and include_leagues are required"})),
        )
            .into_response();
    }
    let repo = GroupRepository::new(state.database.pool().clone());
    match repo.create(&group).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(err) => internal_error(err),
    }
}

/// Match a group's stream pool and apply channel lifecycle decisions
pub async fn refresh_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<i64>,
) -> Response {
    let Some(middleware) = state.middleware.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "no downstream middleware configured"})),
        )
            .into_response();
    };

    let group_repo = GroupRepository::new(state.database.pool().clone());
    let group = match group_repo.get(group_id).await {
        Ok(Some(group)) => group,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("group {group_id} not found")})),
            )
                .into_response()
        }
        Err(err) => return internal_error(err),
    };

    let matcher = match state.matcher_for_group(&group).await {
        Ok(matcher) => matcher,
        Err(err) => return internal_error(err),
    };
    let keywords = match group_repo
        .list_exception_keywords(&group.exception_keyword_ids)
        .await
    {
        Ok(keywords) => keywords,
        Err(err) => return internal_error(err),
    };

    let streams = match middleware.list_streams(None).await {
        Ok(streams) => streams,
        Err(err) => return internal_error(err),
    };

    let store = Arc::new(ChannelRepository::new(state.database.pool().clone()));
    let create_timing = group
        .create_lead_hours
        .or(state.config.lifecycle.create_lead_hours)
        .map(CreateTiming::HoursBefore)
        .unwrap_or(CreateTiming::Immediate);

    // Duration policy: the group template's override beats the per-sport
    // table, which beats the global default
    let template_repo = TemplateRepository::new(state.database.pool().clone());
    let duration_override = match template_repo.for_channel(group.template_id).await {
        Ok(template) => template.duration_hours,
        Err(err) => return internal_error(err),
    };

    let engine = LifecycleEngine::new(
        store,
        middleware,
        Arc::new(matcher),
        "espn".to_string(),
        keywords,
        create_timing,
        group
            .delete_grace_minutes
            .unwrap_or(state.config.lifecycle.delete_grace_minutes),
        state.config.epg.sport_durations.clone(),
        state.config.epg.default_game_duration_hours,
        duration_override,
    );

    let summary = engine.refresh_group(&group, streams, Utc::now()).await;
    Json(json!({
        "total_streams": summary.total_streams,
        "game_streams": summary.game_streams,
        "matched": summary.matched,
        "matched_from_cache": summary.matched_from_cache,
        "channels_created": summary.channels_created,
        "channels_updated": summary.channels_updated,
        "channels_reactivated": summary.channels_reactivated,
        "skipped_not_due": summary.skipped_not_due,
        "errors": summary.errors,
    }))
    .into_response()
}

/// Manual scheduler tick
pub async fn run_lifecycle(State(state): State<Arc<AppState>>) -> Response {
    let report = state.scheduler.run_once().await;
    Json(report).into_response()
}
