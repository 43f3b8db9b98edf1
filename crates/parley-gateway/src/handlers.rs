// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the relay API.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use parley_core::wire::{
    ChatRequest, ChatResponse, ConfigResponse, HealthResponse, ModelListResponse, OpenAiModel,
    OpenAiModelList,
};
use parley_core::{GenerationSettings, ParleyError, SettingsOverrides};
use serde::Deserialize;

use crate::error::ApiError;
use crate::server::RelayState;
use crate::stream::ndjson_response;

/// Query parameters for GET /api/models.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsQuery {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// GET /api/health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /api/config
///
/// Reports the default upstream URL and whether a default key is set,
/// never the key itself.
pub async fn get_config(State(state): State<RelayState>) -> Json<ConfigResponse> {
    let configured = state
        .defaults
        .api_key
        .as_deref()
        .is_some_and(|k| !k.is_empty());
    Json(ConfigResponse {
        api_url: state.defaults.api_url.clone(),
        api_key: if configured { "configured" } else { "" }.to_string(),
    })
}

/// GET /api/models?apiUrl=…&apiKey=…
pub async fn get_models(
    State(state): State<RelayState>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<ModelListResponse>, ApiError> {
    let settings = state.defaults.resolve(&SettingsOverrides {
        api_url: query.api_url,
        api_key: query.api_key,
        ..Default::default()
    });
    let models = state.client_for(&settings)?.list_models().await?;
    tracing::debug!(count = models.len(), url = %settings.api_url, "listed models");
    Ok(Json(ModelListResponse { models }))
}

/// GET /v1/models
///
/// OpenAI-compatible listing against the default upstream.
pub async fn get_openai_models(
    State(state): State<RelayState>,
) -> Result<Json<OpenAiModelList>, ApiError> {
    let models = state.client_for(&state.defaults)?.list_models().await?;
    let created = chrono::Utc::now().timestamp();
    Ok(Json(OpenAiModelList {
        object: "list".to_string(),
        data: models
            .into_iter()
            .map(|m| OpenAiModel {
                id: m.name,
                object: "model".to_string(),
                created,
                owned_by: "local".to_string(),
            })
            .collect(),
    }))
}

/// GET /api/history
///
/// The relay keeps no conversation state; history lives with the client.
pub async fn get_history() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "history": [] }))
}

/// POST /api/chat
pub async fn post_chat(
    State(state): State<RelayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let (request, settings) = prepare(&state, body)?;
    let response = state
        .client_for(&settings)?
        .complete_chat(&request.history, &request.message, &settings)
        .await?;
    Ok(Json(ChatResponse { response }))
}

/// POST /api/chat/stream
///
/// Upstream failures before the first byte produce a JSON error; later
/// failures abort the body.
pub async fn post_chat_stream(
    State(state): State<RelayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let result = async {
        let (request, settings) = prepare(&state, body)?;
        let records = state
            .client_for(&settings)?
            .stream_chat(&request.history, &request.message, &settings)
            .await?;
        Ok::<_, ApiError>(records)
    }
    .await;

    match result {
        Ok(records) => ndjson_response(records),
        Err(e) => e.into_response(),
    }
}

/// Validates a chat body and merges its settings onto the relay defaults.
fn prepare(
    state: &RelayState,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(ChatRequest, GenerationSettings), ApiError> {
    let Json(request) = body.map_err(|rejection| ParleyError::BadRequest {
        message: rejection.body_text(),
    })?;

    if request.message.trim().is_empty() {
        return Err(ParleyError::BadRequest {
            message: "message must not be empty".to_string(),
        }
        .into());
    }

    let settings = state.defaults.resolve(&request.settings);
    tracing::debug!(
        model = %settings.model,
        history = request.history.len(),
        "chat request accepted"
    );
    Ok((request, settings))
}
