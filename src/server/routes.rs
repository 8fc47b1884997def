//! REST endpoints for sessions, the conversation and the wizards.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::conversation::{Outcome, SubFlowState};
use crate::error::{IntakeError, SessionError, WizardError};
use crate::profile::{ProfileForm, UserProfile};
use crate::render::{RenderedMessage, render_all};
use crate::session::{Session, WizardKind, WizardStatus};
use crate::wizard::{InsuranceDetails, MedicalDetails};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(end_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .route("/api/sessions/{id}/location", post(submit_location))
        .route("/api/sessions/{id}/abandon", post(abandon_subflow))
        .route("/api/sessions/{id}/clear", post(clear_history))
        .route("/api/sessions/{id}/services/{service_id}/book", post(book_service))
        .route("/api/sessions/{id}/policies/{policy_id}/apply", post(apply_policy))
        .route("/api/sessions/{id}/wizard", get(wizard_status).delete(cancel_wizard))
        .route("/api/sessions/{id}/wizard/medical", post(submit_medical))
        .route("/api/sessions/{id}/wizard/insurance", post(submit_insurance))
}

// ── Errors ──────────────────────────────────────────────────────────────

/// A failed request: status plus a `{ "error": ... }` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        let status = match err {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::EmptyLocation => StatusCode::BAD_REQUEST,
            SessionError::UnexpectedLocation(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<IntakeError> for ApiError {
    fn from(err: IntakeError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: err.to_string(),
        }
    }
}

impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        let status = match err {
            WizardError::MissingField(_) | WizardError::InvalidField { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WizardError::AlreadySubmitted { .. } | WizardError::NotOpen(_) => StatusCode::CONFLICT,
            WizardError::UnknownItem { .. } => StatusCode::NOT_FOUND,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

// ── Views ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub profile: UserProfile,
    pub subflow: SubFlowState,
    pub messages: Vec<RenderedMessage>,
}

#[derive(Debug, Serialize)]
pub struct MessageReply {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub subflow: SubFlowState,
    pub messages: Vec<RenderedMessage>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitLocation {
    pub location: String,
}

async fn rendered_log(session: &Session) -> Vec<RenderedMessage> {
    let engine = session.engine();
    let messages = engine.messages().await;
    let catalog = engine.catalog().await;
    render_all(&messages, &catalog)
}

async fn session_view(session: &Session) -> SessionView {
    SessionView {
        session_id: session.id,
        created_at: session.created_at,
        profile: session.profile().as_ref().clone(),
        subflow: session.engine().subflow_state().await,
        messages: rendered_log(session).await,
    }
}

async fn message_reply(session: &Session, outcome: Outcome) -> MessageReply {
    MessageReply {
        outcome,
        subflow: session.engine().subflow_state().await,
        messages: rendered_log(session).await,
    }
}

async fn lookup(state: &AppState, id: Uuid) -> Result<Arc<Session>, ApiError> {
    Ok(state.store.get(id).await?)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "arogya-assist",
        "sessions": state.store.len().await,
    }))
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn create_session(
    State(state): State<AppState>,
    Json(form): Json<ProfileForm>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let session = state.store.create(&form).await.inspect_err(|e| {
        warn!(error = %e, "Profile intake rejected");
    })?;
    Ok((StatusCode::CREATED, Json(session_view(&session).await)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = lookup(&state, id).await?;
    Ok(Json(session_view(&session).await))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Conversation ────────────────────────────────────────────────────────

async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessage>,
) -> Result<Json<MessageReply>, ApiError> {
    let session = lookup(&state, id).await?;
    let outcome = session.engine().handle_utterance(&body.content).await;
    info!(session_id = %id, outcome = ?outcome, "Message handled via API");
    Ok(Json(message_reply(&session, outcome).await))
}

async fn submit_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitLocation>,
) -> Result<Json<MessageReply>, ApiError> {
    let session = lookup(&state, id).await?;
    let outcome = session.engine().submit_location(&body.location).await?;
    Ok(Json(message_reply(&session, outcome).await))
}

async fn abandon_subflow(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = lookup(&state, id).await?;
    session.engine().abandon_subflow().await;
    Ok(Json(session_view(&session).await))
}

async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let session = lookup(&state, id).await?;
    session.engine().clear().await;
    Ok(Json(session_view(&session).await))
}

// ── Wizards ─────────────────────────────────────────────────────────────

async fn book_service(
    State(state): State<AppState>,
    Path((id, service_id)): Path<(Uuid, String)>,
) -> Result<(StatusCode, Json<WizardStatus>), ApiError> {
    let session = lookup(&state, id).await?;
    let status = session.open_medical(&service_id).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

async fn apply_policy(
    State(state): State<AppState>,
    Path((id, policy_id)): Path<(Uuid, String)>,
) -> Result<(StatusCode, Json<WizardStatus>), ApiError> {
    let session = lookup(&state, id).await?;
    let status = session.open_insurance(&policy_id).await?;
    Ok((StatusCode::CREATED, Json(status)))
}

async fn submit_medical(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<MedicalDetails>,
) -> Result<Json<WizardStatus>, ApiError> {
    let session = lookup(&state, id).await?;
    Ok(Json(session.submit_medical(details).await?))
}

async fn submit_insurance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<InsuranceDetails>,
) -> Result<Json<WizardStatus>, ApiError> {
    let session = lookup(&state, id).await?;
    Ok(Json(session.submit_insurance(details).await?))
}

async fn wizard_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WizardStatus>, ApiError> {
    let session = lookup(&state, id).await?;
    session
        .wizard_status()
        .await
        .map(Json)
        .ok_or_else(|| WizardError::NotOpen("booking").into())
}

#[derive(Debug, Serialize)]
struct Cancelled {
    cancelled: WizardKind,
}

async fn cancel_wizard(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = lookup(&state, id).await?;
    let kind = session.cancel_wizard().await?;
    info!(session_id = %id, wizard = %kind, "Wizard dismissed via API");
    Ok(Json(Cancelled { cancelled: kind }))
}
