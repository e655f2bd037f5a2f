//! Request handlers for the thin operational API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use driftmail_core::{ScheduleRequest, SchedulerError};
use driftmail_storage::Campaign;
use serde::Serialize;
use tracing::{error, warn};
use uuid::Uuid;

use crate::routes::ApiState;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl SchedulerError {
    fn status_code(&self) -> StatusCode {
        match self {
            SchedulerError::NameNotSpecified
            | SchedulerError::GroupNotSpecified
            | SchedulerError::InvalidSendByDate
            | SchedulerError::NoWorkingDays => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::ScenarioNotFound(_)
            | SchedulerError::GroupNotFound(_)
            | SchedulerError::SmtpNotFound(_)
            | SchedulerError::TemplateNotFound
            | SchedulerError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
            SchedulerError::InvalidFromAddress(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SchedulerError::NameNotSpecified => "NAME_NOT_SPECIFIED",
            SchedulerError::GroupNotSpecified => "GROUP_NOT_SPECIFIED",
            SchedulerError::ScenarioNotFound(_) => "SCENARIO_NOT_FOUND",
            SchedulerError::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            SchedulerError::GroupNotFound(_) => "GROUP_NOT_FOUND",
            SchedulerError::SmtpNotFound(_) => "SMTP_NOT_FOUND",
            SchedulerError::InvalidFromAddress(_) => "INVALID_FROM_ADDRESS",
            SchedulerError::InvalidSendByDate => "INVALID_SEND_BY_DATE",
            SchedulerError::NoWorkingDays => "NO_WORKING_DAYS",
            SchedulerError::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            SchedulerError::Database(_) => "DATABASE_ERROR",
        }
    }
}

fn scheduler_error_response(err: SchedulerError) -> (StatusCode, Json<ErrorBody>) {
    if matches!(err, SchedulerError::Database(_)) {
        error!(error = %err, "scheduler error");
    } else {
        warn!(error = %err, "schedule request rejected");
    }
    let status = err.status_code();
    let code = err.code();
    (status, Json(ErrorBody { code, message: err.to_string() }))
}

/// `GET /health`.
pub async fn health(State(state): State<ApiState>) -> StatusCode {
    match state.db.health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!(error = %e, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// `POST /campaigns/schedule`.
pub async fn schedule(
    State(state): State<ApiState>,
    Json(req): Json<ScheduleRequest>,
) -> Result<(StatusCode, Json<Campaign>), (StatusCode, Json<ErrorBody>)> {
    let campaign = state.scheduler.schedule(req).await.map_err(scheduler_error_response)?;

    if campaign.launch_date <= chrono::Utc::now() {
        let dispatcher = state.dispatcher.clone();
        let campaign_id = campaign.id;
        tokio::spawn(async move {
            if let Err(e) = dispatcher.launch_campaign(campaign_id).await {
                error!(campaign_id = %campaign_id, error = %e, "immediate launch failed");
            }
        });
    }

    Ok((StatusCode::CREATED, Json(campaign)))
}

/// `POST /campaigns/{id}/complete`.
pub async fn complete(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Campaign>, (StatusCode, Json<ErrorBody>)> {
    let campaign = state.scheduler.complete_campaign(id).await.map_err(scheduler_error_response)?;
    Ok(Json(campaign))
}

/// `POST /campaigns/{id}/launch`: dispatch a campaign's due entries
/// immediately instead of waiting for the next tick.
pub async fn launch(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    state.dispatcher.launch_campaign(id).await.map_err(|e| {
        error!(campaign_id = %id, error = %e, "launch_campaign failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody { code: "DATABASE_ERROR", message: e.to_string() }),
        )
    })?;
    Ok(StatusCode::ACCEPTED)
}
