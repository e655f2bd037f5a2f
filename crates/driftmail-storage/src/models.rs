//! Database models for the campaign scheduling domain.

use chrono::{DateTime, Utc};
use driftmail_common::types::{
    CampaignId, GroupId, PageId, ProfileId, ResultId, Rid, ScenarioId, TemplateId, UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign lifecycle status.
/// Stored as TEXT; `rename_all` controls the on-the-wire/on-disk spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CampaignStatus {
    Queued,
    InProgress,
    /// Every MailLog has drained on its own, but `CompleteCampaign` was
    /// never called. Auto-detected by the Dispatcher, distinct from the
    /// manually-triggered `Complete`.
    EmailsSent,
    Complete,
}

impl CampaignStatus {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            CampaignStatus::Queued => "Queued",
            CampaignStatus::InProgress => "In progress",
            CampaignStatus::EmailsSent => "Emails Sent",
            CampaignStatus::Complete => "Complete",
        }
    }
}

/// Result/MailLog status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    Scheduled,
    Sending,
    Sent,
    Opened,
    Clicked,
    Submitted,
    Error,
    Reported,
}

impl ResultStatus {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            ResultStatus::Scheduled => "Scheduled",
            ResultStatus::Sending => "Sending",
            ResultStatus::Sent => "Email Sent",
            ResultStatus::Opened => "Email Opened",
            ResultStatus::Clicked => "Clicked Link",
            ResultStatus::Submitted => "Submitted Data",
            ResultStatus::Error => "Error",
            ResultStatus::Reported => "Email Reported",
        }
    }
}

/// Campaign row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub user_id: UserId,
    pub name: String,
    pub created_date: DateTime<Utc>,
    pub launch_date: DateTime<Utc>,
    pub send_by_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub profile_id: ProfileId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
}

/// A campaign to be inserted, computed by the Scheduler.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub id: CampaignId,
    pub user_id: UserId,
    pub name: String,
    pub created_date: DateTime<Utc>,
    pub launch_date: DateTime<Utc>,
    pub send_by_date: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub profile_id: ProfileId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: String,
    pub scenario_ids: Vec<ScenarioId>,
}

/// Scenario row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub user_id: UserId,
    pub name: String,
    pub page_id: PageId,
    pub url: String,
    pub created_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

/// Template row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    pub envelope_sender: Option<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub modified_date: DateTime<Utc>,
}

/// Group row; targets live in a child table (`Target`).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub user_id: UserId,
    pub name: String,
    pub modified_date: DateTime<Utc>,
}

/// A single target (recipient) belonging to a group.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Target {
    pub id: uuid::Uuid,
    pub group_id: GroupId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub ordinal: i32,
}

/// Sending profile: an SMTP credential bundle.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SendingProfile {
    pub id: ProfileId,
    pub user_id: UserId,
    pub name: String,
    pub host: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub from_address: String,
    pub ignore_cert_errors: bool,
}

/// Result row: per (campaign, recipient, scenario, template) tuple.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CampaignResult {
    pub id: ResultId,
    pub rid: Rid,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub status: ResultStatus,
    pub reported: bool,
    pub scenario_id: ScenarioId,
    pub template_id: TemplateId,
    pub send_date: DateTime<Utc>,
    pub modified_date: DateTime<Utc>,
}

/// A Result row to be inserted as part of the Scheduler's single
/// transaction.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub id: ResultId,
    pub rid: Rid,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub status: ResultStatus,
    pub scenario_id: ScenarioId,
    pub template_id: TemplateId,
    pub send_date: DateTime<Utc>,
}

/// MailLog row: a queue entry, one-to-one with a Result at creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MailLog {
    pub id: uuid::Uuid,
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    pub rid: Rid,
    pub send_date: DateTime<Utc>,
    pub processing: bool,
    pub scenario_id: ScenarioId,
    pub template_id: TemplateId,
    /// Cached campaign/template/scenario context, populated at lease time
    /// by the Dispatcher.
    pub campaign_context: Option<serde_json::Value>,
}

/// A MailLog row to be inserted alongside its Result.
#[derive(Debug, Clone)]
pub struct NewMailLog {
    pub id: uuid::Uuid,
    pub user_id: UserId,
    pub campaign_id: CampaignId,
    pub rid: Rid,
    pub send_date: DateTime<Utc>,
    pub processing: bool,
    pub scenario_id: ScenarioId,
    pub template_id: TemplateId,
}

/// Event row: append-only campaign lifecycle log.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: uuid::Uuid,
    pub campaign_id: CampaignId,
    pub email: Option<String>,
    pub time: DateTime<Utc>,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

/// Per-status-bucket rollup for a single campaign.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CampaignStats {
    pub total: i64,
    pub sent: i64,
    pub opened: i64,
    pub clicked: i64,
    pub submitted_data: i64,
    pub email_reported: i64,
    pub error: i64,
    pub pending: i64,
    pub processing: i64,
}

/// Minimal cached context the Dispatcher attaches to leased MailLogs
/// before handing them to Transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignContext {
    pub campaign_id: CampaignId,
    pub base_url: String,
    pub profile: SendingProfile,
}
