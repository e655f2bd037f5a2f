//! Campaign Scheduler: validates input, orchestrates the Calendar, Slot
//! Generator, and Assignment Planner, and writes the persistent plan in
//! one transaction.

use chrono::Utc;
use driftmail_common::types::{CampaignId, EmailAddress, GroupId, ProfileId, ScenarioId, UserId};
use driftmail_storage::models::{CampaignStatus, NewCampaign, NewMailLog, NewResult, ResultStatus};
use driftmail_storage::{
    Campaign, CampaignRepository, EventRepository, GroupRepository, MailLogRepository,
    ProfileRepository, ResultRepository, ScenarioRepository,
};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::assignment::{assign, Recipient};
use super::calendar::resolve_timezone;
use super::slots::{generate_slots, NoWorkingDays};

/// Error taxonomy for `schedule()`. Every variant
/// except `Database` returns with nothing persisted.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("name not specified")]
    NameNotSpecified,
    #[error("group not specified")]
    GroupNotSpecified,
    #[error("scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),
    #[error("template not found")]
    TemplateNotFound,
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),
    #[error("sending profile not found: {0}")]
    SmtpNotFound(ProfileId),
    #[error("sending profile {0} has an invalid from address")]
    InvalidFromAddress(ProfileId),
    #[error("invalid send-by date")]
    InvalidSendByDate,
    #[error("no working days in the campaign's send window")]
    NoWorkingDays,
    #[error("campaign not found: {0}")]
    CampaignNotFound(CampaignId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<NoWorkingDays> for SchedulerError {
    fn from(_: NoWorkingDays) -> Self {
        SchedulerError::NoWorkingDays
    }
}

/// Input to `schedule()`.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub name: String,
    pub user_id: UserId,
    pub group_ids: Vec<GroupId>,
    pub scenario_ids: Vec<ScenarioId>,
    pub profile_id: ProfileId,
    /// IANA time-zone name. Empty or unresolvable resolves to UTC.
    pub location: String,
    /// `None` means "now".
    pub launch_date: Option<chrono::DateTime<Utc>>,
    pub send_by_date: Option<chrono::DateTime<Utc>>,
    /// `None` defaults to 10:00 in the resolved zone.
    pub start_hour: Option<u32>,
    /// `None` defaults to 18:00 in the resolved zone.
    pub end_hour: Option<u32>,
}

/// Campaign Scheduler.
pub struct CampaignScheduler {
    pool: PgPool,
    campaigns: CampaignRepository,
    scenarios: ScenarioRepository,
    groups: GroupRepository,
    profiles: ProfileRepository,
    results: ResultRepository,
    maillogs: MailLogRepository,
    events: EventRepository,
}

impl CampaignScheduler {
    pub fn new(pool: PgPool) -> Self {
        Self {
            campaigns: CampaignRepository::new(pool.clone()),
            scenarios: ScenarioRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            results: ResultRepository::new(pool.clone()),
            maillogs: MailLogRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            pool,
        }
    }

    /// `schedule(campaign, actingUserId)`.
    pub async fn schedule(&self, req: ScheduleRequest) -> Result<Campaign, SchedulerError> {
        // 1. Validate static fields.
        if req.name.trim().is_empty() {
            return Err(SchedulerError::NameNotSpecified);
        }
        if req.group_ids.is_empty() {
            return Err(SchedulerError::GroupNotSpecified);
        }
        if req.scenario_ids.is_empty() {
            // No explicit "scenario-not-specified" kind in the taxonomy;
            // an empty scenario list trivially fails reference resolution
            // the same way a missing scenario would.
            return Err(SchedulerError::ScenarioNotFound(Uuid::nil()));
        }

        // 2. Normalize times.
        let tz = resolve_timezone(&req.location);
        let launch_date = req.launch_date.unwrap_or_else(Utc::now);
        if let Some(send_by) = req.send_by_date {
            if send_by < launch_date {
                return Err(SchedulerError::InvalidSendByDate);
            }
        }
        let start_hour = req.start_hour.unwrap_or(10);
        let end_hour = req.end_hour.unwrap_or(18);

        // 3. Initial status.
        let now = Utc::now();
        let status = if launch_date <= now {
            CampaignStatus::InProgress
        } else {
            CampaignStatus::Queued
        };

        // 4. Resolve references under the acting user's ownership.
        let mut scenarios = Vec::with_capacity(req.scenario_ids.len());
        let mut pairs = Vec::new();
        for &scenario_id in &req.scenario_ids {
            let scenario = self
                .scenarios
                .get_owned(scenario_id, req.user_id)
                .await?
                .ok_or(SchedulerError::ScenarioNotFound(scenario_id))?;
            let template_ids = self.scenarios.templates_for(scenario_id).await?;
            if template_ids.is_empty() {
                return Err(SchedulerError::TemplateNotFound);
            }
            for template_id in template_ids {
                pairs.push((scenario_id, template_id));
            }
            scenarios.push(scenario);
        }

        let profile = self
            .profiles
            .get_owned(req.profile_id, req.user_id)
            .await?
            .ok_or(SchedulerError::SmtpNotFound(req.profile_id))?;

        if EmailAddress::parse(&profile.from_address).is_none() {
            return Err(SchedulerError::InvalidFromAddress(profile.id));
        }

        // 5. Deduplicate recipients by email, first occurrence wins
        // across groups in iteration order.
        let mut seen = std::collections::HashSet::new();
        let mut recipients = Vec::new();
        for &group_id in &req.group_ids {
            self.groups
                .get_owned(group_id, req.user_id)
                .await?
                .ok_or(SchedulerError::GroupNotFound(group_id))?;
            let targets = self.groups.targets_for(group_id).await?;
            for target in targets {
                if seen.insert(target.email.clone()) {
                    recipients.push(Recipient {
                        email: target.email,
                        first_name: target.first_name,
                        last_name: target.last_name,
                        position: target.position,
                    });
                }
            }
        }

        // 6. Plan. Drive slot/assignment generation off the total tuple count.
        let n_tuples = recipients.len() * pairs.len();
        let has_real_window = req
            .send_by_date
            .map(|send_by| send_by != launch_date)
            .unwrap_or(false);

        let slots = if has_real_window {
            let send_by = req.send_by_date.unwrap();
            let mut rng = rand::thread_rng();
            generate_slots(tz, launch_date, send_by, start_hour, end_hour, n_tuples, &mut rng)?
        } else {
            vec![launch_date; n_tuples]
        };

        if has_real_window && slots.len() < n_tuples {
            return Err(SchedulerError::NoWorkingDays);
        }

        let mut rng = rand::thread_rng();
        let assignments = assign(recipients.len(), &pairs, &mut rng);

        // 7. Persist atomically.
        let campaign_id = Uuid::new_v4();
        let new_campaign = NewCampaign {
            id: campaign_id,
            user_id: req.user_id,
            name: req.name.clone(),
            created_date: now,
            launch_date,
            send_by_date: req.send_by_date,
            status,
            profile_id: req.profile_id,
            start_time: launch_date
                .with_timezone(&tz)
                .date_naive()
                .and_hms_opt(start_hour, 0, 0)
                .unwrap()
                .and_local_timezone(tz)
                .single()
                .unwrap_or(launch_date.with_timezone(&tz))
                .with_timezone(&Utc),
            end_time: launch_date
                .with_timezone(&tz)
                .date_naive()
                .and_hms_opt(end_hour, 0, 0)
                .unwrap()
                .and_local_timezone(tz)
                .single()
                .unwrap_or(launch_date.with_timezone(&tz))
                .with_timezone(&Utc),
            location: req.location.clone(),
            scenario_ids: req.scenario_ids.clone(),
        };

        let mut tx = self.pool.begin().await?;
        let campaign = self.campaigns.create_in_tx(&mut tx, &new_campaign).await?;

        let mut new_results = Vec::with_capacity(assignments.len());
        let mut new_maillogs = Vec::with_capacity(assignments.len());

        for (assignment, send_date) in assignments.into_iter().zip(slots.into_iter()) {
            let recipient = &recipients[assignment.recipient_index];
            let rid = Uuid::new_v4().simple().to_string();
            let leased = send_date <= now;

            new_results.push(NewResult {
                id: Uuid::new_v4(),
                rid: rid.clone(),
                campaign_id,
                user_id: req.user_id,
                email: recipient.email.clone(),
                first_name: recipient.first_name.clone(),
                last_name: recipient.last_name.clone(),
                position: recipient.position.clone(),
                status: if leased { ResultStatus::Sending } else { ResultStatus::Scheduled },
                scenario_id: assignment.scenario_id,
                template_id: assignment.template_id,
                send_date,
            });

            new_maillogs.push(NewMailLog {
                id: Uuid::new_v4(),
                user_id: req.user_id,
                campaign_id,
                rid,
                send_date,
                processing: leased,
                scenario_id: assignment.scenario_id,
                template_id: assignment.template_id,
            });
        }

        self.results.insert_batch_in_tx(&mut tx, &new_results).await?;
        self.maillogs.insert_batch_in_tx(&mut tx, &new_maillogs).await?;

        tx.commit().await?;

        // 8. Emit an Event.
        self.events
            .insert(campaign_id, None, "Campaign Created", None)
            .await?;

        info!(
            campaign_id = %campaign_id,
            recipients = recipients.len(),
            results = new_results.len(),
            "campaign scheduled"
        );

        Ok(campaign)
    }

    /// Transition a campaign to `complete`.
    /// Deletes remaining MailLogs first so a retried call is still safe
    /// to run concurrently with a late-arriving schedule.
    pub async fn complete_campaign(&self, id: CampaignId) -> Result<Campaign, SchedulerError> {
        let mut tx = self.pool.begin().await?;
        self.maillogs.delete_by_campaign_in_tx(&mut tx, id).await?;
        tx.commit().await?;

        let campaign = self
            .campaigns
            .mark_complete(id)
            .await?
            .ok_or(SchedulerError::CampaignNotFound(id))?;

        self.events
            .insert(id, None, "Campaign Complete", None)
            .await?;

        Ok(campaign)
    }

    /// `DeleteCampaign(id)`.
    pub async fn delete_campaign(&self, id: CampaignId) -> Result<bool, SchedulerError> {
        Ok(self.campaigns.delete_cascade(id).await?)
    }
}
