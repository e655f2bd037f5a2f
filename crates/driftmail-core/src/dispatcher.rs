//! Queue Dispatcher: the background send worker.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use driftmail_common::types::{CampaignId, EmailAddress, Rid, TemplateId};
use driftmail_storage::models::CampaignStatus;
use driftmail_storage::{
    CampaignRepository, MailLog, MailLogRepository, ProfileRepository, ResultRepository, Template,
    TemplateRepository,
};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::events::EventLog;
use crate::transport::{DispatchCallback, DispatchEntry, Transport};

/// Dispatcher-level failures.
/// These are always logged and swallowed by the run loop; the loop
/// itself never exits because of one.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Periodic background worker that leases due MailLogs, groups them by
/// campaign, and hands each group to Transport.
pub struct Dispatcher {
    pool: PgPool,
    maillogs: MailLogRepository,
    campaigns: CampaignRepository,
    profiles: ProfileRepository,
    templates: TemplateRepository,
    results: ResultRepository,
    events: Arc<EventLog>,
    transport: Arc<dyn Transport>,
    batch_size: i64,
    concurrency_limit: usize,
}

impl Dispatcher {
    pub fn new(
        pool: PgPool,
        events: Arc<EventLog>,
        transport: Arc<dyn Transport>,
        batch_size: i64,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            maillogs: MailLogRepository::new(pool.clone()),
            campaigns: CampaignRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool.clone()),
            templates: TemplateRepository::new(pool.clone()),
            results: ResultRepository::new(pool.clone()),
            pool,
            events,
            transport,
            batch_size,
            concurrency_limit,
        }
    }

    /// Run the dispatch loop forever, ticking every `poll_interval`.
    pub async fn run(self: Arc<Self>, poll_interval: Duration) {
        let mut ticker = interval(poll_interval);
        info!(
            batch_size = self.batch_size,
            concurrency_limit = self.concurrency_limit,
            "dispatcher started"
        );

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                error!(error = %e, "dispatcher tick failed");
            }
        }
    }

    /// One tick.
    async fn tick(&self) -> Result<(), DispatchError> {
        let now = Utc::now();
        let leased = self.maillogs.lease_due(now, self.batch_size).await?;
        if leased.is_empty() {
            return Ok(());
        }

        debug!(count = leased.len(), "leased due maillogs");

        let mut groups: HashMap<CampaignId, Vec<MailLog>> = HashMap::new();
        for entry in leased {
            groups.entry(entry.campaign_id).or_default().push(entry);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut handles = Vec::with_capacity(groups.len());

        for (campaign_id, entries) in groups {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
            let maillogs = self.maillogs.clone();
            let campaigns = self.campaigns.clone();
            let profiles = self.profiles.clone();
            let templates = self.templates.clone();
            let results = self.results.clone();
            let events = self.events.clone();
            let transport = self.transport.clone();

            handles.push(tokio::spawn(async move {
                let outcome = dispatch_group(
                    campaign_id,
                    entries,
                    &maillogs,
                    &campaigns,
                    &profiles,
                    &templates,
                    &results,
                    &events,
                    &transport,
                )
                .await;
                if let Err(e) = outcome {
                    error!(campaign_id = %campaign_id, error = %e, "campaign dispatch failed");
                }
                drop(permit);
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    /// `LaunchCampaign(c)`: fire a campaign's due MailLogs immediately,
    /// outside the normal tick. Future-dated entries have their lease
    /// released rather than silently left leased, so a later tick can
    /// still pick them up at their real send time.
    pub async fn launch_campaign(&self, campaign_id: CampaignId) -> Result<(), DispatchError> {
        let pairs = self.campaigns.scenario_template_pairs(campaign_id).await?;
        let now = Utc::now();
        let mut due = Vec::new();

        for (scenario_id, template_id) in pairs {
            let logs = self
                .maillogs
                .by_campaign_scenario_template(campaign_id, scenario_id, template_id)
                .await?;
            for log in logs {
                if log.send_date > now {
                    self.maillogs.release(log.id).await?;
                } else {
                    self.maillogs.mark_processing(log.id).await?;
                    due.push(log);
                }
            }
        }

        if due.is_empty() {
            return Ok(());
        }

        dispatch_group(
            campaign_id,
            due,
            &self.maillogs,
            &self.campaigns,
            &self.profiles,
            &self.templates,
            &self.results,
            &self.events,
            &self.transport,
        )
        .await
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_group(
    campaign_id: CampaignId,
    entries: Vec<MailLog>,
    maillogs: &MailLogRepository,
    campaigns: &CampaignRepository,
    profiles: &ProfileRepository,
    templates: &TemplateRepository,
    results: &ResultRepository,
    events: &Arc<EventLog>,
    transport: &Arc<dyn Transport>,
) -> Result<(), DispatchError> {
    let campaign = match campaigns.get(campaign_id).await? {
        Some(c) => c,
        None => {
            warn!(campaign_id = %campaign_id, "campaign missing for leased maillogs, skipping");
            return Ok(());
        }
    };

    if campaign.status == CampaignStatus::Queued {
        campaigns.mark_in_progress(campaign_id).await?;
    }

    let profile = match profiles.get(campaign.profile_id).await? {
        Some(p) => p,
        None => {
            warn!(campaign_id = %campaign_id, "sending profile missing, skipping group");
            return Ok(());
        }
    };

    let mut template_cache: HashMap<TemplateId, Template> = HashMap::new();
    let mut dispatch_entries = Vec::with_capacity(entries.len());

    for entry in &entries {
        let context = serde_json::json!({
            "campaign_id": campaign_id,
            "profile_id": profile.id,
        });
        let _ = maillogs.attach_context(entry.id, context).await;

        let result = match results.get_by_rid(&entry.rid).await? {
            Some(r) => r,
            None => continue,
        };

        if !template_cache.contains_key(&entry.template_id) {
            if let Some(template) = templates.get(entry.template_id).await? {
                template_cache.insert(entry.template_id, template);
            } else {
                continue;
            }
        }
        let template = &template_cache[&entry.template_id];

        let from = match &template.envelope_sender {
            Some(sender) if EmailAddress::parse(sender).is_some() => sender.clone(),
            Some(sender) => {
                warn!(rid = %entry.rid, sender = %sender, "template envelope sender is not a valid address, falling back to profile");
                profile.from_address.clone()
            }
            None => profile.from_address.clone(),
        };

        dispatch_entries.push(DispatchEntry {
            rid: entry.rid.clone(),
            to: result.email.clone(),
            from,
            subject: template.subject.clone(),
            text: template.text.clone(),
            html: template.html.clone(),
        });
    }

    if dispatch_entries.is_empty() {
        return Ok(());
    }

    let callback = Arc::new(StoreCallback {
        results: results.clone(),
        maillogs: maillogs.clone(),
        events: events.clone(),
        campaign_id,
    });

    transport.send_batch(&profile, dispatch_entries, callback).await;
    check_campaign_completion(campaigns, campaign_id).await
}

/// After a drain, check whether a campaign's MailLogs are fully
/// exhausted and, if so, auto-transition it to `emails-sent` without
/// waiting for an explicit `CompleteCampaign` call.
async fn check_campaign_completion(
    campaigns: &CampaignRepository,
    campaign_id: CampaignId,
) -> Result<(), DispatchError> {
    let (pending, processing) = campaigns.pending_and_processing_counts(campaign_id).await?;
    if pending == 0 && processing == 0 {
        campaigns.mark_emails_sent(campaign_id).await?;
        info!(campaign_id = %campaign_id, "campaign emails sent");
    }
    Ok(())
}

/// `DispatchCallback` implementation wired to the Store and Event Log.
struct StoreCallback {
    results: ResultRepository,
    maillogs: MailLogRepository,
    events: Arc<EventLog>,
    campaign_id: CampaignId,
}

#[async_trait]
impl DispatchCallback for StoreCallback {
    async fn success(&self, rid: Rid) {
        if let Err(e) = self.results.mark_sent(&rid).await {
            error!(rid = %rid, error = %e, "failed to mark result sent");
        }
        if let Err(e) = self.maillogs.delete_by_rid(&rid).await {
            error!(rid = %rid, error = %e, "failed to delete maillog");
        }
    }

    async fn error(&self, rid: Rid, err: String) {
        warn!(rid = %rid, error = %err, "send failed");
        if let Err(e) = self.results.mark_error(&rid).await {
            error!(rid = %rid, error = %e, "failed to mark result error");
        }
        if let Err(e) = self.maillogs.delete_by_rid(&rid).await {
            error!(rid = %rid, error = %e, "failed to delete maillog");
        }
        let _ = self
            .events
            .add_event(
                self.campaign_id,
                None,
                "Error Sending Email",
                Some(serde_json::json!({ "rid": rid, "error": err })),
            )
            .await;
    }
}
