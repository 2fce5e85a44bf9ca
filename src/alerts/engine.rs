//! Alert lifecycle engine.
//!
//! An alert is born PENDING, then resolves exactly once to CANCELLED or
//! TRIGGERED. Two mechanisms enforce single resolution: the registry claim
//! stops live timers, and the conditional `WHERE status = 'pending'` UPDATE
//! in the store is the commit point both paths must pass through. The
//! TRIGGERED commit always lands before any notification leaves, so a
//! cancelled alert can never produce an SMS.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use super::registry::CountdownRegistry;
use crate::config::AlertPolicy;
use crate::db::{repository, Database, DatabaseError};
use crate::dispatch::{DispatchReport, NotificationDispatcher, SmsGateway};
use crate::models::{Alert, NewAlert, ValidationError};

#[derive(Error, Debug)]
pub enum AlertError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    #[error("Alert {0} is not pending")]
    AlertNotPending(Uuid),
}

/// A freshly created alert plus whether a countdown was started for it.
#[derive(Debug, Clone)]
pub struct CreatedAlert {
    pub alert: Alert,
    pub countdown_started: bool,
}

/// Result of a committed trigger: the final alert row and the fan-out
/// outcome. Dispatch failures live in the report; they never undo the
/// TRIGGERED commit.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub alert: Alert,
    pub report: DispatchReport,
}

/// Drives alerts from creation through their terminal transition.
pub struct AlertEngine<G> {
    db: Database,
    policy: AlertPolicy,
    registry: CountdownRegistry,
    dispatcher: Arc<NotificationDispatcher<G>>,
}

impl<G> Clone for AlertEngine<G> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            policy: self.policy,
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<G: SmsGateway + 'static> AlertEngine<G> {
    pub fn new(db: Database, policy: AlertPolicy, gateway: G) -> Self {
        Self {
            db,
            policy,
            registry: CountdownRegistry::new(),
            dispatcher: Arc::new(NotificationDispatcher::new(gateway)),
        }
    }

    /// Record a new alert and, when its confidence clears the policy
    /// threshold, start the cancellation countdown.
    pub fn create_alert(&self, new: NewAlert) -> Result<CreatedAlert, AlertError> {
        new.validate()?;

        let conn = self.db.connect()?;
        if repository::get_user(&conn, new.user_id)?.is_none() {
            return Err(AlertError::UserNotFound(new.user_id));
        }
        let alert = repository::insert_alert(&conn, &new)?;
        drop(conn);

        let countdown_started = if alert.confidence >= self.policy.confidence_threshold {
            let engine = self.clone();
            let alert_id = alert.id;
            let started = self.registry.schedule(alert_id, self.policy.countdown, async move {
                engine.run_expiry(alert_id).await;
            });
            tracing::info!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                confidence = alert.confidence,
                countdown_secs = self.policy.countdown.as_secs_f64(),
                "Alert created; countdown started"
            );
            started
        } else {
            tracing::info!(
                alert_id = %alert.id,
                alert_type = alert.alert_type.as_str(),
                confidence = alert.confidence,
                threshold = self.policy.confidence_threshold,
                "Alert created below threshold; no countdown"
            );
            false
        };

        Ok(CreatedAlert {
            alert,
            countdown_started,
        })
    }

    /// Cancel a pending alert ("I'm safe").
    ///
    /// `Ok(true)` only when this call claimed the live countdown and
    /// committed PENDING→CANCELLED. `Ok(false)` with no side effects when
    /// no handle exists: the alert never had a countdown, was already
    /// resolved, or a racing expiry claimed it first.
    pub async fn cancel(&self, alert_id: Uuid) -> Result<bool, AlertError> {
        let Some(handle) = self.registry.claim(alert_id) else {
            tracing::warn!(alert_id = %alert_id, "Cancellation refused; no live countdown");
            return Ok(false);
        };
        handle.abort();

        let conn = self.db.connect()?;
        let committed = repository::mark_cancelled(&conn, alert_id, Utc::now())?;
        if committed {
            tracing::info!(alert_id = %alert_id, "Alert cancelled");
        } else {
            // The handle existed, so the row should still be pending.
            tracing::warn!(alert_id = %alert_id, "Countdown claimed but alert was not pending");
        }
        Ok(committed)
    }

    /// Trigger a pending alert immediately, skipping any remaining
    /// countdown. Used for explicit SOS and voice-activated emergencies.
    pub async fn trigger_instant(&self, alert_id: Uuid) -> Result<TriggerOutcome, AlertError> {
        if let Some(handle) = self.registry.claim(alert_id) {
            handle.abort();
        }
        self.complete_trigger(alert_id).await
    }

    /// Countdown expiry body. Errors end here: a background timer has no
    /// caller to answer to, so they are logged and dropped.
    async fn run_expiry(&self, alert_id: Uuid) {
        match self.complete_trigger(alert_id).await {
            Ok(outcome) => {
                tracing::info!(
                    alert_id = %alert_id,
                    notified = outcome.report.contacts_notified,
                    "Countdown expired; alert triggered"
                );
            }
            Err(AlertError::AlertNotPending(_)) => {
                tracing::debug!(alert_id = %alert_id, "Countdown expired but alert already resolved");
            }
            Err(e) => {
                tracing::error!(alert_id = %alert_id, error = %e, "Countdown expiry failed");
            }
        }
    }

    /// Commit PENDING→TRIGGERED, then notify. The commit comes first: once
    /// the UPDATE lands the alert is triggered even if every send fails.
    async fn complete_trigger(&self, alert_id: Uuid) -> Result<TriggerOutcome, AlertError> {
        // Connection scoped so it is gone before the dispatch await.
        let (alert, user, contacts) = {
            let conn = self.db.connect()?;
            if !repository::mark_triggered(&conn, alert_id, Utc::now())? {
                return Err(AlertError::AlertNotPending(alert_id));
            }
            let alert = repository::get_alert(&conn, alert_id)?
                .ok_or(AlertError::AlertNotFound(alert_id))?;
            let user = repository::get_user(&conn, alert.user_id)?
                .ok_or(AlertError::UserNotFound(alert.user_id))?;
            let contacts = repository::list_trusted_contacts(&conn, alert.user_id)?;
            (alert, user, contacts)
        };

        let report = self
            .dispatcher
            .dispatch(
                &user.name,
                &user.phone,
                &contacts,
                alert.alert_type.label(),
                alert.location,
            )
            .await;

        Ok(TriggerOutcome { alert, report })
    }

    /// Ids of alerts with a live countdown.
    pub fn list_pending_ids(&self) -> Vec<Uuid> {
        self.registry.pending_ids()
    }

    pub fn get_alert(&self, alert_id: Uuid) -> Result<Option<Alert>, AlertError> {
        let conn = self.db.connect()?;
        Ok(repository::get_alert(&conn, alert_id)?)
    }

    pub fn alerts_for_user(&self, user_id: Uuid) -> Result<Vec<Alert>, AlertError> {
        let conn = self.db.connect()?;
        Ok(repository::list_alerts_by_user(&conn, user_id)?)
    }

    pub fn alerts_for_session(&self, session_id: Uuid) -> Result<Vec<Alert>, AlertError> {
        let conn = self.db.connect()?;
        Ok(repository::list_alerts_by_session(&conn, session_id)?)
    }
}
