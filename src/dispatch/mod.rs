//! Notification fan-out to trusted contacts.
//!
//! Each send is independent: one failed contact never blocks the others,
//! and partial failure is reported, not raised. Dispatch runs strictly
//! after the TRIGGERED commit and can never reopen an alert's state.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

use crate::config::Settings;
use crate::models::{GeoPoint, TrustedContact};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Delivery gateway for one SMS message. The real service is a black box;
/// tests and sandbox deployments swap in non-network implementations.
pub trait SmsGateway: Send + Sync {
    fn send(
        &self,
        to: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

/// Sandbox gateway: no network, deterministic success for every contact.
pub struct SandboxGateway;

impl SmsGateway for SandboxGateway {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        tracing::info!(to = %to, chars = body.len(), "Sandbox mode: simulating SMS send");
        Ok(())
    }
}

#[derive(Serialize)]
struct SmsRequest<'a> {
    to: &'a str,
    from: &'a str,
    body: &'a str,
}

/// HTTP gateway: one POST per message to the configured SMS service.
pub struct HttpSmsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl HttpSmsGateway {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: settings.sms_endpoint.clone(),
            api_key: settings.sms_api_key.clone(),
            from: settings.sms_from.clone(),
        }
    }
}

impl SmsGateway for HttpSmsGateway {
    async fn send(&self, to: &str, body: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&SmsRequest {
                to,
                from: &self.from,
                body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// One contact that could not be reached.
#[derive(Debug, Clone)]
pub struct DispatchFailure {
    pub phone: String,
    pub reason: String,
}

/// Aggregate outcome of a fan-out.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub contacts_notified: usize,
    pub failures: Vec<DispatchFailure>,
}

/// Fans out formatted emergency messages to a user's trusted contacts.
pub struct NotificationDispatcher<G> {
    gateway: G,
}

impl<G: SmsGateway> NotificationDispatcher<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Best-effort fan-out. Never errors; per-contact failures are
    /// collected in the report and logged.
    pub async fn dispatch(
        &self,
        user_name: &str,
        user_phone: &str,
        contacts: &[TrustedContact],
        alert_label: &str,
        location: Option<GeoPoint>,
    ) -> DispatchReport {
        if contacts.is_empty() {
            tracing::warn!(user = %user_name, "No trusted contacts to notify");
            return DispatchReport::default();
        }

        let body = format_alert_message(user_name, user_phone, alert_label, location);
        let mut report = DispatchReport::default();

        for contact in contacts {
            match self.gateway.send(&contact.phone, &body).await {
                Ok(()) => {
                    tracing::info!(contact = %contact.phone, "Emergency SMS sent");
                    report.contacts_notified += 1;
                }
                Err(e) => {
                    tracing::error!(contact = %contact.phone, error = %e, "Emergency SMS failed");
                    report.failures.push(DispatchFailure {
                        phone: contact.phone.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            notified = report.contacts_notified,
            failed = report.failures.len(),
            "Notification fan-out complete"
        );
        report
    }
}

/// The message every trusted contact receives.
pub fn format_alert_message(
    user_name: &str,
    user_phone: &str,
    alert_label: &str,
    location: Option<GeoPoint>,
) -> String {
    let mut body = format!(
        "EMERGENCY ALERT: {alert_label} for {user_name}. \
         They may need your help. Call them now: {user_phone}."
    );
    if let Some(point) = location {
        body.push_str(&format!(" Last known location: {}", point.maps_url()));
    }
    body
}
