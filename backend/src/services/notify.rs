//! Outbound patient notifications.
//!
//! Fired after a transition commits, never awaited by the orchestrator for
//! its own success or failure. Delivery trouble is logged and dropped.

use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::env;
use std::sync::Arc;

use crate::models::request::RequestStatus;
use crate::types::RequestId;

#[derive(Debug, Clone)]
pub struct StatusChangeNotice {
    pub request_id: RequestId,
    pub new_status: RequestStatus,
    pub patient_email: Option<String>,
    pub actor_name: String,
    pub decline_reason_note: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
pub trait StatusNotifier: Send + Sync {
    fn notify_status_change(&self, notice: &StatusChangeNotice) -> Result<()>;
}

pub struct EmailNotifier {
    mailer: SmtpTransport,
    from_address: String,
}

impl EmailNotifier {
    pub fn new() -> Result<Self> {
        let smtp_host = env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse::<u16>()
            .unwrap_or(587);
        let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
        let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_address = env::var("SMTP_FROM_ADDRESS")
            .unwrap_or_else(|_| "noreply@clinflow.local".to_string());

        let mailer = if smtp_username.is_empty() {
            SmtpTransport::builder_dangerous(&smtp_host)
                .port(smtp_port)
                .build()
        } else {
            let creds = Credentials::new(smtp_username, smtp_password);
            SmtpTransport::relay(&smtp_host)?
                .port(smtp_port)
                .credentials(creds)
                .build()
        };

        Ok(Self {
            mailer,
            from_address,
        })
    }
}

impl StatusNotifier for EmailNotifier {
    fn notify_status_change(&self, notice: &StatusChangeNotice) -> Result<()> {
        if env::var("SMTP_SKIP_SEND").unwrap_or_default() == "true" {
            return Ok(());
        }
        let Some(to_email) = notice.patient_email.as_deref() else {
            // Nothing to deliver to; not an error.
            return Ok(());
        };

        let mut body = format!(
            "Your request ({}) was updated to \"{}\" by {}.\n",
            notice.request_id,
            notice.new_status.as_str(),
            notice.actor_name
        );
        if let Some(reason) = notice.decline_reason_note.as_deref() {
            body.push_str(&format!("\nReviewer note: {}\n", reason));
        }
        body.push_str("\n---\nClinflow clinical review\n");

        let email = Message::builder()
            .from(self.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(format!(
                "Update on your clinical request - {}",
                notice.new_status.as_str()
            ))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.mailer.send(&email)?;
        Ok(())
    }
}

/// Spawns delivery off the caller's task. The returned handle is for tests;
/// production callers drop it.
pub fn spawn_notification(
    notifier: Arc<dyn StatusNotifier>,
    notice: StatusChangeNotice,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        if let Err(err) = notifier.notify_status_change(&notice) {
            tracing::warn!(
                request_id = %notice.request_id,
                error = %err,
                "patient notification failed; status change unaffected"
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notice() -> StatusChangeNotice {
        StatusChangeNotice {
            request_id: RequestId::new(),
            new_status: RequestStatus::Approved,
            patient_email: Some("patient@example.com".to_string()),
            actor_name: "Dr. Ueda".to_string(),
            decline_reason_note: None,
        }
    }

    #[tokio::test]
    async fn spawn_notification_swallows_notifier_errors() {
        let mut notifier = MockStatusNotifier::new();
        notifier
            .expect_notify_status_change()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("smtp down")));
        let handle = spawn_notification(Arc::new(notifier), notice());
        handle.await.expect("notification task panicked");
    }

    #[tokio::test]
    async fn spawn_notification_delivers_once() {
        let mut notifier = MockStatusNotifier::new();
        notifier
            .expect_notify_status_change()
            .times(1)
            .returning(|_| Ok(()));
        let handle = spawn_notification(Arc::new(notifier), notice());
        handle.await.expect("notification task panicked");
    }
}
