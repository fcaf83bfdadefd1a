//! Notification dispatch
//!
//! Fans a claimed notification out to every configured channel
//! concurrently. Channels are isolated from each other: one channel
//! failing never prevents the other from being attempted, and each
//! channel reports its own outcome.

use std::time::Duration;

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;

use crate::config::SmtpConfig;
use crate::models::{AlertChannels, ChannelOutcome, DispatchOutcome, NotificationCandidate};

const WEBHOOK_TIMEOUT_SECS: u64 = 15;

// Recipient domains that are placeholders, never real mailboxes
const BLOCKED_DOMAIN_SUFFIXES: &[&str] = &[".test", ".invalid", ".localhost", ".example"];
const BLOCKED_ADDRESSES: &[&str] = &["noreply@example.com", "test@test.com"];

/// Fan-out dispatcher for alert notifications
pub struct NotificationDispatcher {
    http: reqwest::Client,
    smtp: Option<SmtpSender>,
}

struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl NotificationDispatcher {
    /// Build a dispatcher; the email channel stays inert without SMTP config
    pub fn new(smtp_config: Option<&SmtpConfig>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let smtp = smtp_config.and_then(|cfg| match build_smtp_sender(cfg) {
            Ok(sender) => Some(sender),
            Err(e) => {
                tracing::warn!("SMTP configuration unusable, email channel disabled: {}", e);
                None
            }
        });

        Self { http, smtp }
    }

    /// Deliver one candidate through the alert's channels
    ///
    /// Both channels are attempted concurrently; the combined outcome
    /// reports each channel separately.
    pub async fn dispatch(
        &self,
        channels: &AlertChannels,
        candidate: &NotificationCandidate,
    ) -> DispatchOutcome {
        let (email, webhook) = tokio::join!(
            self.send_email(channels, candidate),
            self.send_webhook(channels, candidate),
        );
        DispatchOutcome { email, webhook }
    }

    async fn send_email(
        &self,
        channels: &AlertChannels,
        candidate: &NotificationCandidate,
    ) -> ChannelOutcome {
        let Some(ref email) = channels.email else {
            return ChannelOutcome::Skipped;
        };

        let recipients = sanitize_recipients(&email.to);
        if recipients.is_empty() {
            tracing::warn!(title = %candidate.title, "Email channel has no valid recipients, skipping");
            return ChannelOutcome::Skipped;
        }

        let Some(ref sender) = self.smtp else {
            tracing::warn!(title = %candidate.title, "Email channel requested but SMTP is not configured, skipping");
            return ChannelOutcome::Skipped;
        };

        let mut builder = Message::builder()
            .from(sender.from.clone())
            .subject(&candidate.title);
        for recipient in &recipients {
            builder = builder.to(Mailbox::new(None, recipient.clone()));
        }

        let mut body = candidate.message.clone();
        if let Some(ref link) = candidate.link {
            body.push_str("\n\n");
            body.push_str(link);
        }

        let message = match builder.body(body) {
            Ok(m) => m,
            Err(e) => return ChannelOutcome::Failed(format!("message build failed: {}", e)),
        };

        match sender.transport.send(message).await {
            Ok(_) => {
                tracing::info!(title = %candidate.title, recipients = recipients.len(), "Alert email sent");
                ChannelOutcome::Delivered
            }
            Err(e) => {
                tracing::error!(title = %candidate.title, "Alert email failed: {}", e);
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    async fn send_webhook(
        &self,
        channels: &AlertChannels,
        candidate: &NotificationCandidate,
    ) -> ChannelOutcome {
        let Some(ref webhook) = channels.webhook else {
            return ChannelOutcome::Skipped;
        };
        if webhook.url.trim().is_empty() {
            tracing::warn!(title = %candidate.title, "Webhook channel has no URL, skipping");
            return ChannelOutcome::Skipped;
        }

        let payload = json!({
            "title": candidate.title,
            "message": candidate.message,
            "link": candidate.link,
        });

        match self.http.post(&webhook.url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(title = %candidate.title, "Alert webhook delivered");
                ChannelOutcome::Delivered
            }
            Ok(response) => {
                let status = response.status();
                tracing::error!(title = %candidate.title, %status, "Alert webhook rejected");
                ChannelOutcome::Failed(format!("webhook returned {}", status))
            }
            Err(e) => {
                tracing::error!(title = %candidate.title, "Alert webhook failed: {}", e);
                ChannelOutcome::Failed(e.to_string())
            }
        }
    }

    /// Send a synthetic notification, bypassing alert definitions and history
    pub async fn send_test(
        &self,
        channels: &AlertChannels,
        title: Option<String>,
        message: Option<String>,
    ) -> DispatchOutcome {
        let candidate = NotificationCandidate {
            title: title.unwrap_or_else(|| "Test notification".to_string()),
            message: message
                .unwrap_or_else(|| "This is a test notification from buildboard.".to_string()),
            target: None,
            run_number: None,
            link: None,
        };
        self.dispatch(channels, &candidate).await
    }
}

fn build_smtp_sender(cfg: &SmtpConfig) -> anyhow::Result<SmtpSender> {
    let from: Mailbox = cfg
        .from
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid smtp.from address: {}", e))?;

    let mut builder =
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)?.port(cfg.port);
    if let (Some(username), Some(password)) = (&cfg.username, &cfg.password) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(SmtpSender {
        transport: builder.build(),
        from,
    })
}

/// Normalize a recipient list into deliverable addresses
///
/// Entries may contain comma-separated lists. Anything that does not parse
/// as an address, or whose domain is a placeholder, is dropped with a
/// warning rather than failing the whole channel.
fn sanitize_recipients(raw: &[String]) -> Vec<Address> {
    let mut addresses = Vec::new();

    for entry in raw {
        for part in entry.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let address: Address = match part.parse() {
                Ok(a) => a,
                Err(_) => {
                    tracing::warn!(recipient = %part, "Dropping unparseable email recipient");
                    continue;
                }
            };

            let lowered = part.to_lowercase();
            if BLOCKED_ADDRESSES.contains(&lowered.as_str())
                || BLOCKED_DOMAIN_SUFFIXES
                    .iter()
                    .any(|suffix| lowered.ends_with(suffix))
            {
                tracing::warn!(recipient = %part, "Dropping placeholder email recipient");
                continue;
            }

            addresses.push(address);
        }
    }

    addresses
}
