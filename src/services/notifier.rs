//! Approval prompts pushed to managers over the chat channel.
//!
//! Delivery is best effort: every recipient gets its own timeout-bounded
//! send, failures are logged per recipient and never reach the caller.
//! [`ApprovalNotifier::dispatch`] runs the sends on a [`TaskTracker`] so a
//! submission returns immediately and shutdown can wait for in-flight work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::task::TaskTracker;

use crate::models::{
    employee::Employee,
    leave::{LeaveRequest, LeaveType},
};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat API returned HTTP {0}")]
    HttpStatus(u16),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("delivery rejected: {0}")]
    Rejected(String),
}

/// Outbound side of the messaging channel.
#[async_trait]
pub trait ChatChannel: Send + Sync + 'static {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotificationError>;
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramChannel {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
}

impl TelegramChannel {
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_url, self.bot_token)
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotificationError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ApprovalNotifier {
    channel: Arc<dyn ChatChannel>,
    timeout: Duration,
    tracker: TaskTracker,
}

impl ApprovalNotifier {
    pub fn new(channel: Arc<dyn ChatChannel>, timeout: Duration) -> Self {
        Self {
            channel,
            timeout,
            tracker: TaskTracker::new(),
        }
    }

    /// Sends `message` to every recipient concurrently and reports the outcome.
    pub async fn notify(&self, recipients: &[Employee], message: &str) -> DeliveryReport {
        let sends = recipients
            .iter()
            .filter_map(|employee| employee.telegram_id.map(|chat_id| (employee.id, chat_id)))
            .map(|(employee_id, chat_id)| async move {
                let result = match tokio::time::timeout(self.timeout, self.channel.send(chat_id, message)).await {
                    Ok(result) => result,
                    Err(_) => Err(NotificationError::Timeout(self.timeout)),
                };
                if let Err(e) = &result {
                    tracing::warn!(employee_id, chat_id, error = %e, "Approval notification failed");
                }
                result.is_ok()
            });

        let outcomes = futures::future::join_all(sends).await;
        let delivered = outcomes.iter().filter(|ok| **ok).count();
        DeliveryReport {
            delivered,
            failed: outcomes.len() - delivered,
        }
    }

    /// Fire-and-forget variant of [`notify`](Self::notify).
    pub fn dispatch(&self, recipients: Vec<Employee>, message: String) {
        if recipients.is_empty() {
            tracing::warn!("No active approvers found, skipping approval notification");
            return;
        }

        let notifier = self.clone();
        self.tracker.spawn(async move {
            let report = notifier.notify(&recipients, &message).await;
            tracing::info!(
                delivered = report.delivered,
                failed = report.failed,
                "Approval notification dispatched"
            );
        });
    }

    /// Waits for every dispatched notification to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

pub fn approval_message(request: &LeaveRequest, employee: &Employee, leave_type: &LeaveType) -> String {
    let mut text = format!(
        "New leave request #{}\nEmployee: {}\nType: {}\nDates: {} - {} ({} days)",
        request.id,
        employee.display_name(),
        leave_type.display_title(),
        request.start_date,
        request.end_date,
        request.number_of_days,
    );
    if let Some(comment) = &request.comment {
        text.push_str("\nComment: ");
        text.push_str(comment);
    }
    text
}
