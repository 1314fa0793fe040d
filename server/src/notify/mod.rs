//! Workflow notifications.
//!
//! The directory talks to a [`Notifier`]; the production notifier renders
//! emails and hands them to an [`EmailSender`] (SMTP, or the in-process outbox
//! when SMTP is not configured).

use async_trait::async_trait;

use crate::models::OrganizerSummary;
use crate::utils::error::AppError;

pub mod email;
pub mod templates;

pub use email::{EmailSender, OutboundEmail, OutboxSender, SmtpConfig, SmtpEmailSender};
pub use templates::{ApprovalRequestEmailTemplate, EmailTemplate, OrganizerApprovedEmailTemplate};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the admin at `admin_address` to approve a new organizer.
    async fn notify_admin(
        &self,
        admin_address: &str,
        organizer: &OrganizerSummary,
        approval_link: &str,
    ) -> Result<(), AppError>;

    /// Tell an organizer their account was approved.
    async fn notify_organizer_approved(&self, organizer: &OrganizerSummary) -> Result<(), AppError>;
}

pub struct EmailNotifier {
    sender: Box<dyn EmailSender>,
}

impl EmailNotifier {
    pub fn new(sender: Box<dyn EmailSender>) -> Self {
        Self { sender }
    }

    async fn send(&self, to: &str, template: &(dyn EmailTemplate + Sync)) -> Result<(), AppError> {
        self.sender
            .send_email(to, &template.subject(), &template.html_body(), &template.text_body())
            .await
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify_admin(
        &self,
        admin_address: &str,
        organizer: &OrganizerSummary,
        approval_link: &str,
    ) -> Result<(), AppError> {
        let template = ApprovalRequestEmailTemplate {
            organizer_name: organizer.name.clone(),
            organizer_email: organizer.email.clone(),
            approval_link: approval_link.to_string(),
        };
        self.send(admin_address, &template).await
    }

    async fn notify_organizer_approved(&self, organizer: &OrganizerSummary) -> Result<(), AppError> {
        let template = OrganizerApprovedEmailTemplate {
            organizer_name: organizer.name.clone(),
        };
        self.send(&organizer.email, &template).await
    }
}
