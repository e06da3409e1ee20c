use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync + 'static {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Writes outbound mail to the log instead of a mail server.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "outbound email");
        Ok(())
    }
}

/// Mail failures never fail the request that triggered them.
pub async fn deliver(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        error!("failed to send email to {to}: {e}");
    }
}

pub mod messages {
    use super::Email;

    pub fn volunteer_approved(to: &str, name: &str) -> Email {
        Email::new(
            to,
            "Your volunteer application was approved",
            format!("Hello {name}, your application has been approved. You can now sign in."),
        )
    }

    pub fn volunteer_rejected(to: &str, name: &str) -> Email {
        Email::new(
            to,
            "Your volunteer application",
            format!("Hello {name}, unfortunately your application was not approved."),
        )
    }

    pub fn task_assigned(to: &str, title: &str) -> Email {
        Email::new(
            to,
            "New task assigned",
            format!("You have been assigned the task \"{title}\". Please accept or reject it."),
        )
    }

    pub fn shelter_assigned(to: &str, shelter: &str) -> Email {
        Email::new(
            to,
            "New shelter duty",
            format!("You have been assigned to shelter \"{shelter}\"."),
        )
    }

    pub fn donation_receipt(to: &str, name: &str, amount: i64, currency: &str, campaign: &str) -> Email {
        Email::new(
            to,
            "Thank you for your donation",
            format!(
                "Dear {name}, we received your donation of {}.{:02} {currency} to \"{campaign}\".",
                amount / 100,
                amount % 100
            ),
        )
    }
}
