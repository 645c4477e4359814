//! Outbound mail transport.
//!
//! The default transport writes messages to the log, which is what local
//! development and the test suite use. Real deployments swap in their own
//! implementation behind the trait.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// Logs outgoing mail instead of delivering it.
pub struct ConsoleMailer {
    from: String,
}

impl ConsoleMailer {
    #[must_use]
    pub const fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        info!(
            from = %self.from,
            to = %to,
            subject = %subject,
            "Outgoing mail:\n{body}"
        );
        Ok(())
    }
}
