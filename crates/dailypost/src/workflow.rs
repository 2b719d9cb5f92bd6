//! The daily content run: admission check, then one external generator
//! invocation per post, each charged against the ledger.

use dp_usage::{LimitCheck, OperationEstimate, UsageLedger};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug)]
pub enum RunOutcome {
    Completed { posts: u64 },
    Rejected(LimitCheck),
}

#[derive(Debug, Clone)]
pub struct GenerationRun {
    pub posts: u64,
    /// Charge recorded for each post.
    pub call: OperationEstimate,
    /// Pause between consecutive posts.
    pub delay: Duration,
    /// Generator program followed by its arguments.
    pub command: Vec<String>,
}

impl GenerationRun {
    /// Ledger access is blocking file IO and runs on the blocking pool.
    pub async fn execute(&self, ledger: Arc<UsageLedger>) -> anyhow::Result<RunOutcome> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("No generator command given"))?;

        let estimate = self.call.times(self.posts);
        let check = {
            let ledger = Arc::clone(&ledger);
            tokio::task::spawn_blocking(move || {
                ledger.check_limits(estimate.requests, estimate.tokens)
            })
            .await?
        };
        if !check.can_proceed {
            return Ok(RunOutcome::Rejected(check));
        }

        let date = ledger.today().to_string();
        for post in 1..=self.posts {
            tracing::info!("Generating post {}/{}", post, self.posts);

            // Charged up front so a generator that dies mid-call still counts.
            let call = self.call;
            let charged = Arc::clone(&ledger);
            tokio::task::spawn_blocking(move || charged.record_usage(call.requests, call.tokens))
                .await?;

            let status = Command::new(program)
                .args(args)
                .env("DAILYPOST_POST", post.to_string())
                .env("DAILYPOST_DATE", &date)
                .status()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to start generator {}: {}", program, e))?;

            if !status.success() {
                anyhow::bail!("Generator failed for post {}: {}", post, status);
            }

            if post < self.posts && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        Ok(RunOutcome::Completed { posts: self.posts })
    }
}
