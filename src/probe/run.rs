//! Run loop: start the node, wait for the probe under a layered timeout,
//! and always tear down.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::domain::{Completion, CompletionSignal};
use crate::error::Result;
use crate::runtime::TradingNode;

const SLOW_START_HINTS: &str = "Possible causes:\n  \
    - API keys are wrong or lack permissions.\n  \
    - The exchange testnet is having a temporary outage.\n  \
    - The local clock is out of sync with the exchange servers.\n  \
    - A network or firewall problem is blocking the connection.";

/// Two-stage wait budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Wait before logging the slow-start hint.
    pub first_wait: Duration,
    /// Overall budget, including `first_wait`.
    pub total_wait: Duration,
}

impl WaitPolicy {
    #[must_use]
    pub fn remaining_after_first(&self) -> Duration {
        self.total_wait.saturating_sub(self.first_wait)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            first_wait: Duration::from_secs(15),
            total_wait: Duration::from_secs(60),
        }
    }
}

/// How a probe run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A bar arrived within the budget.
    Completed,
    /// The whole budget elapsed without a bar.
    TimedOut,
    /// The actor gave up, e.g. the instrument could not be resolved.
    Aborted { reason: String },
    /// The operator interrupted the wait.
    Cancelled,
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Whether the first wait expired and the slow-start hint was logged.
    pub slow_start_warned: bool,
    pub elapsed: Duration,
}

/// Deadlines for one run, fixed when the run begins.
#[derive(Debug)]
struct Budget {
    policy: WaitPolicy,
    started: Instant,
    warned: bool,
}

impl Budget {
    fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            warned: false,
        }
    }

    /// Drive `fut` until it resolves or the total budget expires, logging the
    /// slow-start hint once when the first wait passes.
    async fn within<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        if !self.warned {
            match timeout_at(self.started + self.policy.first_wait, &mut fut).await {
                Ok(out) => return Some(out),
                Err(_) => self.warn_slow_start(),
            }
        }
        timeout_at(self.started + self.policy.total_wait, fut).await.ok()
    }

    fn warn_slow_start(&mut self) {
        self.warned = true;
        warn!(
            waited_secs = self.policy.first_wait.as_secs(),
            "No bar data in the first wait window, still waiting"
        );
        warn!("{SLOW_START_HINTS}");
    }

    fn report(&self, outcome: RunOutcome) -> RunReport {
        RunReport {
            outcome,
            slow_start_warned: self.warned,
            elapsed: self.started.elapsed(),
        }
    }
}

fn outcome_of(state: Option<Completion>, policy: &WaitPolicy) -> RunOutcome {
    match state {
        Some(Completion::Succeeded) => RunOutcome::Completed,
        Some(Completion::Aborted { reason }) => {
            error!(reason = %reason, "Probe aborted");
            RunOutcome::Aborted { reason }
        }
        Some(Completion::Pending) | None => {
            error!(
                total_secs = policy.total_wait.as_secs(),
                "Timed out: no bar data received within the total wait"
            );
            RunOutcome::TimedOut
        }
    }
}

/// Wait for `signal` under `policy`.
///
/// Logs one warning with troubleshooting hints if the first wait expires, and
/// an error if the whole budget expires.
pub async fn wait_for_completion(signal: &CompletionSignal, policy: &WaitPolicy) -> RunReport {
    let mut budget = Budget::new(*policy);
    let state = budget.within(signal.wait()).await;
    budget.report(outcome_of(state, policy))
}

/// Start the node and wait for the signal, both inside `budget`.
async fn start_and_wait(
    node: &mut TradingNode,
    signal: &CompletionSignal,
    budget: &mut Budget,
) -> Result<RunOutcome> {
    let policy = budget.policy;
    match budget.within(node.start()).await {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            error!(error = %e, "Node failed to start");
            return Err(e);
        }
        None => {
            error!(
                total_secs = policy.total_wait.as_secs(),
                "Timed out: node did not start within the total wait"
            );
            return Ok(RunOutcome::TimedOut);
        }
    }

    info!(
        total_secs = policy.total_wait.as_secs(),
        "Probe running, waiting for bar data"
    );
    info!("Press CTRL+C to stop");
    let state = budget.within(signal.wait()).await;
    Ok(outcome_of(state, &policy))
}

/// Start `node`, wait for the probe, then stop and dispose the node.
///
/// The budget counts from entry, so a node that hangs while connecting is
/// bounded by `policy.total_wait` too. `interrupt` resolving cancels either
/// phase. Teardown runs on every path, including a failed start.
///
/// # Errors
///
/// Returns the start error if the node could not be started. Teardown has
/// already run by then.
pub async fn run<I>(
    node: &mut TradingNode,
    signal: &CompletionSignal,
    policy: &WaitPolicy,
    interrupt: I,
) -> Result<RunReport>
where
    I: Future<Output = ()>,
{
    let mut budget = Budget::new(*policy);

    let result = tokio::select! {
        biased;
        () = interrupt => {
            info!("Probe cancelled");
            Ok(RunOutcome::Cancelled)
        }
        outcome = start_and_wait(node, signal, &mut budget) => outcome,
    };

    let result = result.map(|outcome| budget.report(outcome));
    teardown(node).await;
    let report = result?;
    info!(outcome = ?report.outcome, elapsed = ?report.elapsed, "Run complete");
    Ok(report)
}

async fn teardown(node: &mut TradingNode) {
    info!("Probe finished, stopping node");
    if let Err(e) = node.stop().await {
        error!(error = %e, "Node stop failed");
    }
    node.dispose().await;
    info!("Node stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> WaitPolicy {
        WaitPolicy::default()
    }

    #[test]
    fn default_policy_matches_fifteen_plus_fortyfive() {
        let policy = policy();
        assert_eq!(policy.first_wait, Duration::from_secs(15));
        assert_eq!(policy.remaining_after_first(), Duration::from_secs(45));
    }

    #[tokio::test(start_paused = true)]
    async fn completes_without_warning_when_signal_is_early() {
        let signal = CompletionSignal::new();
        let writer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            writer.set();
        });

        let report = wait_for_completion(&signal, &policy()).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(!report.slow_start_warned);
        assert!(report.elapsed >= Duration::from_secs(5));
        assert!(report.elapsed < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn warns_then_completes_when_signal_is_late() {
        let signal = CompletionSignal::new();
        let writer = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(20)).await;
            writer.set();
        });

        let report = wait_for_completion(&signal, &policy()).await;

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert!(report.slow_start_warned);
        assert!(report.elapsed >= Duration::from_secs(20));
        assert!(report.elapsed < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_total_budget() {
        let signal = CompletionSignal::new();

        let report = wait_for_completion(&signal, &policy()).await;

        assert_eq!(report.outcome, RunOutcome::TimedOut);
        assert!(report.slow_start_warned);
        assert!(report.elapsed >= Duration::from_secs(60));
        assert!(report.elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn abort_ends_wait_immediately() {
        let signal = CompletionSignal::new();
        signal.abort("unknown symbol");

        let report = wait_for_completion(&signal, &policy()).await;

        assert_eq!(
            report.outcome,
            RunOutcome::Aborted {
                reason: "unknown symbol".into()
            }
        );
        assert!(report.elapsed < Duration::from_secs(1));
    }
}
