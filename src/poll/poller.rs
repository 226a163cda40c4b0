//! Bounded-retry condition poller
//!
//! Repeatedly evaluates a condition against live page state until it yields a
//! value, a recovery action has been tried too many times, or the wall-clock
//! deadline passes. Ticks are strictly sequential: tick, sleep, tick. A
//! recovery action always runs to completion before the next tick starts.

use crate::error::{BrowserError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of a single condition evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    /// The condition holds and produced a value
    Ready(T),
    /// Keep polling
    NotYet,
}

impl<T> Tick<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Tick::Ready(v),
            None => Tick::NotYet,
        }
    }
}

impl Tick<()> {
    pub fn when(holds: bool) -> Self {
        if holds {
            Tick::Ready(())
        } else {
            Tick::NotYet
        }
    }
}

/// Timing and recovery settings for one poll
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// What is being waited for, used in every log line and failure message
    pub description: String,

    /// Delay between ticks
    pub interval: Duration,

    /// Overall deadline, measured from the start of the poll
    pub timeout: Duration,

    /// Consecutive failed ticks allowed before the recovery action runs
    pub max_attempts_before_recovery: u32,

    /// How many times recovery may run before the poll gives up
    pub max_recovery_cycles: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            description: "condition".to_string(),
            interval: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_attempts_before_recovery: 3,
            max_recovery_cycles: 2,
        }
    }
}

impl PollOptions {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    /// Short DOM update (element appears after a click)
    pub fn dom_update(description: impl Into<String>) -> Self {
        Self::new(description).with_timeout(Duration::from_secs(5))
    }

    /// Short-running save round trip
    pub fn save(description: impl Into<String>) -> Self {
        Self::new(description).with_timeout(Duration::from_secs(15))
    }

    /// Full assistant round trip through an LLM provider
    pub fn llm_round_trip(description: impl Into<String>) -> Self {
        Self::new(description).with_timeout(Duration::from_secs(120))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts_before_recovery(mut self, attempts: u32) -> Self {
        self.max_attempts_before_recovery = attempts;
        self
    }

    pub fn with_max_recovery_cycles(mut self, cycles: u32) -> Self {
        self.max_recovery_cycles = cycles;
        self
    }
}

/// Diagnostic attached to every failed poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitReport {
    pub description: String,
    pub elapsed: Duration,
    pub timeout: Duration,
    pub ticks: u32,
    pub recoveries: u32,
}

impl fmt::Display for WaitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (waited {} ms of {} ms, {} checks",
            self.description,
            self.elapsed.as_millis(),
            self.timeout.as_millis(),
            self.ticks
        )?;
        if self.recoveries > 0 {
            write!(f, ", {} recovery attempts", self.recoveries)?;
        }
        write!(f, ")")
    }
}

/// Final state of a poll. Failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Succeeded(T),
    TimedOut(WaitReport),
    RecoveryExhausted(WaitReport),
}

impl<T> PollOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Succeeded(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            PollOutcome::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    /// The failure diagnostic, if the poll did not succeed
    pub fn report(&self) -> Option<&WaitReport> {
        match self {
            PollOutcome::Succeeded(_) => None,
            PollOutcome::TimedOut(r) | PollOutcome::RecoveryExhausted(r) => Some(r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PollOutcome<U> {
        match self {
            PollOutcome::Succeeded(v) => PollOutcome::Succeeded(f(v)),
            PollOutcome::TimedOut(r) => PollOutcome::TimedOut(r),
            PollOutcome::RecoveryExhausted(r) => PollOutcome::RecoveryExhausted(r),
        }
    }

    /// Convert the failure outcomes into typed errors for callers using `?`
    pub fn into_result(self) -> Result<T> {
        match self {
            PollOutcome::Succeeded(v) => Ok(v),
            PollOutcome::TimedOut(r) => Err(BrowserError::Timeout(r)),
            PollOutcome::RecoveryExhausted(r) => Err(BrowserError::RecoveryExhausted(r)),
        }
    }
}

/// Corrective action run after repeated failed ticks (reload, reopen a panel)
pub struct Recovery<'a> {
    label: String,
    action: Box<dyn FnMut() -> BoxFuture<'a, Result<()>> + Send + 'a>,
}

impl<'a> Recovery<'a> {
    pub fn new<F, Fut>(label: impl Into<String>, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'a,
        Fut: Future<Output = Result<()>> + Send + 'a,
    {
        Self {
            label: label.into(),
            action: Box::new(move || action().boxed()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    async fn run(&mut self) -> Result<()> {
        (self.action)().await
    }
}

impl fmt::Debug for Recovery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Poll `condition` until it yields a value or the poll fails.
///
/// * The first tick runs immediately; success needs no confirmation tick.
/// * An `Err` from the condition or the recovery action propagates at once.
/// * No tick starts at or after `options.timeout`.
/// * With a recovery action, it runs after every
///   `max_attempts_before_recovery` consecutive failed ticks. Once
///   `max_recovery_cycles` recoveries have run and another one is due, the
///   poll ends with `RecoveryExhausted`. A deadline reached after at least one
///   recovery also reports `RecoveryExhausted`.
pub async fn poll_until<T, C, Fut>(
    options: &PollOptions,
    mut recovery: Option<Recovery<'_>>,
    mut condition: C,
) -> Result<PollOutcome<T>>
where
    C: FnMut() -> Fut,
    Fut: Future<Output = Result<Tick<T>>>,
{
    let started = Instant::now();
    let deadline = started + options.timeout;
    let attempts_per_cycle = options.max_attempts_before_recovery.max(1);

    let mut ticks: u32 = 0;
    let mut attempts: u32 = 0;
    let mut recoveries: u32 = 0;

    let report = |ticks: u32, recoveries: u32| WaitReport {
        description: options.description.clone(),
        elapsed: started.elapsed(),
        timeout: options.timeout,
        ticks,
        recoveries,
    };

    loop {
        if ticks > 0 && Instant::now() >= deadline {
            break;
        }

        ticks += 1;
        log::debug!(
            "⏳ [{}] check {} at {} ms",
            options.description,
            ticks,
            started.elapsed().as_millis()
        );

        if let Tick::Ready(value) = condition().await? {
            log::info!(
                "✓ [{}] satisfied after {} checks in {} ms",
                options.description,
                ticks,
                started.elapsed().as_millis()
            );
            return Ok(PollOutcome::Succeeded(value));
        }
        attempts += 1;

        if let Some(rec) = recovery.as_mut() {
            if attempts >= attempts_per_cycle {
                if recoveries >= options.max_recovery_cycles {
                    let r = report(ticks, recoveries);
                    log::warn!("❌ [{}] recovery exhausted: {}", options.description, r);
                    return Ok(PollOutcome::RecoveryExhausted(r));
                }
                if Instant::now() >= deadline {
                    break;
                }

                recoveries += 1;
                attempts = 0;
                log::info!(
                    "🔄 [{}] not satisfied after {} checks, recovering ({}/{}): {}",
                    options.description,
                    attempts_per_cycle,
                    recoveries,
                    options.max_recovery_cycles,
                    rec.label()
                );
                rec.run().await?;
                continue;
            }
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep_until((now + options.interval).min(deadline)).await;
    }

    let r = report(ticks, recoveries);
    if recoveries > 0 {
        log::warn!("❌ [{}] recovery exhausted at deadline: {}", options.description, r);
        Ok(PollOutcome::RecoveryExhausted(r))
    } else {
        log::warn!("❌ [{}] timed out: {}", options.description, r);
        Ok(PollOutcome::TimedOut(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn options() -> PollOptions {
        PollOptions::new("test condition")
            .with_interval(Duration::from_millis(500))
            .with_timeout(Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let start = Instant::now();
        let outcome = poll_until(&options(), None, || async { Ok(Tick::Ready(42)) })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Succeeded(42));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_description() {
        let calls = &AtomicU32::new(0);
        let opts = options().with_timeout(Duration::from_millis(1200));

        let outcome: PollOutcome<()> = poll_until(&opts, None, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Tick::NotYet)
        })
        .await
        .unwrap();

        let report = outcome.report().expect("should fail").clone();
        assert!(matches!(outcome, PollOutcome::TimedOut(_)));
        // ticks at 0, 500, 1000; the clamped sleep lands on the deadline
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.ticks, 3);
        assert_eq!(report.elapsed, Duration::from_millis(1200));
        assert!(report.to_string().contains("test condition"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_before_recovery_is_treated_as_one() {
        let recovered = &AtomicU32::new(0);
        let checks = &AtomicU32::new(0);
        let opts = options().with_max_attempts_before_recovery(0);

        let recovery = Recovery::new("count", move || async move {
            recovered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let outcome = poll_until(&opts, Some(recovery), move || async move {
            let n = checks.fetch_add(1, Ordering::SeqCst);
            Ok(Tick::when(n >= 1))
        })
        .await
        .unwrap();

        assert!(outcome.is_success());
        assert_eq!(recovered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_into_result_maps_failures() {
        let report = WaitReport {
            description: "row 'Berlin'".to_string(),
            elapsed: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            ticks: 10,
            recoveries: 0,
        };

        let timed_out: PollOutcome<()> = PollOutcome::TimedOut(report.clone());
        let err = timed_out.into_result().unwrap_err();
        assert!(err.is_wait_failure());
        assert!(err.to_string().contains("row 'Berlin'"));

        let exhausted: PollOutcome<()> = PollOutcome::RecoveryExhausted(report);
        assert!(matches!(
            exhausted.into_result(),
            Err(BrowserError::RecoveryExhausted(_))
        ));
    }

    #[test]
    fn test_report_display_mentions_recoveries() {
        let report = WaitReport {
            description: "chat input enabled".to_string(),
            elapsed: Duration::from_millis(4500),
            timeout: Duration::from_secs(30),
            ticks: 9,
            recoveries: 2,
        };
        assert_eq!(
            report.to_string(),
            "chat input enabled (waited 4500 ms of 30000 ms, 9 checks, 2 recovery attempts)"
        );
    }

    #[test]
    fn test_presets() {
        assert_eq!(PollOptions::dom_update("x").timeout, Duration::from_secs(5));
        assert_eq!(PollOptions::save("x").timeout, Duration::from_secs(15));
        assert_eq!(
            PollOptions::llm_round_trip("x").timeout,
            Duration::from_secs(120)
        );
        assert_eq!(PollOptions::default().interval, Duration::from_millis(500));
    }
}
