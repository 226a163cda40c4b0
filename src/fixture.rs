//! Fixture-scoped state for ordered test steps
//!
//! Ordered steps of one fixture hand state to each other (the branch created
//! in step 20 is renamed in step 21 and deleted in step 22). That state lives
//! in a `FixtureContext` owned by the fixture run, never in statics.

use crate::error::{BrowserError, Result};
use crate::poll::{PollOutcome, WaitReport};
use std::future::Future;

/// An entity a fixture created and is responsible for removing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEntity {
    pub kind: String,
    pub name: String,
}

#[derive(Debug)]
pub struct FixtureContext {
    name: String,
    step: u32,
    created: Vec<CreatedEntity>,
}

impl FixtureContext {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        log::info!("▶ fixture {}", name);
        Self {
            name,
            step: 0,
            created: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_step(&self) -> u32 {
        self.step
    }

    /// Mark the start of the next ordered step
    pub fn begin_step(&mut self, label: &str) -> u32 {
        self.step += 1;
        log::info!("[{} #{}] {}", self.name, self.step, label);
        self.step
    }

    pub fn record_created(&mut self, kind: impl Into<String>, name: impl Into<String>) {
        let entity = CreatedEntity {
            kind: kind.into(),
            name: name.into(),
        };
        log::debug!("[{}] created {} '{}'", self.name, entity.kind, entity.name);
        self.created.push(entity);
    }

    /// Names of entities of `kind` created so far, oldest first
    pub fn created(&self, kind: &str) -> Vec<&str> {
        self.created
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Forget an entity a step already deleted; `false` if it was not recorded
    pub fn forget(&mut self, kind: &str, name: &str) -> bool {
        match self
            .created
            .iter()
            .position(|e| e.kind == kind && e.name == name)
        {
            Some(index) => {
                self.created.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove everything still recorded, newest first.
    ///
    /// Every entity is attempted even if an earlier removal fails; the
    /// failures are returned with the entity they belong to.
    pub async fn teardown<F, Fut>(&mut self, mut remove: F) -> Vec<(CreatedEntity, BrowserError)>
    where
        F: FnMut(CreatedEntity) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut failures = Vec::new();
        while let Some(entity) = self.created.pop() {
            log::info!("[{}] teardown {} '{}'", self.name, entity.kind, entity.name);
            if let Err(e) = remove(entity.clone()).await {
                log::warn!(
                    "[{}] teardown of {} '{}' failed: {}",
                    self.name,
                    entity.kind,
                    entity.name,
                    e
                );
                failures.push((entity, e));
            }
        }
        failures
    }
}

/// How a fixture treats a wait that did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The step failed
    Fail,
    /// A precondition outside the test's control was not met
    Inconclusive,
    /// Not finding the thing is the expected result
    ExpectAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepVerdict {
    Passed,
    Failed(String),
    Inconclusive(String),
}

impl StepVerdict {
    pub fn from_outcome<T>(outcome: &PollOutcome<T>, policy: FailurePolicy) -> Self {
        let report: &WaitReport = match outcome.report() {
            None => {
                return match policy {
                    FailurePolicy::ExpectAbsent => {
                        StepVerdict::Failed("expected nothing to appear, but it did".to_string())
                    }
                    _ => StepVerdict::Passed,
                }
            }
            Some(report) => report,
        };

        let reason = match outcome {
            PollOutcome::RecoveryExhausted(_) => format!("stuck: {}", report),
            _ => format!("timed out waiting for {}", report),
        };

        match policy {
            FailurePolicy::Fail => StepVerdict::Failed(reason),
            FailurePolicy::Inconclusive => StepVerdict::Inconclusive(reason),
            FailurePolicy::ExpectAbsent => StepVerdict::Passed,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, StepVerdict::Passed)
    }
}
