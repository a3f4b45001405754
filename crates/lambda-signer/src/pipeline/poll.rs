/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Bounded polling of signing jobs.
//!
//! A job moves through `Pending -> Succeeded | Failed | TimedOut`; only the
//! terminal [`JobOutcome`] leaves the poller. Between
//! polls the poller sleeps with exponential backoff capped at
//! [`PollPolicy::max_interval`]. The wait budget is measured on the tokio
//! clock, so tests can drive it with a paused runtime.

use crate::provider::{JobStatus, ProviderError, SignedObject, SigningService};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Backoff and budget for waiting on a signing job.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first non-terminal poll.
    pub initial_interval: Duration,
    /// Upper bound for any single delay.
    pub max_interval: Duration,
    /// Growth factor applied per poll.
    pub multiplier: f64,
    /// Total wait budget; `None` waits forever.
    pub max_wait: Option<Duration>,
    /// Maximum number of polls; `None` means unlimited.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            max_wait: Some(Duration::from_secs(900)),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    /// Policy with a constant delay and no budget.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
            max_wait: None,
            max_attempts: None,
        }
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay after the `attempt`-th poll (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_interval.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            self.max_interval
        }
    }
}

/// Terminal result of waiting on a signing job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded {
        signed_object: Option<SignedObject>,
        attempts: u32,
    },
    Failed {
        reason: String,
        attempts: u32,
    },
    TimedOut {
        attempts: u32,
        waited: Duration,
    },
}

impl JobOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            JobOutcome::Succeeded { attempts, .. }
            | JobOutcome::Failed { attempts, .. }
            | JobOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// State of a signing job as observed by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending { attempts: u32 },
    Finished(JobOutcome),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished(_))
    }

    pub fn attempts(&self) -> u32 {
        match self {
            JobState::Pending { attempts } => *attempts,
            JobState::Finished(outcome) => outcome.attempts(),
        }
    }
}

/// Polls one signing job until it reaches a terminal [`JobOutcome`].
pub struct JobPoller<'a> {
    signer: &'a dyn SigningService,
    policy: &'a PollPolicy,
}

impl<'a> JobPoller<'a> {
    pub fn new(signer: &'a dyn SigningService, policy: &'a PollPolicy) -> Self {
        Self { signer, policy }
    }

    /// Wait for `job_id` to finish.
    ///
    /// A job that is still in progress when the budget runs out yields
    /// [`JobOutcome::TimedOut`]. Errors from the signing service end the wait
    /// immediately.
    pub async fn wait(&self, job_id: &str) -> Result<JobOutcome, ProviderError> {
        let started = Instant::now();
        let mut state = JobState::Pending { attempts: 0 };

        loop {
            match state {
                JobState::Finished(outcome) => return Ok(outcome),
                JobState::Pending { attempts } => {
                    state = self.poll_once(job_id, attempts + 1, started).await?;
                }
            }
        }
    }

    async fn poll_once(
        &self,
        job_id: &str,
        attempts: u32,
        started: Instant,
    ) -> Result<JobState, ProviderError> {
        let description = self.signer.describe_job(job_id).await?;

        let outcome = match description.status {
            JobStatus::Succeeded => JobOutcome::Succeeded {
                signed_object: description.signed_object,
                attempts,
            },
            JobStatus::Failed => JobOutcome::Failed {
                reason: description
                    .status_reason
                    .unwrap_or_else(|| "no reason given".to_string()),
                attempts,
            },
            JobStatus::InProgress => return Ok(self.next_pending(job_id, attempts, started).await),
        };

        Ok(JobState::Finished(outcome))
    }

    async fn next_pending(&self, job_id: &str, attempts: u32, started: Instant) -> JobState {
        let waited = started.elapsed();
        let timed_out = JobState::Finished(JobOutcome::TimedOut { attempts, waited });

        if self.policy.max_attempts.is_some_and(|max| attempts >= max) {
            return timed_out;
        }

        let mut delay = self.policy.delay_for(attempts);
        if let Some(max_wait) = self.policy.max_wait {
            if waited >= max_wait {
                return timed_out;
            }
            delay = delay.min(max_wait - waited);
        }

        debug!(
            job_id = %job_id,
            attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            "Signing job in progress"
        );
        tokio::time::sleep(delay).await;

        JobState::Pending { attempts }
    }
}
