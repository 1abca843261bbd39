// Network Join Procedure
//
// Establishes station connectivity for the socket link before its listener
// opens. Runs once at startup and is the only part of the crate allowed to
// block: each attempt polls the station until it connects, fails, or the
// per-attempt timeout runs out.

use crate::clock::{Clock, SystemClock};
use crate::join::{CredentialList, NetworkStation, StationStatus, MAX_CREDENTIALS};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("No network credentials configured")]
    NoCredentials,

    #[error("Too many network credentials: {count} (max {max})")]
    TooManyCredentials { count: usize, max: usize },

    #[error("Could not join any configured network ({attempted} attempted)")]
    Exhausted { attempted: usize },
}

impl JoinError {
    /// Whether running the procedure again later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

// ============================================================================
// CONFIG
// ============================================================================

/// How candidates are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    /// Try every credential in order, each up to the attempt timeout
    #[default]
    Sequential,
    /// Scan first and only try credentials whose network is in range
    ScanThenMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    pub strategy: JoinStrategy,
    /// Upper bound on one attempt, in milliseconds
    pub attempt_timeout_ms: u64,
    /// Station status poll period, in milliseconds
    pub poll_interval_ms: u64,
    /// Try every credential; when false only the first configured one is used
    pub multi: bool,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            strategy: JoinStrategy::Sequential,
            attempt_timeout_ms: 10_000,
            poll_interval_ms: 250,
            multi: true,
        }
    }
}

impl JoinConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Network that was joined
    pub identifier: String,
    /// Slot of the credential in the configured list
    pub index: usize,
    /// Attempts made, including the successful one
    pub attempts: usize,
    pub address: Option<IpAddr>,
    pub elapsed: Duration,
}

// ============================================================================
// PROCEDURE
// ============================================================================

pub struct JoinProcedure<S, K = SystemClock> {
    station: S,
    clock: K,
    config: JoinConfig,
}

impl<S: NetworkStation> JoinProcedure<S, SystemClock> {
    pub fn new(station: S, config: JoinConfig) -> Self {
        Self::with_clock(station, config, SystemClock::new())
    }
}

impl<S: NetworkStation, K: Clock> JoinProcedure<S, K> {
    pub fn with_clock(station: S, config: JoinConfig, clock: K) -> Self {
        Self {
            station,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    pub fn into_station(self) -> S {
        self.station
    }

    /// Join the first reachable network. Stops at the first success.
    pub fn run(&mut self, credentials: &CredentialList) -> Result<JoinOutcome, JoinError> {
        let limit = if self.config.multi { MAX_CREDENTIALS } else { 1 };
        let candidates: Vec<_> = credentials.usable().take(limit).collect();
        if candidates.is_empty() {
            return Err(JoinError::NoCredentials);
        }

        let started = self.clock.now();
        let visible = match self.config.strategy {
            JoinStrategy::Sequential => None,
            JoinStrategy::ScanThenMatch => {
                let found = self.station.scan();
                tracing::info!(networks = found.len(), "scan complete");
                Some(found)
            }
        };

        let mut attempted = 0;
        for (index, credential) in candidates {
            if let Some(visible) = &visible {
                if !visible.iter().any(|name| *name == credential.identifier) {
                    tracing::debug!(network = %credential.identifier, "not in range, skipped");
                    continue;
                }
            }

            attempted += 1;
            tracing::info!(network = %credential.identifier, attempt = attempted, "joining network");
            self.station.begin(credential);

            if self.wait_for_connection() {
                let address = self.station.local_address();
                tracing::info!(network = %credential.identifier, ?address, "network joined");
                return Ok(JoinOutcome {
                    identifier: credential.identifier.clone(),
                    index,
                    attempts: attempted,
                    address,
                    elapsed: self.clock.now().saturating_sub(started),
                });
            }

            tracing::warn!(network = %credential.identifier, "join attempt failed");
            self.station.disconnect();
        }

        tracing::warn!(attempted, "could not join any configured network");
        Err(JoinError::Exhausted { attempted })
    }

    /// Poll the station until it connects, fails, or the attempt times out
    fn wait_for_connection(&mut self) -> bool {
        let start = self.clock.now();
        let timeout = self.config.attempt_timeout();
        loop {
            match self.station.status() {
                StationStatus::Connected => return true,
                StationStatus::Failed => return false,
                StationStatus::Idle | StationStatus::Connecting => {}
            }
            if self.clock.now().saturating_sub(start) >= timeout {
                return false;
            }
            self.clock.sleep(self.config.poll_interval());
        }
    }
}
