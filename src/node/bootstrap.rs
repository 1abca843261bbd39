// Startup Assembly
//
// Turns the configured links into the node's single Link: runs the network
// join the socket link depends on, applies the fallback rule, and wraps the
// survivors in the arbiter the policy asks for.

use crate::arbiter::{FailoverArbiter, FanOutArbiter};
use crate::clock::Clock;
use crate::join::{CredentialList, JoinError, JoinOutcome, JoinProcedure, NetworkStation};
use crate::link::{Link, LinkError};
use crate::node::{ConfigError, LinkPolicy};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("No link is available after startup")]
    NoLinks,

    #[error("Wireless link is not available on this platform")]
    WirelessUnavailable,

    #[error("Unsupported serial device: {0}")]
    SerialUnavailable(String),
}

// ============================================================================
// NETWORK JOIN
// ============================================================================

/// What the startup join produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinState {
    /// No credentials configured; the network is managed elsewhere
    NotRequired,
    Joined(JoinOutcome),
    Failed(JoinError),
}

impl JoinState {
    /// Whether a socket link may be brought up
    pub fn permits_socket(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Run the join procedure if any credential is configured
pub fn join_network<S: NetworkStation, K: Clock>(
    procedure: &mut JoinProcedure<S, K>,
    credentials: &CredentialList,
) -> JoinState {
    if !credentials.has_usable() {
        tracing::debug!("no network credentials, join skipped");
        return JoinState::NotRequired;
    }
    match procedure.run(credentials) {
        Ok(outcome) => JoinState::Joined(outcome),
        Err(e) => {
            tracing::warn!(error = %e, "network join failed");
            JoinState::Failed(e)
        }
    }
}

// ============================================================================
// LINK ASSEMBLY
// ============================================================================

/// Links that came up at startup, before arbitration
#[derive(Default)]
pub struct StartupLinks<'a> {
    pub socket: Option<Box<dyn Link + 'a>>,
    pub wireless: Option<Box<dyn Link + 'a>>,
    pub serial: Option<Box<dyn Link + 'a>>,
}

impl<'a> StartupLinks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socket(mut self, link: impl Link + 'a) -> Self {
        self.socket = Some(Box::new(link) as Box<dyn Link + 'a>);
        self
    }

    pub fn with_wireless(mut self, link: impl Link + 'a) -> Self {
        self.wireless = Some(Box::new(link) as Box<dyn Link + 'a>);
        self
    }

    pub fn with_serial(mut self, link: impl Link + 'a) -> Self {
        self.serial = Some(Box::new(link) as Box<dyn Link + 'a>);
        self
    }

    pub fn count(&self) -> usize {
        [&self.socket, &self.wireless, &self.serial]
            .into_iter()
            .filter(|l| l.is_some())
            .count()
    }
}

/// Build the node's link from whatever came up. The result is enabled.
///
/// Priority, highest first: socket, wireless, serial. A failed join removes
/// the socket link before the policy is applied.
pub fn assemble<'a>(
    policy: LinkPolicy,
    mut links: StartupLinks<'a>,
    join: &JoinState,
    health_check_ticks: u32,
) -> Result<Box<dyn Link + 'a>, NodeError> {
    if !join.permits_socket() && links.socket.take().is_some() {
        tracing::warn!("socket link dropped, network unavailable");
    }

    let mut chosen: Vec<Box<dyn Link + 'a>> = match policy {
        LinkPolicy::Fallback => links
            .socket
            .or(links.wireless)
            .or(links.serial)
            .into_iter()
            .collect(),
        LinkPolicy::Failover | LinkPolicy::FanOut => [links.socket, links.wireless, links.serial]
            .into_iter()
            .flatten()
            .collect(),
    };

    let mut link: Box<dyn Link + 'a> = if chosen.len() > 1 {
        tracing::info!(?policy, links = chosen.len(), "arbitrating links");
        match policy {
            LinkPolicy::FanOut => Box::new(FanOutArbiter::new(chosen)),
            _ => Box::new(FailoverArbiter::new(chosen).with_health_check_ticks(health_check_ticks)),
        }
    } else {
        let only = chosen.pop().ok_or(NodeError::NoLinks)?;
        tracing::info!(link = %only.kind(), "single link in use");
        only
    };

    link.enable();
    Ok(link)
}
