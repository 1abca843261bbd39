// Network Station
// Downward contract of the radio's station-mode network stack

use crate::join::Credential;
use std::net::IpAddr;

/// Association state reported by the station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    Idle,
    Connecting,
    Connected,
    /// The stack gave up on the current attempt (bad secret, network gone)
    Failed,
}

impl StationStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

pub trait NetworkStation {
    /// Identifiers of networks currently in range
    fn scan(&mut self) -> Vec<String>;

    /// Start associating with `credential`; progress is read through `status`
    fn begin(&mut self, credential: &Credential);

    fn status(&self) -> StationStatus;

    /// Tear down any association, complete or partial
    fn disconnect(&mut self);

    fn local_address(&self) -> Option<IpAddr> {
        None
    }
}

impl<S: NetworkStation + ?Sized> NetworkStation for &mut S {
    fn scan(&mut self) -> Vec<String> {
        (**self).scan()
    }

    fn begin(&mut self, credential: &Credential) {
        (**self).begin(credential)
    }

    fn status(&self) -> StationStatus {
        (**self).status()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn local_address(&self) -> Option<IpAddr> {
        (**self).local_address()
    }
}
