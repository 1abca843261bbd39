// Join module - startup network connectivity for the socket link

mod credentials;
mod procedure;
mod station;

pub use credentials::{Credential, CredentialList, MAX_CREDENTIALS};
pub use procedure::{JoinConfig, JoinError, JoinOutcome, JoinProcedure, JoinStrategy};
pub use station::{NetworkStation, StationStatus};
