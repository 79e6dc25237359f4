//! Session membership, passphrase admission, and expiration sweeping.

pub mod error;
pub mod registry;
pub mod sweeper;
mod token;
pub mod verifier;

#[cfg(test)]
mod registry_tests;

pub use error::SessionError;
pub use registry::JoinOutcome;
pub use registry::SessionPhase;
pub use registry::SessionRegistry;
pub use sweeper::ExpirationSweeper;
pub use sweeper::SweeperHooks;
pub use token::issue as issue_token;
