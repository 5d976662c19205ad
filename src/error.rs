//! Error types for voipbl-rtbh.
//!
//! Every variant here is fatal for the running process. A peer rejecting a
//! single command is not an error; it surfaces as [`crate::session::Reply::Rejected`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("I/O error on the peer channel: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ControllerError> = std::result::Result<T, E>;
