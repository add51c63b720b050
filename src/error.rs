//! Error types shared by both nodes.
//!
//! A password mismatch is **not** an error: it travels on the wire as
//! `PASS_NO_MATCH` and is handled by the retry policy. The errors below are the
//! conditions that end a node's state machine.

use std::io;

use thiserror::Error;

use crate::protocol::CredentialError;

/// Failures of the byte link between the two nodes.
#[derive(Error, Debug)]
pub enum LinkError {
    /// The peer went away (channel dropped or port disconnected).
    #[error("link closed by peer")]
    Closed,

    /// A receive waited longer than the configured receive timeout.
    #[error("timed out waiting for a byte from the peer")]
    TimedOut,

    #[error("link i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the persistent credential store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("offset {0} is outside the credential record")]
    OutOfRange(usize),

    #[error("credential store i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Failures of the user input device.
#[derive(Error, Debug)]
pub enum InputError {
    /// No more input will ever come (script exhausted or user quit).
    #[error("input device closed")]
    Closed,

    #[error("input device error: {0}")]
    Io(#[from] io::Error),
}

/// Top-level error for anything that aborts a node.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("motion sensor error: {0}")]
    Sensor(io::Error),

    #[error("serial port error: {0}")]
    Port(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
