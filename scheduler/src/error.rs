use std::io;

use thiserror::Error;

/// Result alias used across the scheduler crate.
pub type Result<T> = core::result::Result<T, SchedError>;

/// Errors surfaced while setting up or driving the simulation.
#[derive(Debug, Error)]
pub enum SchedError {
    /// Socket or file I/O failure during setup.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// The configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// The policy name is not one of FIFO, SJF, RR, MLFQ.
    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),
    /// The MLFQ level table is empty or its quanta decrease.
    #[error("invalid MLFQ levels: {0}")]
    InvalidLevels(String),
}

/// Failure to deliver one framed message over a channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The peer has gone away.
    #[error("channel closed")]
    Closed,
    /// The peer stopped reading and its outbound backlog is full.
    #[error("client stopped reading")]
    Stalled,
    /// Hard write error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
