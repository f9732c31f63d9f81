//! Error types for addrsync.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for addrsync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Shell channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Address source errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Shell channel errors (reading and writing the interactive session).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open the session channel
    #[error("Failed to open session channel")]
    OpenFailed,

    /// Failed to request PTY or shell
    #[error("Failed to request interactive shell")]
    ShellRequestFailed,

    /// The remote side never produced the prompt
    #[error("No prompt within {0:?}")]
    NoResponse(Duration),

    /// Channel closed before the prompt was seen
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// I/O error on a stream-backed channel
    #[error("Channel I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Driver layer errors (command execution).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session was already abandoned after a fatal channel error
    #[error("Session is no longer usable")]
    SessionPoisoned,

    /// Command execution failed
    #[error("Command failed: {message}")]
    CommandFailed { message: String },
}

/// Configuration file errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("config file '{}' not found or unreadable: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML or has wrong types
    #[error("config file '{}' is invalid: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A required option is empty
    #[error("option '{option}' in section [router] must not be empty")]
    EmptyOption { option: &'static str },

    /// Neither a password nor a key file was given
    #[error("section [router] needs 'password' or 'key_file'")]
    MissingCredential,
}

/// Errors reading the address source.
#[derive(Error, Debug)]
pub enum InputError {
    /// Address file could not be opened
    #[error("cannot open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading a line failed
    #[error("read failed at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using addrsync's Error.
pub type Result<T> = std::result::Result<T, Error>;
