//! Replace the contents of a router address list.
//!
//! The update is a full rewrite: every entry of the list is removed, then
//! each address is added in input order. Commands run strictly one after
//! another, each drained to the prompt before the next is sent.

use std::future::Future;

use log::{info, warn};

use crate::address::AddressEntry;
use crate::channel::ShellChannel;
use crate::driver::{Response, SessionConfig, ShellSession};
use crate::error::{DriverError, Result};
use crate::routeros::{AddressListCommands, QUIT};

/// Opens and releases the shell channel for one run.
///
/// `connect` is only called when there is something to send.
pub trait Connector {
    /// Channel produced by a successful connect.
    type Channel: ShellChannel;

    /// Establish the connection and open an interactive shell.
    fn connect(&mut self) -> impl Future<Output = Result<Self::Channel>> + Send;

    /// Release the connection. Safe to call when not connected.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// The desired contents of one address list.
#[derive(Debug, Clone)]
pub struct AddressListUpdate {
    commands: AddressListCommands,
    entries: Vec<AddressEntry>,
}

impl AddressListUpdate {
    /// Replace the list called `list` with `entries`.
    pub fn new(list: impl Into<String>, entries: Vec<AddressEntry>) -> Self {
        Self {
            commands: AddressListCommands::new(list),
            entries,
        }
    }

    /// The list name.
    pub fn list(&self) -> &str {
        self.commands.list()
    }

    /// The entries to add, in order.
    pub fn entries(&self) -> &[AddressEntry] {
        &self.entries
    }

    /// Check if there is nothing to add.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All commands in the order they are sent.
    pub fn commands(&self) -> Vec<String> {
        let mut commands = Vec::with_capacity(self.entries.len() + 1);
        commands.push(self.commands.remove_all());
        commands.extend(self.entries.iter().map(|entry| self.commands.add(entry)));
        commands
    }
}

/// What happened on the router.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Entries the router accepted.
    pub added: usize,

    /// Add commands the router rejected.
    pub failures: Vec<Response>,
}

impl SyncSummary {
    /// Check if every command was accepted.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`push`].
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// No entries; the router was not contacted.
    Skipped,

    /// The list was rewritten.
    Applied(SyncSummary),
}

/// Connect, rewrite the list, and disconnect.
///
/// An empty update returns [`SyncOutcome::Skipped`] without calling the
/// connector. Once connected, the connection is released whether or not
/// the update succeeded.
pub async fn push<K: Connector>(
    connector: &mut K,
    update: &AddressListUpdate,
    config: SessionConfig,
) -> Result<SyncOutcome> {
    if update.is_empty() {
        info!("No entries for address list '{}', not connecting", update.list());
        return Ok(SyncOutcome::Skipped);
    }

    let channel = match connector.connect().await {
        Ok(channel) => channel,
        Err(e) => {
            if let Err(close_err) = connector.disconnect().await {
                warn!("Disconnect after failed connect: {}", close_err);
            }
            return Err(e);
        }
    };
    info!("SSH connected.");

    let mut session = ShellSession::new(channel, config);
    let result = apply(&mut session, update).await;

    if result.is_ok() {
        // The router closes the channel on quit; nothing to read back.
        if let Err(e) = session.send_line(QUIT).await {
            warn!("Sending {:?} failed: {}", QUIT, e);
        }
    }
    let closed = connector.disconnect().await;
    info!("SSH session closed.");

    let summary = result?;
    closed?;
    Ok(SyncOutcome::Applied(summary))
}

/// Run the full rewrite over an open session.
pub async fn apply<C: ShellChannel>(
    session: &mut ShellSession<C>,
    update: &AddressListUpdate,
) -> Result<SyncSummary> {
    session.drain_banner().await?;

    let commands = &update.commands;
    info!("Removing all entries from address list '{}'...", update.list());
    let response = session.execute(&commands.remove_all()).await?;
    if let Some(message) = response.failure_message {
        // Adding on top of a list that was not cleared would merge, not replace.
        return Err(DriverError::CommandFailed {
            message: format!("remove from '{}': {}", update.list(), message),
        }
        .into());
    }

    let mut summary = SyncSummary::default();
    for entry in update.entries() {
        info!("Adding {} to address list '{}'...", entry, update.list());
        let response = session.execute(&commands.add(entry)).await?;
        match &response.failure_message {
            Some(message) => {
                warn!("Router rejected {}: {}", entry, message);
                summary.failures.push(response);
            }
            None => summary.added += 1,
        }
    }

    Ok(summary)
}
