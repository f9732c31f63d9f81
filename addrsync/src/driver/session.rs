//! Shell session driver: synchronous request/response over a raw shell stream.
//!
//! One command is in flight at a time. After the command line is sent the
//! session reads chunks until the decoded output ends with the prompt,
//! answering every pager interruption with a continuation on the way.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use super::response::Response;
use crate::channel::{OutputBuffer, ShellChannel, ShellMarkers};
use crate::error::{ChannelError, DriverError, Result};

/// Configuration for shell session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prompt, pager and framing strings.
    pub markers: ShellMarkers,

    /// Upper bound on waiting for the prompt, per command.
    ///
    /// `None` waits forever.
    pub read_timeout: Option<Duration>,

    /// Maximum bytes requested per receive.
    pub chunk_size: usize,

    /// Drop ANSI escape sequences from the output.
    pub strip_ansi: bool,

    /// Substrings that mark a command as rejected by the shell.
    pub failed_when_contains: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            markers: ShellMarkers::default(),
            read_timeout: Some(Duration::from_secs(30)),
            chunk_size: 4096,
            strip_ansi: false,
            failed_when_contains: Vec::new(),
        }
    }
}

/// Where the session is in the current command exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for more output.
    AwaitingOutput,

    /// A page break was answered; waiting for the next page.
    Paginating,

    /// The prompt was seen; the shell is idle.
    Complete,
}

/// Drives an interactive shell one command at a time.
///
/// The session owns the channel for its lifetime. Any channel error
/// leaves the stream at an unknown position, so the session refuses
/// further commands afterwards.
pub struct ShellSession<C> {
    channel: C,
    config: SessionConfig,
    state: SessionState,
    last_prompt: Option<String>,
    poisoned: bool,
}

impl<C: ShellChannel> ShellSession<C> {
    /// Create a session over an already-open shell channel.
    pub fn new(channel: C, config: SessionConfig) -> Self {
        Self {
            channel,
            config,
            state: SessionState::Complete,
            last_prompt: None,
            poisoned: false,
        }
    }

    /// Current state of the command exchange.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The prompt that ended the most recent command, if any.
    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Release the channel.
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Consume the login banner and bring the shell to a known idle prompt.
    ///
    /// Discards the first chunk the shell sends, then executes an empty
    /// command so that whatever follows the banner is drained too.
    pub async fn drain_banner(&mut self) -> Result<Response> {
        self.ensure_usable()?;
        let deadline = self.deadline();
        match self.receive_chunk(deadline).await {
            Ok(banner) => trace!("banner: {:?}", String::from_utf8_lossy(&banner)),
            Err(e) => {
                self.poisoned = true;
                return Err(e);
            }
        }
        self.execute("").await
    }

    /// Send a command and read until the prompt, returning the full output.
    pub async fn execute(&mut self, command: &str) -> Result<Response> {
        self.ensure_usable()?;
        let result = self.run(command).await;
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Send a line without waiting for a prompt (e.g. `quit`).
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.ensure_usable()?;
        let framed = self.config.markers.command_line(line);
        debug!("send (no wait): {:?}", line);
        self.channel.send(framed.as_bytes()).await
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(DriverError::SessionPoisoned.into());
        }
        Ok(())
    }

    fn deadline(&self) -> Option<tokio::time::Instant> {
        self.config
            .read_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout)
    }

    async fn run(&mut self, command: &str) -> Result<Response> {
        let start = Instant::now();
        let deadline = self.deadline();

        debug!("send: {:?}", command);
        let line = self.config.markers.command_line(command);
        self.channel.send(line.as_bytes()).await?;
        self.state = SessionState::AwaitingOutput;

        let mut buffer = if self.config.strip_ansi {
            OutputBuffer::with_ansi_stripping()
        } else {
            OutputBuffer::new()
        };
        let mut pages = 0;

        while self.state != SessionState::Complete {
            let chunk = self.receive_chunk(deadline).await?;
            trace!("chunk: {} bytes, buffer: {} bytes", chunk.len(), buffer.len());
            buffer.extend(&chunk);
            self.state = self.advance(&mut buffer, &mut pages).await?;
        }

        let prompt = buffer.last_line().to_string();
        let output = buffer.into_string();
        let elapsed = start.elapsed();
        debug!(
            "complete: {:?} in {:?}, {} page(s), prompt={:?}",
            command, elapsed, pages, prompt
        );
        self.last_prompt = Some(prompt.clone());

        let response = Response::new(command, output, prompt, pages, elapsed);
        Ok(self.check_failure(response))
    }

    /// Apply the pager check, then the prompt check, to the buffer.
    ///
    /// The pager check runs first: a page break can leave text that looks
    /// like a prompt until the marker is removed.
    async fn advance(&mut self, buffer: &mut OutputBuffer, pages: &mut usize) -> Result<SessionState> {
        let markers = &self.config.markers;
        let paged = buffer.strip_marker(&markers.pager);
        if paged > 1 {
            warn!("{} pager markers in one read, answering once", paged);
        }
        if paged > 0 {
            *pages += 1;
            trace!("pager marker removed, sending continuation");
            self.channel.send(markers.continuation.as_bytes()).await?;
        }

        if buffer.ends_with(&self.config.markers.prompt) {
            Ok(SessionState::Complete)
        } else if paged > 0 {
            Ok(SessionState::Paginating)
        } else {
            Ok(SessionState::AwaitingOutput)
        }
    }

    async fn receive_chunk(&mut self, deadline: Option<tokio::time::Instant>) -> Result<Vec<u8>> {
        let read = self.channel.receive(self.config.chunk_size);
        match (deadline, self.config.read_timeout) {
            (Some(deadline), Some(timeout)) => tokio::time::timeout_at(deadline, read)
                .await
                .map_err(|_| ChannelError::NoResponse(timeout))?,
            _ => read.await,
        }
    }

    fn check_failure(&self, response: Response) -> Response {
        let matched = self
            .config
            .failed_when_contains
            .iter()
            .find(|pattern| response.output.contains(pattern.as_str()))
            .cloned();
        match matched {
            Some(pattern) => {
                debug!("failure pattern matched: {:?}", pattern);
                response.with_failure(pattern)
            }
            None => response,
        }
    }
}
