//! Response type for command execution results.

use std::time::Duration;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Everything the shell produced, pager markers removed, trailing prompt included.
    pub output: String,

    /// The prompt line that ended the output.
    pub prompt: String,

    /// Number of pager continuations sent while reading.
    pub pages: usize,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure message if the output matched a failure pattern.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a new successful response.
    pub fn new(
        command: impl Into<String>,
        output: impl Into<String>,
        prompt: impl Into<String>,
        pages: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
            prompt: prompt.into(),
            pages,
            elapsed,
            failure_message: None,
        }
    }

    /// Mark the response as failed.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// The output without the echoed command line and the trailing prompt.
    pub fn body(&self) -> &str {
        let output = self.output.strip_suffix(&self.prompt).unwrap_or(&self.output);
        let output = match output.find('\n') {
            Some(pos)
                if !self.command.is_empty()
                    && output[..pos].trim_end().ends_with(self.command.as_str()) =>
            {
                &output[pos + 1..]
            }
            _ => output,
        };
        output.trim_matches(['\r', '\n'])
    }

    /// Get the body lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body().lines()
    }

    /// Check if the output contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.output.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.body())
    }
}
