//! Literal markers used to delimit command output on a human-oriented shell.

/// The fixed strings that frame a command/response exchange.
///
/// The remote shell offers no structure, so completion and pagination are
/// detected by plain substring and suffix tests on the decoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellMarkers {
    /// Suffix the shell emits when it is idle and ready for input.
    pub prompt: String,

    /// Substring the shell inserts when it paginates a long response.
    pub pager: String,

    /// Bytes sent to make the pager show the next page.
    pub continuation: String,

    /// Terminator appended to every command.
    pub line_ending: String,
}

impl ShellMarkers {
    /// Replace the prompt suffix.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Replace the pager marker.
    pub fn with_pager(mut self, pager: impl Into<String>) -> Self {
        self.pager = pager.into();
        self
    }

    /// Frame a command as the line the shell expects.
    pub fn command_line(&self, command: &str) -> String {
        let mut line = String::with_capacity(command.len() + self.line_ending.len());
        line.push_str(command);
        line.push_str(&self.line_ending);
        line
    }
}

impl Default for ShellMarkers {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            pager: "-- more --".to_string(),
            continuation: " ".to_string(),
            line_ending: "\r\n".to_string(),
        }
    }
}
