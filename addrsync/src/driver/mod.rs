//! High-level driver for shell interaction.
//!
//! The driver layer turns a raw shell channel into synchronous
//! command/response calls with prompt and pager handling.

pub(crate) mod response;
mod session;

pub use response::Response;
pub use session::{SessionConfig, SessionState, ShellSession};
