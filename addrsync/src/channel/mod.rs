//! Channel layer for the interactive router shell.
//!
//! This module handles the byte-level side of a session: the duplex
//! [`ShellChannel`] seam, output decoding and the prompt/pager markers.

mod buffer;
mod markers;
mod shell;

pub use buffer::OutputBuffer;
pub use markers::ShellMarkers;
pub use shell::{ShellChannel, StreamChannel};
