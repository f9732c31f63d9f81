//! # addrsync
//!
//! Replace the contents of a RouterOS firewall address list by driving
//! the router's interactive console over SSH.
//!
//! The console is built for humans, so the only completion signal is the
//! prompt at the end of the output, and long output is interrupted by a
//! `-- more --` pager. [`ShellSession`] turns that into a request/response
//! call; [`address`] validates the input list; [`sync`] ties them together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use addrsync::sync::{self, AddressListUpdate, SyncOutcome};
//! use addrsync::transport::{AuthMethod, SshConfig, SshConnector};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), addrsync::Error> {
//!     let report = addrsync::address::filter_lines(["10.0.0.0/24", "192.168.1.5"]);
//!     let update = AddressListUpdate::new("blocked", report.entries);
//!
//!     let ssh = SshConfig::new("192.168.88.1", "admin", AuthMethod::Password("secret".into()));
//!     let mut connector = SshConnector::new(ssh);
//!
//!     let outcome = sync::push(&mut connector, &update, addrsync::routeros::session_config()).await?;
//!     if let SyncOutcome::Applied(summary) = outcome {
//!         println!("added {}", summary.added);
//!     }
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod routeros;
pub mod sync;
pub mod transport;

// Re-export main types for convenience
pub use address::{AddressEntry, FilterReport};
pub use channel::ShellChannel;
pub use config::Config;
pub use driver::{Response, SessionConfig, ShellSession};
pub use error::Error;
pub use transport::{AuthMethod, SshConfig};
