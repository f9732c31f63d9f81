//! Address filter: turns raw input lines into validated address literals.

mod filter;

pub use filter::{AddressEntry, FilterReport, Rejected, clean_line, filter_lines, read_addresses};
