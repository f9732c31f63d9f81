//! Line filter for address-list input.
//!
//! Each line is independent: the text after the first `#` is a comment,
//! surrounding whitespace is ignored, and what remains must be an IPv4 or
//! IPv6 address or CIDR block. Host bits inside a block are allowed.

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use ipnetwork::{IpNetwork, IpNetworkError};
use log::warn;

use crate::error::InputError;

/// A validated address or network literal.
///
/// Keeps the literal exactly as written (after comment and whitespace
/// removal); the parsed network is only used for validation and queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    literal: String,
    network: IpNetwork,
}

impl AddressEntry {
    /// The literal as it appeared in the input.
    pub fn as_str(&self) -> &str {
        &self.literal
    }

    /// The parsed network; a bare host is a /32 or /128.
    pub fn network(&self) -> IpNetwork {
        self.network
    }

    /// Whether this entry is a single host.
    pub fn is_host(&self) -> bool {
        match self.network {
            IpNetwork::V4(net) => net.prefix() == 32,
            IpNetwork::V6(net) => net.prefix() == 128,
        }
    }
}

impl FromStr for AddressEntry {
    type Err = IpNetworkError;

    fn from_str(literal: &str) -> Result<Self, Self::Err> {
        check_prefix(literal)?;
        let network = literal.parse::<IpNetwork>()?;
        Ok(Self {
            literal: literal.to_string(),
            network,
        })
    }
}

/// Only a decimal prefix length or a dotted netmask may follow the `/`.
///
/// The integer parser behind [`IpNetwork`] also takes a leading `+`, which
/// the router would then receive verbatim.
fn check_prefix(literal: &str) -> Result<(), IpNetworkError> {
    match literal.split_once('/') {
        Some((_, prefix))
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit() || b == b'.') =>
        {
            Err(IpNetworkError::InvalidPrefix)
        }
        _ => Ok(()),
    }
}

impl fmt::Display for AddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literal)
    }
}

/// An input line that was not a valid address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// 1-based line number in the input.
    pub line_number: usize,

    /// The line as read, untrimmed and with its comment.
    pub line: String,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.line)
    }
}

/// Outcome of filtering a set of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    /// Accepted entries in input order, duplicates kept.
    pub entries: Vec<AddressEntry>,

    /// Lines that failed validation, in input order.
    pub rejected: Vec<Rejected>,
}

impl FilterReport {
    /// Number of rejected lines.
    pub fn reject_count(&self) -> usize {
        self.rejected.len()
    }

    /// Check if no entry was accepted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push_line(&mut self, line_number: usize, line: &str) {
        let cleaned = clean_line(line);
        if cleaned.is_empty() {
            return;
        }
        match cleaned.parse::<AddressEntry>() {
            Ok(entry) => self.entries.push(entry),
            Err(e) => {
                warn!("line {}: rejected {:?}: {}", line_number, line, e);
                self.rejected.push(Rejected {
                    line_number,
                    line: line.to_string(),
                });
            }
        }
    }
}

/// Strip the `#` comment and surrounding whitespace from a line.
pub fn clean_line(line: &str) -> &str {
    line.split_once('#').map_or(line, |(head, _)| head).trim()
}

/// Filter lines into validated entries and rejects.
pub fn filter_lines<I, S>(lines: I) -> FilterReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = FilterReport::default();
    for (index, line) in lines.into_iter().enumerate() {
        report.push_line(index + 1, line.as_ref());
    }
    report
}

/// Read and filter every line of `reader`.
///
/// Undecodable bytes are replaced, which makes the affected line a reject
/// rather than an I/O failure.
pub fn read_addresses<R: BufRead>(mut reader: R) -> Result<FilterReport, InputError> {
    let mut report = FilterReport::default();
    let mut raw = Vec::new();
    let mut line_number = 0;

    loop {
        raw.clear();
        line_number += 1;
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(|source| InputError::Read {
                line: line_number,
                source,
            })?;
        if n == 0 {
            break;
        }
        let decoded = String::from_utf8_lossy(&raw);
        let line = decoded
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(decoded.as_ref());
        report.push_line(line_number, line);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literals(report: &FilterReport) -> Vec<&str> {
        report.entries.iter().map(AddressEntry::as_str).collect()
    }

    #[test]
    fn test_mixed_input() {
        let report = read_addresses("10.0.0.0/24   # office\n\nbad-line\n192.168.1.5\n".as_bytes()).unwrap();
        assert_eq!(literals(&report), vec!["10.0.0.0/24", "192.168.1.5"]);
        assert_eq!(report.reject_count(), 1);
        assert_eq!(report.rejected[0].line, "bad-line");
        assert_eq!(report.rejected[0].line_number, 3);
    }

    #[test]
    fn test_valid_literals_with_comments_and_whitespace() {
        let cases = [
            ("192.168.1.5", "192.168.1.5"),
            ("  10.0.0.0/8  ", "10.0.0.0/8"),
            ("\t172.16.0.0/12\t# private", "172.16.0.0/12"),
            ("192.168.1.77/24", "192.168.1.77/24"),
            ("0.0.0.0/0 #default", "0.0.0.0/0"),
            ("2001:db8::1", "2001:db8::1"),
            ("2001:db8::/32 # doc", "2001:db8::/32"),
            ("2001:db8::1/64", "2001:db8::1/64"),
            ("::1#loopback", "::1"),
            ("fe80::/10", "fe80::/10"),
        ];

        for (line, expected) in cases {
            let report = filter_lines([line]);
            assert_eq!(literals(&report), vec![expected], "line {:?}", line);
            assert_eq!(report.reject_count(), 0, "line {:?}", line);
        }
    }

    #[test]
    fn test_blank_and_comment_lines_are_silent() {
        let report = filter_lines(["", "   ", "\t", "# just a comment", "   # indented", "#10.0.0.1"]);
        assert!(report.is_empty());
        assert_eq!(report.reject_count(), 0);
    }

    #[test]
    fn test_invalid_lines_each_reported_once() {
        let lines = [
            "bad-line",
            "router.example.com",
            "300.1.1.1",
            "10.0.0.0/33",
            "2001:db8::/129",
            "10.0.0.0/24 extra",
            "1.2.3.4.5",
            "10.0.0.0/+24",
            "2001:db8::/+64",
            "10.0.0.0/",
            "10.0.0.0/ 24",
        ];
        let report = filter_lines(lines);
        assert!(report.is_empty());
        assert_eq!(report.reject_count(), lines.len());
        for (rejected, line) in report.rejected.iter().zip(lines) {
            assert_eq!(rejected.line, line);
        }
    }

    #[test]
    fn test_netmask_prefix() {
        let entry: AddressEntry = "10.0.0.0/255.255.255.0".parse().unwrap();
        assert_eq!(entry.network().prefix(), 24);
        assert_eq!(entry.as_str(), "10.0.0.0/255.255.255.0");
    }

    #[test]
    fn test_forms_the_router_cannot_take_are_rejected() {
        // Hostmask prefixes and zone-scoped IPv6 addresses have no
        // address-list equivalent.
        let report = filter_lines(["10.0.0.0/0.0.0.255", "fe80::1%eth0"]);
        assert!(report.is_empty());
        assert_eq!(report.reject_count(), 2);
    }

    #[test]
    fn test_rejected_line_is_untrimmed() {
        let report = filter_lines(["  junk   # why"]);
        assert_eq!(report.rejected[0].line, "  junk   # why");
        assert_eq!(report.rejected[0].to_string(), "line 1:   junk   # why");
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let report = filter_lines(["10.0.0.2", "10.0.0.1", "10.0.0.2"]);
        assert_eq!(literals(&report), vec!["10.0.0.2", "10.0.0.1", "10.0.0.2"]);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = [
            " 10.1.0.0/16 # a",
            "nonsense",
            "",
            "2001:db8::5",
            "192.0.2.1/24",
            "# only comment",
        ];
        let first = filter_lines(input);
        let second = filter_lines(literals(&first));
        assert_eq!(literals(&first), literals(&second));
        assert_eq!(second.reject_count(), 0);
    }

    #[test]
    fn test_read_crlf_and_invalid_utf8() {
        let input: &[u8] = b"10.0.0.1\r\n\xff\xfe\r\n10.0.0.2";
        let report = read_addresses(input).unwrap();
        assert_eq!(literals(&report), vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(report.reject_count(), 1);
        assert_eq!(report.rejected[0].line_number, 2);
    }

    #[test]
    fn test_entry_network() {
        let host: AddressEntry = "192.168.1.5".parse().unwrap();
        assert!(host.is_host());
        assert_eq!(host.network().prefix(), 32);

        let block: AddressEntry = "192.168.1.77/24".parse().unwrap();
        assert!(!block.is_host());
        assert_eq!(block.to_string(), "192.168.1.77/24");

        let v6: AddressEntry = "2001:db8::1".parse().unwrap();
        assert!(v6.is_host());
        assert_eq!(v6.network().prefix(), 128);
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("  1.2.3.4  # x # y"), "1.2.3.4");
        assert_eq!(clean_line("#"), "");
        assert_eq!(clean_line("plain"), "plain");
    }
}
