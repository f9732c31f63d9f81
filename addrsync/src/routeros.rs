//! RouterOS command vocabulary and shell conventions.
//!
//! RouterOS prompts look like `[admin@MikroTik] > ` and paginate long
//! output with a `-- more --` line.

use crate::address::AddressEntry;
use crate::channel::ShellMarkers;
use crate::driver::SessionConfig;

/// Command that ends the interactive session.
pub const QUIT: &str = "quit";

/// Output fragments RouterOS prints when it rejects a command.
pub const FAILURE_PATTERNS: &[&str] = &[
    "failure:",
    "syntax error",
    "expected end of command",
    "bad command name",
    "invalid value",
    "no such item",
];

/// Session settings for a RouterOS console.
pub fn session_config() -> SessionConfig {
    SessionConfig {
        markers: ShellMarkers::default(),
        failed_when_contains: FAILURE_PATTERNS.iter().map(|p| p.to_string()).collect(),
        ..SessionConfig::default()
    }
}

/// Builds `/ip firewall address-list` commands for one named list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressListCommands {
    list: String,
}

impl AddressListCommands {
    /// Commands for the list called `list`.
    pub fn new(list: impl Into<String>) -> Self {
        Self { list: list.into() }
    }

    /// The list name.
    pub fn list(&self) -> &str {
        &self.list
    }

    /// Remove every entry of the list.
    pub fn remove_all(&self) -> String {
        format!(
            "/ip firewall address-list remove [find list={}]",
            quote_value(&self.list)
        )
    }

    /// Add one address to the list.
    pub fn add(&self, entry: &AddressEntry) -> String {
        format!(
            "/ip firewall address-list add list={} address={}",
            quote_value(&self.list),
            entry
        )
    }
}

/// Quote a value for the RouterOS command line when it needs it.
///
/// Bare words pass through unchanged; anything else is double-quoted with
/// `\`, `"` and `$` escaped.
pub fn quote_value(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '/'));
    if bare {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '$') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_all() {
        let commands = AddressListCommands::new("blocked");
        assert_eq!(
            commands.remove_all(),
            "/ip firewall address-list remove [find list=blocked]"
        );
    }

    #[test]
    fn test_add() {
        let commands = AddressListCommands::new("blocked");
        let entry: AddressEntry = "10.0.0.0/24".parse().unwrap();
        assert_eq!(
            commands.add(&entry),
            "/ip firewall address-list add list=blocked address=10.0.0.0/24"
        );
    }

    #[test]
    fn test_list_name_with_spaces_is_quoted() {
        let commands = AddressListCommands::new("block list");
        assert_eq!(
            commands.remove_all(),
            "/ip firewall address-list remove [find list=\"block list\"]"
        );
    }

    #[test]
    fn test_quote_value() {
        assert_eq!(quote_value("office-v6_2"), "office-v6_2");
        assert_eq!(quote_value(""), "\"\"");
        assert_eq!(quote_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_value("$var"), "\"\\$var\"");
    }

    #[test]
    fn test_session_config() {
        let config = session_config();
        assert_eq!(config.markers.prompt, "> ");
        assert!(config.failed_when_contains.iter().any(|p| p == "failure:"));
    }
}
