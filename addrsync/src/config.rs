//! Configuration file loading.
//!
//! The file is TOML with a single `[router]` table:
//!
//! ```toml
//! [router]
//! host = "192.168.88.1"
//! user = "admin"
//! password = "secret"
//! address_list = "blocked"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::driver::SessionConfig;
use crate::error::ConfigError;
use crate::routeros;
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "addrsync.toml";

/// Top-level configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Router connection and target list.
    pub router: RouterConfig,
}

/// The `[router]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Router hostname or address.
    pub host: String,

    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login name.
    pub user: String,

    /// Login password.
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// Private key used instead of a password.
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Name of the address list to replace.
    pub address_list: String,

    /// Seconds to wait for the prompt after each command; 0 waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds allowed for connecting and authenticating.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// How to treat the router's host key.
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file; the user's default when unset.
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    /// Remove ANSI escape sequences from router output.
    #[serde(default)]
    pub strip_ansi: bool,
}

fn default_port() -> u16 {
    22
}

fn default_timeout_secs() -> u64 {
    30
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content, path)
    }

    /// Parse and validate config text; `path` is only used in errors.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.router.validate()?;
        Ok(config)
    }
}

impl RouterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        for (option, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("address_list", &self.address_list),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyOption { option });
            }
        }
        if self.password.is_none() && self.key_file.is_none() {
            return Err(ConfigError::MissingCredential);
        }
        Ok(())
    }

    /// SSH settings for connecting to the router.
    pub fn ssh_config(&self) -> SshConfig {
        let auth = match (&self.key_file, &self.password) {
            (Some(path), passphrase) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: passphrase.as_ref().map(|p| p.expose_secret().to_string()),
            },
            (None, Some(password)) => AuthMethod::Password(password.expose_secret().to_string()),
            (None, None) => AuthMethod::Password(String::new()),
        };

        let mut config = SshConfig::new(&self.host, &self.user, auth);
        config.port = self.port;
        config.timeout = Duration::from_secs(self.connect_timeout_secs);
        config.host_key_verification = self.host_key_verification.clone();
        config.known_hosts_path = self.known_hosts.clone();
        config
    }

    /// Shell session settings for the router console.
    pub fn session_config(&self) -> SessionConfig {
        let read_timeout = match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        SessionConfig {
            read_timeout,
            strip_ansi: self.strip_ansi,
            ..routeros::session_config()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MINIMAL: &str = r#"
[router]
host = "192.168.88.1"
user = "admin"
password = "secret"
address_list = "blocked"
"#;

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::from_toml(content, Path::new("test.toml"))
    }

    #[test]
    fn test_minimal_defaults() {
        let config = parse(MINIMAL).unwrap();
        let router = &config.router;
        assert_eq!(router.host, "192.168.88.1");
        assert_eq!(router.port, 22);
        assert_eq!(router.address_list, "blocked");
        assert_eq!(router.timeout_secs, 30);
        assert_eq!(router.host_key_verification, HostKeyVerification::AcceptNew);
        assert!(!router.strip_ansi);
    }

    #[test]
    fn test_password_is_redacted() {
        let config = parse(MINIMAL).unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
        assert!(!format!("{:?}", config.router.ssh_config()).contains("secret"));
    }

    #[test]
    fn test_ssh_config() {
        let config = parse(
            r#"
[router]
host = "router.lan"
port = 2222
user = "admin"
password = "pw"
address_list = "blocked"
connect_timeout_secs = 5
host_key_verification = "strict"
known_hosts = "/tmp/known_hosts"
"#,
        )
        .unwrap();
        let ssh = config.router.ssh_config();
        assert_eq!(ssh.socket_addr(), "router.lan:2222");
        assert_eq!(ssh.timeout, Duration::from_secs(5));
        assert_eq!(ssh.host_key_verification, HostKeyVerification::Strict);
        assert_eq!(ssh.known_hosts_path, Some(PathBuf::from("/tmp/known_hosts")));
        assert!(matches!(ssh.auth, AuthMethod::Password(ref p) if p == "pw"));
    }

    #[test]
    fn test_key_file_auth() {
        let config = parse(
            r#"
[router]
host = "router.lan"
user = "admin"
key_file = "/home/admin/.ssh/id_ed25519"
address_list = "blocked"
"#,
        )
        .unwrap();
        let ssh = config.router.ssh_config();
        assert!(matches!(ssh.auth, AuthMethod::PrivateKey { passphrase: None, .. }));
    }

    #[test]
    fn test_zero_timeout_is_unbounded() {
        let config = parse(&MINIMAL.replace("address_list", "timeout_secs = 0\naddress_list")).unwrap();
        assert_eq!(config.router.session_config().read_timeout, None);

        let config = parse(MINIMAL).unwrap();
        let session = config.router.session_config();
        assert_eq!(session.read_timeout, Some(Duration::from_secs(30)));
        assert!(!session.failed_when_contains.is_empty());
    }

    #[test]
    fn test_missing_option_is_parse_error() {
        let err = parse(&MINIMAL.replace("address_list = \"blocked\"", "")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("address_list"));
    }

    #[test]
    fn test_empty_option() {
        let err = parse(&MINIMAL.replace("\"blocked\"", "\"  \"")).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyOption { option: "address_list" }));
    }

    #[test]
    fn test_missing_credential() {
        let err = parse(&MINIMAL.replace("password = \"secret\"", "")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }

    #[test]
    fn test_unknown_verification_mode() {
        let err = parse(&MINIMAL.replace(
            "address_list",
            "host_key_verification = \"sometimes\"\naddress_list",
        ))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.router.user, "admin");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/addrsync.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
