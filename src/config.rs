//! Configuration management for voipbl-rtbh.
//!
//! The YAML file is deserialized into typed sections, then every setting is
//! checked once against [`FIELD_RULES`]. Only a configuration that passed
//! both steps is turned into sources and a command formatter.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::address::FilterPolicy;
use crate::command::{CommandFormatter, FlowProtocol};
use crate::error::ControllerError;
use crate::source::BlacklistSource;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/voipbl-rtbh/config.yaml";

/// Commented template printed by `voipbl-rtbh default-config`.
pub const DEFAULT_CONFIG: &str = include_str!("../templates/config.yaml");

/// Remote voipbl.org list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoipblSection {
    pub remote: String,
    pub database: PathBuf,
    pub frequency: u64,
    pub filter_rfc1918: bool,
}

/// Hand-maintained local list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocalblSection {
    pub database: PathBuf,
    pub frequency: u64,
    pub filter_rfc1918: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExabgpSection {
    /// `unicast` or `flowspec`
    pub method: String,
    #[serde(default)]
    pub uc_next_hop: String,
    #[serde(default)]
    pub fs_dst_port: String,
    #[serde(default = "default_fs_protocol")]
    pub fs_protocol: String,
    pub communities: String,
}

fn default_fs_protocol() -> String {
    "any".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub voipbl: VoipblSection,
    pub localbl: LocalblSection,
    pub exabgp: ExabgpSection,

    /// Directory relative database paths resolve against.
    #[serde(skip)]
    base_dir: PathBuf,
}

/// One typed check over a single setting.
struct FieldRule {
    name: &'static str,
    expected: &'static str,
    check: fn(&Config) -> bool,
}

static FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        name: "voipbl::remote",
        expected: "a URL",
        check: |c| is_valid_url(&c.voipbl.remote),
    },
    FieldRule {
        name: "voipbl::database",
        expected: "a file path",
        check: |c| is_file_path(&c.voipbl.database),
    },
    FieldRule {
        name: "voipbl::frequency",
        expected: "a positive number of seconds",
        check: |c| c.voipbl.frequency >= 1,
    },
    FieldRule {
        name: "localbl::database",
        expected: "a file path",
        check: |c| is_file_path(&c.localbl.database),
    },
    FieldRule {
        name: "localbl::frequency",
        expected: "a positive number of seconds",
        check: |c| c.localbl.frequency >= 1,
    },
    FieldRule {
        name: "exabgp::method",
        expected: "unicast or flowspec",
        check: |c| matches!(c.exabgp.method.as_str(), "unicast" | "flowspec"),
    },
    FieldRule {
        name: "exabgp::uc_next_hop",
        expected: "an IPv4 address",
        check: |c| c.exabgp.method != "unicast" || c.exabgp.uc_next_hop.parse::<Ipv4Addr>().is_ok(),
    },
    FieldRule {
        name: "exabgp::fs_dst_port",
        expected: "a port expression made of [0-9=<>& ]",
        check: |c| is_port_expression(&c.exabgp.fs_dst_port),
    },
    FieldRule {
        name: "exabgp::fs_protocol",
        expected: "tcp, udp or any",
        check: |c| parse_protocol(&c.exabgp.fs_protocol).is_some(),
    },
    FieldRule {
        name: "exabgp::communities",
        expected: "a list of communities like 65535:666",
        check: |c| is_community_list(&c.exabgp.communities),
    },
];

impl Config {
    /// Load and validate the configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let base_dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::from_yaml(&content, base_dir)
            .with_context(|| format!("Failed to load config file: {}", path.display()))
    }

    /// Parse and validate YAML, resolving relative paths against `base_dir`.
    pub fn from_yaml(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| ControllerError::Config(e.to_string()))?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    /// Run every field rule, then check the cache directory.
    pub fn validate(&self) -> std::result::Result<(), ControllerError> {
        if let Some(rule) = FIELD_RULES.iter().find(|rule| !(rule.check)(self)) {
            return Err(ControllerError::Config(format!(
                "Invalid value for {}, expected {}.",
                rule.name, rule.expected
            )));
        }

        let dir = self.cache_dir();
        if !dir.is_dir() {
            return Err(ControllerError::Config(format!(
                "Cache directory {} does not exist",
                dir.display()
            )));
        }
        tempfile::NamedTempFile::new_in(&dir).map_err(|e| {
            ControllerError::Config(format!(
                "Cache directory {} is not writable: {}",
                dir.display(),
                e
            ))
        })?;

        Ok(())
    }

    pub fn voipbl_path(&self) -> PathBuf {
        self.base_dir.join(&self.voipbl.database)
    }

    pub fn localbl_path(&self) -> PathBuf {
        self.base_dir.join(&self.localbl.database)
    }

    /// Directory holding the downloaded list (and the instance lock).
    pub fn cache_dir(&self) -> PathBuf {
        match self.voipbl_path().parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Remote source first, local second.
    pub fn sources(&self) -> Vec<BlacklistSource> {
        vec![
            BlacklistSource::remote(
                "voipbl",
                self.voipbl.remote.clone(),
                self.voipbl_path(),
                self.voipbl.frequency,
                FilterPolicy {
                    exclude_private: self.voipbl.filter_rfc1918,
                },
            ),
            BlacklistSource::local(
                "localbl",
                self.localbl_path(),
                self.localbl.frequency,
                FilterPolicy {
                    exclude_private: self.localbl.filter_rfc1918,
                },
            ),
        ]
    }

    /// Select the advertisement method.
    pub fn formatter(&self) -> std::result::Result<CommandFormatter, ControllerError> {
        let invalid = |name: &str, expected: &str| {
            ControllerError::Config(format!(
                "Invalid value for exabgp::{}, expected {}.",
                name, expected
            ))
        };
        let communities = normalize_communities(&self.exabgp.communities);

        match self.exabgp.method.as_str() {
            "unicast" => {
                let next_hop = self
                    .exabgp
                    .uc_next_hop
                    .parse::<Ipv4Addr>()
                    .map_err(|_| invalid("uc_next_hop", "an IPv4 address"))?;
                Ok(CommandFormatter::Unicast {
                    next_hop,
                    communities,
                })
            }
            "flowspec" => {
                let protocol = parse_protocol(&self.exabgp.fs_protocol)
                    .ok_or_else(|| invalid("fs_protocol", "tcp, udp or any"))?;
                let port = self.exabgp.fs_dst_port.trim();
                Ok(CommandFormatter::Flowspec {
                    destination_port: (!port.is_empty()).then(|| port.to_string()),
                    protocol,
                    communities,
                })
            }
            _ => Err(invalid("method", "unicast or flowspec")),
        }
    }
}

/// http(s) URL with a host and an explicit path.
fn is_valid_url(value: &str) -> bool {
    let url = match Url::parse(value) {
        Ok(u) => u,
        Err(_) => return false,
    };
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return false;
    }
    // Url normalizes a missing path to "/", so look at the raw text
    value
        .split_once("://")
        .map(|(_, rest)| rest.contains('/'))
        .unwrap_or(false)
}

fn is_file_path(path: &Path) -> bool {
    !path.as_os_str().is_empty() && path.file_name().is_some()
}

/// Empty (match every port) or characters from `[0-9=<>& ]`.
fn is_port_expression(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '=' | '<' | '>' | '&' | ' '))
}

fn parse_protocol(value: &str) -> Option<FlowProtocol> {
    match value {
        "tcp" => Some(FlowProtocol::Tcp),
        "udp" => Some(FlowProtocol::Udp),
        "any" => Some(FlowProtocol::Any),
        _ => None,
    }
}

/// One or more whitespace separated `<digits>:<digits>` tokens.
fn is_community_list(value: &str) -> bool {
    let mut tokens = value.split_whitespace().peekable();
    tokens.peek().is_some()
        && tokens.all(|token| match token.split_once(':') {
            Some((asn, tag)) => is_digits(asn) && is_digits(tag),
            None => false,
        })
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn normalize_communities(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
