use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::network::VpnNetwork;

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Config {
    // generated server configuration file, its stem also names the systemd unit
    pub config_file: Option<PathBuf>,
    // desired state of the configuration
    pub state: Option<State>,
    pub port: Option<u16>,
    pub protocol: Option<Protocol>,
    pub cipher: Option<String>,
    pub vpn_network: Option<VpnNetwork>,
    // derived from the vpn_network prefix if omitted
    pub vpn_netmask: Option<Ipv4Addr>,
    pub topology: Option<Topology>,
    pub client_to_client: Option<bool>,
    pub duplicate_cn: Option<bool>,
    pub redirect_gateway: Option<bool>,
    pub dns_servers: Option<Vec<String>>,
    pub routes: Option<Vec<String>>,
    pub mssfix: Option<bool>,
    // 0 disables fragmentation
    pub fragment: Option<u32>,
    pub enable_compress: Option<bool>,
    pub user: Option<String>,
    pub group: Option<String>,
    // appended verbatim after the default server settings
    pub extra_server_options: Option<Vec<String>>,
    pub ca_cert: Option<PathBuf>,
    pub server_cert: Option<PathBuf>,
    pub server_key: Option<PathBuf>,
    pub dh_pem: Option<PathBuf>,
    pub tls_auth_key: Option<PathBuf>,
    // systemd unit, defaults to openvpn@<config_file stem>
    pub service_name: Option<String>,
    #[serde(default)]
    pub pki: PkiConfig,
    #[serde(default)]
    pub nat: NatConfig,
    #[serde(default)]
    pub ccd: CcdConfig,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct PkiConfig {
    // run Easy-RSA during install
    pub generate: Option<bool>,
    pub dir: Option<PathBuf>,
    pub key_size: Option<KeySize>,
    pub cert_days: Option<u32>,
    // Easy-RSA executable, Debian ships it outside of PATH
    pub easyrsa: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct NatConfig {
    pub enabled: Option<bool>,
    // outgoing interface for masquerading
    pub interface: Option<String>,
    // iptables-save target
    pub rules_file: Option<PathBuf>,
    // tool executables, looked up in PATH by default
    pub iptables: Option<PathBuf>,
    pub iptables_save: Option<PathBuf>,
    pub sysctl: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CcdConfig {
    pub dir: Option<PathBuf>,
    // client name -> ifconfig-push value
    #[serde(default)]
    pub clients: BTreeMap<String, IfconfigPush>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum IfconfigPush {
    Scalar(String),
    List(Vec<String>),
}

impl IfconfigPush {
    pub fn value(&self) -> String {
        match self {
            IfconfigPush::Scalar(value) => value.clone(),
            IfconfigPush::List(values) => values.join(" "),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
    Started,
    Stopped,
    Restarted,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    #[default]
    Subnet,
    Net30,
    P2p,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Subnet => write!(f, "subnet"),
            Topology::Net30 => write!(f, "net30"),
            Topology::P2p => write!(f, "p2p"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "u32", into = "u32")]
pub struct KeySize(u32);

impl KeySize {
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl Default for KeySize {
    fn default() -> Self {
        KeySize(2048)
    }
}

impl TryFrom<u32> for KeySize {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            2048 | 4096 => Ok(KeySize(bits)),
            _ => Err(format!("key size must be 2048 or 4096, got {}", bits)),
        }
    }
}

impl From<KeySize> for u32 {
    fn from(size: KeySize) -> Self {
        size.0
    }
}

/// Reads the configuration file, missing files yield an all-default configuration.
/// Values from `OPENVPN_CONFIGURE_*` environment variables take precedence, `__` separates
/// nested keys (`OPENVPN_CONFIGURE_NAT__INTERFACE`).
pub fn read(path: &Path) -> Result<Config, figment::Error> {
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("OPENVPN_CONFIGURE_").ignore(&["config_file"]).split("__"))
        .extract()
}
