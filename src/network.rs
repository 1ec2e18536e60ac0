use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;

/// VPN network in CIDR notation, e.g. `10.8.0.0/24`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VpnNetwork {
    address: Ipv4Addr,
    prefix: u8,
}

impl VpnNetwork {
    pub fn new(address: Ipv4Addr, prefix: u8) -> Option<Self> {
        if prefix > 32 {
            return None;
        }
        Some(VpnNetwork { address, prefix })
    }

    pub fn netmask(&self) -> Ipv4Addr {
        let mask = match self.prefix {
            0 => 0,
            p => u32::MAX << (32 - u32::from(p)),
        };
        Ipv4Addr::from(mask)
    }
}

impl Default for VpnNetwork {
    fn default() -> Self {
        VpnNetwork {
            address: Ipv4Addr::new(10, 8, 0, 0),
            prefix: 24,
        }
    }
}

impl fmt::Display for VpnNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix)
    }
}

impl std::str::FromStr for VpnNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("missing prefix length in {}", s))?;
        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|err| format!("invalid network address {}: {}", address, err))?;
        let prefix = prefix
            .parse::<u8>()
            .map_err(|err| format!("invalid prefix length {}: {}", prefix, err))?;
        VpnNetwork::new(address, prefix).ok_or_else(|| format!("prefix length must be at most 32, got {}", prefix))
    }
}

impl Serialize for VpnNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VpnNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<VpnNetwork>().map_err(serde::de::Error::custom)
    }
}
