use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::PathBuf;

use crate::config::{Config, KeySize, State};
use crate::ovpn::conf::ServerOptions;

#[derive(Debug, Clone)]
pub struct Ops {
    pub config_file: PathBuf,
    pub state: State,
    pub server: ServerOptions,
    pub pki: PkiOps,
    pub nat: NatOps,
    pub ccd_dir: PathBuf,
    // client name -> resolved ifconfig-push value
    pub ccd: BTreeMap<String, String>,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct PkiOps {
    pub generate: bool,
    pub dir: PathBuf,
    pub key_size: KeySize,
    pub cert_days: u32,
    pub easyrsa: PathBuf,
}

#[derive(Debug, Clone)]
pub struct NatOps {
    pub enabled: bool,
    pub interface: String,
    pub rules_file: PathBuf,
    pub iptables: PathBuf,
    pub iptables_save: PathBuf,
    pub sysctl: PathBuf,
}

impl From<Config> for Ops {
    fn from(config: Config) -> Self {
        let def_config_file = PathBuf::from("/etc/openvpn/server.conf");
        let def_dns_servers = vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()];

        let vpn_network = config.vpn_network.unwrap_or_default();
        let config_file = config.config_file.unwrap_or(def_config_file);
        let service_name = config.service_name.unwrap_or_else(|| {
            let stem = config_file.file_stem().and_then(OsStr::to_str).unwrap_or("server");
            format!("openvpn@{}", stem)
        });

        let server = ServerOptions {
            port: config.port.unwrap_or(1194),
            protocol: config.protocol.unwrap_or_default(),
            ca_cert: config.ca_cert.unwrap_or_else(|| PathBuf::from("/etc/openvpn/ca.crt")),
            server_cert: config.server_cert.unwrap_or_else(|| PathBuf::from("/etc/openvpn/server.crt")),
            server_key: config.server_key.unwrap_or_else(|| PathBuf::from("/etc/openvpn/server.key")),
            dh_pem: config.dh_pem.unwrap_or_else(|| PathBuf::from("/etc/openvpn/dh.pem")),
            tls_auth_key: config.tls_auth_key.unwrap_or_else(|| PathBuf::from("/etc/openvpn/ta.key")),
            cipher: config.cipher.unwrap_or_else(|| "AES-256-CBC".to_string()),
            vpn_network,
            vpn_netmask: config.vpn_netmask.unwrap_or_else(|| vpn_network.netmask()),
            topology: config.topology.unwrap_or_default(),
            client_to_client: config.client_to_client.unwrap_or(false),
            duplicate_cn: config.duplicate_cn.unwrap_or(false),
            redirect_gateway: config.redirect_gateway.unwrap_or(true),
            dns_servers: config.dns_servers.unwrap_or(def_dns_servers),
            routes: config.routes.unwrap_or_default(),
            mssfix: config.mssfix.unwrap_or(true),
            fragment: config.fragment.unwrap_or(0),
            user: config.user.unwrap_or_else(|| "nobody".to_string()),
            group: config.group.unwrap_or_else(|| "nogroup".to_string()),
            extra_options: config.extra_server_options.unwrap_or_default(),
            compress: config.enable_compress.unwrap_or(true),
        };

        Self {
            config_file,
            state: config.state.unwrap_or_default(),
            server,
            pki: PkiOps {
                generate: config.pki.generate.unwrap_or(false),
                dir: config.pki.dir.unwrap_or_else(|| PathBuf::from("/etc/openvpn/easy-rsa")),
                key_size: config.pki.key_size.unwrap_or_default(),
                cert_days: config.pki.cert_days.unwrap_or(3650),
                easyrsa: config.pki.easyrsa.unwrap_or_else(|| PathBuf::from("easyrsa")),
            },
            nat: NatOps {
                enabled: config.nat.enabled.unwrap_or(true),
                interface: config.nat.interface.unwrap_or_else(|| "eth0".to_string()),
                rules_file: config
                    .nat
                    .rules_file
                    .unwrap_or_else(|| PathBuf::from("/etc/iptables/rules.v4")),
                iptables: config.nat.iptables.unwrap_or_else(|| PathBuf::from("iptables")),
                iptables_save: config
                    .nat
                    .iptables_save
                    .unwrap_or_else(|| PathBuf::from("iptables-save")),
                sysctl: config.nat.sysctl.unwrap_or_else(|| PathBuf::from("sysctl")),
            },
            ccd_dir: config.ccd.dir.unwrap_or_else(|| PathBuf::from("/etc/openvpn/ccd")),
            ccd: config
                .ccd
                .clients
                .iter()
                .map(|(client, push)| (client.clone(), push.value()))
                .collect(),
            service_name,
        }
    }
}
