use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::config::{Protocol, State, Topology};
use crate::network::VpnNetwork;

const DEFAULT_SERVER_SETTINGS: [&str; 4] = ["status openvpn-status.log", "verb 3", "mute 20", "keepalive 10 120"];

/// Everything that ends up in the server configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub port: u16,
    pub protocol: Protocol,
    pub ca_cert: PathBuf,
    pub server_cert: PathBuf,
    pub server_key: PathBuf,
    pub dh_pem: PathBuf,
    pub tls_auth_key: PathBuf,
    pub cipher: String,
    pub vpn_network: VpnNetwork,
    pub vpn_netmask: Ipv4Addr,
    pub topology: Topology,
    pub client_to_client: bool,
    pub duplicate_cn: bool,
    pub redirect_gateway: bool,
    pub dns_servers: Vec<String>,
    pub routes: Vec<String>,
    pub mssfix: bool,
    pub fragment: u32,
    pub user: String,
    pub group: String,
    pub extra_options: Vec<String>,
    pub compress: bool,
}

#[derive(Debug)]
pub struct RenderedConfig {
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug)]
pub struct Written {
    // content differed from the file on disk, or there was no file
    pub changed: bool,
    pub written: bool,
}

#[derive(Debug, Serialize)]
pub enum Error {
    IO(String),
}

impl RenderedConfig {
    pub fn new(path: PathBuf, opts: &ServerOptions) -> Self {
        RenderedConfig {
            path,
            content: render(opts),
        }
    }
}

pub fn render(opts: &ServerOptions) -> String {
    let mut lines: Vec<String> = vec![
        "# OpenVPN Server Configuration".to_string(),
        format!("port {}", opts.port),
        format!("proto {}", opts.protocol),
        "dev tun".to_string(),
        String::new(),
        format!("ca {}", opts.ca_cert.display()),
        format!("cert {}", opts.server_cert.display()),
        format!("key {}", opts.server_key.display()),
        format!("dh {}", opts.dh_pem.display()),
        format!("tls-auth {} 0", opts.tls_auth_key.display()),
        String::new(),
        format!("cipher {}", opts.cipher),
        String::new(),
        format!("server {} {}", opts.vpn_network, opts.vpn_netmask),
        String::new(),
    ];

    // openvpn rejects a topology directive in point-to-point mode
    if opts.topology != Topology::P2p {
        lines.push(format!("topology {}", opts.topology));
    }
    if opts.client_to_client {
        lines.push("client-to-client".to_string());
    }
    if opts.duplicate_cn {
        lines.push("duplicate-cn".to_string());
    }
    if opts.redirect_gateway {
        lines.push(r#"push "redirect-gateway def1 bypass-dhcp""#.to_string());
    }
    lines.extend(opts.dns_servers.iter().map(|dns| format!(r#"push "dhcp-option DNS {}""#, dns)));
    lines.extend(opts.routes.iter().map(|route| format!(r#"push "route {}""#, route)));
    if opts.mssfix {
        lines.push("mssfix".to_string());
    }
    if opts.fragment > 0 {
        lines.push(format!("fragment {}", opts.fragment));
    }

    lines.push("persist-key".to_string());
    lines.push("persist-tun".to_string());
    lines.push(format!("user {}", opts.user));
    lines.push(format!("group {}", opts.group));
    lines.extend(DEFAULT_SERVER_SETTINGS.iter().map(|s| s.to_string()));
    lines.extend(opts.extra_options.iter().cloned());

    if opts.compress {
        lines.push("compress lz4".to_string());
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

/// Writes the rendered configuration.
/// `changed` reflects the comparison before writing, with `State::Present` the file is
/// rewritten even if unchanged.
pub fn write(rendered: &RenderedConfig, state: State) -> Result<Written, Error> {
    let path = &rendered.path;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| Error::IO(format!("creating directory {:?} failed: {:?}", parent, err)))?;
    }

    let changed = match fs::read(path) {
        Ok(existing) => existing != rendered.content.as_bytes(),
        Err(err) if err.kind() == ErrorKind::NotFound => true,
        Err(err) => return Err(Error::IO(format!("reading {:?} failed: {:?}", path, err))),
    };

    let written = changed || state == State::Present;
    if written {
        fs::write(path, &rendered.content).map_err(|err| Error::IO(format!("writing {:?} failed: {:?}", path, err)))?;
        tracing::debug!(?path, changed, "server configuration written");
    }

    Ok(Written { changed, written })
}

/// Removes the configuration file, returns whether there was one.
pub fn remove(path: &Path) -> Result<bool, Error> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
        Err(err) => Err(Error::IO(format!("removing {:?} failed: {:?}", path, err))),
    }
}
