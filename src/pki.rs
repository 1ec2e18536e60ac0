use serde::Serialize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::cmd;
use crate::ops::PkiOps;
use crate::ovpn::conf::ServerOptions;

#[derive(Debug, Serialize)]
pub struct Pki {
    pub generated: Vec<String>,
}

#[derive(Debug, Serialize)]
pub enum Error {
    EasyRsaNotFound(PathBuf),
    IO(String),
    Cmd(cmd::Error),
}

impl Pki {
    pub fn changed(&self) -> bool {
        !self.generated.is_empty()
    }

    pub fn message(&self) -> String {
        if self.generated.is_empty() {
            "PKI already exists".to_string()
        } else {
            self.generated.join(" | ")
        }
    }
}

pub fn generate(pki: &PkiOps, server: &ServerOptions) -> Result<Pki, Error> {
    fs::create_dir_all(&pki.dir)
        .map_err(|err| Error::IO(format!("creating pki directory {:?} failed: {:?}", pki.dir, err)))?;

    if !cmd::which(&pki.easyrsa.to_string_lossy()) {
        return Err(Error::EasyRsaNotFound(pki.easyrsa.clone()));
    }

    let mut generated = Vec::new();
    let pki_root = pki.dir.join("pki");

    if !pki_root.exists() {
        easyrsa(pki, &["init-pki"])?;
        generated.push("PKI initialized".to_string());
    }

    if !pki_root.join("ca.crt").exists() {
        easyrsa(pki, &["build-ca", "nopass"])?;
        generated.push("CA certificate generated".to_string());
    }

    if !pki_root.join("issued").join("server.crt").exists() {
        easyrsa(pki, &["gen-req", "server", "nopass"])?;
        easyrsa(pki, &["sign-req", "server", "server"])?;
        generated.push("Server certificate generated".to_string());
    }

    if !pki_root.join("dh.pem").exists() {
        easyrsa(pki, &["gen-dh"])?;
        generated.push("Diffie-Hellman parameters generated".to_string());
    }

    if !server.tls_auth_key.exists() {
        create_parent(&server.tls_auth_key)?;
        cmd::run(
            Command::new("openvpn")
                .arg("--genkey")
                .arg("--secret")
                .arg(&server.tls_auth_key),
        )
        .map_err(Error::Cmd)?;
        generated.push("TLS authentication key generated".to_string());
    }

    install_files(&pki_root, server)?;

    tracing::info!(dir = ?pki.dir, generated = generated.len(), "pki ready");
    Ok(Pki { generated })
}

/// Copies generated artifacts to the locations the server configuration refers to
/// and sets their permissions. Existing destinations are left untouched.
pub fn install_files(pki_root: &Path, server: &ServerOptions) -> Result<(), Error> {
    let copies = [
        (pki_root.join("ca.crt"), &server.ca_cert),
        (pki_root.join("issued").join("server.crt"), &server.server_cert),
        (pki_root.join("private").join("server.key"), &server.server_key),
        (pki_root.join("dh.pem"), &server.dh_pem),
    ];

    for (src, dst) in &copies {
        if src.exists() && !dst.exists() {
            create_parent(dst)?;
            fs::copy(src, dst).map_err(|err| Error::IO(format!("copying {:?} to {:?} failed: {:?}", src, dst, err)))?;
            set_mode(dst, 0o600)?;
        }
    }

    set_mode(&server.server_key, 0o600)?;
    set_mode(&server.ca_cert, 0o644)?;
    set_mode(&server.server_cert, 0o644)?;
    set_mode(&server.dh_pem, 0o644)?;
    set_mode(&server.tls_auth_key, 0o600)?;
    Ok(())
}

fn easyrsa(pki: &PkiOps, args: &[&str]) -> Result<String, Error> {
    cmd::run(
        Command::new(&pki.easyrsa)
            .args(args)
            .current_dir(&pki.dir)
            .env("EASYRSA_BATCH", "1")
            .env("EASYRSA_KEY_SIZE", pki.key_size.bits().to_string())
            .env("EASYRSA_CA_EXPIRE", pki.cert_days.to_string())
            .env("EASYRSA_CERT_EXPIRE", pki.cert_days.to_string()),
    )
    .map_err(Error::Cmd)
}

fn create_parent(path: &Path) -> Result<(), Error> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|err| Error::IO(format!("creating directory {:?} failed: {:?}", parent, err))),
        None => Ok(()),
    }
}

fn set_mode(path: &Path, mode: u32) -> Result<(), Error> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|err| Error::IO(format!("setting permissions on {:?} failed: {:?}", path, err)))
}
