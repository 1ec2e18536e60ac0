use serde::Serialize;
use std::path::Path;
use std::process::Command;

use crate::cmd;

const PACKAGES: [&str; 2] = ["openvpn", "easy-rsa"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PackageManager {
    Apt,
    Yum,
}

#[derive(Debug, Serialize)]
pub enum Error {
    UnsupportedPlatform,
    Cmd(cmd::Error),
}

impl PackageManager {
    /// Detects the package manager from the release files below `etc`.
    pub fn detect(etc: &Path) -> Option<Self> {
        if etc.join("debian_version").exists() {
            Some(PackageManager::Apt)
        } else if etc.join("redhat-release").exists() {
            Some(PackageManager::Yum)
        } else {
            None
        }
    }

    fn commands(&self) -> Vec<Command> {
        match self {
            PackageManager::Apt => {
                let mut update = Command::new("apt-get");
                update.arg("update").env("DEBIAN_FRONTEND", "noninteractive");
                let mut install = Command::new("apt-get");
                install
                    .arg("install")
                    .arg("-y")
                    .args(PACKAGES)
                    .env("DEBIAN_FRONTEND", "noninteractive");
                vec![update, install]
            }
            PackageManager::Yum => {
                let mut install = Command::new("yum");
                install.arg("install").arg("-y").args(PACKAGES);
                vec![install]
            }
        }
    }
}

pub fn is_installed() -> bool {
    cmd::which("openvpn")
}

pub fn run(etc: &Path) -> Result<PackageManager, Error> {
    let manager = PackageManager::detect(etc).ok_or(Error::UnsupportedPlatform)?;
    tracing::info!(?manager, "installing openvpn");
    for mut command in manager.commands() {
        cmd::run(&mut command).map_err(Error::Cmd)?;
    }
    Ok(manager)
}
