use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cmd;
use crate::config::State;
use crate::install;
use crate::nat;
use crate::ops::Ops;
use crate::ovpn::ccd;
use crate::ovpn::conf::{self, RenderedConfig};
use crate::pki;
use crate::service::{self, Verb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Server,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Install,
    Configure,
    Start,
    Stop,
    Restart,
    Status,
}

#[derive(Debug, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub config_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub enum Error {
    UnsupportedMode { mode: Mode, action: Action },
    Install(install::Error),
    Pki(pki::Error),
    Conf(conf::Error),
    Nat(nat::Error),
    Ccd(ccd::Error),
    Service(cmd::Error),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Install => "install",
            Action::Configure => "configure",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Status => "status",
        };
        write!(f, "{}", name)
    }
}

#[derive(Default)]
struct Report {
    changed: bool,
    messages: Vec<String>,
}

impl Report {
    fn changed(&mut self, message: impl Into<String>) {
        self.changed = true;
        self.messages.push(message.into());
    }

    fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn message(&self) -> String {
        if self.messages.is_empty() {
            "No changes".to_string()
        } else {
            self.messages.join(" | ")
        }
    }
}

/// Performs a single action. In check mode nothing is modified and every mutating
/// step is reported as "Would ..." without inspecting the host.
pub fn run(ops: &Ops, mode: Mode, action: Action, check_mode: bool) -> Result<Outcome, Error> {
    let mut report = Report::default();
    let mut status = None;

    tracing::info!(?mode, %action, check_mode, "applying");

    match action {
        Action::Install => install_packages(ops, check_mode, &mut report)?,
        Action::Configure => {
            if mode == Mode::Client {
                return Err(Error::UnsupportedMode { mode, action });
            }
            configure(ops, check_mode, &mut report)?
        }
        Action::Start => control(ops, Verb::Start, check_mode, &mut report)?,
        Action::Stop => control(ops, Verb::Stop, check_mode, &mut report)?,
        Action::Restart => control(ops, Verb::Restart, check_mode, &mut report)?,
        Action::Status => status = Some(service::status(&ops.service_name).map_err(Error::Service)?),
    }

    Ok(Outcome {
        changed: report.changed,
        message: report.message(),
        status,
        config_path: ops.config_file.clone(),
    })
}

fn install_packages(ops: &Ops, check_mode: bool, report: &mut Report) -> Result<(), Error> {
    if check_mode {
        report.note("Would install OpenVPN");
    } else if !install::is_installed() {
        install::run(Path::new("/etc")).map_err(Error::Install)?;
        report.changed("OpenVPN installed");
    }

    if ops.pki.generate {
        if check_mode {
            report.note("Would generate PKI");
        } else {
            let pki = pki::generate(&ops.pki, &ops.server).map_err(Error::Pki)?;
            if pki.changed() {
                report.changed(pki.message());
            } else {
                report.note(pki.message());
            }
        }
    }

    Ok(())
}

fn configure(ops: &Ops, check_mode: bool, report: &mut Report) -> Result<(), Error> {
    if check_mode {
        report.note("Would generate configuration");
        return Ok(());
    }

    if ops.state == State::Absent {
        if conf::remove(&ops.config_file).map_err(Error::Conf)? {
            report.changed(format!("Configuration removed from {}", ops.config_file.display()));
        }
        if ops.nat.enabled && nat::disable(&ops.nat, &ops.server.vpn_network).map_err(Error::Nat)? {
            report.changed("NAT masquerading removed");
        }
        return Ok(());
    }

    let rendered = RenderedConfig::new(ops.config_file.clone(), &ops.server);
    let written = conf::write(&rendered, ops.state).map_err(Error::Conf)?;
    tracing::debug!(changed = written.changed, written = written.written, path = ?ops.config_file, "server configuration");
    if written.changed {
        report.changed(format!("Configuration written to {}", ops.config_file.display()));
    }

    if ops.nat.enabled && nat::enable(&ops.nat, &ops.server.vpn_network).map_err(Error::Nat)? {
        report.changed("NAT masquerading configured");
    }

    let ccd = ccd::write_all(&ops.ccd_dir, &ops.ccd).map_err(Error::Ccd)?;
    if ccd.changed() {
        for client in &ccd.written {
            report.changed(format!("Wrote CCD for {}", client));
        }
    }

    Ok(())
}

fn control(ops: &Ops, verb: Verb, check_mode: bool, report: &mut Report) -> Result<(), Error> {
    if check_mode {
        report.note(format!("Would {} service", verb));
        return Ok(());
    }

    service::control(&ops.service_name, verb).map_err(Error::Service)?;
    report.changed(format!("Service {} successful", verb));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::fs;

    fn ops_in(dir: &Path, extra: &str) -> Ops {
        let config = toml::from_str::<Config>(&format!(
            r#"
            config_file = "{}"
            {}

            [nat]
            enabled = false

            [ccd]
            dir = "{}"
            "#,
            dir.join("server.conf").display(),
            extra,
            dir.join("ccd").display(),
        ))
        .unwrap();
        Ops::from(config)
    }

    #[test]
    fn test_configure_writes_config_and_ccd() {
        let dir = tempfile::tempdir().unwrap();
        let mut ops = ops_in(dir.path(), "");
        ops.ccd.insert("client1".to_string(), "10.8.0.10 255.255.255.255".to_string());

        let res = run(&ops, Mode::Server, Action::Configure, false);
        assert!(res.is_ok());
        let outcome = res.unwrap();
        assert!(outcome.changed);
        assert_eq!(
            outcome.message,
            format!(
                "Configuration written to {} | Wrote CCD for client1",
                dir.path().join("server.conf").display()
            )
        );
        assert_eq!(outcome.config_path, dir.path().join("server.conf"));
        assert!(outcome.status.is_none());
        assert!(fs::read_to_string(dir.path().join("server.conf"))
            .unwrap()
            .contains("port 1194"));

        let again = run(&ops, Mode::Server, Action::Configure, false).unwrap();
        assert!(!again.changed);
        assert_eq!(again.message, "No changes");
    }

    #[test]
    fn test_configure_without_clients_skips_ccd() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops_in(dir.path(), "");

        let outcome = run(&ops, Mode::Server, Action::Configure, false).unwrap();
        assert_eq!(
            outcome.message,
            format!("Configuration written to {}", dir.path().join("server.conf").display())
        );
        assert!(!dir.path().join("ccd").exists());
    }

    #[test]
    fn test_configure_absent_removes_config() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops_in(dir.path(), "");
        run(&ops, Mode::Server, Action::Configure, false).unwrap();

        let absent = ops_in(dir.path(), r#"state = "absent""#);
        let outcome = run(&absent, Mode::Server, Action::Configure, false).unwrap();
        assert!(outcome.changed);
        assert!(!dir.path().join("server.conf").exists());

        let outcome = run(&absent, Mode::Server, Action::Configure, false).unwrap();
        assert!(!outcome.changed);
    }

    #[test]
    fn test_configure_client_mode_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops_in(dir.path(), "");
        let res = run(&ops, Mode::Client, Action::Configure, false);
        assert!(matches!(res, Err(Error::UnsupportedMode { .. })));
    }

    #[test]
    fn test_check_mode_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ops = ops_in(dir.path(), "[pki]\ngenerate = true");

        let outcome = run(&ops, Mode::Server, Action::Configure, true).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "Would generate configuration");
        assert!(!dir.path().join("server.conf").exists());

        let outcome = run(&ops, Mode::Server, Action::Install, true).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "Would install OpenVPN | Would generate PKI");

        let outcome = run(&ops, Mode::Server, Action::Restart, true).unwrap();
        assert!(!outcome.changed);
        assert_eq!(outcome.message, "Would restart service");
    }

    #[test]
    fn test_outcome_json() {
        let outcome = Outcome {
            changed: true,
            message: "Service start successful".to_string(),
            status: None,
            config_path: PathBuf::from("/etc/openvpn/server.conf"),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "changed": true,
                "message": "Service start successful",
                "config_path": "/etc/openvpn/server.conf",
            })
        );
    }
}
