use serde::Serialize;
use std::fs;
use std::process::Command;

use crate::cmd;
use crate::network::VpnNetwork;
use crate::ops::NatOps;

#[derive(Debug, Serialize)]
pub enum Error {
    IO(String),
    Cmd(cmd::Error),
}

/// Enables forwarding and masquerades traffic from the VPN network.
/// Returns whether a new rule was added.
pub fn enable(nat: &NatOps, network: &VpnNetwork) -> Result<bool, Error> {
    cmd::run(Command::new(&nat.sysctl).arg("-w").arg("net.ipv4.ip_forward=1")).map_err(Error::Cmd)?;

    if rule_exists(nat, network) {
        tracing::debug!(%network, interface = %nat.interface, "masquerade rule already present");
        return Ok(false);
    }

    cmd::run(&mut masquerade(nat, network, "-A")).map_err(Error::Cmd)?;
    save(nat)?;
    tracing::info!(%network, interface = %nat.interface, "masquerade rule added");
    Ok(true)
}

/// Removes the masquerade rule, returns whether there was one.
pub fn disable(nat: &NatOps, network: &VpnNetwork) -> Result<bool, Error> {
    if !rule_exists(nat, network) {
        return Ok(false);
    }

    cmd::run(&mut masquerade(nat, network, "-D")).map_err(Error::Cmd)?;
    save(nat)?;
    tracing::info!(%network, interface = %nat.interface, "masquerade rule removed");
    Ok(true)
}

fn rule_exists(nat: &NatOps, network: &VpnNetwork) -> bool {
    cmd::succeeds(&mut masquerade(nat, network, "-C"))
}

fn masquerade(nat: &NatOps, network: &VpnNetwork, op: &str) -> Command {
    let mut command = Command::new(&nat.iptables);
    command
        .arg("-t")
        .arg("nat")
        .arg(op)
        .arg("POSTROUTING")
        .arg("-s")
        .arg(network.to_string())
        .arg("-o")
        .arg(&nat.interface)
        .arg("-j")
        .arg("MASQUERADE");
    command
}

fn save(nat: &NatOps) -> Result<(), Error> {
    let rules = cmd::run(&mut Command::new(&nat.iptables_save)).map_err(Error::Cmd)?;
    if let Some(parent) = nat.rules_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| Error::IO(format!("creating directory {:?} failed: {:?}", parent, err)))?;
    }
    fs::write(&nat.rules_file, rules)
        .map_err(|err| Error::IO(format!("writing {:?} failed: {:?}", nat.rules_file, err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::tests::script;
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};

    #[test]
    fn test_masquerade_rule() {
        let nat = NatOps {
            enabled: true,
            interface: "ens3".to_string(),
            rules_file: PathBuf::from("/etc/iptables/rules.v4"),
            iptables: PathBuf::from("iptables"),
            iptables_save: PathBuf::from("iptables-save"),
            sysctl: PathBuf::from("sysctl"),
        };
        let network: VpnNetwork = "10.8.0.0/24".parse().unwrap();
        let command = masquerade(&nat, &network, "-C");
        assert_eq!(command.get_program(), "iptables");
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            vec!["-t", "nat", "-C", "POSTROUTING", "-s", "10.8.0.0/24", "-o", "ens3", "-j", "MASQUERADE"]
        );
    }

    // fake iptables keeping the rule as a marker file
    fn fake_nat(dir: &Path) -> NatOps {
        let log = dir.join("calls.log");
        let mark = dir.join("rule");
        NatOps {
            enabled: true,
            interface: "eth0".to_string(),
            rules_file: dir.join("rules").join("rules.v4"),
            iptables: script(
                dir,
                "iptables",
                &format!(
                    r#"echo "iptables $@" >> {log}
case "$3" in
  -C) test -f {mark} ;;
  -A) touch {mark} ;;
  -D) rm {mark} ;;
esac"#,
                    log = log.display(),
                    mark = mark.display()
                ),
            ),
            iptables_save: script(
                dir,
                "iptables-save",
                &format!("echo iptables-save >> {}\necho '*nat'\necho COMMIT", log.display()),
            ),
            sysctl: script(dir, "sysctl", &format!("echo \"sysctl $@\" >> {}", log.display())),
        }
    }

    fn calls(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("calls.log"))
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }

    #[test]
    fn test_enable_disable_checks_rule_first() {
        let dir = tempfile::tempdir().unwrap();
        let nat = fake_nat(dir.path());
        let network: VpnNetwork = "10.8.0.0/24".parse().unwrap();
        let rule = "-s 10.8.0.0/24 -o eth0 -j MASQUERADE";

        let res = enable(&nat, &network);
        assert!(res.is_ok());
        assert!(res.unwrap());
        assert_eq!(
            calls(dir.path()),
            vec![
                "sysctl -w net.ipv4.ip_forward=1".to_string(),
                format!("iptables -t nat -C POSTROUTING {}", rule),
                format!("iptables -t nat -A POSTROUTING {}", rule),
                "iptables-save".to_string(),
            ]
        );
        assert_eq!(fs::read_to_string(&nat.rules_file).unwrap(), "*nat\nCOMMIT\n");

        assert!(!enable(&nat, &network).unwrap());
        let after = calls(dir.path());
        assert_eq!(after.len(), 6);
        assert_eq!(after[5], format!("iptables -t nat -C POSTROUTING {}", rule));

        assert!(disable(&nat, &network).unwrap());
        let after = calls(dir.path());
        assert_eq!(
            after[6..],
            [
                format!("iptables -t nat -C POSTROUTING {}", rule),
                format!("iptables -t nat -D POSTROUTING {}", rule),
                "iptables-save".to_string(),
            ]
        );

        assert!(!disable(&nat, &network).unwrap());
        assert_eq!(calls(dir.path()).len(), 10);
    }

    #[test]
    fn test_enable_fails_on_sysctl_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut nat = fake_nat(dir.path());
        nat.sysctl = script(dir.path(), "sysctl-broken", "echo 'permission denied' >&2\nexit 255");
        let network: VpnNetwork = "10.8.0.0/24".parse().unwrap();

        let res = enable(&nat, &network);
        assert!(matches!(res, Err(Error::Cmd(cmd::Error::Failed { .. }))));
        assert!(!nat.rules_file.exists());
    }
}
