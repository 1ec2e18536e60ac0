use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct Ccd {
    pub written: Vec<String>,
}

#[derive(Debug, Serialize)]
pub enum Error {
    InvalidClientName(String),
    IO(String),
}

impl Ccd {
    pub fn changed(&self) -> bool {
        !self.written.is_empty()
    }
}

pub fn content(ifconfig_push: &str) -> String {
    format!("ifconfig-push {}\n", ifconfig_push)
}

/// Writes one `ifconfig-push` file per client into `dir`, skipping files that are up to date.
pub fn write_all(dir: &Path, clients: &BTreeMap<String, String>) -> Result<Ccd, Error> {
    if clients.is_empty() {
        return Ok(Ccd { written: vec![] });
    }

    if let Some(name) = clients.keys().find(|name| !valid_client_name(name)) {
        return Err(Error::InvalidClientName(name.clone()));
    }

    fs::create_dir_all(dir).map_err(|err| Error::IO(format!("creating ccd directory {:?} failed: {:?}", dir, err)))?;

    let mut written = Vec::new();
    for (client, ifconfig_push) in clients {
        let path = dir.join(client);
        let expected = content(ifconfig_push);

        let up_to_date = match fs::read(&path) {
            Ok(existing) => existing == expected.as_bytes(),
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => return Err(Error::IO(format!("reading ccd file {:?} failed: {:?}", path, err))),
        };
        if up_to_date {
            continue;
        }

        fs::write(&path, &expected).map_err(|err| Error::IO(format!("writing ccd file {:?} failed: {:?}", path, err)))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .map_err(|err| Error::IO(format!("setting permissions on {:?} failed: {:?}", path, err)))?;
        tracing::debug!(%client, ?path, "ccd file written");
        written.push(client.clone());
    }

    Ok(Ccd { written })
}

fn valid_client_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}
